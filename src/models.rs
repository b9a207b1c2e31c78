pub mod auth;
pub mod content;
pub mod rbac;
pub mod session;
pub mod tenancy;
