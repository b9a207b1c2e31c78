pub mod auth;
pub mod content;
pub mod rbac;
pub mod tenancy;
