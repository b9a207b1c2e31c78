pub mod auth;
pub mod pipeline;
pub mod rbac;
pub mod tenancy;
