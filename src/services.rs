pub mod auth;
pub mod rbac_service;
pub mod tenancy_service;
