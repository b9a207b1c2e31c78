pub mod user_repo;
pub use user_repo::UserRepository;
pub mod tenancy_repo;
pub use tenancy_repo::TenantRepository;
pub mod rbac_repo;
pub use rbac_repo::RbacRepository;
pub mod token_repo;
pub use token_repo::TokenRepository;
pub mod content_repo;
pub use content_repo::ContentRepository;
pub mod scope;
pub use scope::ScopeBinder;
