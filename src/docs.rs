// src/docs.rs

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Setup ---
        handlers::auth::setup_status,

        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::auth::logout,
        handlers::auth::logout_all,

        // --- Users ---
        handlers::auth::get_me,
        handlers::auth::get_my_tenants,

        // --- Tenancy ---
        handlers::tenancy::create_tenant,
        handlers::tenancy::list_my_tenants,
        handlers::tenancy::add_domain,
        handlers::tenancy::rename_slug,

        // --- RBAC ---
        handlers::rbac::create_role,
        handlers::rbac::assign_role,
        handlers::rbac::list_permissions,

        // --- Content ---
        handlers::content::create_article,
        handlers::content::list_articles,
        handlers::content::get_article,
        handlers::content::update_article,
        handlers::content::delete_article,

        // --- Admin ---
        handlers::content::admin_list_tenant_articles,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::User,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,
            models::auth::SetupStatus,

            // --- Tenancy ---
            models::tenancy::Tenant,
            models::tenancy::Domain,
            models::tenancy::TenantMember,
            handlers::tenancy::CreateTenantPayload,
            handlers::tenancy::TenantCreatedResponse,
            handlers::tenancy::AddDomainPayload,
            handlers::tenancy::RenameSlugPayload,

            // --- RBAC ---
            models::rbac::Role,
            models::rbac::Permission,
            models::rbac::CreateRolePayload,
            models::rbac::AssignRolePayload,
            models::rbac::RoleResponse,

            // --- Content ---
            models::content::Article,
            models::content::CreateArticlePayload,
            models::content::UpdateArticlePayload,
        )
    ),
    tags(
        (name = "Setup", description = "Status de instalação"),
        (name = "Auth", description = "Autenticação e Sessões"),
        (name = "Users", description = "Dados do Usuário e Perfil"),
        (name = "Tenancy", description = "Gestão de Organizações e Domínios"),
        (name = "RBAC", description = "Controle de Acesso (Cargos e Permissões)"),
        (name = "Content", description = "Conteúdo (escopado por tenant)"),
        (name = "Admin", description = "Operações globais auditadas")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}
