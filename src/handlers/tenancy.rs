// src/handlers/tenancy.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        pipeline::RequestContext,
        rbac::{PermTenantManage, RequirePermission},
    },
    models::tenancy::{Domain, Tenant},
};

// ---
// 1. "Payloads" (Os "Formulários" da API)
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTenantPayload {
    // O slug vira subdomínio; as regras (charset, reservados) são
    // checadas no serviço, na criação.
    #[validate(length(min = 2, message = "O slug é obrigatório."))]
    pub slug: String,

    #[validate(length(min = 1, message = "O nome da organização é obrigatório."))]
    pub name: String,

    // Hostname do domínio primário (ex: "loja-centro.plataforma.app")
    #[validate(length(min = 3, message = "O hostname é obrigatório."))]
    pub hostname: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TenantCreatedResponse {
    pub tenant: Tenant,
    pub primary_domain: Domain,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddDomainPayload {
    #[validate(length(min = 3, message = "O hostname é obrigatório."))]
    pub hostname: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenameSlugPayload {
    #[validate(length(min = 2, message = "O novo slug é obrigatório."))]
    pub new_slug: String,
}

// ---
// 2. Os "Handlers" (As Rotas)
// ---

// Criação de tenant é um endpoint tenant-OPCIONAL: roda sem contexto de
// tenant (só autenticação), porque o tenant ainda não existe.
#[utoipa::path(
    post,
    path = "/api/tenants",
    tag = "Tenancy",
    security(("api_jwt" = [])),
    request_body = CreateTenantPayload,
    responses((status = 201, body = TenantCreatedResponse))
)]
pub async fn create_tenant(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateTenantPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    // Operação transacional: tenant + domínio primário + cargo de
    // administrador + membership do dono, tudo ou nada.
    let (tenant, primary_domain) = app_state
        .tenant_service
        .create_tenant_with_owner(&payload.slug, &payload.name, &payload.hostname, user.0.id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(TenantCreatedResponse {
            tenant,
            primary_domain,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/tenants",
    tag = "Tenancy",
    security(("api_jwt" = [])),
    responses((status = 200, body = [Tenant]))
)]
pub async fn list_my_tenants(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Tenant>>, AppError> {
    let tenants = app_state.tenant_service.list_user_tenants(user.0.id).await?;
    Ok(Json(tenants))
}

// Daqui para baixo as rotas rodam DENTRO do pipeline (tenant resolvido
// + sessão validada) e exigem a permissão de gestão do tenant.

#[utoipa::path(
    post,
    path = "/api/tenant/domains",
    tag = "Tenancy",
    security(("api_jwt" = [])),
    request_body = AddDomainPayload,
    responses((status = 201, body = Domain))
)]
pub async fn add_domain(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    _perm: RequirePermission<PermTenantManage>,
    Json(payload): Json<AddDomainPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let domain = app_state
        .tenant_service
        .add_domain(ctx.tenant_id(), &payload.hostname)
        .await?;

    Ok((StatusCode::CREATED, Json(domain)))
}

// A única forma de mudar o slug: migra o scope_key junto, na mesma
// transação.
#[utoipa::path(
    post,
    path = "/api/tenant/rename",
    tag = "Tenancy",
    security(("api_jwt" = [])),
    request_body = RenameSlugPayload,
    responses((status = 200, body = Tenant))
)]
pub async fn rename_slug(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    _perm: RequirePermission<PermTenantManage>,
    Json(payload): Json<RenameSlugPayload>,
) -> Result<Json<Tenant>, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let tenant = app_state
        .tenant_service
        .rename_slug(ctx.tenant_id(), &payload.new_slug)
        .await?;

    Ok(Json(tenant))
}
