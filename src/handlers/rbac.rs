// src/handlers/rbac.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{
        pipeline::RequestContext,
        rbac::{PermRoleAssign, PermRoleCreate, RequirePermission},
    },
    models::rbac::{AssignRolePayload, CreateRolePayload, Permission},
};

// POST /api/tenant/roles
#[utoipa::path(
    post,
    path = "/api/tenant/roles",
    tag = "RBAC",
    security(("api_jwt" = [])),
    request_body = CreateRolePayload,
    responses((status = 201))
)]
pub async fn create_role(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    _perm: RequirePermission<PermRoleCreate>,
    Json(payload): Json<CreateRolePayload>,
) -> Result<impl IntoResponse, AppError> {
    let response = app_state
        .rbac_service
        .create_role_with_permissions(
            ctx.tenant_id(),
            payload.name,
            payload.description,
            payload.permissions,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

// POST /api/tenant/roles/assign — mais um cargo para um membro.
// Composição é sempre por atribuição múltipla, nunca por herança.
#[utoipa::path(
    post,
    path = "/api/tenant/roles/assign",
    tag = "RBAC",
    security(("api_jwt" = [])),
    request_body = AssignRolePayload,
    responses((status = 204))
)]
pub async fn assign_role(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    _perm: RequirePermission<PermRoleAssign>,
    Json(payload): Json<AssignRolePayload>,
) -> Result<impl IntoResponse, AppError> {
    app_state
        .rbac_service
        .assign_role_to_member(ctx.tenant_id(), payload.user_id, payload.role_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

// GET /api/permissions (Para o frontend saber o que mostrar na tela de criação)
#[utoipa::path(
    get,
    path = "/api/permissions",
    tag = "RBAC",
    responses((status = 200, body = [Permission]))
)]
pub async fn list_permissions(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let permissions = app_state.rbac_service.list_system_permissions().await?;

    Ok(Json(permissions))
}
