// src/handlers/content.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        pipeline::RequestContext,
        rbac::{
            PermArticleCreate, PermArticleDelete, PermArticleRead, PermArticleUpdate,
            RequirePermission,
        },
    },
    models::content::{Article, CreateArticlePayload, UpdateArticlePayload},
};

// Estes handlers são o consumidor representativo do núcleo: permissão
// via extractor, tenant/usuário via RequestContext, queries SEMPRE por
// uma ScopedConn. Nenhum deles monta contexto por conta própria.

#[utoipa::path(
    post,
    path = "/api/content/articles",
    tag = "Content",
    security(("api_jwt" = [])),
    request_body = CreateArticlePayload,
    responses((status = 201, body = Article))
)]
pub async fn create_article(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    _perm: RequirePermission<PermArticleCreate>,
    Json(payload): Json<CreateArticlePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    // ScopeBound -> Ready: o escopo entra na conexão antes de qualquer
    // query; se o bind falhar, a requisição falha (sem modo degradado).
    let mut conn = app_state
        .scope_binder
        .acquire(ctx.tenant_id(), ctx.user_id())
        .await?;

    let article = app_state
        .content_repo
        .create_article(&mut conn, ctx.user_id(), &payload.title, &payload.body)
        .await?;

    Ok((StatusCode::CREATED, Json(article)))
}

#[utoipa::path(
    get,
    path = "/api/content/articles",
    tag = "Content",
    security(("api_jwt" = [])),
    responses((status = 200, body = [Article]))
)]
pub async fn list_articles(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    _perm: RequirePermission<PermArticleRead>,
) -> Result<Json<Vec<Article>>, AppError> {
    let mut conn = app_state
        .scope_binder
        .acquire(ctx.tenant_id(), ctx.user_id())
        .await?;

    let articles = app_state.content_repo.list_articles(&mut conn).await?;

    Ok(Json(articles))
}

#[utoipa::path(
    get,
    path = "/api/content/articles/{id}",
    tag = "Content",
    security(("api_jwt" = [])),
    params(("id" = Uuid, Path, description = "ID do artigo")),
    responses((status = 200, body = Article), (status = 404))
)]
pub async fn get_article(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    _perm: RequirePermission<PermArticleRead>,
    Path(id): Path<Uuid>,
) -> Result<Json<Article>, AppError> {
    let mut conn = app_state
        .scope_binder
        .acquire(ctx.tenant_id(), ctx.user_id())
        .await?;

    let article = app_state
        .content_repo
        .find_article(&mut conn, id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(article))
}

#[utoipa::path(
    put,
    path = "/api/content/articles/{id}",
    tag = "Content",
    security(("api_jwt" = [])),
    params(("id" = Uuid, Path, description = "ID do artigo")),
    request_body = UpdateArticlePayload,
    responses((status = 200, body = Article), (status = 404))
)]
pub async fn update_article(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    _perm: RequirePermission<PermArticleUpdate>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateArticlePayload>,
) -> Result<Json<Article>, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let mut conn = app_state
        .scope_binder
        .acquire(ctx.tenant_id(), ctx.user_id())
        .await?;

    let article = app_state
        .content_repo
        .update_article(
            &mut conn,
            id,
            &payload.title,
            &payload.body,
            payload.is_published,
        )
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(article))
}

#[utoipa::path(
    delete,
    path = "/api/content/articles/{id}",
    tag = "Content",
    security(("api_jwt" = [])),
    params(("id" = Uuid, Path, description = "ID do artigo")),
    responses((status = 204), (status = 404))
)]
pub async fn delete_article(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    _perm: RequirePermission<PermArticleDelete>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = app_state
        .scope_binder
        .acquire(ctx.tenant_id(), ctx.user_id())
        .await?;

    let deleted = app_state.content_repo.delete_article(&mut conn, id).await?;
    if deleted == 0 {
        return Err(AppError::NotFound);
    }

    Ok(StatusCode::NO_CONTENT)
}

// ---
// Rota administrativa global (fora do pipeline de tenant)
// ---

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BypassQuery {
    // Motivo registrado no evento de auditoria.
    pub reason: Option<String>,
}

// Leitura cross-tenant pelo super-administrador. O bypass de RLS é um
// modo EXPLÍCITO: exige o cargo global, usa acquire_bypass (que emite
// exatamente um evento de auditoria) e nunca é o caminho padrão.
#[utoipa::path(
    get,
    path = "/api/admin/tenants/{tenant_id}/articles",
    tag = "Admin",
    security(("api_jwt" = [])),
    params(("tenant_id" = Uuid, Path, description = "Tenant alvo")),
    responses((status = 200, body = [Article]), (status = 403))
)]
pub async fn admin_list_tenant_articles(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(tenant_id): Path<Uuid>,
    axum::extract::Query(query): axum::extract::Query<BypassQuery>,
) -> Result<Json<Vec<Article>>, AppError> {
    // Só o cargo global de super-administrador chega ao bypass.
    if !app_state.rbac_service.is_superadmin(user.id).await? {
        return Err(AppError::Unauthorized("*".into()));
    }

    let reason = query
        .reason
        .unwrap_or_else(|| "leitura administrativa".to_string());

    let mut conn = app_state.scope_binder.acquire_bypass(user.id, &reason).await?;

    let articles = app_state
        .content_repo
        .list_articles_any_tenant(&mut conn, tenant_id)
        .await?;

    Ok(Json(articles))
}
