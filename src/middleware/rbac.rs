// src/middleware/rbac.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::marker::PhantomData;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::pipeline::RequestContext,
    services::rbac_service::Decision,
};

/// 1. O Trait que define o que é uma Permissão
pub trait PermissionDef: Send + Sync + 'static {
    fn slug() -> &'static str;
}

/// 2. O Extractor (Guardião)
///
/// É a superfície `Authorize(action)` dos handlers: o motor de
/// permissões é invocado uniformemente por aqui, nunca por condicionais
/// ad hoc espalhadas pelos handlers.
pub struct RequirePermission<T>(pub PhantomData<T>);

// 3. Implementação do FromRequestParts

impl<T, S> FromRequestParts<S> for RequirePermission<T>
where
    T: PermissionDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        // A. O contexto já passou pelo pipeline (tenant + usuário)
        let ctx = parts
            .extensions
            .get::<RequestContext>()
            .ok_or(AppError::Unauthenticated("contexto de requisição ausente"))?;

        // B. Pega o slug da permissão
        let required_perm = T::slug();

        // C. Avalia no motor de permissões
        let decision = app_state
            .rbac_service
            .authorize(ctx.user_id(), ctx.tenant_id(), required_perm)
            .await?;

        // Negado é terminal: 403, sem revelar se o recurso existe.
        if decision == Decision::Denied {
            return Err(AppError::Unauthorized(required_perm.to_string()));
        }

        Ok(RequirePermission(PhantomData))
    }
}

// ---
// DEFINIÇÃO DAS PERMISSÕES (TIPOS)
// ---

pub struct PermArticleCreate;
impl PermissionDef for PermArticleCreate {
    fn slug() -> &'static str { "article:create" }
}

pub struct PermArticleRead;
impl PermissionDef for PermArticleRead {
    fn slug() -> &'static str { "article:read" }
}

pub struct PermArticleUpdate;
impl PermissionDef for PermArticleUpdate {
    fn slug() -> &'static str { "article:update" }
}

pub struct PermArticleDelete;
impl PermissionDef for PermArticleDelete {
    fn slug() -> &'static str { "article:delete" }
}

pub struct PermRoleCreate;
impl PermissionDef for PermRoleCreate {
    fn slug() -> &'static str { "role:create" }
}

pub struct PermRoleAssign;
impl PermissionDef for PermRoleAssign {
    fn slug() -> &'static str { "role:assign" }
}

pub struct PermTenantManage;
impl PermissionDef for PermTenantManage {
    fn slug() -> &'static str { "tenant:manage" }
}
