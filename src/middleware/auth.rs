// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::{common::error::AppError, config::AppState, models::auth::User};

/// Valida o bearer token e carrega o usuário ativo. Toda falha (header
/// ausente, token malformado, expirado, usuário desativado) colapsa na
/// MESMA resposta 401; o motivo fica só no log.
pub async fn bearer_user(app_state: &AppState, headers: &HeaderMap) -> Result<User, AppError> {
    let auth_header = headers
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .ok_or(AppError::Unauthenticated("header Authorization ausente"))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthenticated("header Authorization malformado"))?;

    // Validação stateless (assinatura + expiração)...
    let claims = app_state.auth_service.validate_access(token)?;

    // ...e só então o lookup do usuário para montar o contexto.
    app_state.auth_service.load_user(claims.sub).await
}

/// Guard para rotas autenticadas SEM tenant (criação de tenant, /me,
/// logout). As rotas de negócio usam o pipeline_guard, que inclui a
/// resolução de tenant.
pub async fn auth_guard(
    State(app_state): State<AppState>,
    mut request: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let user = bearer_user(&app_state, request.headers()).await?;

    // Insere o usuário nos "extensions" da requisição
    request.extensions_mut().insert(AuthenticatedUser(user));

    Ok(next.run(request).await)
}

// Extrator para obter o usuário autenticado diretamente nos handlers
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AppError::Unauthenticated("contexto de usuário ausente"))
    }
}
