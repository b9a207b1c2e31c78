// src/handlers/auth.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::auth::{AuthResponse, LoginUserPayload, RegisterUserPayload, SetupStatus, User},
    models::tenancy::Tenant,
    services::auth::SessionPair,
};

// Nome do cookie do refresh token. HttpOnly + Secure + SameSite=Strict:
// nunca legível por script, nunca numa URL.
const REFRESH_COOKIE: &str = "refresh_token";

fn refresh_cookie(value: String) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, value))
        .path("/api/auth")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .build()
}

fn session_response(jar: CookieJar, pair: SessionPair) -> (CookieJar, Json<AuthResponse>) {
    let jar = jar.add(refresh_cookie(pair.refresh_token));
    (
        jar,
        Json(AuthResponse {
            access_token: pair.access_token,
            expires_in: pair.expires_in,
        }),
    )
}

// Handler de registro
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterUserPayload,
    responses((status = 201, body = AuthResponse))
)]
pub async fn register(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<RegisterUserPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let pair = app_state
        .auth_service
        .register_user(&payload.email, &payload.password)
        .await?;

    Ok((StatusCode::CREATED, session_response(jar, pair)))
}

// Handler de login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginUserPayload,
    responses((status = 200, body = AuthResponse), (status = 401, description = "Credenciais inválidas"))
)]
pub async fn login(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginUserPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let pair = app_state
        .auth_service
        .login_user(&payload.email, &payload.password)
        .await?;

    Ok(session_response(jar, pair))
}

// Rotação do refresh token: o apresentado (cookie) é consumido, um novo
// par é emitido. Replay = família inteira revogada.
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    tag = "Auth",
    responses((status = 200, body = AuthResponse), (status = 401, description = "Não autenticado"))
)]
pub async fn refresh(
    State(app_state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let raw = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or(AppError::Unauthenticated("cookie de refresh ausente"))?;

    let pair = app_state.auth_service.refresh_session(&raw).await?;

    Ok(session_response(jar, pair))
}

// Logout: revoga a família do refresh token e limpa o cookie. O access
// token já emitido vale até expirar sozinho.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    responses((status = 204))
)]
pub async fn logout(
    State(app_state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    if let Some(cookie) = jar.get(REFRESH_COOKIE) {
        let raw = cookie.value().to_string();
        app_state.auth_service.revoke_session(&raw).await?;
    }

    let jar = jar.remove(refresh_cookie(String::new()));

    Ok((StatusCode::NO_CONTENT, jar))
}

// "Logout em todos os dispositivos": zera os refresh tokens do usuário.
#[utoipa::path(
    post,
    path = "/api/auth/logout-all",
    tag = "Auth",
    security(("api_jwt" = [])),
    responses((status = 204))
)]
pub async fn logout_all(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let revoked = app_state.auth_service.revoke_all_sessions(user.id).await?;
    tracing::info!(user = %user.id, revoked, "logout-all");

    let jar = jar.remove(refresh_cookie(String::new()));

    Ok((StatusCode::NO_CONTENT, jar))
}

// Handler da rota protegida /me
#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "Users",
    security(("api_jwt" = [])),
    responses((status = 200, body = User))
)]
pub async fn get_me(AuthenticatedUser(user): AuthenticatedUser) -> Json<User> {
    Json(user)
}

// Lista os tenants onde o usuário tem membership ativa (é com isso que
// o frontend monta o seletor de tenant).
#[utoipa::path(
    get,
    path = "/api/users/me/tenants",
    tag = "Users",
    security(("api_jwt" = [])),
    responses((status = 200, body = [Tenant]))
)]
pub async fn get_my_tenants(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Vec<Tenant>>, AppError> {
    let tenants = app_state.tenant_service.list_user_tenants(user.id).await?;
    Ok(Json(tenants))
}

// Endpoint PÚBLICO de status do setup: "alguém já se registrou?".
// Contas is_system = true (admin semeado) não contam.
#[utoipa::path(
    get,
    path = "/api/setup/status",
    tag = "Setup",
    responses((status = 200, body = SetupStatus))
)]
pub async fn setup_status(
    State(app_state): State<AppState>,
) -> Result<Json<SetupStatus>, AppError> {
    let real_users = app_state.user_repo.count_non_system_users().await?;

    Ok(Json(SetupStatus {
        setup_complete: real_users > 0,
    }))
}
