// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
//
// As variantes de política (tenant, credencial, permissão) são resolvidas
// na camada de pipeline e nunca chegam aos handlers de negócio como
// exceções cruas. Falhas de infraestrutura (banco inacessível, bind de
// escopo) viram 5xx para que retry só aconteça onde faz sentido.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    // Credencial ausente, malformada, expirada ou revogada.
    // O chamador recebe SEMPRE a mesma resposta 401, sem distinção do
    // motivo; o motivo real fica no log interno.
    #[error("Não autenticado: {0}")]
    Unauthenticated(&'static str),

    // Autenticado, mas sem a permissão necessária. Distinto de 401 e
    // não revela se o recurso existe.
    #[error("Permissão '{0}' ausente")]
    Unauthorized(String),

    // O host não corresponde a nenhum domínio e o endpoint exige tenant.
    #[error("Tenant não encontrado para o host '{0}'")]
    TenantNotFound(String),

    // O seletor X-Tenant-Id aponta para um tenant onde o chamador não
    // tem membership ativa. Logado como possível tentativa de sondagem.
    #[error("Seletor de tenant sem membership ativa")]
    TenantMismatch,

    // A variável de escopo não pôde ser definida na conexão adquirida.
    // Fatal para a requisição: não existe modo degradado sem escopo.
    #[error("Falha ao vincular escopo de isolamento: {0}")]
    IsolationBindFailure(sqlx::Error),

    // Refresh token apresentado duas vezes: sinal de comprometimento.
    // A família inteira de tokens já foi revogada quando este erro sobe.
    #[error("Replay de refresh token detectado")]
    ReplayDetected,

    #[error("Requisição malformada: {0}")]
    BadRequest(String),

    #[error("Recurso não encontrado")]
    NotFound,

    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("Conflito: {0}")]
    UniqueConstraintViolation(String),

    #[error("Slug inválido: {0}")]
    InvalidSlug(String),

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }

            AppError::EmailAlreadyExists => (StatusCode::CONFLICT, "Este e-mail já está em uso."),
            AppError::UniqueConstraintViolation(msg) => {
                let body = Json(json!({ "error": msg }));
                return (StatusCode::CONFLICT, body).into_response();
            }
            AppError::InvalidSlug(msg) | AppError::BadRequest(msg) => {
                let body = Json(json!({ "error": msg }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }

            // Todas as falhas de credencial colapsam numa única resposta.
            // InvalidCredentials (login) e Unauthenticated (pipeline) não
            // dizem ao chamador POR QUE a credencial falhou.
            AppError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "E-mail ou senha inválidos.")
            }
            AppError::Unauthenticated(reason) => {
                tracing::debug!(reason, "credencial rejeitada");
                (StatusCode::UNAUTHORIZED, "Não autenticado.")
            }
            AppError::ReplayDetected => {
                // O chamador vê o mesmo 401 genérico de qualquer
                // credencial inválida.
                (StatusCode::UNAUTHORIZED, "Não autenticado.")
            }

            AppError::Unauthorized(ref perm) => {
                tracing::debug!(permission = %perm, "permissão negada");
                (StatusCode::FORBIDDEN, "Você não tem permissão para realizar esta ação.")
            }
            AppError::TenantMismatch => {
                tracing::warn!("seletor de tenant rejeitado (possível sondagem)");
                (StatusCode::FORBIDDEN, "Você não tem acesso a este tenant.")
            }

            AppError::TenantNotFound(ref host) => {
                tracing::debug!(host = %host, "host sem domínio cadastrado");
                (StatusCode::NOT_FOUND, "Tenant não encontrado.")
            }
            AppError::NotFound => (StatusCode::NOT_FOUND, "Recurso não encontrado."),
            AppError::UserNotFound => (StatusCode::NOT_FOUND, "Usuário não encontrado."),

            // Infraestrutura: o escopo não pôde ser vinculado. 503 para
            // sinalizar que o retry é legítimo.
            AppError::IsolationBindFailure(ref e) => {
                tracing::error!("Falha no bind de escopo RLS: {}", e);
                (StatusCode::SERVICE_UNAVAILABLE, "Serviço temporariamente indisponível.")
            }

            // Todos os outros erros (DatabaseError, InternalServerError) viram 500.
            // O `tracing` vai logar a mensagem detalhada que `thiserror` nos deu.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Ocorreu um erro inesperado.")
            }
        };

        // Resposta padrão para erros simples que só têm uma mensagem.
        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    // Extrai só o status, que é o que importa para o contrato externo.
    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn falhas_de_credencial_sao_indistinguiveis() {
        // Expirado, malformado e replay devem produzir o MESMO status.
        let a = status_of(AppError::Unauthenticated("expirado"));
        let b = status_of(AppError::Unauthenticated("malformado"));
        let c = status_of(AppError::ReplayDetected);
        assert_eq!(a, StatusCode::UNAUTHORIZED);
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn nao_autorizado_e_distinto_de_nao_autenticado() {
        assert_eq!(
            status_of(AppError::Unauthorized("article:create".into())),
            StatusCode::FORBIDDEN
        );
        assert_ne!(
            status_of(AppError::Unauthorized("article:create".into())),
            status_of(AppError::Unauthenticated("ausente"))
        );
    }

    #[test]
    fn falha_de_bind_e_erro_de_infraestrutura() {
        // 5xx (retry legítimo), nunca 4xx de política.
        let status = status_of(AppError::IsolationBindFailure(sqlx::Error::PoolClosed));
        assert!(status.is_server_error());
    }

    #[test]
    fn mismatch_de_tenant_e_rejeitado_fechado() {
        assert_eq!(status_of(AppError::TenantMismatch), StatusCode::FORBIDDEN);
    }
}
