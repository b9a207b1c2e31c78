// src/middleware/tenancy.rs

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
};

use crate::common::error::AppError;
use crate::models::tenancy::Tenant;

// O nome do cabeçalho do seletor explícito de tenant (para usuários
// com membership em mais de um tenant). Só é honrado DEPOIS da
// verificação de membership no pipeline.
pub const TENANT_SELECTOR_HEADER: &str = "x-tenant-id";

// O contexto de tenant resolvido para a requisição. Inserido nas
// extensions pelo pipeline_guard; nunca construído por handlers.
#[derive(Debug, Clone)]
pub struct TenantContext(pub Tenant);

impl TenantContext {
    pub fn tenant(&self) -> &Tenant {
        &self.0
    }
}

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantContext>()
            .cloned()
            .ok_or_else(|| AppError::TenantNotFound("<sem contexto>".into()))
    }
}

/// Remove a porta de um header Host ("loja.app:8080" -> "loja.app") e
/// normaliza para minúsculas. A resolução em si é um lookup exato.
pub fn strip_port(host: &str) -> String {
    host.rsplit_once(':')
        .map(|(h, port)| {
            // Só remove se o sufixo for numérico mesmo (defende contra
            // hosts IPv6 literais, que não atendemos por domínio).
            if port.chars().all(|c| c.is_ascii_digit()) {
                h
            } else {
                host
            }
        })
        .unwrap_or(host)
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_a_porta_do_host() {
        assert_eq!(strip_port("loja-centro.plataforma.app:8080"), "loja-centro.plataforma.app");
        assert_eq!(strip_port("loja-centro.plataforma.app:443"), "loja-centro.plataforma.app");
    }

    #[test]
    fn host_sem_porta_fica_intacto() {
        assert_eq!(strip_port("loja-centro.plataforma.app"), "loja-centro.plataforma.app");
    }

    #[test]
    fn normaliza_maiusculas() {
        assert_eq!(strip_port("Loja-Centro.Plataforma.APP:80"), "loja-centro.plataforma.app");
    }

    #[test]
    fn sufixo_nao_numerico_nao_e_porta() {
        assert_eq!(strip_port("estranho:abc"), "estranho:abc");
    }
}
