// src/middleware/pipeline.rs

use axum::{
    extract::{FromRequestParts, State},
    http::{header::HOST, request::Parts},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::{bearer_user, AuthenticatedUser},
    middleware::tenancy::{strip_port, TenantContext, TENANT_SELECTOR_HEADER},
    models::{auth::User, tenancy::Tenant},
};

// ---
// O Pipeline de Contexto da Requisição
// ---
// A ordem resolve-tenant -> valida-sessão -> verifica-seletor é um
// invariante VISÍVEL deste módulo, não uma consequência implícita da
// ordem de layers do framework. Falha em qualquer estágio rejeita a
// requisição antes de qualquer lógica de negócio.
//
// O estágio final (ScopeBound -> Ready) acontece quando o handler
// adquire a ScopedConn via AppState::scope_binder: o escopo é definido
// na MESMA conexão que executa as queries, e a devolução à pool (em
// qualquer caminho de saída, inclusive cancelamento) passa pelo RESET
// do hook after_release.

// Os estágios, na ordem em que DEVEM acontecer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Unresolved,
    TenantResolved,
    SessionValidated,
    ScopeBound,
    Ready,
    Rejected,
}

impl PipelineStage {
    /// O próximo estágio do caminho feliz. `Rejected` é alcançável de
    /// qualquer estágio não-terminal, via `reject`.
    pub fn advance(self) -> PipelineStage {
        match self {
            PipelineStage::Unresolved => PipelineStage::TenantResolved,
            PipelineStage::TenantResolved => PipelineStage::SessionValidated,
            PipelineStage::SessionValidated => PipelineStage::ScopeBound,
            PipelineStage::ScopeBound => PipelineStage::Ready,
            // Terminais
            PipelineStage::Ready => PipelineStage::Ready,
            PipelineStage::Rejected => PipelineStage::Rejected,
        }
    }

    pub fn reject(self) -> PipelineStage {
        match self {
            PipelineStage::Ready => PipelineStage::Ready,
            _ => PipelineStage::Rejected,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineStage::Ready | PipelineStage::Rejected)
    }
}

// O contexto pronto, exposto aos handlers. Vive exclusivamente na
// requisição em voo (extensions), nunca num global do processo.
#[derive(Debug, Clone)]
pub struct RequestContext {
    tenant: Tenant,
    user: User,
}

impl RequestContext {
    pub fn current_tenant(&self) -> &Tenant {
        &self.tenant
    }

    pub fn current_user(&self) -> &User {
        &self.user
    }

    pub fn tenant_id(&self) -> Uuid {
        self.tenant.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user.id
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .ok_or(AppError::Unauthenticated("contexto de requisição ausente"))
    }
}

/// O guard das rotas de negócio: executa os estágios na ordem fixa e
/// insere o RequestContext. Nenhum handler de negócio roda sem passar
/// por aqui.
pub async fn pipeline_guard(
    State(app_state): State<AppState>,
    mut request: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let mut stage = PipelineStage::Unresolved;

    // 1. Unresolved -> TenantResolved: lookup puro por hostname.
    let host = request
        .headers()
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .map(strip_port)
        .unwrap_or_default();

    let host_tenant = app_state.tenant_service.resolve_by_hostname(&host).await?;
    stage = stage.advance();

    // 2. TenantResolved -> SessionValidated: bearer + lookup do usuário.
    let user = bearer_user(&app_state, request.headers()).await?;
    stage = stage.advance();

    // 3. Seletor explícito: só sobrepõe o host DEPOIS de verificada a
    // membership do chamador no tenant pedido.
    let selector = request
        .headers()
        .get(TENANT_SELECTOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|raw| {
            Uuid::parse_str(raw)
                .map_err(|_| AppError::BadRequest("O cabeçalho X-Tenant-Id não é um UUID.".into()))
        })
        .transpose()?;

    let tenant = match selector {
        Some(selected) => {
            app_state
                .tenant_service
                .verify_tenant_selector(user.id, selected)
                .await?
        }
        None => host_tenant.ok_or_else(|| AppError::TenantNotFound(host.clone()))?,
    };

    tracing::debug!(
        tenant = %tenant.slug,
        user = %user.id,
        stage = ?stage,
        "pipeline de contexto pronto"
    );

    // Contexto pronto: tenant + usuário amarrados a ESTA requisição.
    let ctx = RequestContext {
        tenant: tenant.clone(),
        user: user.clone(),
    };
    request.extensions_mut().insert(ctx);
    request.extensions_mut().insert(TenantContext(tenant));
    request.extensions_mut().insert(AuthenticatedUser(user));

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn o_caminho_feliz_segue_a_ordem_fixa() {
        // resolve-tenant -> valida-sessão -> vincula-escopo -> pronto
        let mut stage = PipelineStage::Unresolved;
        let expected = [
            PipelineStage::TenantResolved,
            PipelineStage::SessionValidated,
            PipelineStage::ScopeBound,
            PipelineStage::Ready,
        ];

        for want in expected {
            stage = stage.advance();
            assert_eq!(stage, want);
        }
        assert!(stage.is_terminal());
    }

    #[test]
    fn rejeicao_e_alcancavel_de_qualquer_estagio_nao_terminal() {
        let stages = [
            PipelineStage::Unresolved,
            PipelineStage::TenantResolved,
            PipelineStage::SessionValidated,
            PipelineStage::ScopeBound,
        ];
        for s in stages {
            assert_eq!(s.reject(), PipelineStage::Rejected);
        }
    }

    #[test]
    fn estagios_terminais_nao_avancam() {
        assert_eq!(PipelineStage::Ready.advance(), PipelineStage::Ready);
        assert_eq!(PipelineStage::Rejected.advance(), PipelineStage::Rejected);
        // Ready não vira Rejected: a liberação do escopo acontece na
        // devolução da conexão, não por transição de estado.
        assert_eq!(PipelineStage::Ready.reject(), PipelineStage::Ready);
    }
}
