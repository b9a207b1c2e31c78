// src/common/audit.rs

use std::sync::Arc;
use uuid::Uuid;

// ---
// O Colaborador de Auditoria
// ---
// O núcleo depende apenas da capacidade de "registrar um evento";
// onde os eventos são armazenados ou exibidos não é problema nosso.

// Eventos de segurança que DEVEM ser registrados.
#[derive(Debug, Clone, PartialEq)]
pub enum AuditEvent {
    // Toda negação do motor de permissões.
    PermissionDenied {
        user_id: Uuid,
        tenant_id: Uuid,
        permission: String,
    },
    // Todo uso do bypass de super-administrador (leitura cross-tenant).
    SuperAdminBypass {
        user_id: Uuid,
        reason: String,
    },
    // Toda revogação de sessão (logout, logout-all).
    SessionRevoked {
        user_id: Uuid,
        all_sessions: bool,
    },
    // Refresh token apresentado duas vezes: a família foi revogada.
    ReplayDetected {
        user_id: Uuid,
        family_id: Uuid,
    },
    // Seletor X-Tenant-Id sem membership: possível sondagem.
    TenantProbe {
        user_id: Uuid,
        requested_tenant: Uuid,
    },
}

#[async_trait::async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: AuditEvent);
}

pub type SharedAuditSink = Arc<dyn AuditSink>;

// Implementação padrão: eventos estruturados via `tracing`, no target
// "audit", para serem coletados pelo pipeline de observabilidade.
pub struct TracingAuditSink;

#[async_trait::async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, event: AuditEvent) {
        match event {
            AuditEvent::PermissionDenied { user_id, tenant_id, permission } => {
                tracing::warn!(
                    target: "audit",
                    %user_id, %tenant_id, permission,
                    "permissão negada"
                );
            }
            AuditEvent::SuperAdminBypass { user_id, reason } => {
                tracing::warn!(
                    target: "audit",
                    %user_id, reason,
                    "bypass de super-administrador utilizado"
                );
            }
            AuditEvent::SessionRevoked { user_id, all_sessions } => {
                tracing::info!(
                    target: "audit",
                    %user_id, all_sessions,
                    "sessão revogada"
                );
            }
            AuditEvent::ReplayDetected { user_id, family_id } => {
                tracing::warn!(
                    target: "audit",
                    %user_id, %family_id,
                    "replay de refresh token; família revogada"
                );
            }
            AuditEvent::TenantProbe { user_id, requested_tenant } => {
                tracing::warn!(
                    target: "audit",
                    %user_id, %requested_tenant,
                    "seletor de tenant sem membership"
                );
            }
        }
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use std::sync::Mutex;

    // Sink de teste: acumula os eventos em memória.
    #[derive(Default)]
    pub struct RecordingSink {
        pub events: Mutex<Vec<AuditEvent>>,
    }

    #[async_trait::async_trait]
    impl AuditSink for RecordingSink {
        async fn record(&self, event: AuditEvent) {
            self.events.lock().unwrap().push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::RecordingSink;
    use super::*;

    #[tokio::test]
    async fn o_sink_recebe_os_eventos_na_ordem() {
        let sink = RecordingSink::default();
        let user_id = Uuid::new_v4();
        let tenant_id = Uuid::new_v4();

        sink.record(AuditEvent::TenantProbe {
            user_id,
            requested_tenant: tenant_id,
        })
        .await;
        sink.record(AuditEvent::SessionRevoked {
            user_id,
            all_sessions: true,
        })
        .await;

        let events = sink.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            AuditEvent::TenantProbe {
                user_id,
                requested_tenant: tenant_id
            }
        );
    }

    #[tokio::test]
    async fn o_bypass_gera_exatamente_um_evento() {
        // O contrato do enforcer: um acquire_bypass = um evento.
        let sink = RecordingSink::default();

        sink.record(AuditEvent::SuperAdminBypass {
            user_id: Uuid::new_v4(),
            reason: "leitura administrativa".into(),
        })
        .await;

        assert_eq!(sink.events.lock().unwrap().len(), 1);
    }
}
