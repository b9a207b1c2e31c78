// src/services/rbac_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::common::audit::{AuditEvent, SharedAuditSink};
use crate::common::error::AppError;
use crate::db::{RbacRepository, TenantRepository};
use crate::models::rbac::{Permission, RoleResponse, WILDCARD_PERMISSION};

// O resultado de uma avaliação de permissão. Negado é terminal para a
// requisição: o chamador não tenta de novo com privilégio implícito.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied,
}

#[derive(Clone)]
pub struct RbacService {
    repo: RbacRepository,
    tenant_repo: TenantRepository,
    pool: PgPool,
    audit: SharedAuditSink,
}

impl RbacService {
    pub fn new(
        repo: RbacRepository,
        tenant_repo: TenantRepository,
        pool: PgPool,
        audit: SharedAuditSink,
    ) -> Self {
        Self {
            repo,
            tenant_repo,
            pool,
            audit,
        }
    }

    /// O Motor de Permissões: carrega os cargos do (usuário, tenant),
    /// faz a união dos slugs e decide. Sem herança entre cargos:
    /// composição = atribuir mais cargos. Toda negação vira evento de
    /// auditoria.
    pub async fn authorize(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
        permission: &str,
    ) -> Result<Decision, AppError> {
        let granted = self.repo.load_user_permissions(user_id, tenant_id).await?;

        if permission_granted(&granted, permission) {
            return Ok(Decision::Allowed);
        }

        self.audit
            .record(AuditEvent::PermissionDenied {
                user_id,
                tenant_id,
                permission: permission.to_string(),
            })
            .await;

        Ok(Decision::Denied)
    }

    /// Verificação do cargo global de super-administrador (o único que
    /// pode pedir o bypass de isolamento).
    pub async fn is_superadmin(&self, user_id: Uuid) -> Result<bool, AppError> {
        self.repo.user_is_superadmin(user_id).await
    }

    pub async fn create_role_with_permissions(
        &self,
        tenant_id: Uuid,
        name: String,
        description: Option<String>,
        permission_slugs: Vec<String>,
    ) -> Result<RoleResponse, AppError> {
        // A curinga não é atribuível a cargos de tenant.
        if permission_slugs.iter().any(|s| s == WILDCARD_PERMISSION) {
            return Err(AppError::Unauthorized(WILDCARD_PERMISSION.into()));
        }

        // 1. Inicia Transação
        let mut tx = self.pool.begin().await?;

        // 2. Cria o Cargo
        let role = self
            .repo
            .create_role(&mut *tx, Some(tenant_id), &name, description.as_deref())
            .await?;

        // 3. Resolve Slugs ("article:read") para IDs (UUIDs)
        let permissions = self
            .repo
            .find_permissions_by_slugs(&mut *tx, &permission_slugs)
            .await?;

        let permission_ids: Vec<Uuid> = permissions.iter().map(|p| p.id).collect();
        let valid_slugs: Vec<String> = permissions.into_iter().map(|p| p.slug).collect();

        // 4. Salva o Vínculo
        if !permission_ids.is_empty() {
            self.repo
                .assign_permissions(&mut *tx, role.id, &permission_ids)
                .await?;
        }

        // 5. Commit
        tx.commit().await?;

        Ok(RoleResponse {
            role,
            permissions: valid_slugs,
        })
    }

    /// Atribui um cargo adicional a um membro do tenant. Cargos são
    /// flat: mais capacidade = mais cargos, nunca herança.
    pub async fn assign_role_to_member(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> Result<(), AppError> {
        // O cargo precisa pertencer a ESTE tenant.
        let role = self
            .repo
            .find_role_in_tenant(tenant_id, role_id)
            .await?
            .ok_or(AppError::NotFound)?;

        self.tenant_repo
            .add_member(&self.pool, tenant_id, user_id, role.id)
            .await?;

        Ok(())
    }

    pub async fn list_system_permissions(&self) -> Result<Vec<Permission>, AppError> {
        self.repo.list_all_permissions().await
    }
}

/// A decisão em si, como função pura: presente na união, ou curinga.
/// Monotônica por construção: adicionar um cargo só pode ADICIONAR
/// slugs à união (não existem permissões negativas).
pub fn permission_granted(granted: &[String], required: &str) -> bool {
    granted
        .iter()
        .any(|slug| slug == required || slug == WILDCARD_PERMISSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slugs(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn permissao_presente_e_concedida() {
        let granted = slugs(&["article:read", "article:update"]);
        assert!(permission_granted(&granted, "article:read"));
    }

    #[test]
    fn permissao_ausente_e_negada() {
        let granted = slugs(&["article:read"]);
        assert!(!permission_granted(&granted, "article:delete"));
    }

    #[test]
    fn curinga_concede_tudo() {
        let granted = slugs(&["*"]);
        assert!(permission_granted(&granted, "article:delete"));
        assert!(permission_granted(&granted, "role:assign"));
        assert!(permission_granted(&granted, "qualquer:coisa"));
    }

    #[test]
    fn uniao_vazia_nega_tudo() {
        let granted: Vec<String> = vec![];
        assert!(!permission_granted(&granted, "article:read"));
    }

    #[test]
    fn avaliacao_e_monotonica_na_atribuicao_de_cargos() {
        // Adicionar um cargo (mais slugs na união) nunca revoga uma
        // permissão que já era concedida.
        let before = slugs(&["article:read"]);
        let after = slugs(&["article:read", "member:invite"]); // cargo extra

        let all = [
            "article:read",
            "article:update",
            "article:delete",
            "member:invite",
        ];
        for perm in all {
            if permission_granted(&before, perm) {
                assert!(permission_granted(&after, perm), "revogou {}", perm);
            }
        }
    }
}
