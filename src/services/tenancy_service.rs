// src/services/tenancy_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::audit::{AuditEvent, SharedAuditSink},
    common::error::AppError,
    db::{RbacRepository, TenantRepository},
    models::rbac::WILDCARD_PERMISSION,
    models::tenancy::{Domain, Tenant},
};

// Subdomínios que nunca podem virar slug de tenant nem primeiro label
// de hostname. Rejeitados AQUI, na criação, para que a resolução por
// host continue sendo um lookup puro.
const RESERVED_SLUGS: &[&str] = &[
    "www", "admin", "api", "app", "mail", "smtp", "ftp", "static", "assets", "cdn", "status",
];

#[derive(Clone)]
pub struct TenantService {
    tenant_repo: TenantRepository,
    rbac_repo: RbacRepository,
    pool: PgPool,
    audit: SharedAuditSink,
}

impl TenantService {
    pub fn new(
        tenant_repo: TenantRepository,
        rbac_repo: RbacRepository,
        pool: PgPool,
        audit: SharedAuditSink,
    ) -> Self {
        Self {
            tenant_repo,
            rbac_repo,
            pool,
            audit,
        }
    }

    /// Resolução por host: lookup exato do hostname (a porta já foi
    /// removida pelo middleware). Nenhum match = "sem tenant"; quem
    /// decide se isso é aceitável é o endpoint.
    pub async fn resolve_by_hostname(&self, hostname: &str) -> Result<Option<Tenant>, AppError> {
        self.tenant_repo.find_tenant_by_hostname(hostname).await
    }

    /// Honra um seletor explícito de tenant (X-Tenant-Id) SOMENTE se o
    /// chamador autenticado tem membership ativa nele. Um seletor não
    /// verificado nunca sobrepõe a resolução por host.
    pub async fn verify_tenant_selector(
        &self,
        user_id: Uuid,
        selected_tenant: Uuid,
    ) -> Result<Tenant, AppError> {
        let is_member = self
            .tenant_repo
            .check_active_membership(user_id, selected_tenant)
            .await?;

        if !is_member {
            self.audit
                .record(AuditEvent::TenantProbe {
                    user_id,
                    requested_tenant: selected_tenant,
                })
                .await;
            return Err(AppError::TenantMismatch);
        }

        self.tenant_repo
            .find_by_id(selected_tenant)
            .await?
            .ok_or(AppError::TenantMismatch)
    }

    /// Onboarding: cria o Tenant, o domínio primário, o cargo de
    /// administrador do tenant e a membership do dono — tudo numa
    /// transação. Ou nasce inteiro, ou não nasce.
    pub async fn create_tenant_with_owner(
        &self,
        slug: &str,
        name: &str,
        hostname: &str,
        owner_id: Uuid,
    ) -> Result<(Tenant, Domain), AppError> {
        validate_slug(slug)?;
        validate_hostname(hostname)?;

        let scope_key = scope_key_for(slug);

        // 1. Inicia a transação
        let mut tx = self.pool.begin().await?;

        // 2. Cria o Tenant
        let new_tenant = self
            .tenant_repo
            .create_tenant(&mut *tx, slug, &scope_key, name)
            .await?;

        // 3. Cria o domínio primário (todo tenant tem pelo menos um)
        let primary_domain = self
            .tenant_repo
            .create_domain(&mut *tx, new_tenant.id, hostname, true)
            .await?;

        // 4. Cria o cargo "Administrador" deste tenant
        let owner_role = self
            .rbac_repo
            .create_role(
                &mut *tx,
                Some(new_tenant.id),
                "Administrador",
                Some("Acesso administrativo ao tenant (gerado no onboarding)"),
            )
            .await?;

        // 5. Atribui ao cargo todas as permissões do catálogo, MENOS a
        // curinga: "*" é exclusiva do super-administrador global.
        let all_permissions = self.rbac_repo.list_all_permissions().await?;
        let perm_ids: Vec<Uuid> = all_permissions
            .iter()
            .filter(|p| p.slug != WILDCARD_PERMISSION)
            .map(|p| p.id)
            .collect();

        if !perm_ids.is_empty() {
            self.rbac_repo
                .assign_permissions(&mut *tx, owner_role.id, &perm_ids)
                .await?;
        }

        // 6. Atribui o dono ao tenant com o cargo criado
        self.tenant_repo
            .add_member(&mut *tx, new_tenant.id, owner_id, owner_role.id)
            .await?;

        // 7. Commit
        tx.commit().await?;

        tracing::info!(tenant = %new_tenant.slug, "tenant criado");

        Ok((new_tenant, primary_domain))
    }

    /// Cadastra um domínio adicional (não primário) para o tenant.
    pub async fn add_domain(&self, tenant_id: Uuid, hostname: &str) -> Result<Domain, AppError> {
        validate_hostname(hostname)?;

        self.tenant_repo
            .create_domain(&self.pool, tenant_id, hostname, false)
            .await
    }

    /// A ÚNICA forma de mudar slug/scope_key: os dois migram juntos,
    /// na mesma transação.
    pub async fn rename_slug(&self, tenant_id: Uuid, new_slug: &str) -> Result<Tenant, AppError> {
        validate_slug(new_slug)?;

        let new_scope_key = scope_key_for(new_slug);

        let mut tx = self.pool.begin().await?;
        let tenant = self
            .tenant_repo
            .rename_slug(&mut *tx, tenant_id, new_slug, &new_scope_key)
            .await?;
        tx.commit().await?;

        Ok(tenant)
    }

    pub async fn list_user_tenants(&self, user_id: Uuid) -> Result<Vec<Tenant>, AppError> {
        self.tenant_repo.get_tenants_for_user(user_id).await
    }
}

/// Identificador do escopo de isolamento derivado do slug.
pub fn scope_key_for(slug: &str) -> String {
    format!("t_{}", slug.replace('-', "_"))
}

/// Regras de slug: [a-z0-9-], 2..=63 chars, sem hífen nas pontas, fora
/// da lista de nomes reservados.
pub fn validate_slug(slug: &str) -> Result<(), AppError> {
    if slug.len() < 2 || slug.len() > 63 {
        return Err(AppError::InvalidSlug(
            "O slug deve ter entre 2 e 63 caracteres.".into(),
        ));
    }

    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(AppError::InvalidSlug(
            "O slug só pode conter letras minúsculas, dígitos e hífens.".into(),
        ));
    }

    if slug.starts_with('-') || slug.ends_with('-') {
        return Err(AppError::InvalidSlug(
            "O slug não pode começar nem terminar com hífen.".into(),
        ));
    }

    if RESERVED_SLUGS.contains(&slug) {
        return Err(AppError::InvalidSlug(format!(
            "O nome '{}' é reservado.",
            slug
        )));
    }

    Ok(())
}

/// O primeiro label do hostname segue as mesmas regras do slug (é o
/// subdomínio do tenant).
pub fn validate_hostname(hostname: &str) -> Result<(), AppError> {
    let first_label = hostname.split('.').next().unwrap_or("");
    validate_slug(first_label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_valido_passa() {
        assert!(validate_slug("loja-centro").is_ok());
        assert!(validate_slug("ab").is_ok());
        assert!(validate_slug("tenant42").is_ok());
    }

    #[test]
    fn slug_reservado_e_rejeitado_na_criacao() {
        for reserved in ["www", "admin", "api"] {
            assert!(matches!(
                validate_slug(reserved),
                Err(AppError::InvalidSlug(_))
            ));
        }
    }

    #[test]
    fn slug_com_charset_invalido_e_rejeitado() {
        assert!(validate_slug("Loja").is_err()); // maiúscula
        assert!(validate_slug("loja_centro").is_err()); // underscore
        assert!(validate_slug("loja centro").is_err()); // espaço
        assert!(validate_slug("açai").is_err()); // não-ascii
    }

    #[test]
    fn slug_com_hifen_nas_pontas_e_rejeitado() {
        assert!(validate_slug("-loja").is_err());
        assert!(validate_slug("loja-").is_err());
    }

    #[test]
    fn slug_curto_ou_longo_demais_e_rejeitado() {
        assert!(validate_slug("a").is_err());
        assert!(validate_slug(&"a".repeat(64)).is_err());
    }

    #[test]
    fn hostname_com_subdominio_reservado_e_rejeitado() {
        assert!(validate_hostname("www.plataforma.app").is_err());
        assert!(validate_hostname("loja-centro.plataforma.app").is_ok());
    }

    #[test]
    fn scope_key_migra_junto_com_o_slug() {
        assert_eq!(scope_key_for("loja-centro"), "t_loja_centro");
        // Renomear gera um scope_key novo e determinístico.
        assert_ne!(scope_key_for("loja-centro"), scope_key_for("loja-norte"));
    }
}
