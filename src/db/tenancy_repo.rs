// src/db/tenancy_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::tenancy::{Domain, Tenant, TenantMember};

#[derive(Clone)]
pub struct TenantRepository {
    pool: PgPool,
}

impl TenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Resolve um hostname (já sem porta) para o tenant ativo dono dele.
    /// Lookup puro: nenhuma regra além do match exato. As regras de
    /// nomes reservados vivem na CRIAÇÃO de tenants/domínios.
    pub async fn find_tenant_by_hostname(
        &self,
        hostname: &str,
    ) -> Result<Option<Tenant>, AppError> {
        sqlx::query_as::<_, Tenant>(
            r#"
            SELECT t.*
            FROM tenants t
            JOIN domains d ON d.tenant_id = t.id
            WHERE d.hostname = $1
              AND t.is_active = true
            "#,
        )
        .bind(hostname)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)
    }

    pub async fn find_by_id(&self, tenant_id: Uuid) -> Result<Option<Tenant>, AppError> {
        sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE id = $1 AND is_active = true")
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)
    }

    /// Verifica se um utilizador tem membership ATIVA num tenant.
    /// Esta é a verificação que protege o seletor X-Tenant-Id: um
    /// seletor não verificado nunca sobrepõe a resolução por host.
    pub async fn check_active_membership(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<bool, AppError> {
        // SELECT EXISTS para a consulta mais rápida possível.
        let row: (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM tenant_members
                WHERE user_id = $1 AND tenant_id = $2 AND is_active = true
            )
            "#,
        )
        .bind(user_id)
        .bind(tenant_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    /// Cria um novo tenant. O slug e o scope_key já chegam validados
    /// pelo serviço (charset, nomes reservados).
    pub async fn create_tenant<'e, E>(
        &self,
        executor: E,
        slug: &str,
        scope_key: &str,
        name: &str,
    ) -> Result<Tenant, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Tenant>(
            r#"
            INSERT INTO tenants (slug, scope_key, name)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(slug)
        .bind(scope_key)
        .bind(name)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::UniqueConstraintViolation(
                        "Já existe um tenant com esse slug.".into(),
                    );
                }
            }
            e.into()
        })
    }

    /// Cadastra um domínio para o tenant. O primeiro é sempre primário.
    pub async fn create_domain<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        hostname: &str,
        is_primary: bool,
    ) -> Result<Domain, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Domain>(
            r#"
            INSERT INTO domains (tenant_id, hostname, is_primary)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(hostname)
        .bind(is_primary)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::UniqueConstraintViolation(
                        "Este hostname já está cadastrado.".into(),
                    );
                }
            }
            e.into()
        })
    }

    /// Atribui um utilizador a um tenant com um cargo (uma linha por
    /// cargo; membership ativa tem sempre >= 1 cargos).
    pub async fn add_member<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> Result<TenantMember, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, TenantMember>(
            r#"
            INSERT INTO tenant_members (user_id, tenant_id, role_id)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(tenant_id)
        .bind(role_id)
        .fetch_one(executor)
        .await
        .map_err(AppError::from)
    }

    /// Remove a membership de um utilizador num tenant (todas as linhas
    /// de cargo). O User global permanece.
    pub async fn remove_member<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "DELETE FROM tenant_members WHERE tenant_id = $1 AND user_id = $2",
        )
        .bind(tenant_id)
        .bind(user_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Lista os tenants onde o utilizador tem membership ativa.
    pub async fn get_tenants_for_user(&self, user_id: Uuid) -> Result<Vec<Tenant>, AppError> {
        sqlx::query_as::<_, Tenant>(
            r#"
            SELECT DISTINCT t.*
            FROM tenants t
            JOIN tenant_members tm ON tm.tenant_id = t.id
            WHERE tm.user_id = $1
              AND tm.is_active = true
              AND t.is_active = true
            ORDER BY t.slug
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    /// Renomeia o slug E migra o scope_key na mesma operação.
    /// Fora deste caminho os dois campos são imutáveis.
    pub async fn rename_slug<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        new_slug: &str,
        new_scope_key: &str,
    ) -> Result<Tenant, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Tenant>(
            r#"
            UPDATE tenants
            SET slug = $2, scope_key = $3, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(new_slug)
        .bind(new_scope_key)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::UniqueConstraintViolation(
                        "Já existe um tenant com esse slug.".into(),
                    );
                }
            }
            e.into()
        })
    }

    /// Desativação suave: tenants nunca são apagados (o scope_key não
    /// pode ficar órfão).
    pub async fn deactivate<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE tenants SET is_active = false, updated_at = now() WHERE id = $1")
            .bind(tenant_id)
            .execute(executor)
            .await?;

        Ok(())
    }
}
