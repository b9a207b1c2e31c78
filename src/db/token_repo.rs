// src/db/token_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::session::RefreshToken;

// O Credential Store dos refresh tokens. Só hashes em repouso: o valor
// opaco que o cliente guarda nunca toca esta tabela.
#[derive(Clone)]
pub struct TokenRepository {
    pool: PgPool,
}

impl TokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Grava um novo refresh token. `family_id` novo = novo login;
    /// `family_id` existente = rotação dentro da mesma sessão.
    pub async fn create<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        family_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshToken, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, RefreshToken>(
            r#"
            INSERT INTO refresh_tokens (user_id, family_id, token_hash, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(family_id)
        .bind(token_hash)
        .bind(expires_at)
        .fetch_one(executor)
        .await
        .map_err(AppError::from)
    }

    /// Busca pelo hash, usada ou não. Quem decide o que fazer com um
    /// token já usado (replay!) é o serviço.
    pub async fn find_by_hash(&self, token_hash: &str) -> Result<Option<RefreshToken>, AppError> {
        sqlx::query_as::<_, RefreshToken>(
            "SELECT * FROM refresh_tokens WHERE token_hash = $1",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)
    }

    /// Marca o token como consumido. Retorna a linha apenas se ela
    /// AINDA não estava usada: duas rotações concorrentes do mesmo
    /// token fazem só uma vencer.
    pub async fn mark_used<'e, E>(
        &self,
        executor: E,
        token_id: Uuid,
    ) -> Result<Option<RefreshToken>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, RefreshToken>(
            r#"
            UPDATE refresh_tokens
            SET used_at = now()
            WHERE id = $1 AND used_at IS NULL
            RETURNING *
            "#,
        )
        .bind(token_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
    }

    /// Revoga a família inteira (todas as rotações de uma sessão).
    /// Disparada na detecção de replay e no logout.
    pub async fn revoke_family<'e, E>(
        &self,
        executor: E,
        family_id: Uuid,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE family_id = $1")
            .bind(family_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    /// "Logout em todos os dispositivos": apaga todos os refresh tokens
    /// do utilizador. Access tokens já emitidos valem até expirarem.
    pub async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Limpeza periódica de tokens expirados (housekeeping).
    pub async fn delete_expired(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < now()")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
