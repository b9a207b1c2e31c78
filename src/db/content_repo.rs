// src/db/content_repo.rs

use uuid::Uuid;

use crate::common::error::AppError;
use crate::db::scope::{BypassConn, ScopedConn};
use crate::models::content::Article;

// O repositório de conteúdo é o consumidor representativo do núcleo:
// todas as queries recebem uma ScopedConn (escopo RLS já vinculado) E
// carregam o predicado tenant_id = $n. Duas camadas: se uma query
// esquecer o predicado, a política RLS ainda bloqueia a linha alheia.
#[derive(Clone)]
pub struct ContentRepository;

impl ContentRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn create_article(
        &self,
        conn: &mut ScopedConn,
        author_id: Uuid,
        title: &str,
        body: &str,
    ) -> Result<Article, AppError> {
        let tenant_id = conn.tenant_id();

        sqlx::query_as::<_, Article>(
            r#"
            INSERT INTO articles (tenant_id, author_id, title, body)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(author_id)
        .bind(title)
        .bind(body)
        .fetch_one(&mut **conn)
        .await
        .map_err(AppError::from)
    }

    pub async fn list_articles(&self, conn: &mut ScopedConn) -> Result<Vec<Article>, AppError> {
        let tenant_id = conn.tenant_id();

        sqlx::query_as::<_, Article>(
            r#"
            SELECT * FROM articles
            WHERE tenant_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&mut **conn)
        .await
        .map_err(AppError::from)
    }

    pub async fn find_article(
        &self,
        conn: &mut ScopedConn,
        article_id: Uuid,
    ) -> Result<Option<Article>, AppError> {
        let tenant_id = conn.tenant_id();

        sqlx::query_as::<_, Article>(
            "SELECT * FROM articles WHERE id = $1 AND tenant_id = $2",
        )
        .bind(article_id)
        .bind(tenant_id)
        .fetch_optional(&mut **conn)
        .await
        .map_err(AppError::from)
    }

    pub async fn update_article(
        &self,
        conn: &mut ScopedConn,
        article_id: Uuid,
        title: &str,
        body: &str,
        is_published: bool,
    ) -> Result<Option<Article>, AppError> {
        let tenant_id = conn.tenant_id();

        sqlx::query_as::<_, Article>(
            r#"
            UPDATE articles
            SET title = $3, body = $4, is_published = $5, updated_at = now()
            WHERE id = $1 AND tenant_id = $2
            RETURNING *
            "#,
        )
        .bind(article_id)
        .bind(tenant_id)
        .bind(title)
        .bind(body)
        .bind(is_published)
        .fetch_optional(&mut **conn)
        .await
        .map_err(AppError::from)
    }

    pub async fn delete_article(
        &self,
        conn: &mut ScopedConn,
        article_id: Uuid,
    ) -> Result<u64, AppError> {
        let tenant_id = conn.tenant_id();

        let result = sqlx::query("DELETE FROM articles WHERE id = $1 AND tenant_id = $2")
            .bind(article_id)
            .bind(tenant_id)
            .execute(&mut **conn)
            .await?;

        Ok(result.rows_affected())
    }

    /// Leitura cross-tenant para o super-administrador. Só aceita uma
    /// BypassConn: impossível chamar por engano com a conexão comum.
    pub async fn list_articles_any_tenant(
        &self,
        conn: &mut BypassConn,
        tenant_id: Uuid,
    ) -> Result<Vec<Article>, AppError> {
        sqlx::query_as::<_, Article>(
            r#"
            SELECT * FROM articles
            WHERE tenant_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&mut **conn)
        .await
        .map_err(AppError::from)
    }
}
