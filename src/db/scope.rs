// src/db/scope.rs

use sqlx::pool::PoolConnection;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use crate::common::audit::{AuditEvent, SharedAuditSink};
use crate::common::error::AppError;

// ---
// O Enforcer de Isolamento: a "Chave" para o Banco de Dados
// ---
// Toda query de negócio roda numa ScopedConn: uma conexão da pool com as
// variáveis de escopo RLS já definidas NA MESMA conexão, antes de
// qualquer query do tenant. O escopo vive na conexão (e no contexto da
// requisição), nunca num global do processo.
//
// A limpeza é garantida pelo hook `after_release` da pool (ver
// config.rs): qualquer caminho de saída (sucesso, erro, cancelamento)
// devolve a conexão à pool, e a devolução executa RESET. Uma conexão
// reutilizada nunca carrega escopo de uma requisição anterior.

#[derive(Clone)]
pub struct ScopeBinder {
    pool: PgPool,
    audit: SharedAuditSink,
}

// Conexão com escopo de tenant vinculado. Enquanto este valor existir,
// `app.tenant_id` está definido na conexão subjacente.
pub struct ScopedConn {
    conn: PoolConnection<Postgres>,
    tenant_id: Uuid,
}

impl ScopedConn {
    pub fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }
}

// Permite passar `&mut *scoped` como executor do sqlx.
impl std::ops::Deref for ScopedConn {
    type Target = sqlx::PgConnection;

    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl std::ops::DerefMut for ScopedConn {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn
    }
}

// Conexão em modo bypass: RLS liberado. Só existe pelo caminho
// explícito e auditado de super-administrador.
pub struct BypassConn {
    conn: PoolConnection<Postgres>,
}

impl std::ops::Deref for BypassConn {
    type Target = sqlx::PgConnection;

    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl std::ops::DerefMut for BypassConn {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn
    }
}

impl ScopeBinder {
    pub fn new(pool: PgPool, audit: SharedAuditSink) -> Self {
        Self { pool, audit }
    }

    /// Adquire uma conexão da pool e define as variáveis de escopo.
    ///
    /// Se a pool estiver esgotada ou o set_config falhar, a requisição
    /// FALHA (IsolationBindFailure). Não existe modo degradado sem
    /// escopo.
    pub async fn acquire(&self, tenant_id: Uuid, user_id: Uuid) -> Result<ScopedConn, AppError> {
        // 1. Adquire conexão
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(AppError::IsolationBindFailure)?;

        // 2. Define Tenant ID (a variável que as políticas RLS leem)
        sqlx::query("SELECT set_config('app.tenant_id', $1, false)")
            .bind(tenant_id.to_string())
            .execute(&mut *conn)
            .await
            .map_err(AppError::IsolationBindFailure)?;

        // 3. Define User ID
        sqlx::query("SELECT set_config('app.user_id', $1, false)")
            .bind(user_id.to_string())
            .execute(&mut *conn)
            .await
            .map_err(AppError::IsolationBindFailure)?;

        Ok(ScopedConn { conn, tenant_id })
    }

    /// Caminho EXPLÍCITO de super-administrador: RLS liberado nesta
    /// conexão. Nunca é o padrão, e cada uso gera exatamente um evento
    /// de auditoria. O chamador (handler admin) já verificou o cargo
    /// global antes de chegar aqui.
    pub async fn acquire_bypass(
        &self,
        user_id: Uuid,
        reason: &str,
    ) -> Result<BypassConn, AppError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(AppError::IsolationBindFailure)?;

        sqlx::query("SELECT set_config('app.bypass_rls', 'on', false)")
            .execute(&mut *conn)
            .await
            .map_err(AppError::IsolationBindFailure)?;

        sqlx::query("SELECT set_config('app.user_id', $1, false)")
            .bind(user_id.to_string())
            .execute(&mut *conn)
            .await
            .map_err(AppError::IsolationBindFailure)?;

        self.audit
            .record(AuditEvent::SuperAdminBypass {
                user_id,
                reason: reason.to_string(),
            })
            .await;

        Ok(BypassConn { conn })
    }
}
