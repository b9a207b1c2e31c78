// src/config.rs

use sqlx::{postgres::PgPoolOptions, PgPool};
use std::sync::Arc;
use std::{env, time::Duration};

use crate::common::audit::{SharedAuditSink, TracingAuditSink};
use crate::db::{
    ContentRepository, RbacRepository, ScopeBinder, TenantRepository, TokenRepository,
    UserRepository,
};
use crate::services::auth::AuthService;
use crate::services::rbac_service::RbacService;
use crate::services::tenancy_service::TenantService;

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub auth_service: AuthService,
    pub tenant_service: TenantService,
    pub rbac_service: RbacService,
    pub content_repo: ContentRepository,
    pub user_repo: UserRepository,
    pub scope_binder: ScopeBinder,
    pub audit: SharedAuditSink,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL deve ser definida");
        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET deve ser definido");

        // Vida CURTA para o access token: revogação não é instantânea
        // (validação é stateless), então o tradeoff é limitado por aqui.
        let access_ttl_minutes: i64 = env::var("ACCESS_TOKEN_TTL_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(15);
        let refresh_ttl_days: i64 = env::var("REFRESH_TOKEN_TTL_DAYS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);

        // Conecta ao banco de dados, usando '?' para propagar erros.
        //
        // O hook after_release é o contrato de limpeza do enforcer de
        // isolamento: TODA devolução de conexão à pool (sucesso, erro,
        // cancelamento) zera as variáveis de escopo. Uma conexão
        // reutilizada nunca carrega o tenant da requisição anterior.
        let db_pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(3))
            .after_release(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("RESET app.tenant_id").execute(&mut *conn).await?;
                    sqlx::query("RESET app.user_id").execute(&mut *conn).await?;
                    sqlx::query("RESET app.bypass_rls").execute(&mut *conn).await?;
                    Ok(true)
                })
            })
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        let audit: SharedAuditSink = Arc::new(TracingAuditSink);

        let user_repo = UserRepository::new(db_pool.clone());
        let token_repo = TokenRepository::new(db_pool.clone());
        let tenant_repo = TenantRepository::new(db_pool.clone());
        let rbac_repo = RbacRepository::new(db_pool.clone());
        let content_repo = ContentRepository::new();

        let scope_binder = ScopeBinder::new(db_pool.clone(), audit.clone());

        let auth_service = AuthService::new(
            user_repo.clone(),
            token_repo,
            jwt_secret,
            access_ttl_minutes,
            refresh_ttl_days,
            db_pool.clone(),
            audit.clone(),
        );

        let tenant_service = TenantService::new(
            tenant_repo.clone(),
            rbac_repo.clone(),
            db_pool.clone(),
            audit.clone(),
        );

        let rbac_service = RbacService::new(rbac_repo, tenant_repo, db_pool.clone(), audit.clone());

        Ok(Self {
            db_pool,
            auth_service,
            tenant_service,
            rbac_service,
            content_repo,
            user_repo,
            scope_binder,
            audit,
        })
    }
}
