// src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// Declaração dos nossos módulos
mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::AppState;
use crate::middleware::{auth::auth_guard, pipeline::pipeline_guard};

#[tokio::main]
async fn main() {
    // Inicializa o logger (RUST_LOG controla o filtro; o target
    // "audit" carrega os eventos de segurança)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,audit=info".into()),
        )
        .with_target(true)
        .compact()
        .init();

    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    // Roda as migrações do SQLx na inicialização. As políticas RLS
    // moram AQUI (versionadas), não em scripts avulsos de init.
    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // Rotas públicas (tenant-opcionais por definição: registro, login,
    // refresh por cookie, status de setup)
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/refresh", post(handlers::auth::refresh))
        .route("/logout", post(handlers::auth::logout));

    // Rotas autenticadas SEM contexto de tenant
    let user_routes = Router::new()
        .route("/me", get(handlers::auth::get_me))
        .route("/me/tenants", get(handlers::auth::get_my_tenants))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let logout_all_route = Router::new()
        .route("/logout-all", post(handlers::auth::logout_all))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Criação/listagem de tenants: autenticado, tenant ainda opcional
    let tenancy_routes = Router::new()
        .route(
            "/",
            post(handlers::tenancy::create_tenant).get(handlers::tenancy::list_my_tenants),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Administração DO tenant corrente: passa pelo pipeline completo
    // (resolve-tenant -> valida-sessão -> seletor verificado)
    let tenant_admin_routes = Router::new()
        .route("/domains", post(handlers::tenancy::add_domain))
        .route("/rename", post(handlers::tenancy::rename_slug))
        .route("/roles", post(handlers::rbac::create_role))
        .route("/roles/assign", post(handlers::rbac::assign_role))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            pipeline_guard,
        ));

    // Conteúdo: o consumidor representativo do núcleo
    let content_routes = Router::new()
        .route(
            "/articles",
            post(handlers::content::create_article).get(handlers::content::list_articles),
        )
        .route(
            "/articles/{id}",
            get(handlers::content::get_article)
                .put(handlers::content::update_article)
                .delete(handlers::content::delete_article),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            pipeline_guard,
        ));

    // Rotas globais de administração (cargo global verificado no
    // handler; bypass de RLS sempre auditado)
    let admin_routes = Router::new()
        .route(
            "/tenants/{tenant_id}/articles",
            get(handlers::content::admin_list_tenant_articles),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Combina tudo no router principal
    let app = Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/setup/status", get(handlers::auth::setup_status))
        .route("/api/permissions", get(handlers::rbac::list_permissions))
        .nest("/api/auth", auth_routes)
        .nest("/api/auth", logout_all_route)
        .nest("/api/users", user_routes)
        .nest("/api/tenants", tenancy_routes)
        .nest("/api/tenant", tenant_admin_routes)
        .nest("/api/content", content_routes)
        .nest("/api/admin", admin_routes)
        .with_state(app_state);

    // Inicia o servidor
    let addr = "0.0.0.0:3000";
    let listener = TcpListener::bind(addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr().unwrap());
    axum::serve(listener, app)
        .await
        .expect("Erro no servidor Axum");
}
