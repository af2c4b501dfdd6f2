//! Servio server binary.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use servio::api::{build_router, AppState};
use servio::auth::{AuthService, TokenManager};
use servio::config::Config;
use servio::services::ServiceManager;
use servio::store::{PostgresStore, ServiceStore, UserStore};
use servio::telemetry;
use servio::users::UserService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let mut config = Config::load().unwrap_or_else(|err| {
        eprintln!("config load failed ({err}), falling back to DATABASE_URL");
        Config::fallback_from_env()
    });

    telemetry::init(&config.observability)?;

    if config.auth.jwt_secret.is_empty() {
        if let Ok(secret) = std::env::var("JWT_KEY") {
            config.auth.jwt_secret = secret;
        } else {
            warn!("no signing secret configured, using an insecure development secret");
            config.auth.jwt_secret = "dev-secret".to_string();
        }
    }

    let store = Arc::new(
        PostgresStore::connect(&config.database)
            .await
            .context("database connection failed")?,
    );
    let users_store: Arc<dyn UserStore> = store.clone();
    let services_store: Arc<dyn ServiceStore> = store;

    let tokens = Arc::new(TokenManager::new(
        &config.auth.jwt_secret,
        config.auth.token_ttl_secs,
    ));

    let state = AppState {
        auth: Arc::new(AuthService::new(users_store.clone(), tokens.clone())),
        users: Arc::new(UserService::new(users_store, services_store.clone())),
        catalog: Arc::new(ServiceManager::new(services_store)),
    };

    let router = build_router(state, tokens);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("listening on {addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl-c"),
        _ = terminate => info!("received SIGTERM"),
    }
}
