use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use waypoint::api::AppState;
use waypoint::app::{create_app, create_geo_lookup};
use waypoint::auth::AuthService;
use waypoint::config::{AuthMode, Config, Environment};
use waypoint::storage::{AliasStore, CachedAliasStore, SqliteStorage, Storage};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    init_tracing(config.env);
    info!(env = ?config.env, "Loaded configuration");

    // Initialize storage
    info!("Using SQLite storage: {}", config.database.url);
    let storage =
        Arc::new(SqliteStorage::new(&config.database.url, config.database.max_connections).await?);

    info!("Initializing database...");
    storage.init().await?;
    info!("Database initialized successfully");

    let aliases: Arc<dyn AliasStore> = if config.cache.enabled {
        info!(
            max_entries = config.cache.max_entries,
            ttl_secs = config.cache.ttl_secs,
            "Alias read cache enabled"
        );
        Arc::new(CachedAliasStore::new(
            storage.clone(),
            config.cache.max_entries,
            config.cache.ttl_secs,
        ))
    } else {
        storage.clone()
    };

    let auth_service = Arc::new(AuthService::new(&config.auth, storage.clone()));
    match config.auth.mode {
        AuthMode::Jwt => info!("🔐 JWT bearer authentication enabled"),
        AuthMode::Basic => info!("🔐 HTTP basic authentication enabled"),
    }

    let geo = create_geo_lookup(&config.geoip)?;
    info!(provider = ?config.geoip.provider, "Geo enrichment configured");

    let state = Arc::new(AppState {
        aliases,
        visits: storage.clone(),
        auth: auth_service,
        geo,
        enrich_budget: Duration::from_millis(config.geoip.enrich_budget_ms),
        alias_length: config.redirect.alias_length,
    });

    let app = create_app(
        state,
        config.redirect.strict_status_codes,
        Duration::from_secs(config.server.timeout_secs),
    );

    let listener = tokio::net::TcpListener::bind(&config.server.address).await?;
    info!("🚀 Server listening on http://{}", config.server.address);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Stopping server");
    let grace = Duration::from_secs(config.server.shutdown_grace_secs);
    if tokio::time::timeout(grace, storage.close()).await.is_err() {
        tracing::warn!("Timed out closing database pool");
    }
    info!("Server stopped");

    Ok(())
}

fn init_tracing(env: Environment) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=debug", env.default_log_level())));

    match env {
        Environment::Local => tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(filter)
            .init(),
        Environment::Dev | Environment::Prod => {
            tracing_subscriber::fmt().compact().with_env_filter(filter).init()
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => tracing::error!(error = %err, "failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
