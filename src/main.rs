use mimalloc::MiMalloc;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use upcloud_secrets::config::{Config, StorageKind};
use upcloud_secrets::db::SqliteStorage;
use upcloud_secrets::logical::{BackendConfig, InMemoryStorage, Storage};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        listen_addr = %cfg.listen_addr,
        storage = ?cfg.storage,
        database_url = %cfg.database_url,
        mount_point = %cfg.mount_point,
        loglevel = %cfg.loglevel,
    );

    let storage: Arc<dyn Storage> = match cfg.storage {
        StorageKind::Sqlite => Arc::new(SqliteStorage::connect(&cfg.database_url).await?),
        StorageKind::Memory => {
            info!("using in-memory storage; entries are lost on exit");
            Arc::new(InMemoryStorage::new())
        }
    };

    let backend = upcloud_secrets::factory(BackendConfig {
        storage,
        mount_point: cfg.mount_point.clone(),
        default_lease_ttl: cfg.default_lease_ttl(),
    })?;

    // Build axum router and serve
    let state = upcloud_secrets::router::PluginState::new(backend, cfg.plugin_key.clone());
    let app = upcloud_secrets::router::plugin_router(state);

    let listener = TcpListener::bind(&cfg.listen_addr).await?;
    info!("HTTP server listening on {}", cfg.listen_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
