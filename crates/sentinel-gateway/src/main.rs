use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use sentinel_core::config::{SentinelConfig, StoreBackend};
use sentinel_core::types::TenantId;
use sentinel_platform::{BridgePairing, Timeouts};
use sentinel_router::{ArchiveCatalog, Catalog};
use sentinel_settings::{MemoryBackend, SettingsBackend, SqliteBackend};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

mod app;
mod http;

/// Multi-tenant chat automation gateway.
#[derive(Debug, Parser)]
#[command(name = "sentinel-gateway", version)]
struct Cli {
    /// Path to sentinel.toml. Falls back to SENTINEL_CONFIG, then ~/.sentinel/sentinel.toml.
    #[arg(long)]
    config: Option<String>,
    /// Override `gateway.port`.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "sentinel_gateway=info,sentinel_dispatch=info,tower_http=debug".into()
            }),
        )
        .init();

    // config: --config > SENTINEL_CONFIG env > ~/.sentinel/sentinel.toml
    let cli = Cli::parse();
    let config_path = cli.config.or_else(|| std::env::var("SENTINEL_CONFIG").ok());
    let mut config = SentinelConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        SentinelConfig::default()
    });
    if let Some(port) = cli.port {
        config.gateway.port = port;
    }
    config.validate()?;

    let backend = open_backend(&config)?;
    let timeouts = Timeouts::from_config(&config.dispatch);
    let pairing = Arc::new(BridgePairing::new(&config.bridge, timeouts.control)?);
    let catalog: Option<Arc<dyn Catalog>> = if config.catalog.enabled {
        info!(url = %config.catalog.base_url, "archive catalog enabled");
        Some(Arc::new(ArchiveCatalog::new(config.catalog.base_url.clone(), timeouts)?))
    } else {
        None
    };

    let state = Arc::new(app::AppState::new(config, backend, pairing, catalog));
    let (tenants, chats) = state.settings.preload()?;
    info!(tenants, chats, "settings loaded");

    let cancel = CancellationToken::new();
    let sweeper = sentinel_sessions::spawn_sweeper(
        state.sessions.clone(),
        Duration::from_secs(state.config.dispatch.sweep_interval_secs),
        cancel.clone(),
    );

    // admitted tenants: the ones listed in config plus every enrolled one
    let mut admitted: Vec<TenantId> = state
        .config
        .bridge
        .tenants
        .iter()
        .map(|id| TenantId::from(id.as_str()))
        .collect();
    admitted.extend(state.settings.tenant_ids()?);
    admitted.sort();
    admitted.dedup();
    for tenant in admitted {
        match state.register_tenant(&tenant) {
            Ok(_) => {
                state.dispatcher.connectivity().spawn_connect(tenant);
            }
            Err(e) => warn!(tenant = %tenant, error = %e, "tenant bootstrap failed"),
        }
    }

    let addr: SocketAddr =
        format!("{}:{}", state.config.gateway.bind, state.config.gateway.port).parse()?;
    let router = app::build_router(state.clone());
    info!("Sentinel gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutting down");
    cancel.cancel();
    state.workers().close();
    let _ = sweeper.await;
    Ok(())
}

/// Pick the settings backend. SQLite lives in one file next to the config.
fn open_backend(config: &SentinelConfig) -> anyhow::Result<Arc<dyn SettingsBackend>> {
    match config.database.backend {
        StoreBackend::Memory => {
            warn!("in-memory settings backend: nothing survives a restart");
            Ok(Arc::new(MemoryBackend::new()))
        }
        StoreBackend::Sqlite => {
            let db_path = &config.database.path;
            ensure_parent_dir(db_path);
            info!(path = %db_path, "opening SQLite database");
            let db = rusqlite::Connection::open(db_path)?;
            db.execute_batch("PRAGMA journal_mode=WAL;")?;
            // SqliteBackend::new runs the (idempotent) migration.
            Ok(Arc::new(SqliteBackend::new(db)?))
        }
    }
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "ctrl-c handler failed");
    }
}
