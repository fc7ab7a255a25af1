use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    routing::{get, post},
    Router,
};
use sentinel_core::config::SentinelConfig;
use sentinel_core::types::TenantId;
use sentinel_core::WorkerPool;
use sentinel_dispatch::{Connectivity, Dispatcher};
use sentinel_moderation::{ModerationEngine, Wizard};
use sentinel_platform::registry::Backoff;
use sentinel_platform::{
    BridgeClient, PairingProvider, PlatformClient, PlatformError, TenantRegistry, Timeouts,
};
use sentinel_router::{Catalog, CommandRouter, Services};
use sentinel_sessions::SessionManager;
use sentinel_settings::{SettingsBackend, SettingsStore};
use sentinel_users::Resolver;
use tracing::info;

/// Central shared state, passed as `Arc<AppState>` to all Axum handlers.
pub struct AppState {
    pub config: SentinelConfig,
    pub settings: Arc<SettingsStore>,
    pub sessions: Arc<SessionManager>,
    pub dispatcher: Arc<Dispatcher>,
    pub pairing: Arc<dyn PairingProvider>,
}

impl AppState {
    /// Wire every subsystem from config. The backend, pairing provider and
    /// catalog are injected so tests can swap in fakes.
    pub fn new(
        config: SentinelConfig,
        backend: Arc<dyn SettingsBackend>,
        pairing: Arc<dyn PairingProvider>,
        catalog: Option<Arc<dyn Catalog>>,
    ) -> Self {
        let dispatch = &config.dispatch;
        let settings = Arc::new(SettingsStore::new(backend, config.bot.default_prefix.clone()));
        let sessions = Arc::new(
            SessionManager::new(Duration::from_secs(dispatch.session_ttl_secs)).with_retention(
                Duration::from_secs(dispatch.recent_ttl_secs),
                dispatch.recent_capacity,
            ),
        );
        let resolver = Arc::new(Resolver::new(
            settings.clone(),
            Duration::from_millis(dispatch.platform_timeout_ms),
        ));

        let services = Arc::new(Services {
            settings: settings.clone(),
            sessions: sessions.clone(),
            resolver: resolver.clone(),
            wizard: Arc::new(Wizard::new(sessions.clone(), settings.clone())),
            workers: WorkerPool::new(dispatch.max_heavy_tasks),
            catalog,
            catalog_rows: config.catalog.rows,
            bot: config.bot.clone(),
            started: Instant::now(),
            max_media_bytes: dispatch.max_media_bytes,
        });

        let registry = Arc::new(TenantRegistry::new());
        let dispatcher = Arc::new(Dispatcher::new(
            registry.clone(),
            Arc::new(CommandRouter::new(services)),
            Arc::new(ModerationEngine::new(settings.clone(), resolver)),
            Arc::new(Connectivity::new(registry, settings.clone(), Backoff::default())),
        ));

        Self {
            config,
            settings,
            sessions,
            dispatcher,
            pairing,
        }
    }

    pub fn registry(&self) -> &Arc<TenantRegistry> {
        self.dispatcher.registry()
    }

    pub fn workers(&self) -> &WorkerPool {
        &self.dispatcher.router().services().workers
    }

    /// Client for `tenant`, registering a bridge client on first call.
    ///
    /// Only the bootstrap (configured and enrolled tenants) and pairing call
    /// this; event ingress never admits a tenant on its own.
    pub fn register_tenant(&self, tenant: &TenantId) -> Result<Arc<dyn PlatformClient>, PlatformError> {
        if let Some(client) = self.registry().get(tenant) {
            return Ok(client);
        }
        let timeouts = Timeouts::from_config(&self.config.dispatch);
        let client: Arc<dyn PlatformClient> =
            Arc::new(BridgeClient::new(tenant.clone(), &self.config.bridge, timeouts)?);
        self.registry().register(client.clone());
        info!(tenant = %tenant, "bridge client registered");
        Ok(client)
    }
}

/// Build the Axum router with all routes wired up.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/healthz", get(crate::http::health::liveness_handler))
        .route("/readyz", get(crate::http::health::readiness_handler))
        .route("/api/pair", post(crate::http::pair::pair_handler))
        .route("/api/events/{tenant}", post(crate::http::events::events_handler))
        .route("/api/tenants", get(crate::http::tenants::tenants_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
