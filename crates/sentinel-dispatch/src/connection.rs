//! Tenant connectivity: status tracking, reconnects and presence.

use std::sync::Arc;

use dashmap::DashMap;
use sentinel_core::types::TenantId;
use sentinel_core::worker::contain;
use sentinel_platform::registry::Backoff;
use sentinel_platform::{ConnectionState, ConnectionStatus, Presence, TenantRegistry};
use sentinel_settings::SettingsStore;
use tokio::task::JoinHandle;
use tracing::{info, warn, Instrument};

/// Reacts to connection-state events and (re)connects tenants.
pub struct Connectivity {
    registry: Arc<TenantRegistry>,
    settings: Arc<SettingsStore>,
    backoff: Backoff,
    /// Tenants with a reconnect task in flight.
    reconnecting: DashMap<TenantId, ()>,
}

impl Connectivity {
    pub fn new(registry: Arc<TenantRegistry>, settings: Arc<SettingsStore>, backoff: Backoff) -> Self {
        Self {
            registry,
            settings,
            backoff,
            reconnecting: DashMap::new(),
        }
    }

    pub fn registry(&self) -> &Arc<TenantRegistry> {
        &self.registry
    }

    /// Apply one connection-state change reported by the platform.
    pub async fn on_state(self: &Arc<Self>, tenant: &TenantId, state: ConnectionState) {
        match state {
            ConnectionState::Connected => {
                self.registry.set_status(tenant, ConnectionStatus::Connected);
                info!(tenant = %tenant, "tenant connected");
                self.announce_presence(tenant).await;
            }
            ConnectionState::Disconnected => {
                self.registry.set_status(tenant, ConnectionStatus::Disconnected);
                warn!(tenant = %tenant, "tenant disconnected; scheduling reconnect");
                self.spawn_connect(tenant.clone());
            }
            ConnectionState::LoggedOut => {
                self.registry.remove(tenant);
                self.reconnecting.remove(tenant);
                warn!(tenant = %tenant, "tenant logged out; session removed");
            }
        }
    }

    /// Connect `tenant` with backoff in its own task. Returns `None` when a
    /// connect for this tenant is already running. A panicking client marks
    /// the tenant as errored and frees the slot for the next attempt.
    pub fn spawn_connect(self: &Arc<Self>, tenant: TenantId) -> Option<JoinHandle<()>> {
        if self.reconnecting.insert(tenant.clone(), ()).is_some() {
            return None;
        }
        let this = Arc::clone(self);
        let span = tracing::info_span!("connect", tenant = %tenant);
        Some(tokio::spawn(
            async move {
                let result = contain("connect", this.registry.connect(&tenant, this.backoff)).await;
                this.reconnecting.remove(&tenant);
                match result {
                    Some(Ok(())) => this.announce_presence(&tenant).await,
                    Some(Err(e)) => warn!(error = %e, "tenant stays offline"),
                    None => {
                        this.registry
                            .set_status(&tenant, ConnectionStatus::Error("connect panicked".into()));
                    }
                }
            }
            .instrument(span),
        ))
    }

    /// Send `available` presence if the tenant keeps itself online.
    async fn announce_presence(&self, tenant: &TenantId) {
        if !self.settings.tenant(tenant).always_online {
            return;
        }
        let Some(client) = self.registry.get(tenant) else {
            return;
        };
        if let Err(e) = client.set_presence(Presence::Available).await {
            warn!(tenant = %tenant, error = %e, "presence update failed");
        }
    }
}
