use std::sync::Arc;

use dashmap::DashMap;
use sentinel_core::types::TenantId;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

use crate::{client::PlatformClient, error::PlatformError, types::ConnectionStatus};

/// Minimum delay between reconnect attempts (seconds).
const BACKOFF_BASE_SECS: u64 = 5;
/// Maximum delay between reconnect attempts (seconds).
const BACKOFF_MAX_SECS: u64 = 300; // 5 minutes
/// Maximum number of reconnect attempts before giving up.
const MAX_ATTEMPTS: u32 = 10;
/// Jitter fraction applied to each delay (±10 %).
const JITTER_FRACTION: f64 = 0.10;

/// Reconnect schedule. The defaults follow 5 s → 10 s → … → 300 s.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    pub base: Duration,
    pub max: Duration,
    pub attempts: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(BACKOFF_BASE_SECS),
            max: Duration::from_secs(BACKOFF_MAX_SECS),
            attempts: MAX_ATTEMPTS,
        }
    }
}

struct TenantEntry {
    client: Arc<dyn PlatformClient>,
    status: ConnectionStatus,
}

/// Live tenant sessions, keyed by tenant id.
///
/// One client per tenant; registering a tenant again replaces its client.
/// Lookups are lock-free per shard so every event task can fetch its client
/// without contending with other tenants.
pub struct TenantRegistry {
    tenants: DashMap<TenantId, TenantEntry>,
}

impl TenantRegistry {
    pub fn new() -> Self {
        Self {
            tenants: DashMap::new(),
        }
    }

    /// Register a client. Its status starts as `Connecting`.
    pub fn register(&self, client: Arc<dyn PlatformClient>) {
        let tenant = client.tenant().clone();
        info!(tenant = %tenant, "registering tenant session");
        self.tenants.insert(
            tenant,
            TenantEntry {
                client,
                status: ConnectionStatus::Connecting,
            },
        );
    }

    pub fn get(&self, tenant: &TenantId) -> Option<Arc<dyn PlatformClient>> {
        self.tenants.get(tenant).map(|e| Arc::clone(&e.client))
    }

    /// Drop a tenant (logout). Returns the removed client, if any.
    pub fn remove(&self, tenant: &TenantId) -> Option<Arc<dyn PlatformClient>> {
        self.tenants.remove(tenant).map(|(_, e)| e.client)
    }

    pub fn set_status(&self, tenant: &TenantId, status: ConnectionStatus) {
        if let Some(mut entry) = self.tenants.get_mut(tenant) {
            entry.status = status;
        }
    }

    pub fn status(&self, tenant: &TenantId) -> Option<ConnectionStatus> {
        self.tenants.get(tenant).map(|e| e.status.clone())
    }

    /// Status of every tenant, sorted by tenant id for deterministic output.
    pub fn statuses(&self) -> Vec<(TenantId, ConnectionStatus)> {
        let mut result: Vec<(TenantId, ConnectionStatus)> = self
            .tenants
            .iter()
            .map(|e| (e.key().clone(), e.status.clone()))
            .collect();
        result.sort_by(|a, b| a.0.cmp(&b.0));
        result
    }

    pub fn connected_count(&self) -> usize {
        self.tenants
            .iter()
            .filter(|e| e.status == ConnectionStatus::Connected)
            .count()
    }

    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }

    /// Connect one tenant with backoff and record the outcome.
    pub async fn connect(&self, tenant: &TenantId, backoff: Backoff) -> Result<(), PlatformError> {
        let client = self
            .get(tenant)
            .ok_or_else(|| PlatformError::NotConnected(tenant.to_string()))?;
        self.set_status(tenant, ConnectionStatus::Connecting);
        match connect_with_backoff(client.as_ref(), backoff).await {
            Ok(()) => {
                self.set_status(tenant, ConnectionStatus::Connected);
                Ok(())
            }
            Err(e) => {
                error!(tenant = %tenant, error = %e, "failed to connect tenant after retries");
                self.set_status(tenant, ConnectionStatus::Error(e.to_string()));
                Err(e)
            }
        }
    }
}

impl Default for TenantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Attempt to connect a single tenant with exponential backoff and ±10 % jitter.
pub async fn connect_with_backoff(
    client: &dyn PlatformClient,
    backoff: Backoff,
) -> Result<(), PlatformError> {
    let mut delay = backoff.base;
    let attempts = backoff.attempts.max(1);

    for attempt in 1..=attempts {
        match client.connect().await {
            Ok(()) => {
                info!(tenant = %client.tenant(), attempt, "tenant connected");
                return Ok(());
            }
            Err(e) if attempt == attempts => {
                return Err(e);
            }
            Err(e) => {
                let total = jittered(delay);
                warn!(
                    tenant = %client.tenant(),
                    attempt,
                    max = attempts,
                    error = %e,
                    retry_after_ms = total.as_millis() as u64,
                    "tenant connect failed, retrying with backoff"
                );
                sleep(total).await;
                delay = (delay * 2).min(backoff.max);
            }
        }
    }

    Err(PlatformError::NotConnected(client.tenant().to_string()))
}

/// Spread `base` by up to `JITTER_FRACTION` either way.
///
/// Derived from the wall clock's sub-second nanos, avoiding a rand dependency.
fn jittered(base: Duration) -> Duration {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);

    let spread_ms = ((base.as_millis() as f64) * JITTER_FRACTION) as u64;
    if spread_ms == 0 {
        return base;
    }
    // offset in 0 ..= 2 * spread, then shifted down by one spread
    let offset = Duration::from_millis((nanos as u64) % (2 * spread_ms + 1));
    (base + offset).saturating_sub(Duration::from_millis(spread_ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingClient;

    fn fast() -> Backoff {
        Backoff {
            base: Duration::from_millis(1),
            max: Duration::from_millis(4),
            attempts: 4,
        }
    }

    #[tokio::test]
    async fn connect_retries_until_success() {
        let client = Arc::new(RecordingClient::new("15550001111"));
        client.fail_next_connects(2);
        let registry = TenantRegistry::new();
        registry.register(client.clone());

        let tenant = TenantId::from("15550001111");
        registry.connect(&tenant, fast()).await.expect("connect");
        assert_eq!(client.connect_calls(), 3);
        assert_eq!(registry.status(&tenant), Some(ConnectionStatus::Connected));
        assert_eq!(registry.connected_count(), 1);
    }

    #[tokio::test]
    async fn connect_gives_up_after_max_attempts() {
        let client = Arc::new(RecordingClient::new("15550001111"));
        client.fail_next_connects(10);
        let registry = TenantRegistry::new();
        registry.register(client.clone());

        let tenant = TenantId::from("15550001111");
        assert!(registry.connect(&tenant, fast()).await.is_err());
        assert_eq!(client.connect_calls(), 4);
        assert!(matches!(
            registry.status(&tenant),
            Some(ConnectionStatus::Error(_))
        ));
    }

    #[tokio::test]
    async fn unknown_tenant_cannot_connect() {
        let registry = TenantRegistry::new();
        let err = registry
            .connect(&TenantId::from("404"), fast())
            .await
            .expect_err("no client");
        assert!(matches!(err, PlatformError::NotConnected(_)));
    }

    #[test]
    fn statuses_sorted_and_removable() {
        let registry = TenantRegistry::new();
        registry.register(Arc::new(RecordingClient::new("2")));
        registry.register(Arc::new(RecordingClient::new("1")));
        let ids: Vec<String> = registry
            .statuses()
            .into_iter()
            .map(|(t, _)| t.to_string())
            .collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert!(registry.remove(&TenantId::from("1")).is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn jitter_spreads_both_ways_within_ten_percent() {
        let base = Duration::from_secs(10);
        for _ in 0..50 {
            let d = jittered(base);
            assert!(d >= Duration::from_secs(9), "{d:?} below -10%");
            assert!(d <= Duration::from_secs(11), "{d:?} above +10%");
        }
        assert_eq!(jittered(Duration::from_millis(5)), Duration::from_millis(5));
    }
}
