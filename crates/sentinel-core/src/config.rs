use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 8790;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_PREFIX: &str = ".";
/// Ephemeral wizard/menu lifetime.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 600;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_PLATFORM_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_MAX_HEAVY_TASKS: usize = 8;
pub const DEFAULT_MAX_MEDIA_BYTES: u64 = 64 * 1024 * 1024; // 64 MiB
/// Whole-request bound for media downloads and uploads.
pub const DEFAULT_TRANSFER_TIMEOUT_SECS: u64 = 600;
/// How long one-to-one messages stay available to anti-delete.
pub const DEFAULT_RECENT_TTL_SECS: u64 = 24 * 60 * 60;
/// Messages kept per tenant for anti-delete.
pub const DEFAULT_RECENT_CAPACITY: usize = 500;

/// Top-level config (sentinel.toml + SENTINEL_* env overrides).
///
/// Every section is optional; an empty file yields a runnable in-memory setup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SentinelConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

/// Where chat and tenant settings are persisted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    /// Nothing survives a restart. Useful for tests and dry runs.
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
    #[serde(default)]
    pub backend: StoreBackend,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            backend: StoreBackend::default(),
        }
    }
}

/// Presentation values shown on cards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_bot_name")]
    pub name: String,
    #[serde(default = "default_owner_name")]
    pub owner_name: String,
    /// Prefix used by tenants that never ran `setprefix`.
    #[serde(default = "default_prefix")]
    pub default_prefix: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            owner_name: default_owner_name(),
            default_prefix: default_prefix(),
        }
    }
}

/// Concurrency and timeout knobs of the per-event pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Upper bound on concurrently running heavy handlers (downloads, scraping).
    #[serde(default = "default_max_heavy_tasks")]
    pub max_heavy_tasks: usize,
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// Applied to every outbound control call (send, react, kick, ...).
    #[serde(default = "default_platform_timeout_ms")]
    pub platform_timeout_ms: u64,
    /// Applied to media transfers, which may legitimately run for minutes.
    #[serde(default = "default_transfer_timeout_secs")]
    pub transfer_timeout_secs: u64,
    /// Files above this size are sent as links instead of uploads.
    #[serde(default = "default_max_media_bytes")]
    pub max_media_bytes: u64,
    #[serde(default = "default_recent_ttl_secs")]
    pub recent_ttl_secs: u64,
    #[serde(default = "default_recent_capacity")]
    pub recent_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_heavy_tasks: DEFAULT_MAX_HEAVY_TASKS,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            platform_timeout_ms: DEFAULT_PLATFORM_TIMEOUT_MS,
            transfer_timeout_secs: DEFAULT_TRANSFER_TIMEOUT_SECS,
            max_media_bytes: DEFAULT_MAX_MEDIA_BYTES,
            recent_ttl_secs: DEFAULT_RECENT_TTL_SECS,
            recent_capacity: DEFAULT_RECENT_CAPACITY,
        }
    }
}

/// Connection to the messaging transport bridge.
///
/// The bridge owns the platform sessions and auth state; sentinel talks to it
/// over REST for outbound actions and receives events on `/api/events/{tenant}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default = "default_bridge_url")]
    pub base_url: String,
    /// Bearer token sent on every outbound bridge request.
    pub token: Option<String>,
    /// HMAC-SHA256 secret used to verify inbound event posts.
    /// Unset means ingress is unauthenticated, which is only allowed on a
    /// loopback bind.
    pub ingress_secret: Option<String>,
    /// Tenants connected at startup. Others are admitted once paired.
    #[serde(default)]
    pub tenants: Vec<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            base_url: default_bridge_url(),
            token: None,
            ingress_secret: None,
            tenants: Vec::new(),
        }
    }
}

/// External media catalog used by the search and format menus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    #[serde(default = "default_catalog_url")]
    pub base_url: String,
    /// Maximum search results offered in one menu.
    #[serde(default = "default_catalog_rows")]
    pub rows: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_catalog_url(),
            rows: default_catalog_rows(),
        }
    }
}

fn bool_true() -> bool {
    true
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}
fn default_bot_name() -> String {
    "SENTINEL".to_string()
}
fn default_owner_name() -> String {
    "Owner".to_string()
}
fn default_max_heavy_tasks() -> usize {
    DEFAULT_MAX_HEAVY_TASKS
}
fn default_session_ttl_secs() -> u64 {
    DEFAULT_SESSION_TTL_SECS
}
fn default_sweep_interval_secs() -> u64 {
    DEFAULT_SWEEP_INTERVAL_SECS
}
fn default_platform_timeout_ms() -> u64 {
    DEFAULT_PLATFORM_TIMEOUT_MS
}
fn default_max_media_bytes() -> u64 {
    DEFAULT_MAX_MEDIA_BYTES
}
fn default_transfer_timeout_secs() -> u64 {
    DEFAULT_TRANSFER_TIMEOUT_SECS
}
fn default_recent_ttl_secs() -> u64 {
    DEFAULT_RECENT_TTL_SECS
}
fn default_recent_capacity() -> usize {
    DEFAULT_RECENT_CAPACITY
}
fn default_bridge_url() -> String {
    "http://127.0.0.1:8791".to_string()
}
fn default_catalog_url() -> String {
    "https://archive.org".to_string()
}
fn default_catalog_rows() -> usize {
    10
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.sentinel/sentinel.db", home)
}

impl SentinelConfig {
    /// Load config from a TOML file with SENTINEL_* env var overrides.
    ///
    /// Nested keys use a double underscore, e.g.
    /// `SENTINEL_DISPATCH__MAX_HEAVY_TASKS=4`. A missing file is not an error;
    /// defaults fill every section.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        Self::figment(&path)
            .extract()
            .map_err(|e| crate::error::SentinelError::Config(e.to_string()))
    }

    /// Reject setups that would expose unauthenticated event ingress: a
    /// non-loopback bind requires `bridge.ingress_secret`.
    pub fn validate(&self) -> crate::error::Result<()> {
        let has_secret = self
            .bridge
            .ingress_secret
            .as_deref()
            .is_some_and(|s| !s.is_empty());
        if !has_secret && !is_loopback(&self.gateway.bind) {
            return Err(crate::error::SentinelError::Config(format!(
                "gateway.bind = {} is reachable from other hosts; set bridge.ingress_secret",
                self.gateway.bind
            )));
        }
        Ok(())
    }

    fn figment(path: &str) -> Figment {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("SENTINEL_").split("__"))
    }
}

fn is_loopback(bind: &str) -> bool {
    bind.eq_ignore_ascii_case("localhost")
        || bind
            .parse::<std::net::IpAddr>()
            .is_ok_and(|ip| ip.is_loopback())
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.sentinel/sentinel.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn empty_file_yields_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file("sentinel.toml", "")?;
            let config = SentinelConfig::load(Some("sentinel.toml")).expect("load");
            assert_eq!(config.gateway.port, DEFAULT_PORT);
            assert_eq!(config.bot.default_prefix, ".");
            assert_eq!(config.dispatch.session_ttl_secs, 600);
            assert_eq!(config.dispatch.transfer_timeout_secs, DEFAULT_TRANSFER_TIMEOUT_SECS);
            assert_eq!(config.dispatch.recent_capacity, DEFAULT_RECENT_CAPACITY);
            assert_eq!(config.database.backend, StoreBackend::Sqlite);
            assert!(config.catalog.enabled);
            Ok(())
        });
    }

    #[test]
    fn toml_values_override_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "sentinel.toml",
                r#"
                [gateway]
                port = 9000

                [database]
                backend = "memory"

                [bridge]
                base_url = "http://bridge:7000"
                tenants = ["15550001111"]
                "#,
            )?;
            let config = SentinelConfig::load(Some("sentinel.toml")).expect("load");
            assert_eq!(config.gateway.port, 9000);
            assert_eq!(config.gateway.bind, DEFAULT_BIND);
            assert_eq!(config.database.backend, StoreBackend::Memory);
            assert_eq!(config.bridge.base_url, "http://bridge:7000");
            assert_eq!(config.bridge.tenants, vec!["15550001111".to_string()]);
            Ok(())
        });
    }

    #[test]
    fn env_overrides_nested_keys() {
        Jail::expect_with(|jail| {
            jail.create_file("sentinel.toml", "[dispatch]\nmax_heavy_tasks = 2\n")?;
            jail.set_env("SENTINEL_DISPATCH__MAX_HEAVY_TASKS", "4");
            jail.set_env("SENTINEL_BOT__DEFAULT_PREFIX", "!");
            let config = SentinelConfig::load(Some("sentinel.toml")).expect("load");
            assert_eq!(config.dispatch.max_heavy_tasks, 4);
            assert_eq!(config.bot.default_prefix, "!");
            Ok(())
        });
    }

    #[test]
    fn open_bind_requires_ingress_secret() {
        let mut config = SentinelConfig::default();
        assert!(config.validate().is_ok());

        config.gateway.bind = "0.0.0.0".into();
        let err = config.validate().expect_err("unauthenticated public ingress");
        assert_eq!(err.code(), "CONFIG_ERROR");

        config.bridge.ingress_secret = Some(String::new());
        assert!(config.validate().is_err());
        config.bridge.ingress_secret = Some("s3cret".into());
        assert!(config.validate().is_ok());

        config.bridge.ingress_secret = None;
        config.gateway.bind = "::1".into();
        assert!(config.validate().is_ok());
        config.gateway.bind = "localhost".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_file_is_not_an_error() {
        Jail::expect_with(|_jail| {
            let config = SentinelConfig::load(Some("does-not-exist.toml")).expect("load");
            assert_eq!(config.gateway.port, DEFAULT_PORT);
            Ok(())
        });
    }
}
