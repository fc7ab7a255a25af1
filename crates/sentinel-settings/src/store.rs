use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sentinel_core::types::{ChatId, TenantId};
use tracing::{debug, info, instrument, warn};

use crate::backend::SettingsBackend;
use crate::error::{Result, SettingsError};
use crate::types::{ChatSettings, TenantSettings};

type ChatKey = (TenantId, ChatId);

fn chat_key(tenant: &TenantId, chat: &ChatId) -> String {
    format!("chat:{}:{}", tenant, chat)
}

fn tenant_key(tenant: &TenantId) -> String {
    format!("tenant:{}", tenant)
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Read-mostly settings cache in front of a [`SettingsBackend`].
///
/// Each record lives behind its own mutex inside a sharded map, so writers on
/// one chat never block readers or writers of another. `update` runs the
/// mutation and the persistence write under that record's lock; two
/// concurrent violation-counter increments therefore both land, and the
/// backend sees them in mutation order.
///
/// The cache is authoritative at runtime. A failed persistence write is logged
/// and the in-memory value is kept.
pub struct SettingsStore {
    backend: Arc<dyn SettingsBackend>,
    chats: DashMap<ChatKey, Arc<Mutex<ChatSettings>>>,
    tenants: DashMap<TenantId, Arc<Mutex<TenantSettings>>>,
    default_prefix: String,
}

impl SettingsStore {
    pub fn new(backend: Arc<dyn SettingsBackend>, default_prefix: impl Into<String>) -> Self {
        Self {
            backend,
            chats: DashMap::new(),
            tenants: DashMap::new(),
            default_prefix: default_prefix.into(),
        }
    }

    // ── chat records ─────────────────────────────────────────────────────────

    /// Snapshot of a chat's settings. Never fails: the first access loads the
    /// persisted record or creates a defaulted one.
    pub fn get(&self, tenant: &TenantId, chat: &ChatId) -> ChatSettings {
        let record = self.chat_record(tenant, chat);
        let snapshot = lock(&record).clone();
        snapshot
    }

    /// Mutate a chat's settings in place and persist the result.
    #[instrument(skip(self, f), fields(tenant = %tenant, chat = %chat))]
    pub fn update<R>(
        &self,
        tenant: &TenantId,
        chat: &ChatId,
        f: impl FnOnce(&mut ChatSettings) -> R,
    ) -> R {
        let record = self.chat_record(tenant, chat);
        let mut guard = lock(&record);
        let out = f(&mut guard);
        self.persist(&chat_key(tenant, chat), &*guard);
        out
    }

    /// Replace a chat's settings wholesale.
    pub fn set(&self, tenant: &TenantId, chat: &ChatId, settings: ChatSettings) {
        self.update(tenant, chat, |s| *s = settings);
    }

    fn chat_record(&self, tenant: &TenantId, chat: &ChatId) -> Arc<Mutex<ChatSettings>> {
        let key = (tenant.clone(), chat.clone());
        if let Some(existing) = self.chats.get(&key) {
            return Arc::clone(existing.value());
        }
        // Load outside the shard lock; if another task inserted meanwhile its
        // record wins and ours is dropped, so every caller shares one record.
        let loaded: ChatSettings = self.load_or_default(&chat_key(tenant, chat));
        let entry = self
            .chats
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(loaded)));
        Arc::clone(entry.value())
    }

    // ── tenant records ───────────────────────────────────────────────────────

    pub fn tenant(&self, tenant: &TenantId) -> TenantSettings {
        let record = self.tenant_record(tenant);
        let snapshot = lock(&record).clone();
        snapshot
    }

    #[instrument(skip(self, f), fields(tenant = %tenant))]
    pub fn update_tenant<R>(&self, tenant: &TenantId, f: impl FnOnce(&mut TenantSettings) -> R) -> R {
        let record = self.tenant_record(tenant);
        let mut guard = lock(&record);
        let out = f(&mut guard);
        self.persist(&tenant_key(tenant), &*guard);
        out
    }

    /// Persist the tenant's record so it is admitted again after a restart.
    pub fn enroll(&self, tenant: &TenantId) {
        self.update_tenant(tenant, |_| ());
    }

    /// Every tenant with a stored record, sorted.
    pub fn tenant_ids(&self) -> Result<Vec<TenantId>> {
        let mut ids: Vec<TenantId> = self
            .backend
            .scan("tenant:")?
            .into_iter()
            .filter_map(|(key, _)| key.strip_prefix("tenant:").map(TenantId::from))
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn tenant_record(&self, tenant: &TenantId) -> Arc<Mutex<TenantSettings>> {
        if let Some(existing) = self.tenants.get(tenant) {
            return Arc::clone(existing.value());
        }
        let loaded = match self.load::<TenantSettings>(&tenant_key(tenant)) {
            Some(settings) => settings,
            None => TenantSettings::with_prefix(self.default_prefix.clone()),
        };
        let entry = self
            .tenants
            .entry(tenant.clone())
            .or_insert_with(|| Arc::new(Mutex::new(loaded)));
        Arc::clone(entry.value())
    }

    /// Command prefix in effect for `chat`: the chat override, else the
    /// tenant prefix.
    pub fn prefix_for(&self, tenant: &TenantId, chat: &ChatId) -> String {
        let chat_settings = self.get(tenant, chat);
        match chat_settings.prefix {
            Some(prefix) => prefix,
            None => self.tenant(tenant).prefix,
        }
    }

    // ── bulk ─────────────────────────────────────────────────────────────────

    /// Warm the cache from the backend. Returns `(tenants, chats)` loaded.
    /// Records already cached are left untouched.
    pub fn preload(&self) -> Result<(usize, usize)> {
        let mut tenants = 0;
        for (key, value) in self.backend.scan("tenant:")? {
            let Some(id) = key.strip_prefix("tenant:") else {
                continue;
            };
            match serde_json::from_str::<TenantSettings>(&value) {
                Ok(settings) => {
                    self.tenants
                        .entry(TenantId::from(id))
                        .or_insert_with(|| Arc::new(Mutex::new(settings)));
                    tenants += 1;
                }
                Err(e) => warn!(key = %key, error = %e, "skipping unreadable tenant settings"),
            }
        }

        let mut chats = 0;
        for (key, value) in self.backend.scan("chat:")? {
            let Some((tenant, chat)) = key
                .strip_prefix("chat:")
                .and_then(|rest| rest.split_once(':'))
            else {
                continue;
            };
            match serde_json::from_str::<ChatSettings>(&value) {
                Ok(settings) => {
                    self.chats
                        .entry((TenantId::from(tenant), ChatId::new(chat)))
                        .or_insert_with(|| Arc::new(Mutex::new(settings)));
                    chats += 1;
                }
                Err(e) => warn!(key = %key, error = %e, "skipping unreadable chat settings"),
            }
        }

        info!(tenants, chats, "settings preloaded");
        Ok((tenants, chats))
    }

    /// Number of cached chat records.
    pub fn cached_chats(&self) -> usize {
        self.chats.len()
    }

    // ── persistence helpers ──────────────────────────────────────────────────

    fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.backend.load(key) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(key, error = %e, "stored settings unreadable, using defaults");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key, error = %e, "settings load failed, using defaults");
                None
            }
        }
    }

    fn load_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        self.load(key).unwrap_or_else(|| {
            debug!(key, "no stored settings, creating defaults");
            T::default()
        })
    }

    fn persist<T: Serialize>(&self, key: &str, value: &T) {
        let result = serde_json::to_string(value)
            .map_err(SettingsError::from)
            .and_then(|raw| self.backend.store(key, &raw));
        if let Err(e) = result {
            warn!(key, error = %e, "settings persistence failed; keeping cached value");
        }
    }
}
