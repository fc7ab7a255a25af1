use std::sync::Arc;

use sentinel_core::config::{DEFAULT_RECENT_CAPACITY, DEFAULT_RECENT_TTL_SECS};
use sentinel_core::types::ChatId;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::error::{Result, SessionError};
use crate::recent::RecentMessages;
use crate::registry::Registry;
use crate::types::{parse_choice, PendingSelection, Selected, SessionKey, SetupSession, WizardStage};

/// Wizards and pending menus for every tenant, keyed by `(tenant, identity)`.
///
/// At most one wizard and one menu exist per key. Starting a new one
/// replaces the previous one. Recently received messages ride along so the
/// same sweeper bounds them.
pub struct SessionManager {
    wizards: Registry<SetupSession>,
    menus: Registry<PendingSelection>,
    recent: RecentMessages,
}

impl SessionManager {
    pub fn new(ttl: Duration) -> Self {
        Self {
            wizards: Registry::new(ttl),
            menus: Registry::new(ttl),
            recent: RecentMessages::new(
                Duration::from_secs(DEFAULT_RECENT_TTL_SECS),
                DEFAULT_RECENT_CAPACITY,
            ),
        }
    }

    /// Keep received messages for `ttl`, at most `capacity` per tenant.
    pub fn with_retention(mut self, ttl: Duration, capacity: usize) -> Self {
        self.recent = RecentMessages::new(ttl, capacity);
        self
    }

    pub fn recent(&self) -> &RecentMessages {
        &self.recent
    }

    // ── wizards ──────────────────────────────────────────────────────────────

    /// Begin a wizard. Returns `true` when a live wizard was replaced.
    #[instrument(skip(self, session), fields(key = %key, feature = ?session.feature))]
    pub fn start_wizard(&self, key: SessionKey, session: SetupSession) -> bool {
        let replaced = self.wizards.insert(key, session).is_some();
        if replaced {
            debug!("replaced an unfinished wizard");
        }
        replaced
    }

    /// The live wizard for `key` in `chat`. A wizard opened in another chat is
    /// invisible here.
    pub fn wizard(&self, key: &SessionKey, chat: &ChatId) -> Option<SetupSession> {
        self.wizards.get(key).filter(|s| &s.chat == chat)
    }

    #[instrument(skip(self), fields(key = %key))]
    pub fn advance_wizard(&self, key: &SessionKey, stage: WizardStage) -> Result<()> {
        self.wizards
            .update(key, |s| s.stage = stage)
            .ok_or_else(|| SessionError::NotFound { key: key.format() })
    }

    /// Terminal transition: remove the wizard.
    pub fn finish_wizard(&self, key: &SessionKey) -> Option<SetupSession> {
        self.wizards.remove(key)
    }

    // ── menus ────────────────────────────────────────────────────────────────

    /// Open a menu for `key`. Fails if the menu is bound to another tenant.
    #[instrument(skip(self, menu), fields(key = %key, kind = ?menu.kind, options = menu.options.len()))]
    pub fn open_menu(&self, key: SessionKey, menu: PendingSelection) -> Result<()> {
        if menu.tenant != key.tenant {
            return Err(SessionError::TenantMismatch {
                key: key.format(),
                expected: menu.tenant.to_string(),
            });
        }
        if self.menus.insert(key, menu).is_some() {
            debug!("replaced a pending menu");
        }
        Ok(())
    }

    pub fn menu(&self, key: &SessionKey) -> Option<PendingSelection> {
        self.menus.get(key)
    }

    /// Consume the menu for `key` if `reply` selects one of its options.
    ///
    /// The menu is taken only when it is bound to `key.tenant`, was opened in
    /// `chat`, and `reply` is an in-range number. Anything else leaves the menu
    /// in place and returns `None` so the reply can be routed normally.
    pub fn take_selection(&self, key: &SessionKey, chat: &ChatId, reply: &str) -> Option<Selected> {
        let mut index = None;
        let menu = self.menus.take_if(key, |m| {
            if m.tenant != key.tenant || &m.chat != chat {
                return false;
            }
            index = parse_choice(reply, m.options.len());
            index.is_some()
        })?;
        let index = index?;
        debug!(key = %key, kind = ?menu.kind, index, "menu selection consumed");
        Some(Selected { menu, index })
    }

    // ── maintenance ──────────────────────────────────────────────────────────

    /// Evict expired wizards and menus. Returns `(wizards, menus)` removed.
    pub fn sweep(&self) -> (usize, usize) {
        (self.wizards.sweep(), self.menus.sweep())
    }

    /// `(wizards, menus)` currently stored.
    pub fn counts(&self) -> (usize, usize) {
        (self.wizards.len(), self.menus.len())
    }
}

/// Run [`SessionManager::sweep`] every `interval` until `cancel` fires.
pub fn spawn_sweeper(
    sessions: Arc<SessionManager>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("session sweeper stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let (wizards, menus) = sessions.sweep();
                    if wizards + menus > 0 {
                        info!(wizards, menus, "expired sessions evicted");
                    }
                    let messages = sessions.recent().sweep();
                    if messages > 0 {
                        debug!(messages, "expired recent messages dropped");
                    }
                }
            }
        }
    })
}
