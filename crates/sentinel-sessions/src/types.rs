use sentinel_core::types::{ChatId, Identity, TenantId};
use sentinel_settings::Feature;

/// Key of every ephemeral conversation state: one wizard and one menu per
/// `(tenant, identity)`.
///
/// Format: `{tenant}:{identity}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub tenant: TenantId,
    pub identity: Identity,
}

impl SessionKey {
    pub fn new(tenant: TenantId, identity: Identity) -> Self {
        Self { tenant, identity }
    }

    pub fn format(&self) -> String {
        format!("{}:{}", self.tenant, self.identity)
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format())
    }
}

// ── setup wizard ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStage {
    /// Stage 1: should group admins bypass the rule?
    AdminBypass,
    /// Stage 2: which enforcement action?
    Action,
}

impl WizardStage {
    pub fn number(&self) -> u8 {
        match self {
            WizardStage::AdminBypass => 1,
            WizardStage::Action => 2,
        }
    }
}

/// A moderation-rule configuration wizard in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupSession {
    pub feature: Feature,
    pub stage: WizardStage,
    /// Chat being configured; replies from other chats are ignored.
    pub chat: ChatId,
}

impl SetupSession {
    pub fn start(feature: Feature, chat: ChatId) -> Self {
        Self {
            feature,
            stage: WizardStage::AdminBypass,
            chat,
        }
    }
}

// ── pending selections ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuKind {
    /// Catalog search results; the value is an item identifier.
    Search,
    /// Files of one catalog item; the value is a file name.
    Format,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuOption {
    /// Text shown next to the number.
    pub label: String,
    /// Locator handed to the follow-up handler.
    pub value: String,
}

impl MenuOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// A numbered menu waiting for a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSelection {
    pub kind: MenuKind,
    /// Tenant whose session opened the menu; only its events may consume it.
    pub tenant: TenantId,
    pub chat: ChatId,
    pub options: Vec<MenuOption>,
    /// Menu-wide payload, e.g. the catalog item a format menu belongs to.
    pub context: Option<String>,
}

/// A consumed menu together with the chosen option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selected {
    pub menu: PendingSelection,
    /// Zero-based index into `menu.options`.
    pub index: usize,
}

impl Selected {
    pub fn option(&self) -> &MenuOption {
        &self.menu.options[self.index]
    }
}

/// Parse a menu reply: a 1-based integer within `1..=len`.
pub fn parse_choice(reply: &str, len: usize) -> Option<usize> {
    let n: usize = reply.trim().parse().ok()?;
    (1..=len).contains(&n).then(|| n - 1)
}
