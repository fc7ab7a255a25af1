use serde::{Deserialize, Serialize};
use std::fmt;

/// Chat identifier of the platform's status feed.
pub const STATUS_BROADCAST_CHAT: &str = "status@broadcast";
/// Domain suffix carried by group chat identifiers.
pub const GROUP_DOMAIN: &str = "@g.us";
/// Domain suffix of one-to-one chats with a user account.
pub const USER_DOMAIN: &str = "@s.whatsapp.net";

/// Reduce a raw platform identifier to its stable account part.
///
/// Raw identifiers come in several shapes for the same participant:
/// `+15550001111`, `15550001111@s.whatsapp.net`, `15550001111:12@s.whatsapp.net`
/// (device suffix) or `15550001111@lid`. All of them normalize to `15550001111`.
/// This is the only normalization used for owner, admin, session and counter
/// comparisons.
pub fn normalize_identity(raw: &str) -> String {
    let trimmed = raw.trim();
    let account = trimmed
        .split('@')
        .next()
        .unwrap_or(trimmed)
        .split(':')
        .next()
        .unwrap_or(trimmed);
    account.replace('+', "")
}

/// A normalized participant identity, stable across device and domain variants.
///
/// Constructed only through [`Identity::from`] / deserialization, both of which
/// normalize, so two `Identity` values are equal iff they denote the same account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Build an identity from free-form user input such as `+1 (555) 000-1111`,
    /// keeping only digits. Returns `None` when nothing numeric remains.
    pub fn from_phone_input(input: &str) -> Option<Self> {
        let digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            None
        } else {
            Some(Self(digits))
        }
    }

    /// `true` when this identity is the account the tenant itself runs as.
    pub fn is_owner_of(&self, tenant: &TenantId) -> bool {
        !self.0.is_empty() && self.0 == tenant.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Identity {
    fn from(s: String) -> Self {
        Self(normalize_identity(&s))
    }
}

impl From<&str> for Identity {
    fn from(s: &str) -> Self {
        Self(normalize_identity(s))
    }
}

impl From<Identity> for String {
    fn from(id: Identity) -> Self {
        id.0
    }
}

/// One independently authenticated bot account. Normalized like [`Identity`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identity the tenant's own messages are sent as.
    pub fn identity(&self) -> Identity {
        Identity(self.0.clone())
    }

    /// The tenant's chat with itself ("message yourself").
    pub fn own_chat(&self) -> ChatId {
        ChatId(format!("{}{}", self.0, USER_DOMAIN))
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TenantId {
    fn from(s: String) -> Self {
        Self(normalize_identity(&s))
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        Self(normalize_identity(s))
    }
}

impl From<TenantId> for String {
    fn from(id: TenantId) -> Self {
        id.0
    }
}

/// A conversation address, kept verbatim (domain included) because the
/// platform needs the full form to route outbound actions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub String);

impl ChatId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_group(&self) -> bool {
        self.0.ends_with(GROUP_DOMAIN)
    }

    pub fn is_status_broadcast(&self) -> bool {
        self.0 == STATUS_BROADCAST_CHAT
    }

    /// The chat address without its domain, for display on cards.
    pub fn short(&self) -> &str {
        self.0.split('@').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ChatId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Platform-assigned message identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
