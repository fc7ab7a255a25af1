use async_trait::async_trait;
use sentinel_core::types::{ChatId, Identity, MessageId, TenantId};

use crate::error::Result;
use crate::types::{
    GroupInfo, MediaKind, OutboundMedia, OutboundText, ParticipantChange, Presence, UploadedMedia,
};

/// Outbound side of one tenant's messaging-platform session.
///
/// Every call is independently bounded by the implementation's timeout; the
/// core never holds a lock across one of these awaits. Implementations must be
/// `Send + Sync` so a single `Arc<dyn PlatformClient>` can be shared by all
/// tasks handling that tenant's events.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// The tenant this client acts for.
    fn tenant(&self) -> &TenantId;

    /// (Re-)establish the session with the platform.
    async fn connect(&self) -> Result<()>;

    async fn send_text(&self, chat: &ChatId, msg: &OutboundText) -> Result<MessageId>;

    /// Upload raw bytes, returning the locator `send_media` needs.
    async fn upload(&self, bytes: Vec<u8>, kind: MediaKind) -> Result<UploadedMedia>;

    async fn send_media(&self, chat: &ChatId, media: &OutboundMedia) -> Result<MessageId>;

    async fn react(&self, chat: &ChatId, message: &MessageId, emoji: &str) -> Result<()>;

    /// Delete `message` (authored by `sender`) for everyone in the chat.
    async fn revoke(&self, chat: &ChatId, sender: &Identity, message: &MessageId) -> Result<()>;

    async fn update_participants(
        &self,
        chat: &ChatId,
        identities: &[Identity],
        change: ParticipantChange,
    ) -> Result<()>;

    async fn mark_read(&self, chat: &ChatId, sender: &Identity, ids: &[MessageId]) -> Result<()>;

    async fn group_info(&self, chat: &ChatId) -> Result<GroupInfo>;

    /// `true` restricts sending to admins ("closed" group).
    async fn set_announce(&self, chat: &ChatId, announce: bool) -> Result<()>;

    async fn invite_link(&self, chat: &ChatId) -> Result<String>;

    async fn set_presence(&self, presence: Presence) -> Result<()>;
}

/// Links a new tenant account by phone number.
#[async_trait]
pub trait PairingProvider: Send + Sync {
    /// Request a linking code for `phone` (digits only).
    async fn pair(&self, phone: &str) -> Result<String>;
}
