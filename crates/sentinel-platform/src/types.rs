use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sentinel_core::types::{ChatId, Identity, MessageId};

// ── inbound ──────────────────────────────────────────────────────────────────

/// One event delivered by the platform for a single tenant.
///
/// Wire format (as posted by the transport bridge):
/// `{"type": "message", "id": "...", "chat": "...", "sender": "...", ...}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    Message(MessageEvent),
    Group(GroupEvent),
    Connection(ConnectionEvent),
}

impl InboundEvent {
    /// Short label for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            InboundEvent::Message(_) => "message",
            InboundEvent::Group(_) => "group",
            InboundEvent::Connection(_) => "connection",
        }
    }
}

/// A new message in a chat the tenant participates in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEvent {
    pub id: MessageId,
    pub chat: ChatId,
    /// Normalized on deserialization; device and domain suffixes are gone.
    pub sender: Identity,
    #[serde(default)]
    pub is_group: bool,
    /// Sent by the tenant's own account (possibly from another device).
    #[serde(default)]
    pub from_me: bool,
    pub timestamp: DateTime<Utc>,
    /// Display name the sender chose, if the platform exposes it.
    #[serde(default)]
    pub push_name: Option<String>,
    pub content: MessageContent,
    /// Where the platform already stores this message's media, when the
    /// bridge forwards it. Lets the message be re-sent without a download.
    #[serde(default)]
    pub media: Option<MediaRef>,
}

impl MessageEvent {
    /// Text body or media caption; empty for content without text.
    pub fn text(&self) -> &str {
        self.content.text().unwrap_or("")
    }
}

/// Polymorphic message payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageContent {
    Text {
        text: String,
    },
    /// Text with an optional quoted (replied-to) message.
    ExtendedText {
        text: String,
        #[serde(default)]
        quoted: Option<QuotedMessage>,
    },
    Image {
        #[serde(default)]
        caption: Option<String>,
    },
    Video {
        #[serde(default)]
        caption: Option<String>,
    },
    Sticker,
    Audio,
    Document {
        #[serde(default)]
        caption: Option<String>,
        #[serde(default)]
        file_name: Option<String>,
    },
    Reaction {
        emoji: String,
        target: MessageId,
    },
    /// Protocol notice that a message was deleted for everyone.
    Revoke {
        target: MessageId,
    },
}

impl MessageContent {
    pub fn text(&self) -> Option<&str> {
        match self {
            MessageContent::Text { text } | MessageContent::ExtendedText { text, .. } => {
                Some(text.as_str())
            }
            MessageContent::Image { caption }
            | MessageContent::Video { caption }
            | MessageContent::Document { caption, .. } => caption.as_deref(),
            _ => None,
        }
    }

    /// Kind of content, for cards and log lines.
    pub fn label(&self) -> &'static str {
        match self {
            MessageContent::Text { .. } | MessageContent::ExtendedText { .. } => "text",
            MessageContent::Image { .. } => "image",
            MessageContent::Video { .. } => "video",
            MessageContent::Sticker => "sticker",
            MessageContent::Audio => "audio",
            MessageContent::Document { .. } => "document",
            MessageContent::Reaction { .. } => "reaction",
            MessageContent::Revoke { .. } => "revoke",
        }
    }

    /// The message a delete-for-everyone notice refers to.
    pub fn revoked(&self) -> Option<&MessageId> {
        match self {
            MessageContent::Revoke { target } => Some(target),
            _ => None,
        }
    }

    pub fn quoted(&self) -> Option<&QuotedMessage> {
        match self {
            MessageContent::ExtendedText { quoted, .. } => quoted.as_ref(),
            _ => None,
        }
    }

    pub fn media_kind(&self) -> Option<MediaKind> {
        match self {
            MessageContent::Image { .. } => Some(MediaKind::Image),
            MessageContent::Video { .. } => Some(MediaKind::Video),
            MessageContent::Sticker => Some(MediaKind::Sticker),
            MessageContent::Audio => Some(MediaKind::Audio),
            MessageContent::Document { .. } => Some(MediaKind::Document),
            _ => None,
        }
    }
}

/// Locator of media already held by the platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaRef {
    #[serde(flatten)]
    pub upload: UploadedMedia,
    pub mime_type: String,
}

/// Reference to the message a reply quotes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuotedMessage {
    pub id: MessageId,
    /// Author of the quoted message.
    #[serde(default)]
    pub participant: Option<Identity>,
}

/// Group membership / metadata change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupEvent {
    pub chat: ChatId,
    /// Who performed the change; `None` when the platform does not say.
    #[serde(default)]
    pub actor: Option<Identity>,
    #[serde(default)]
    pub joined: Vec<Identity>,
    #[serde(default)]
    pub left: Vec<Identity>,
    #[serde(default)]
    pub promoted: Vec<Identity>,
    #[serde(default)]
    pub demoted: Vec<Identity>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionEvent {
    pub state: ConnectionState,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connected,
    Disconnected,
    /// The session was unlinked from the phone; reconnecting is pointless.
    LoggedOut,
}

// ── outbound ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Sticker,
    Document,
}

/// A text message to send, optionally quoting another and mentioning participants.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutboundText {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quoted: Option<MessageId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mentions: Vec<Identity>,
}

impl OutboundText {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn quoting(mut self, id: &MessageId) -> Self {
        self.quoted = Some(id.clone());
        self
    }

    pub fn mentioning(mut self, ids: impl IntoIterator<Item = Identity>) -> Self {
        self.mentions.extend(ids);
        self
    }
}

/// Content locator returned by the upload step and consumed by `send_media`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadedMedia {
    pub url: String,
    pub direct_path: String,
    /// Hex-encoded encryption key.
    pub media_key: String,
    pub file_sha256: String,
    pub file_enc_sha256: String,
    pub file_length: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMedia {
    pub kind: MediaKind,
    pub upload: UploadedMedia,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quoted: Option<MessageId>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantChange {
    Add,
    Remove,
    Promote,
    Demote,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    Available,
    Unavailable,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Participant {
    pub identity: Identity,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_super_admin: bool,
}

impl Participant {
    pub fn member(identity: impl Into<Identity>) -> Self {
        Self {
            identity: identity.into(),
            is_admin: false,
            is_super_admin: false,
        }
    }

    pub fn admin(identity: impl Into<Identity>) -> Self {
        Self {
            identity: identity.into(),
            is_admin: true,
            is_super_admin: false,
        }
    }

    pub fn has_admin_rights(&self) -> bool {
        self.is_admin || self.is_super_admin
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupInfo {
    pub chat: ChatId,
    #[serde(default)]
    pub subject: String,
    pub participants: Vec<Participant>,
}

impl GroupInfo {
    /// Whether `identity` holds admin or super-admin rights in this group.
    pub fn is_admin(&self, identity: &Identity) -> bool {
        self.participants
            .iter()
            .any(|p| &p.identity == identity && p.has_admin_rights())
    }
}

/// Runtime connection state of one tenant, as tracked by the registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connected,
    Connecting,
    Disconnected,
    LoggedOut,
    Error(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_event_decodes_from_bridge_json() {
        let raw = json!({
            "type": "message",
            "id": "3EB0ABC",
            "chat": "120363000@g.us",
            "sender": "15550002222:5@s.whatsapp.net",
            "is_group": true,
            "timestamp": "2026-01-02T03:04:05Z",
            "content": {"kind": "extended_text", "text": ".kick", "quoted": {
                "id": "3EB0DEF", "participant": "15550003333@s.whatsapp.net"
            }}
        });
        let event: InboundEvent = serde_json::from_value(raw).expect("decode");
        let InboundEvent::Message(msg) = event else {
            panic!("expected message event");
        };
        assert_eq!(msg.sender.as_str(), "15550002222");
        assert!(!msg.from_me);
        assert_eq!(msg.text(), ".kick");
        let quoted = msg.content.quoted().expect("quoted");
        assert_eq!(quoted.participant.as_ref().unwrap().as_str(), "15550003333");
    }

    #[test]
    fn media_locator_is_optional() {
        let raw = json!({
            "type": "message",
            "id": "M1",
            "chat": "15550002222@s.whatsapp.net",
            "sender": "15550002222@s.whatsapp.net",
            "timestamp": "2026-01-02T03:04:05Z",
            "content": {"kind": "image", "caption": "hi"},
            "media": {
                "url": "https://mmg.example/x", "direct_path": "/x", "media_key": "aa",
                "file_sha256": "bb", "file_enc_sha256": "cc", "file_length": 42,
                "mime_type": "image/jpeg"
            }
        });
        let InboundEvent::Message(msg) = serde_json::from_value(raw).expect("decode") else {
            panic!("expected message event");
        };
        let media = msg.media.expect("media");
        assert_eq!(media.upload.file_length, 42);
        assert_eq!(media.mime_type, "image/jpeg");

        let raw = json!({"type": "message", "id": "M2", "chat": "c", "sender": "s",
            "timestamp": "2026-01-02T03:04:05Z", "content": {"kind": "sticker"}});
        let InboundEvent::Message(msg) = serde_json::from_value(raw).expect("decode") else {
            panic!("expected message event");
        };
        assert!(msg.media.is_none());
    }

    #[test]
    fn group_event_lists_default_to_empty() {
        let raw = json!({"type": "group", "chat": "1@g.us", "joined": ["15550001111@s.whatsapp.net"]});
        let InboundEvent::Group(g) = serde_json::from_value(raw).expect("decode") else {
            panic!("expected group event");
        };
        assert_eq!(g.joined.len(), 1);
        assert!(g.left.is_empty());
        assert!(g.actor.is_none());
    }

    #[test]
    fn connection_event_decodes() {
        let raw = json!({"type": "connection", "state": "logged_out"});
        let InboundEvent::Connection(c) = serde_json::from_value(raw).expect("decode") else {
            panic!("expected connection event");
        };
        assert_eq!(c.state, ConnectionState::LoggedOut);
    }

    #[test]
    fn captions_count_as_text_and_media() {
        let content = MessageContent::Image {
            caption: Some("look www.example.com".into()),
        };
        assert_eq!(content.text(), Some("look www.example.com"));
        assert_eq!(content.media_kind(), Some(MediaKind::Image));
        assert_eq!(MessageContent::Sticker.text(), None);
    }

    #[test]
    fn group_info_admin_lookup() {
        let info = GroupInfo {
            chat: ChatId::from("1@g.us"),
            subject: "test".into(),
            participants: vec![
                Participant::admin("15550001111"),
                Participant::member("15550002222"),
                Participant {
                    identity: Identity::from("15550003333"),
                    is_admin: false,
                    is_super_admin: true,
                },
            ],
        };
        assert!(info.is_admin(&Identity::from("15550001111@s.whatsapp.net")));
        assert!(!info.is_admin(&Identity::from("15550002222")));
        assert!(info.is_admin(&Identity::from("15550003333")));
        assert!(!info.is_admin(&Identity::from("15550009999")));
    }
}
