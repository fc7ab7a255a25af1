//! In-process [`PlatformClient`] that records every outbound action.
//!
//! Scriptable failure switches let tests exercise the "bot is not admin" and
//! "kick failed" branches without a real platform.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use sentinel_core::types::{ChatId, Identity, MessageId, TenantId};

use crate::client::{PairingProvider, PlatformClient};
use crate::error::{PlatformError, Result};
use crate::types::{
    GroupInfo, MediaKind, OutboundMedia, OutboundText, Participant, ParticipantChange, Presence,
    UploadedMedia,
};

/// One recorded outbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Text { chat: ChatId, msg: OutboundText },
    Upload { kind: MediaKind, len: usize },
    Media { chat: ChatId, kind: MediaKind, file_name: Option<String> },
    React { chat: ChatId, message: MessageId, emoji: String },
    Revoke { chat: ChatId, sender: Identity, message: MessageId },
    Participants { chat: ChatId, identities: Vec<Identity>, change: ParticipantChange },
    Read { chat: ChatId, ids: Vec<MessageId> },
    Announce { chat: ChatId, announce: bool },
    Presence(Presence),
}

pub struct RecordingClient {
    tenant: TenantId,
    actions: Mutex<Vec<Action>>,
    participants: Mutex<Vec<Participant>>,
    next_id: AtomicUsize,
    connect_calls: AtomicU32,
    connect_failures: AtomicU32,
    group_info_calls: AtomicUsize,
    fail_revoke: AtomicBool,
    fail_participants: AtomicBool,
    fail_group_info: AtomicBool,
}

impl RecordingClient {
    pub fn new(tenant: impl Into<TenantId>) -> Self {
        Self {
            tenant: tenant.into(),
            actions: Mutex::new(Vec::new()),
            participants: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(1),
            connect_calls: AtomicU32::new(0),
            connect_failures: AtomicU32::new(0),
            group_info_calls: AtomicUsize::new(0),
            fail_revoke: AtomicBool::new(false),
            fail_participants: AtomicBool::new(false),
            fail_group_info: AtomicBool::new(false),
        }
    }

    /// Participant list returned by `group_info` for every chat.
    pub fn with_participants(self, participants: Vec<Participant>) -> Self {
        *self.participants.lock().unwrap() = participants;
        self
    }

    pub fn set_participants(&self, participants: Vec<Participant>) {
        *self.participants.lock().unwrap() = participants;
    }

    /// Make revoke calls fail with `Forbidden` (bot lacks admin rights).
    pub fn fail_revoke(&self, fail: bool) {
        self.fail_revoke.store(fail, Ordering::SeqCst);
    }

    /// Make participant updates fail with `Forbidden`.
    pub fn fail_participants(&self, fail: bool) {
        self.fail_participants.store(fail, Ordering::SeqCst);
    }

    pub fn fail_group_info(&self, fail: bool) {
        self.fail_group_info.store(fail, Ordering::SeqCst);
    }

    /// The next `n` connect attempts fail.
    pub fn fail_next_connects(&self, n: u32) {
        self.connect_failures.store(n, Ordering::SeqCst);
    }

    pub fn connect_calls(&self) -> u32 {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn group_info_calls(&self) -> usize {
        self.group_info_calls.load(Ordering::SeqCst)
    }

    pub fn actions(&self) -> Vec<Action> {
        self.actions.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.actions.lock().unwrap().clear();
    }

    /// Bodies of every text message sent, in order.
    pub fn texts(&self) -> Vec<String> {
        self.actions()
            .into_iter()
            .filter_map(|a| match a {
                Action::Text { msg, .. } => Some(msg.text),
                _ => None,
            })
            .collect()
    }

    /// `true` when any sent text contains `needle`.
    pub fn sent_text_containing(&self, needle: &str) -> bool {
        self.texts().iter().any(|t| t.contains(needle))
    }

    pub fn revokes(&self) -> Vec<MessageId> {
        self.actions()
            .into_iter()
            .filter_map(|a| match a {
                Action::Revoke { message, .. } => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn participant_updates(&self) -> Vec<(Vec<Identity>, ParticipantChange)> {
        self.actions()
            .into_iter()
            .filter_map(|a| match a {
                Action::Participants {
                    identities, change, ..
                } => Some((identities, change)),
                _ => None,
            })
            .collect()
    }

    pub fn reactions(&self) -> Vec<String> {
        self.actions()
            .into_iter()
            .filter_map(|a| match a {
                Action::React { emoji, .. } => Some(emoji),
                _ => None,
            })
            .collect()
    }

    fn record(&self, action: Action) {
        self.actions.lock().unwrap().push(action);
    }

    fn next_message_id(&self) -> MessageId {
        MessageId(format!("SENT{}", self.next_id.fetch_add(1, Ordering::SeqCst)))
    }
}

#[async_trait]
impl PlatformClient for RecordingClient {
    fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    async fn connect(&self) -> Result<()> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.connect_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.connect_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(PlatformError::Transport("scripted connect failure".into()));
        }
        Ok(())
    }

    async fn send_text(&self, chat: &ChatId, msg: &OutboundText) -> Result<MessageId> {
        self.record(Action::Text {
            chat: chat.clone(),
            msg: msg.clone(),
        });
        Ok(self.next_message_id())
    }

    async fn upload(&self, bytes: Vec<u8>, kind: MediaKind) -> Result<UploadedMedia> {
        self.record(Action::Upload {
            kind,
            len: bytes.len(),
        });
        Ok(UploadedMedia {
            url: "https://media.invalid/blob".into(),
            direct_path: "/blob".into(),
            media_key: "00".into(),
            file_sha256: "00".into(),
            file_enc_sha256: "00".into(),
            file_length: bytes.len() as u64,
        })
    }

    async fn send_media(&self, chat: &ChatId, media: &OutboundMedia) -> Result<MessageId> {
        self.record(Action::Media {
            chat: chat.clone(),
            kind: media.kind,
            file_name: media.file_name.clone(),
        });
        Ok(self.next_message_id())
    }

    async fn react(&self, chat: &ChatId, message: &MessageId, emoji: &str) -> Result<()> {
        self.record(Action::React {
            chat: chat.clone(),
            message: message.clone(),
            emoji: emoji.to_string(),
        });
        Ok(())
    }

    async fn revoke(&self, chat: &ChatId, sender: &Identity, message: &MessageId) -> Result<()> {
        if self.fail_revoke.load(Ordering::SeqCst) {
            return Err(PlatformError::Forbidden("not an admin".into()));
        }
        self.record(Action::Revoke {
            chat: chat.clone(),
            sender: sender.clone(),
            message: message.clone(),
        });
        Ok(())
    }

    async fn update_participants(
        &self,
        chat: &ChatId,
        identities: &[Identity],
        change: ParticipantChange,
    ) -> Result<()> {
        if self.fail_participants.load(Ordering::SeqCst) {
            return Err(PlatformError::Forbidden("not an admin".into()));
        }
        self.record(Action::Participants {
            chat: chat.clone(),
            identities: identities.to_vec(),
            change,
        });
        Ok(())
    }

    async fn mark_read(&self, chat: &ChatId, _sender: &Identity, ids: &[MessageId]) -> Result<()> {
        self.record(Action::Read {
            chat: chat.clone(),
            ids: ids.to_vec(),
        });
        Ok(())
    }

    async fn group_info(&self, chat: &ChatId) -> Result<GroupInfo> {
        self.group_info_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_group_info.load(Ordering::SeqCst) {
            return Err(PlatformError::Transport("scripted group info failure".into()));
        }
        Ok(GroupInfo {
            chat: chat.clone(),
            subject: "Test Group".into(),
            participants: self.participants.lock().unwrap().clone(),
        })
    }

    async fn set_announce(&self, chat: &ChatId, announce: bool) -> Result<()> {
        self.record(Action::Announce {
            chat: chat.clone(),
            announce,
        });
        Ok(())
    }

    async fn invite_link(&self, chat: &ChatId) -> Result<String> {
        Ok(format!("https://chat.whatsapp.com/{}", chat.short()))
    }

    async fn set_presence(&self, presence: Presence) -> Result<()> {
        self.record(Action::Presence(presence));
        Ok(())
    }
}

/// Pairing provider returning a fixed code, or failing when `code` is `None`.
pub struct StaticPairing {
    pub code: Option<String>,
    pub requests: Mutex<Vec<String>>,
}

impl StaticPairing {
    pub fn new(code: Option<&str>) -> Self {
        Self {
            code: code.map(str::to_string),
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PairingProvider for StaticPairing {
    async fn pair(&self, phone: &str) -> Result<String> {
        self.requests.lock().unwrap().push(phone.to_string());
        self.code
            .clone()
            .ok_or_else(|| PlatformError::Transport("pairing unavailable".into()))
    }
}
