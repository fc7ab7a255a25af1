//! Shared fixtures for router tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use sentinel_core::config::BotConfig;
use sentinel_core::types::{ChatId, Identity, MessageId};
use sentinel_core::WorkerPool;
use sentinel_moderation::Wizard;
use sentinel_platform::recording::RecordingClient;
use sentinel_platform::{MessageContent, MessageEvent, Participant, QuotedMessage};
use sentinel_sessions::SessionManager;
use sentinel_settings::{MemoryBackend, SettingsStore};
use sentinel_users::Resolver;

use crate::catalog::{Catalog, CatalogError, CatalogFile, CatalogItem};
use crate::context::Services;
use crate::router::CommandRouter;

pub const TENANT: &str = "15550001111";
pub const ADMIN: &str = "15550002222";
pub const MEMBER: &str = "15550003333";
pub const GROUP: &str = "120363@g.us";

static NEXT_ID: AtomicUsize = AtomicUsize::new(1);

pub struct FakeCatalog {
    items: Vec<CatalogItem>,
    files: Vec<CatalogFile>,
    payload: Vec<u8>,
}

impl FakeCatalog {
    pub fn with_defaults() -> Arc<Self> {
        Arc::new(Self {
            items: vec![
                CatalogItem {
                    identifier: "night_1968".into(),
                    title: "Night of the Living Dead".into(),
                    year: Some("1968".into()),
                    downloads: 5000,
                },
                CatalogItem {
                    identifier: "nosferatu".into(),
                    title: "Nosferatu".into(),
                    year: None,
                    downloads: 10,
                },
            ],
            files: vec![CatalogFile {
                name: "night.mp4".into(),
                format: Some("MPEG4".into()),
                size: Some(10),
            }],
            payload: vec![0u8; 10],
        })
    }

    pub fn empty() -> Arc<Self> {
        Arc::new(Self {
            items: Vec::new(),
            files: Vec::new(),
            payload: Vec::new(),
        })
    }
}

#[async_trait]
impl Catalog for FakeCatalog {
    async fn search(&self, _query: &str, rows: usize) -> Result<Vec<CatalogItem>, CatalogError> {
        Ok(self.items.iter().take(rows).cloned().collect())
    }

    async fn files(&self, _identifier: &str) -> Result<Vec<CatalogFile>, CatalogError> {
        Ok(self.files.clone())
    }

    fn download_url(&self, identifier: &str, file: &str) -> String {
        format!("https://catalog.test/download/{}/{}", identifier, file)
    }

    async fn download(
        &self,
        _identifier: &str,
        _file: &str,
        max_bytes: u64,
    ) -> Result<Vec<u8>, CatalogError> {
        let size = self.payload.len() as u64;
        if size > max_bytes {
            return Err(CatalogError::TooLarge {
                size,
                limit: max_bytes,
            });
        }
        Ok(self.payload.clone())
    }
}

pub fn services(catalog: Option<Arc<FakeCatalog>>, max_media_bytes: u64) -> Arc<Services> {
    let settings = Arc::new(SettingsStore::new(Arc::new(MemoryBackend::new()), "."));
    let sessions = Arc::new(SessionManager::new(Duration::from_secs(600)));
    Arc::new(Services {
        resolver: Arc::new(Resolver::new(settings.clone(), Duration::from_secs(1))),
        wizard: Arc::new(Wizard::new(sessions.clone(), settings.clone())),
        settings,
        sessions,
        workers: WorkerPool::new(4),
        catalog: catalog.map(|c| c as Arc<dyn Catalog>),
        catalog_rows: 10,
        bot: BotConfig::default(),
        started: Instant::now(),
        max_media_bytes,
    })
}

pub fn harness(catalog: Option<Arc<FakeCatalog>>) -> (CommandRouter, Arc<RecordingClient>) {
    harness_with_limit(catalog, 1024 * 1024)
}

pub fn harness_with_limit(
    catalog: Option<Arc<FakeCatalog>>,
    max_media_bytes: u64,
) -> (CommandRouter, Arc<RecordingClient>) {
    let client = Arc::new(RecordingClient::new(TENANT).with_participants(vec![
        Participant::admin(ADMIN),
        Participant::member(MEMBER),
    ]));
    (CommandRouter::new(services(catalog, max_media_bytes)), client)
}

fn event(chat: &str, sender: &str, content: MessageContent) -> MessageEvent {
    let chat = ChatId::from(chat);
    MessageEvent {
        id: MessageId(format!("IN{}", NEXT_ID.fetch_add(1, Ordering::SeqCst))),
        is_group: chat.is_group(),
        chat,
        sender: Identity::from(sender),
        from_me: false,
        timestamp: Utc::now(),
        push_name: None,
        content,
        media: None,
    }
}

pub fn text(chat: &str, sender: &str, body: &str) -> MessageEvent {
    event(chat, sender, MessageContent::Text { text: body.into() })
}

/// One-to-one message from `sender`.
pub fn dm(sender: &str, body: &str) -> MessageEvent {
    text(&format!("{}@s.whatsapp.net", sender), sender, body)
}

pub fn reply_to(chat: &str, sender: &str, body: &str, quoted_id: &str, author: &str) -> MessageEvent {
    event(
        chat,
        sender,
        MessageContent::ExtendedText {
            text: body.into(),
            quoted: Some(QuotedMessage {
                id: MessageId::from(quoted_id),
                participant: Some(Identity::from(author)),
            }),
        },
    )
}

/// Poll `cond` until it holds; background work runs on the worker pool.
pub async fn eventually(cond: impl Fn() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met within 2s");
}
