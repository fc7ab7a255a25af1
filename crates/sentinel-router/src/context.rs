use std::sync::Arc;
use std::time::Instant;

use sentinel_core::config::BotConfig;
use sentinel_core::types::ChatId;
use sentinel_core::WorkerPool;
use sentinel_moderation::Wizard;
use sentinel_platform::card::Card;
use sentinel_platform::{MessageEvent, PlatformClient};
use sentinel_sessions::{SessionKey, SessionManager};
use sentinel_settings::SettingsStore;
use sentinel_users::{Caller, Resolver};
use tracing::warn;

use crate::catalog::Catalog;
use crate::error::CommandError;
use crate::parse::ParsedCommand;
use crate::table::CommandSpec;

/// Process-wide state shared by every command handler.
pub struct Services {
    pub settings: Arc<SettingsStore>,
    pub sessions: Arc<SessionManager>,
    pub resolver: Arc<Resolver>,
    pub wizard: Arc<Wizard>,
    pub workers: WorkerPool,
    /// `None` when the catalog is disabled in config.
    pub catalog: Option<Arc<dyn Catalog>>,
    pub catalog_rows: usize,
    pub bot: BotConfig,
    pub started: Instant,
    pub max_media_bytes: u64,
}

/// Everything one handler invocation needs. Owned so heavy handlers can move
/// it onto the worker pool.
#[derive(Clone)]
pub struct CommandContext {
    pub services: Arc<Services>,
    pub client: Arc<dyn PlatformClient>,
    pub caller: Caller,
    pub message: MessageEvent,
    pub spec: &'static CommandSpec,
    pub command: ParsedCommand,
    /// Prefix in effect for this chat.
    pub prefix: String,
}

impl CommandContext {
    pub fn client(&self) -> &dyn PlatformClient {
        self.client.as_ref()
    }

    pub fn chat(&self) -> &ChatId {
        &self.caller.chat
    }

    pub fn args(&self) -> Vec<&str> {
        self.command.args()
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.command.arg(index)
    }

    pub fn session_key(&self) -> SessionKey {
        SessionKey::new(self.caller.tenant.clone(), self.caller.sender.clone())
    }

    /// `Usage` error carrying this command's synopsis.
    pub fn usage(&self) -> CommandError {
        CommandError::Usage(
            format!("{}{} {}", self.prefix, self.spec.name, self.spec.usage)
                .trim_end()
                .to_string(),
        )
    }

    /// Reply to the triggering message with `card`.
    pub async fn reply(&self, card: Card) {
        card.reply(self.client(), self.chat(), &self.message.id).await
    }

    /// React to the triggering message. Failures are logged only.
    pub async fn react(&self, emoji: &str) {
        if let Err(e) = self.client.react(self.chat(), &self.message.id, emoji).await {
            warn!(tenant = %self.caller.tenant, chat = %self.chat(), emoji, error = %e, "reaction failed");
        }
    }
}
