//! Numbered pick-lists and their follow-ups.
//!
//! `movie <title>` opens a search menu; picking an item opens a format menu
//! with that item's video files; picking a file downloads it and sends it as
//! a document. Each step replaces the caller's previous menu.

use std::sync::Arc;

use sentinel_platform::card::Card;
use sentinel_platform::{MediaKind, MessageEvent, OutboundMedia, PlatformClient};
use sentinel_sessions::{MenuKind, MenuOption, PendingSelection, Selected, SessionKey};
use sentinel_users::Caller;
use tracing::{info, warn};

use crate::catalog::{mime_for, Catalog, CatalogError};
use crate::context::{CommandContext, Services};
use crate::error::{CommandError, Result};

/// Run a catalog search and open the search menu.
pub async fn open_search(ctx: &CommandContext, query: &str) -> Result<()> {
    let catalog = catalog(&ctx.services)?;
    ctx.react("🔎").await;

    let items = catalog
        .search(query, ctx.services.catalog_rows)
        .await
        .map_err(|e| {
            warn!(tenant = %ctx.caller.tenant, query = %query, error = %e, "catalog search failed");
            CommandError::unavailable("Search API Error.")
        })?;

    if items.is_empty() {
        ctx.reply(Card::new("ARCHIVE SEARCH").line(format!("🚫 No movies found for: {}", query)))
            .await;
        return Ok(());
    }

    let mut card = Card::new("🎬 ARCHIVE SEARCH").line(format!("🔎 {}", query)).blank();
    for (i, item) in items.iter().enumerate() {
        card = card
            .line(format!("{}. {}", i + 1, item.display_title()))
            .line(format!("   └ 📥 {} Downloads", item.downloads));
    }
    card = card.blank().line("Reply with a number");

    let options = items
        .into_iter()
        .map(|item| MenuOption::new(item.display_title(), item.identifier))
        .collect();
    ctx.services.sessions.open_menu(
        ctx.session_key(),
        PendingSelection {
            kind: MenuKind::Search,
            tenant: ctx.caller.tenant.clone(),
            chat: ctx.caller.chat.clone(),
            options,
            context: Some(query.to_string()),
        },
    )?;
    ctx.reply(card).await;
    Ok(())
}

fn catalog(services: &Services) -> Result<Arc<dyn Catalog>> {
    services
        .catalog
        .clone()
        .ok_or_else(|| CommandError::unavailable("Archive search is disabled."))
}

/// A consumed menu and the reply that consumed it, ready to run on the
/// worker pool.
pub struct FollowUp {
    pub services: Arc<Services>,
    pub client: Arc<dyn PlatformClient>,
    pub caller: Caller,
    pub message: MessageEvent,
    pub selected: Selected,
}

impl FollowUp {
    /// Run the follow-up, replying with an error card on failure.
    pub async fn run(self) {
        let result = match self.selected.menu.kind {
            MenuKind::Search => self.open_formats().await,
            MenuKind::Format => self.deliver().await,
        };
        if let Err(e) = result {
            warn!(tenant = %self.caller.tenant, chat = %self.caller.chat, error = %e, "menu follow-up failed");
            self.reply(e.card()).await;
        }
    }

    async fn reply(&self, card: Card) {
        card.reply(self.client.as_ref(), &self.caller.chat, &self.message.id)
            .await
    }

    async fn react(&self, emoji: &str) {
        if let Err(e) = self
            .client
            .react(&self.caller.chat, &self.message.id, emoji)
            .await
        {
            warn!(tenant = %self.caller.tenant, emoji, error = %e, "reaction failed");
        }
    }

    /// Search pick → list the item's video files.
    async fn open_formats(&self) -> Result<()> {
        let catalog = catalog(&self.services)?;
        let item = self.selected.option();
        self.react("💿").await;

        let files = catalog.files(&item.value).await.map_err(|e| {
            warn!(identifier = %item.value, error = %e, "catalog metadata failed");
            CommandError::unavailable("Metadata API Error.")
        })?;
        if files.is_empty() {
            return Err(CommandError::unavailable(
                "No suitable video file found in this archive.",
            ));
        }

        let files: Vec<_> = files
            .into_iter()
            .take(self.services.catalog_rows.max(1))
            .collect();
        let mut card = Card::new("📂 SELECT FILE").line(format!("🎬 {}", item.label)).blank();
        for (i, file) in files.iter().enumerate() {
            card = card.line(format!("{}. {} ({})", i + 1, file.name, file.size_label()));
        }
        card = card.blank().line("Reply with a number");

        let options = files
            .iter()
            .map(|f| MenuOption::new(format!("{} ({})", f.name, f.size_label()), f.name.clone()))
            .collect();
        self.services.sessions.open_menu(
            SessionKey::new(self.caller.tenant.clone(), self.caller.sender.clone()),
            PendingSelection {
                kind: MenuKind::Format,
                tenant: self.caller.tenant.clone(),
                chat: self.caller.chat.clone(),
                options,
                context: Some(item.value.clone()),
            },
        )?;
        self.reply(card).await;
        Ok(())
    }

    /// Format pick → download and send as a document.
    async fn deliver(&self) -> Result<()> {
        let catalog = catalog(&self.services)?;
        let identifier = self
            .selected
            .menu
            .context
            .as_deref()
            .ok_or_else(|| CommandError::unavailable("Selection expired, search again."))?;
        let file = self.selected.option().value.as_str();
        let limit = self.services.max_media_bytes;
        self.react("💿").await;

        let bytes = match catalog.download(identifier, file, limit).await {
            Ok(bytes) => bytes,
            Err(CatalogError::TooLarge { size, limit }) => {
                info!(identifier = %identifier, file = %file, size, limit, "file above upload limit; sending link");
                self.reply(
                    Card::new("📎 FILE TOO LARGE")
                        .line(format!("📄 {}", file))
                        .line(format!("Limit: {} MB", limit / (1024 * 1024)))
                        .blank()
                        .line(catalog.download_url(identifier, file)),
                )
                .await;
                return Ok(());
            }
            Err(e) => {
                warn!(identifier = %identifier, file = %file, error = %e, "catalog download failed");
                return Err(CommandError::unavailable("Download Failed"));
            }
        };

        let upload = self
            .client
            .upload(bytes, MediaKind::Document)
            .await
            .map_err(|e| {
                warn!(tenant = %self.caller.tenant, file = %file, error = %e, "upload failed");
                CommandError::unavailable("Upload Failed.")
            })?;

        let media = OutboundMedia {
            kind: MediaKind::Document,
            upload,
            mime_type: mime_for(file).to_string(),
            caption: Some(file.to_string()),
            file_name: Some(file.to_string()),
            quoted: Some(self.message.id.clone()),
        };
        self.client.send_media(&self.caller.chat, &media).await?;
        self.react("✅").await;
        info!(tenant = %self.caller.tenant, chat = %self.caller.chat, identifier = %identifier, file = %file, "catalog file delivered");
        Ok(())
    }
}
