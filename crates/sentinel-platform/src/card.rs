//! Boxed text "cards" used for every bot reply.
//!
//! ```text
//! ╭━━━〔 TITLE 〕━━━┈
//! ┃
//! ┃ line one
//! ┃ line two
//! ┃
//! ╰━━━━━━━━━━━━━━━━━━┈
//! ```

use sentinel_core::types::{ChatId, Identity, MessageId};
use tracing::warn;

use crate::client::PlatformClient;
use crate::types::OutboundText;

const FOOTER: &str = "╰━━━━━━━━━━━━━━━━━━┈";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Card {
    title: String,
    lines: Vec<String>,
    mentions: Vec<Identity>,
}

impl Card {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Add a body line. Embedded newlines become separate lines.
    pub fn line(mut self, text: impl AsRef<str>) -> Self {
        self.lines
            .extend(text.as_ref().lines().map(|l| l.to_string()));
        self
    }

    pub fn blank(mut self) -> Self {
        self.lines.push(String::new());
        self
    }

    /// Mention `who` in the body (`@{identity}`) and in the message metadata.
    pub fn mention(mut self, who: &Identity) -> Self {
        self.mentions.push(who.clone());
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn render(&self) -> String {
        let mut out = format!("╭━━━〔 {} 〕━━━┈\n┃\n", self.title.to_uppercase());
        for line in &self.lines {
            if line.is_empty() {
                out.push_str("┃\n");
            } else {
                out.push_str("┃ ");
                out.push_str(line);
                out.push('\n');
            }
        }
        out.push_str("┃\n");
        out.push_str(FOOTER);
        out
    }

    pub fn into_text(self) -> OutboundText {
        let text = self.render();
        OutboundText::new(text).mentioning(self.mentions)
    }

    /// Send the card, logging (not propagating) delivery failures.
    pub async fn send(self, client: &dyn PlatformClient, chat: &ChatId) {
        self.send_inner(client, chat, None).await
    }

    /// Send the card as a reply to `quoted`.
    pub async fn reply(self, client: &dyn PlatformClient, chat: &ChatId, quoted: &MessageId) {
        self.send_inner(client, chat, Some(quoted)).await
    }

    async fn send_inner(
        self,
        client: &dyn PlatformClient,
        chat: &ChatId,
        quoted: Option<&MessageId>,
    ) {
        let title = self.title.clone();
        let mut msg = self.into_text();
        msg.quoted = quoted.cloned();
        if let Err(e) = client.send_text(chat, &msg).await {
            warn!(tenant = %client.tenant(), chat = %chat, card = %title, error = %e, "card delivery failed");
        }
    }
}

/// Fixed error card: title `ERROR`, body prefixed with ❌.
pub fn error_card(message: impl AsRef<str>) -> Card {
    Card::new("ERROR").line(format!("❌ {}", message.as_ref()))
}
