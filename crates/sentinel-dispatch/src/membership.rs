//! Cards announcing group membership changes.

use sentinel_platform::card::Card;
use sentinel_platform::{GroupEvent, PlatformClient};
use sentinel_settings::{ChatMode, ChatSettings};

/// Cards to send for `event`, one per affected identity. Private chats get none.
pub fn membership_cards(event: &GroupEvent, settings: &ChatSettings) -> Vec<Card> {
    if settings.mode == ChatMode::Private {
        return Vec::new();
    }

    let mut cards = Vec::new();
    for member in &event.left {
        let card = match &event.actor {
            Some(actor) if actor != member => Card::new("👢 MEMBER KICKED")
                .line(format!("👤 User: @{}", member))
                .line(format!("👮 By: @{}", actor))
                .mention(member)
                .mention(actor),
            _ => Card::new("👋 MEMBER LEFT")
                .line(format!("👤 User: @{}", member))
                .line("📉 Status: Self Leave")
                .mention(member),
        };
        cards.push(card);
    }
    for member in &event.promoted {
        cards.push(
            Card::new("👑 PROMOTED")
                .line(format!("👤 User: @{}", member))
                .line("🎉 Congrats!")
                .mention(member),
        );
    }
    for member in &event.demoted {
        cards.push(
            Card::new("👤 DEMOTED")
                .line(format!("👤 User: @{}", member))
                .line("📉 Rank Removed")
                .mention(member),
        );
    }
    for member in &event.joined {
        cards.push(
            Card::new("👋 JOINED")
                .line(format!("👤 User: @{}", member))
                .line("🎉 Welcome!")
                .mention(member),
        );
    }
    cards
}

/// Send every membership card for `event`. Returns how many were sent.
pub async fn announce(client: &dyn PlatformClient, event: &GroupEvent, settings: &ChatSettings) -> usize {
    let cards = membership_cards(event, settings);
    let count = cards.len();
    for card in cards {
        card.send(client, &event.chat).await;
    }
    count
}
