//! Anti-delete: repost one-to-one messages their sender deleted for everyone.

use chrono::{DateTime, Utc};
use sentinel_core::types::TenantId;
use sentinel_platform::card::Card;
use sentinel_platform::{relay, MessageEvent, PlatformClient};
use sentinel_settings::TenantSettings;
use tracing::{info, warn};

const CLOCK: &str = "%I:%M:%S %p";

/// Copy `original` into the tenant's dump chat and follow it with an alert
/// card quoting the copy. Returns `false` when the copy could not be sent.
pub async fn restore(
    client: &dyn PlatformClient,
    tenant: &TenantId,
    settings: &TenantSettings,
    original: &MessageEvent,
    deleted_at: DateTime<Utc>,
) -> bool {
    let dump = settings.dump_chat(tenant);
    let copy = match relay::repost(client, &dump, original).await {
        Ok(copy) => copy,
        Err(e) => {
            warn!(tenant = %tenant, chat = %dump, error = %e, "deleted message could not be reposted");
            return false;
        }
    };

    let mut card = alert(original, deleted_at);
    if copy.is_none() {
        card = card.line(format!("📎 Content: {} (not recoverable)", original.content.label()));
    }
    match copy {
        Some(id) => card.reply(client, &dump, &id).await,
        None => card.send(client, &dump).await,
    }
    info!(tenant = %tenant, sender = %original.sender, message = %original.id, "deleted message restored");
    true
}

fn alert(original: &MessageEvent, deleted_at: DateTime<Utc>) -> Card {
    let name = original.push_name.as_deref().unwrap_or("Unknown");
    Card::new("ANTIDELETE ALERT")
        .line(format!("👤 User: {}", name))
        .line(format!("📱 Number: @{}", original.sender))
        .line(format!("⏰ Sent: {}", original.timestamp.format(CLOCK)))
        .line(format!("🗑️ Deleted: {}", deleted_at.format(CLOCK)))
        .mention(&original.sender)
}
