//! Status-broadcast posts: auto-view and auto-react.

use sentinel_platform::{MessageEvent, PlatformClient};
use sentinel_settings::TenantSettings;
use tracing::{debug, warn};

/// Reactions drawn from when `status_react` is on.
pub const STATUS_REACTIONS: &[&str] = &["💚", "❤️", "🔥", "😍", "💯"];

/// What happened to one status post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusAction {
    Skipped,
    Viewed,
    ViewedAndReacted,
}

/// Mark a status post read (and react) according to the tenant toggles.
pub async fn handle_status(
    client: &dyn PlatformClient,
    tenant: &TenantSettings,
    msg: &MessageEvent,
) -> StatusAction {
    if msg.from_me || !tenant.auto_status || !tenant.watches_status_of(&msg.sender) {
        return StatusAction::Skipped;
    }

    if let Err(e) = client
        .mark_read(&msg.chat, &msg.sender, std::slice::from_ref(&msg.id))
        .await
    {
        warn!(tenant = %client.tenant(), sender = %msg.sender, error = %e, "status view failed");
        return StatusAction::Skipped;
    }
    debug!(tenant = %client.tenant(), sender = %msg.sender, "status viewed");

    if !tenant.status_react {
        return StatusAction::Viewed;
    }
    let emoji = pick_reaction();
    if let Err(e) = client.react(&msg.chat, &msg.id, emoji).await {
        warn!(tenant = %client.tenant(), sender = %msg.sender, error = %e, "status reaction failed");
        return StatusAction::Viewed;
    }
    StatusAction::ViewedAndReacted
}

/// Pseudo-random pick from [`STATUS_REACTIONS`], seeded by the clock's nanos.
fn pick_reaction() -> &'static str {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    STATUS_REACTIONS[nanos as usize % STATUS_REACTIONS.len()]
}
