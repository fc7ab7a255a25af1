use std::sync::Arc;

use sentinel_platform::card::Card;
use sentinel_platform::{MessageEvent, ParticipantChange, PlatformClient, PlatformError};
use sentinel_settings::{ChatMode, EnforcementAction, Feature, SettingsStore};
use sentinel_users::{Caller, Resolver};
use tracing::{info, instrument, warn};

use crate::detect::detect_violation;

/// Violations under `delete+warn` that trigger removal.
pub const WARN_LIMIT: u32 = 3;

/// What the engine did with one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Not a group, private mode, or the bot's own account.
    Inert,
    /// No enabled rule matched.
    Clean,
    /// A rule matched but the sender is an exempt admin.
    Exempt(Feature),
    Deleted(Feature),
    /// The revoke failed; nothing else was attempted.
    DeleteFailed { feature: Feature, privilege: bool },
    Kicked(Feature),
    /// The message is gone but the sender could not be removed.
    KickFailed(Feature),
    Warned { feature: Feature, count: u32 },
    /// Reached [`WARN_LIMIT`] and was removed; the counter is back to zero.
    WarnKicked(Feature),
}

/// Evaluates group messages against the chat's rules and enforces the
/// configured action.
pub struct ModerationEngine {
    settings: Arc<SettingsStore>,
    resolver: Arc<Resolver>,
}

impl ModerationEngine {
    pub fn new(settings: Arc<SettingsStore>, resolver: Arc<Resolver>) -> Self {
        Self { settings, resolver }
    }

    /// Check one message and enforce if it violates a rule.
    #[instrument(skip_all, fields(tenant = %caller.tenant, chat = %caller.chat, sender = %caller.sender, message = %msg.id))]
    pub async fn check(
        &self,
        client: &dyn PlatformClient,
        caller: &Caller,
        msg: &MessageEvent,
    ) -> Outcome {
        if !caller.is_group || caller.is_owner || msg.from_me {
            return Outcome::Inert;
        }

        let settings = self.settings.get(&caller.tenant, &caller.chat);
        if settings.mode == ChatMode::Private {
            return Outcome::Inert;
        }

        let Some(feature) = detect_violation(&settings, &msg.content) else {
            return Outcome::Clean;
        };

        if settings.allow_admins
            && self
                .resolver
                .is_group_admin(client, &caller.chat, &caller.sender)
                .await
        {
            return Outcome::Exempt(feature);
        }

        let action = settings.rule(feature).action;
        info!(feature = ?feature, action = action.label(), "rule violation");
        self.enforce(client, caller, msg, feature, action).await
    }

    async fn enforce(
        &self,
        client: &dyn PlatformClient,
        caller: &Caller,
        msg: &MessageEvent,
        feature: Feature,
        action: EnforcementAction,
    ) -> Outcome {
        let chat = &caller.chat;
        let sender = &caller.sender;

        if let Err(e) = client.revoke(chat, sender, &msg.id).await {
            return self.delete_failed(client, caller, msg, feature, e).await;
        }

        match action {
            EnforcementAction::Delete => {
                Card::new("🚫 DELETED")
                    .line(format!("Reason: {}", feature.reason()))
                    .line(format!("User: @{}", sender))
                    .mention(sender)
                    .reply(client, chat, &msg.id)
                    .await;
                Outcome::Deleted(feature)
            }
            EnforcementAction::DeleteKick => {
                if !self.kick(client, caller, msg).await {
                    return Outcome::KickFailed(feature);
                }
                Card::new("👢 KICKED")
                    .line(format!("Reason: {}", feature.reason()))
                    .line(format!("User: @{}", sender))
                    .line(format!("Action: {}", action.label()))
                    .mention(sender)
                    .send(client, chat)
                    .await;
                Outcome::Kicked(feature)
            }
            EnforcementAction::DeleteWarn => {
                // Increment and reset happen under the record lock so rapid
                // violations from one sender are all counted.
                let count = self.settings.update(&caller.tenant, chat, |s| {
                    let count = s.record_violation(sender);
                    if count >= WARN_LIMIT {
                        s.clear_warnings(sender);
                    }
                    count
                });

                if count < WARN_LIMIT {
                    Card::new("⚠️ WARNING")
                        .line(format!("User: @{}", sender))
                        .line(format!("Count: {}/{}", count, WARN_LIMIT))
                        .line(format!("Reason: {}", feature.reason()))
                        .line(format!("{} = Kick", WARN_LIMIT))
                        .mention(sender)
                        .reply(client, chat, &msg.id)
                        .await;
                    return Outcome::Warned { feature, count };
                }

                if !self.kick(client, caller, msg).await {
                    return Outcome::KickFailed(feature);
                }
                Card::new("🚫 KICKED")
                    .line(format!("User: @{}", sender))
                    .line(format!("Warning: {}/{}", WARN_LIMIT, WARN_LIMIT))
                    .line("Kicked Out")
                    .mention(sender)
                    .send(client, chat)
                    .await;
                Outcome::WarnKicked(feature)
            }
        }
    }

    async fn delete_failed(
        &self,
        client: &dyn PlatformClient,
        caller: &Caller,
        msg: &MessageEvent,
        feature: Feature,
        error: PlatformError,
    ) -> Outcome {
        let privilege = error.is_privilege();
        warn!(tenant = %caller.tenant, chat = %caller.chat, error = %error, privilege, "delete failed");
        let card = if privilege {
            Card::new("❌ DELETE FAILED").line("Bot needs admin")
        } else {
            Card::new("❌ DELETE FAILED").line("Platform did not respond, try again later")
        };
        card.reply(client, &caller.chat, &msg.id).await;
        Outcome::DeleteFailed { feature, privilege }
    }

    /// Remove the sender. On failure the "KICK FAILED" card is sent.
    async fn kick(&self, client: &dyn PlatformClient, caller: &Caller, msg: &MessageEvent) -> bool {
        let result = client
            .update_participants(
                &caller.chat,
                std::slice::from_ref(&caller.sender),
                ParticipantChange::Remove,
            )
            .await;
        match result {
            Ok(()) => {
                info!(tenant = %caller.tenant, chat = %caller.chat, sender = %caller.sender, "offender removed");
                true
            }
            Err(e) => {
                warn!(tenant = %caller.tenant, chat = %caller.chat, error = %e, "kick failed");
                Card::new("⚠️ KICK FAILED")
                    .line("Bot needs admin")
                    .reply(client, &caller.chat, &msg.id)
                    .await;
                false
            }
        }
    }
}
