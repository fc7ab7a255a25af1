use std::sync::Arc;

use chrono::Utc;
use sentinel_core::types::{MessageId, TenantId};
use sentinel_core::worker::contain;
use sentinel_moderation::{ModerationEngine, WizardReply};
use sentinel_platform::{GroupEvent, InboundEvent, MessageEvent, PlatformClient, TenantRegistry};
use sentinel_router::{CommandRouter, RouteOutcome};
use sentinel_users::Caller;
use tokio::task::JoinHandle;
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

use crate::antidelete;
use crate::connection::Connectivity;
use crate::membership;
use crate::status::{self, StatusAction};

/// Reaction used for `autoreact`.
pub const AUTO_REACTION: &str = "❤️";

/// Which stage of the pipeline consumed an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// No live client for the tenant; the event was dropped.
    NoClient,
    Status(StatusAction),
    Wizard(WizardReply),
    Menu,
    Command(RouteOutcome),
    /// Delete-for-everyone notice in a one-to-one chat; `true` when the
    /// original was reposted.
    AntiDelete(bool),
    /// Plain group message handed to the moderation engine.
    Moderating,
    /// Nothing to do (own message, plain DM, ...).
    Ignored,
    /// Membership cards sent.
    Group(usize),
    Connection,
}

/// Entry point for every inbound platform event.
///
/// Each event runs in its own task under a span carrying a fresh event id.
/// A panic anywhere in the pipeline is contained to that task.
pub struct Dispatcher {
    registry: Arc<TenantRegistry>,
    router: Arc<CommandRouter>,
    moderation: Arc<ModerationEngine>,
    connectivity: Arc<Connectivity>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<TenantRegistry>,
        router: Arc<CommandRouter>,
        moderation: Arc<ModerationEngine>,
        connectivity: Arc<Connectivity>,
    ) -> Self {
        Self {
            registry,
            router,
            moderation,
            connectivity,
        }
    }

    pub fn registry(&self) -> &Arc<TenantRegistry> {
        &self.registry
    }

    pub fn router(&self) -> &Arc<CommandRouter> {
        &self.router
    }

    pub fn connectivity(&self) -> &Arc<Connectivity> {
        &self.connectivity
    }

    /// Process `event` in a new task and return immediately.
    pub fn dispatch(self: &Arc<Self>, tenant: TenantId, event: InboundEvent) -> JoinHandle<()> {
        let span = info_span!(
            "event",
            event_id = %Uuid::now_v7(),
            tenant = %tenant,
            kind = event.kind(),
        );
        let this = Arc::clone(self);
        tokio::spawn(
            async move {
                if let Some(disposition) = contain("event", this.handle(&tenant, event)).await {
                    debug!(?disposition, "event handled");
                }
            }
            .instrument(span),
        )
    }

    /// Run the pipeline for one event to completion.
    pub async fn handle(&self, tenant: &TenantId, event: InboundEvent) -> Disposition {
        match event {
            InboundEvent::Connection(conn) => {
                self.connectivity.on_state(tenant, conn.state).await;
                Disposition::Connection
            }
            InboundEvent::Message(msg) => {
                let Some(client) = self.registry.get(tenant) else {
                    warn!(tenant = %tenant, "message for unregistered tenant dropped");
                    return Disposition::NoClient;
                };
                self.handle_message(client, tenant, msg).await
            }
            InboundEvent::Group(group) => {
                let Some(client) = self.registry.get(tenant) else {
                    warn!(tenant = %tenant, "group event for unregistered tenant dropped");
                    return Disposition::NoClient;
                };
                self.handle_group(client.as_ref(), tenant, &group).await
            }
        }
    }

    async fn handle_message(
        &self,
        client: Arc<dyn PlatformClient>,
        tenant: &TenantId,
        msg: MessageEvent,
    ) -> Disposition {
        let services = self.router.services();

        // 1. Status posts never reach commands or moderation.
        if msg.chat.is_status_broadcast() {
            if !msg.from_me {
                services.sessions.recent().remember_status(tenant, msg.clone());
            }
            let defaults = services.settings.tenant(tenant);
            return Disposition::Status(status::handle_status(client.as_ref(), &defaults, &msg).await);
        }

        // 2. Caller identity and role.
        let caller = Caller::from_message(tenant, &msg);

        if let Some(target) = msg.content.revoked() {
            if msg.from_me || caller.is_group {
                return Disposition::Ignored;
            }
            return Disposition::AntiDelete(self.on_revoke(client.as_ref(), tenant, &msg, target).await);
        }

        if !msg.from_me {
            if !caller.is_group {
                services.sessions.recent().remember(tenant, msg.clone());
            }

            // 3. Read receipts and reactions.
            self.acknowledge(client.as_ref(), tenant, &msg).await;

            // 4. An open wizard takes any text reply from its owner.
            let text = msg.text();
            if !text.trim().is_empty() {
                let reply = services
                    .wizard
                    .handle_reply(client.as_ref(), &caller, text, &msg.id)
                    .await;
                if reply != WizardReply::NotInWizard {
                    return Disposition::Wizard(reply);
                }
            }

            // 5. Pending numbered menu.
            if self.router.try_menu(&client, &caller, &msg).await {
                return Disposition::Menu;
            }
        }

        // 6. Prefixed commands. The owner's own messages may issue them.
        let outcome = self.router.route(&client, &caller, &msg).await;

        // 7. Group messages from others go to moderation, off the event task.
        // A command that ran with admin or owner rights is exempt; a denied
        // or open command is still checked.
        let moderate = !msg.from_me && caller.is_group && !outcome.is_privileged();
        if moderate {
            let moderation = Arc::clone(&self.moderation);
            tokio::spawn(
                async move {
                    if let Some(outcome) =
                        contain("moderation", moderation.check(client.as_ref(), &caller, &msg)).await
                    {
                        debug!(?outcome, "moderation finished");
                    }
                }
                .in_current_span(),
            );
        }

        if outcome.is_recognized() {
            Disposition::Command(outcome)
        } else if moderate {
            Disposition::Moderating
        } else {
            Disposition::Ignored
        }
    }

    async fn on_revoke(
        &self,
        client: &dyn PlatformClient,
        tenant: &TenantId,
        notice: &MessageEvent,
        target: &MessageId,
    ) -> bool {
        let services = self.router.services();
        let Some(original) = services.sessions.recent().take(tenant, target) else {
            debug!(message = %target, "deleted message was not cached");
            return false;
        };
        if original.sender != notice.sender {
            warn!(message = %target, sender = %notice.sender, "delete notice from someone other than the author");
            return false;
        }
        let settings = services.settings.tenant(tenant);
        if !settings.anti_delete {
            return false;
        }
        antidelete::restore(client, tenant, &settings, &original, Utc::now()).await
    }

    async fn acknowledge(&self, client: &dyn PlatformClient, tenant: &TenantId, msg: &MessageEvent) {
        let settings = self.router.services().settings.get(tenant, &msg.chat);
        let defaults = self.router.services().settings.tenant(tenant);

        if settings.effective_auto_read(&defaults) {
            if let Err(e) = client
                .mark_read(&msg.chat, &msg.sender, std::slice::from_ref(&msg.id))
                .await
            {
                warn!(chat = %msg.chat, error = %e, "auto-read failed");
            }
        }
        if settings.effective_auto_react(&defaults) {
            if let Err(e) = client.react(&msg.chat, &msg.id, AUTO_REACTION).await {
                warn!(chat = %msg.chat, error = %e, "auto-react failed");
            }
        }
    }

    async fn handle_group(
        &self,
        client: &dyn PlatformClient,
        tenant: &TenantId,
        event: &GroupEvent,
    ) -> Disposition {
        let settings = self.router.services().settings.get(tenant, &event.chat);
        Disposition::Group(membership::announce(client, event, &settings).await)
    }
}
