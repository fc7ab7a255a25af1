use std::sync::Arc;

use sentinel_platform::{MessageEvent, PlatformClient};
use sentinel_sessions::SessionKey;
use sentinel_users::{Caller, DenialReason, PermissionCheck, Requirement};
use tracing::{debug, info, instrument, warn};

use crate::commands;
use crate::context::{CommandContext, Services};
use crate::error::CommandError;
use crate::menus::FollowUp;
use crate::parse::parse;
use crate::table::{spec_of, CommandId, CommandTable};

/// What the router did with one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// No prefix, or nothing after it.
    NotCommand,
    /// Prefixed but not in the table. Ignored without a reply.
    Unknown,
    /// Permission gate refused; a denial card was sent unless the reason is silent.
    Denied(DenialReason),
    Completed(CommandId),
    /// The handler failed and an error card was sent.
    Failed(CommandId),
    /// Handed to the worker pool.
    Queued(CommandId),
}

impl RouteOutcome {
    /// Whether the message named a known command (whatever happened next).
    pub fn is_recognized(&self) -> bool {
        !matches!(self, RouteOutcome::NotCommand | RouteOutcome::Unknown)
    }

    /// A command that passed an admin or owner gate ran (or was queued).
    pub fn is_privileged(&self) -> bool {
        match self {
            RouteOutcome::Completed(id) | RouteOutcome::Failed(id) | RouteOutcome::Queued(id) => {
                spec_of(*id).is_some_and(|s| s.requirement != Requirement::Anyone)
            }
            _ => false,
        }
    }
}

/// Parses prefixed messages, gates them through the resolver and runs the
/// matching handler.
pub struct CommandRouter {
    services: Arc<Services>,
    table: CommandTable,
}

impl CommandRouter {
    pub fn new(services: Arc<Services>) -> Self {
        Self {
            services,
            table: CommandTable::builtin(),
        }
    }

    pub fn services(&self) -> &Arc<Services> {
        &self.services
    }

    #[instrument(skip_all, fields(tenant = %caller.tenant, chat = %caller.chat, sender = %caller.sender))]
    pub async fn route(
        &self,
        client: &Arc<dyn PlatformClient>,
        caller: &Caller,
        msg: &MessageEvent,
    ) -> RouteOutcome {
        let prefix = self.services.settings.prefix_for(&caller.tenant, &caller.chat);
        let Some(command) = parse(msg.text(), &prefix) else {
            return RouteOutcome::NotCommand;
        };
        let Some(spec) = self.table.lookup(&command.name) else {
            debug!(command = %command.name, "unknown command ignored");
            return RouteOutcome::Unknown;
        };

        let check = self
            .services
            .resolver
            .authorize(client.as_ref(), caller, spec.requirement, spec.group_only)
            .await;
        if let PermissionCheck::Denied { reason } = check {
            if let Some(card) = reason.card() {
                card.reply(client.as_ref(), &caller.chat, &msg.id).await;
            }
            return RouteOutcome::Denied(reason);
        }

        info!(command = spec.name, heavy = spec.heavy, "command dispatched");
        let ctx = CommandContext {
            services: Arc::clone(&self.services),
            client: Arc::clone(client),
            caller: caller.clone(),
            message: msg.clone(),
            spec,
            command,
            prefix,
        };

        if spec.heavy {
            self.services.workers.spawn(spec.name, async move {
                run(ctx).await;
            });
            return RouteOutcome::Queued(spec.id);
        }
        if run(ctx).await {
            RouteOutcome::Completed(spec.id)
        } else {
            RouteOutcome::Failed(spec.id)
        }
    }

    /// Offer `msg` to the sender's pending menu. Returns `true` when it was
    /// consumed; the follow-up then runs on the worker pool.
    pub async fn try_menu(
        &self,
        client: &Arc<dyn PlatformClient>,
        caller: &Caller,
        msg: &MessageEvent,
    ) -> bool {
        let text = msg.text();
        if text.trim().is_empty() {
            return false;
        }
        let key = SessionKey::new(caller.tenant.clone(), caller.sender.clone());
        let Some(selected) = self
            .services
            .sessions
            .take_selection(&key, &caller.chat, text)
        else {
            return false;
        };
        info!(tenant = %caller.tenant, chat = %caller.chat, sender = %caller.sender, kind = ?selected.menu.kind, index = selected.index, "menu selection");

        let follow_up = FollowUp {
            services: Arc::clone(&self.services),
            client: Arc::clone(client),
            caller: caller.clone(),
            message: msg.clone(),
            selected,
        };
        self.services.workers.spawn("menu_follow_up", follow_up.run());
        true
    }
}

/// Execute the handler and turn any failure into its reply card.
async fn run(ctx: CommandContext) -> bool {
    match commands::execute(ctx.spec.id, &ctx).await {
        Ok(()) => true,
        Err(e) => {
            match &e {
                CommandError::Usage(_) => debug!(command = ctx.spec.name, "bad arguments"),
                _ => warn!(command = ctx.spec.name, error = %e, "command failed"),
            }
            ctx.reply(e.card()).await;
            false
        }
    }
}
