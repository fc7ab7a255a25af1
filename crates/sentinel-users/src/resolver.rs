use std::sync::Arc;
use std::time::Duration;

use sentinel_core::types::{ChatId, Identity};
use sentinel_platform::PlatformClient;
use sentinel_settings::SettingsStore;
use tracing::{debug, warn};

use crate::permissions::{Caller, PermissionCheck, PermissionChecker, Requirement};

/// Live permission resolution for one inbound event.
///
/// Group-admin status is fetched from the platform on every call that needs
/// it, with no local cache: admin changes take effect immediately at the cost
/// of one round-trip per admin-gated command.
pub struct Resolver {
    settings: Arc<SettingsStore>,
    lookup_timeout: Duration,
}

impl Resolver {
    pub fn new(settings: Arc<SettingsStore>, lookup_timeout: Duration) -> Self {
        Self {
            settings,
            lookup_timeout,
        }
    }

    /// `true` when `who` holds admin or super-admin rights in `chat`.
    ///
    /// A failed or timed-out lookup counts as "not an admin".
    pub async fn is_group_admin(
        &self,
        client: &dyn PlatformClient,
        chat: &ChatId,
        who: &Identity,
    ) -> bool {
        match tokio::time::timeout(self.lookup_timeout, client.group_info(chat)).await {
            Ok(Ok(info)) => info.is_admin(who),
            Ok(Err(e)) => {
                warn!(tenant = %client.tenant(), chat = %chat, error = %e, "group info lookup failed");
                false
            }
            Err(_) => {
                warn!(
                    tenant = %client.tenant(),
                    chat = %chat,
                    timeout_ms = self.lookup_timeout.as_millis() as u64,
                    "group info lookup timed out"
                );
                false
            }
        }
    }

    /// Full permission decision for `caller` running a command with the given
    /// requirement, reading the chat mode from the settings store.
    pub async fn authorize(
        &self,
        client: &dyn PlatformClient,
        caller: &Caller,
        requirement: Requirement,
        group_only: bool,
    ) -> PermissionCheck {
        let mode = self.settings.get(&caller.tenant, &caller.chat).mode;
        let is_admin = if PermissionChecker::needs_admin_lookup(caller, mode, requirement) {
            self.is_group_admin(client, &caller.chat, &caller.sender).await
        } else {
            false
        };
        let check = PermissionChecker::check(caller, mode, requirement, group_only, is_admin);
        if let PermissionCheck::Denied { reason } = check {
            debug!(
                tenant = %caller.tenant,
                chat = %caller.chat,
                sender = %caller.sender,
                mode = %mode,
                ?reason,
                "permission denied"
            );
        }
        check
    }
}
