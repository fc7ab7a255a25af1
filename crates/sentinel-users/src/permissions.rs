use sentinel_core::types::{ChatId, Identity, TenantId};
use sentinel_platform::{Card, MessageEvent};
use sentinel_settings::ChatMode;

/// Minimum role a command needs, on top of the chat-mode gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Anyone,
    /// Group administrator (or owner).
    Admin,
    Owner,
}

/// Who is acting, where, on behalf of which tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub tenant: TenantId,
    pub sender: Identity,
    pub chat: ChatId,
    /// Sender is the account the tenant runs as.
    pub is_owner: bool,
    pub is_group: bool,
}

impl Caller {
    pub fn new(tenant: TenantId, sender: Identity, chat: ChatId) -> Self {
        let is_owner = sender.is_owner_of(&tenant);
        let is_group = chat.is_group();
        Self {
            tenant,
            sender,
            chat,
            is_owner,
            is_group,
        }
    }

    /// Build the caller for an inbound message. Messages the tenant sent
    /// itself are attributed to the owner even when the platform reports a
    /// device-specific sender.
    pub fn from_message(tenant: &TenantId, msg: &MessageEvent) -> Self {
        let sender = if msg.from_me {
            tenant.identity()
        } else {
            msg.sender.clone()
        };
        let is_group = msg.is_group || msg.chat.is_group();
        Self {
            is_owner: sender.is_owner_of(tenant),
            tenant: tenant.clone(),
            sender,
            chat: msg.chat.clone(),
            is_group,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    /// Chat is in private mode.
    PrivateMode,
    /// Chat is admin-only and the sender is not an admin.
    AdminOnlyMode,
    /// Command only works in groups.
    GroupOnly,
    AdminRequired,
    OwnerRequired,
}

impl DenialReason {
    /// Mode denials are dropped without a reply.
    pub fn is_silent(&self) -> bool {
        matches!(self, DenialReason::PrivateMode | DenialReason::AdminOnlyMode)
    }

    /// Fixed denial card, or `None` when the denial is silent.
    pub fn card(&self) -> Option<Card> {
        match self {
            DenialReason::PrivateMode | DenialReason::AdminOnlyMode => None,
            DenialReason::GroupOnly => {
                Some(Card::new("GROUP ONLY").line("⚠️ This command only works in groups"))
            }
            DenialReason::AdminRequired => {
                Some(Card::new("ADMIN ONLY").line("⛔ Only group admins can use this"))
            }
            DenialReason::OwnerRequired => {
                Some(Card::new("OWNER ONLY").line("⛔ Only the bot owner can use this"))
            }
        }
    }
}

/// Result of a permission check. Callers pattern-match this rather than
/// treating denial as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionCheck {
    Allowed,
    Denied { reason: DenialReason },
}

impl PermissionCheck {
    pub fn is_allowed(&self) -> bool {
        matches!(self, PermissionCheck::Allowed)
    }
}

pub struct PermissionChecker;

impl PermissionChecker {
    /// Whether [`check`](Self::check) would read `is_admin` for this input.
    /// The admin flag costs a platform round-trip, so it is fetched only then.
    pub fn needs_admin_lookup(caller: &Caller, mode: ChatMode, requirement: Requirement) -> bool {
        if caller.is_owner || !caller.is_group {
            return false;
        }
        match mode {
            ChatMode::Private => false,
            ChatMode::Admin => true,
            ChatMode::Public => requirement == Requirement::Admin,
        }
    }

    /// Decide whether `caller` may run a command.
    ///
    /// Order, first match wins:
    /// 1. group-only command outside a group → denied;
    /// 2. chat-mode gate: owner and one-to-one chats pass, `private` denies,
    ///    `admin` requires `is_admin`, `public` passes;
    /// 3. the command's own requirement.
    pub fn check(
        caller: &Caller,
        mode: ChatMode,
        requirement: Requirement,
        group_only: bool,
        is_admin: bool,
    ) -> PermissionCheck {
        if group_only && !caller.is_group {
            return PermissionCheck::Denied {
                reason: DenialReason::GroupOnly,
            };
        }

        if !caller.is_owner && caller.is_group {
            match mode {
                ChatMode::Private => {
                    return PermissionCheck::Denied {
                        reason: DenialReason::PrivateMode,
                    }
                }
                ChatMode::Admin if !is_admin => {
                    return PermissionCheck::Denied {
                        reason: DenialReason::AdminOnlyMode,
                    }
                }
                _ => {}
            }
        }

        match requirement {
            Requirement::Anyone => PermissionCheck::Allowed,
            Requirement::Admin if caller.is_owner || is_admin => PermissionCheck::Allowed,
            Requirement::Admin => PermissionCheck::Denied {
                reason: DenialReason::AdminRequired,
            },
            Requirement::Owner if caller.is_owner => PermissionCheck::Allowed,
            Requirement::Owner => PermissionCheck::Denied {
                reason: DenialReason::OwnerRequired,
            },
        }
    }
}
