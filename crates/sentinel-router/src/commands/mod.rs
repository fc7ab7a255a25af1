//! Command handlers. Permission has already been checked by the router when
//! any of these run.

pub mod general;
pub mod group;
pub mod media;
pub mod owner;
pub mod security;

use sentinel_core::types::Identity;

use crate::context::CommandContext;
use crate::error::Result;
use crate::table::CommandId;

pub async fn execute(id: CommandId, ctx: &CommandContext) -> Result<()> {
    match id {
        CommandId::Menu => general::menu(ctx).await,
        CommandId::Ping => general::ping(ctx).await,
        CommandId::Id => general::id(ctx).await,
        CommandId::Owner => general::owner(ctx).await,
        CommandId::AlwaysOnline => owner::toggle(ctx, owner::Toggle::AlwaysOnline).await,
        CommandId::AutoRead => owner::toggle(ctx, owner::Toggle::AutoRead).await,
        CommandId::AutoReact => owner::toggle(ctx, owner::Toggle::AutoReact).await,
        CommandId::AutoStatus => owner::toggle(ctx, owner::Toggle::AutoStatus).await,
        CommandId::StatusReact => owner::toggle(ctx, owner::Toggle::StatusReact).await,
        CommandId::AddStatus => owner::add_status(ctx).await,
        CommandId::DelStatus => owner::del_status(ctx).await,
        CommandId::ListStatus => owner::list_status(ctx).await,
        CommandId::ReadAllStatus => owner::read_all_status(ctx).await,
        CommandId::SaveStatus => owner::save_status(ctx).await,
        CommandId::AntiDelete => owner::anti_delete(ctx).await,
        CommandId::SetPrefix => owner::set_prefix(ctx).await,
        CommandId::Mode => security::mode(ctx).await,
        CommandId::Guard(feature) => security::guard(ctx, feature).await,
        CommandId::Warnings => security::warnings(ctx).await,
        CommandId::Kick => group::change_member(ctx, group::MemberChange::Kick).await,
        CommandId::Promote => group::change_member(ctx, group::MemberChange::Promote).await,
        CommandId::Demote => group::change_member(ctx, group::MemberChange::Demote).await,
        CommandId::Add => group::add(ctx).await,
        CommandId::TagAll => group::tag_all(ctx).await,
        CommandId::HideTag => group::hide_tag(ctx).await,
        CommandId::Group => group::group(ctx).await,
        CommandId::Delete => group::delete(ctx).await,
        CommandId::Movie => media::movie(ctx).await,
    }
}

/// Target of a member command: the argument at `index` if it holds digits,
/// otherwise the author of the quoted message.
pub(crate) fn target(ctx: &CommandContext, index: usize) -> Option<Identity> {
    ctx.arg(index)
        .and_then(Identity::from_phone_input)
        .or_else(|| {
            ctx.message
                .content
                .quoted()
                .and_then(|q| q.participant.clone())
        })
}

/// `on`/`off` (and a few synonyms) as a bool.
pub(crate) fn parse_switch(word: &str) -> Option<bool> {
    match word.to_lowercase().as_str() {
        "on" | "enable" | "true" | "1" => Some(true),
        "off" | "disable" | "false" | "0" => Some(false),
        _ => None,
    }
}

pub(crate) fn on_off(value: bool) -> &'static str {
    if value {
        "ON 🟢"
    } else {
        "OFF 🔴"
    }
}
