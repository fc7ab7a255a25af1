use sentinel_core::types::Identity;
use sentinel_platform::card::Card;
use sentinel_platform::{OutboundText, ParticipantChange};
use tracing::info;

use super::target;
use crate::context::CommandContext;
use crate::error::{CommandError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberChange {
    Kick,
    Promote,
    Demote,
}

impl MemberChange {
    fn change(&self) -> ParticipantChange {
        match self {
            MemberChange::Kick => ParticipantChange::Remove,
            MemberChange::Promote => ParticipantChange::Promote,
            MemberChange::Demote => ParticipantChange::Demote,
        }
    }

    fn title(&self) -> &'static str {
        match self {
            MemberChange::Kick => "👢 KICKED",
            MemberChange::Promote => "⬆️ PROMOTED",
            MemberChange::Demote => "⬇️ DEMOTED",
        }
    }
}

/// `kick|promote|demote <number>`, or as a reply to the member's message.
pub async fn change_member(ctx: &CommandContext, which: MemberChange) -> Result<()> {
    let who = target(ctx, 0).ok_or_else(|| ctx.usage())?;
    if which == MemberChange::Kick && who.is_owner_of(&ctx.caller.tenant) {
        return Err(CommandError::unavailable("The bot cannot remove itself."));
    }
    ctx.client
        .update_participants(ctx.chat(), std::slice::from_ref(&who), which.change())
        .await?;
    info!(tenant = %ctx.caller.tenant, chat = %ctx.chat(), target = %who, change = ?which, "member updated");
    ctx.reply(
        Card::new(which.title())
            .line(format!("User: @{}", who))
            .line(format!("By: @{}", ctx.caller.sender))
            .mention(&who)
            .mention(&ctx.caller.sender),
    )
    .await;
    Ok(())
}

/// `add <number>`.
pub async fn add(ctx: &CommandContext) -> Result<()> {
    let who = ctx
        .arg(0)
        .and_then(Identity::from_phone_input)
        .ok_or_else(|| ctx.usage())?;
    ctx.client
        .update_participants(ctx.chat(), std::slice::from_ref(&who), ParticipantChange::Add)
        .await?;
    info!(tenant = %ctx.caller.tenant, chat = %ctx.chat(), target = %who, "member added");
    ctx.reply(
        Card::new("✅ MEMBER ADDED")
            .line(format!("👤 Number: {}", who))
            .line("✅ Successfully Added"),
    )
    .await;
    Ok(())
}

/// `tagall [text]`: visible list of every participant.
pub async fn tag_all(ctx: &CommandContext) -> Result<()> {
    let info = ctx.client.group_info(ctx.chat()).await?;
    let mut card = Card::new("📣 TAG ALL");
    if !ctx.command.raw_args.is_empty() {
        card = card.line(format!("💬 {}", ctx.command.raw_args)).blank();
    }
    for p in &info.participants {
        card = card.line(format!("@{}", p.identity)).mention(&p.identity);
    }
    card = card
        .blank()
        .line(format!("👥 Total: {} members", info.participants.len()));
    ctx.reply(card).await;
    Ok(())
}

/// `hidetag [text]`: plain text that silently mentions everyone.
pub async fn hide_tag(ctx: &CommandContext) -> Result<()> {
    let info = ctx.client.group_info(ctx.chat()).await?;
    let text = if ctx.command.raw_args.is_empty() {
        "🔔 Hidden Tag Announcement"
    } else {
        ctx.command.raw_args.as_str()
    };
    let msg = OutboundText::new(text).mentioning(info.participants.into_iter().map(|p| p.identity));
    ctx.client.send_text(ctx.chat(), &msg).await?;
    Ok(())
}

/// `group <open|close|link>`.
pub async fn group(ctx: &CommandContext) -> Result<()> {
    let sub = ctx.arg(0).map(str::to_lowercase).ok_or_else(|| ctx.usage())?;
    let card = match sub.as_str() {
        "close" => {
            ctx.client.set_announce(ctx.chat(), true).await?;
            Card::new("🔒 GROUP CLOSED").line("Only admins can send messages now")
        }
        "open" => {
            ctx.client.set_announce(ctx.chat(), false).await?;
            Card::new("🔓 GROUP OPENED").line("All members can send messages now")
        }
        "link" => {
            let link = ctx.client.invite_link(ctx.chat()).await?;
            Card::new("🔗 GROUP INVITE LINK").line(link)
        }
        _ => return Err(ctx.usage()),
    };
    info!(tenant = %ctx.caller.tenant, chat = %ctx.chat(), action = %sub, "group setting changed");
    ctx.reply(card).await;
    Ok(())
}

/// `del` as a reply: revoke the quoted message for everyone.
pub async fn delete(ctx: &CommandContext) -> Result<()> {
    let quoted = ctx.message.content.quoted().ok_or_else(|| ctx.usage())?;
    // No participant means the quoted message is the bot's own.
    let author = quoted
        .participant
        .clone()
        .unwrap_or_else(|| ctx.caller.tenant.identity());
    ctx.client.revoke(ctx.chat(), &author, &quoted.id).await?;
    info!(tenant = %ctx.caller.tenant, chat = %ctx.chat(), message = %quoted.id, "message revoked on request");
    Ok(())
}
