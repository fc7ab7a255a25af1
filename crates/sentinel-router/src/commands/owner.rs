use sentinel_core::types::{ChatId, Identity, MessageId, STATUS_BROADCAST_CHAT};
use sentinel_platform::card::Card;
use sentinel_platform::{relay, Presence};
use tracing::{debug, info, warn};

use super::{on_off, parse_switch};
use crate::context::CommandContext;
use crate::error::{CommandError, Result};

const MAX_PREFIX_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    AlwaysOnline,
    AutoRead,
    AutoReact,
    AutoStatus,
    StatusReact,
}

impl Toggle {
    fn label(&self) -> &'static str {
        match self {
            Toggle::AlwaysOnline => "AlwaysOnline",
            Toggle::AutoRead => "AutoRead",
            Toggle::AutoReact => "AutoReact",
            Toggle::AutoStatus => "AutoStatus",
            Toggle::StatusReact => "StatusReact",
        }
    }

    /// Whether a per-chat override exists for this toggle.
    fn has_chat_override(&self) -> bool {
        matches!(self, Toggle::AutoRead | Toggle::AutoReact)
    }
}

/// `<toggle> [on|off] [here]`: no value flips the current state; `here`
/// writes the chat override instead of the tenant default.
pub async fn toggle(ctx: &CommandContext, which: Toggle) -> Result<()> {
    let mut value = None;
    let mut here = false;
    for word in ctx.args() {
        if word.eq_ignore_ascii_case("here") && which.has_chat_override() {
            here = true;
        } else if let Some(v) = parse_switch(word) {
            value = Some(v);
        } else {
            return Err(ctx.usage());
        }
    }

    let tenant = &ctx.caller.tenant;
    let settings = &ctx.services.settings;
    let now = if here {
        let defaults = settings.tenant(tenant);
        settings.update(tenant, ctx.chat(), |s| {
            let (slot, inherited) = match which {
                Toggle::AutoRead => (&mut s.auto_read, defaults.auto_read),
                _ => (&mut s.auto_react, defaults.auto_react),
            };
            let next = value.unwrap_or(!slot.unwrap_or(inherited));
            *slot = Some(next);
            next
        })
    } else {
        settings.update_tenant(tenant, |t| {
            let slot = match which {
                Toggle::AlwaysOnline => &mut t.always_online,
                Toggle::AutoRead => &mut t.auto_read,
                Toggle::AutoReact => &mut t.auto_react,
                Toggle::AutoStatus => &mut t.auto_status,
                Toggle::StatusReact => &mut t.status_react,
            };
            *slot = value.unwrap_or(!*slot);
            *slot
        })
    };
    info!(tenant = %tenant, chat = %ctx.chat(), toggle = which.label(), enabled = now, here, "setting changed");

    if which == Toggle::AlwaysOnline {
        let presence = if now {
            Presence::Available
        } else {
            Presence::Unavailable
        };
        if let Err(e) = ctx.client.set_presence(presence).await {
            warn!(tenant = %tenant, error = %e, "presence update failed");
        }
    }

    let scope = if here { " in this chat" } else { "" };
    ctx.reply(Card::new("SETTINGS").line(format!("{} is now {}{}", which.label(), on_off(now), scope)))
        .await;
    Ok(())
}

pub async fn add_status(ctx: &CommandContext) -> Result<()> {
    let who = ctx
        .arg(0)
        .and_then(Identity::from_phone_input)
        .ok_or_else(|| ctx.usage())?;
    let added = ctx.services.settings.update_tenant(&ctx.caller.tenant, |t| {
        if t.status_targets.contains(&who) {
            false
        } else {
            t.status_targets.push(who.clone());
            true
        }
    });
    let line = if added {
        format!("✅ Added {}", who)
    } else {
        format!("ℹ️ {} is already a target", who)
    };
    ctx.reply(Card::new("STATUS TARGETS").line(line)).await;
    Ok(())
}

pub async fn del_status(ctx: &CommandContext) -> Result<()> {
    let who = ctx
        .arg(0)
        .and_then(Identity::from_phone_input)
        .ok_or_else(|| ctx.usage())?;
    let removed = ctx.services.settings.update_tenant(&ctx.caller.tenant, |t| {
        let before = t.status_targets.len();
        t.status_targets.retain(|id| id != &who);
        before != t.status_targets.len()
    });
    let line = if removed {
        format!("🗑️ Removed {}", who)
    } else {
        format!("⚠️ {} was not a target", who)
    };
    ctx.reply(Card::new("STATUS TARGETS").line(line)).await;
    Ok(())
}

pub async fn list_status(ctx: &CommandContext) -> Result<()> {
    let targets = ctx.services.settings.tenant(&ctx.caller.tenant).status_targets;
    let mut card = Card::new("STATUS TARGETS");
    if targets.is_empty() {
        card = card.line("All contacts (no filter)");
    } else {
        for (i, who) in targets.iter().enumerate() {
            card = card.line(format!("{}. {}", i + 1, who));
        }
    }
    ctx.reply(card).await;
    Ok(())
}

/// Mark every cached status post as read.
pub async fn read_all_status(ctx: &CommandContext) -> Result<()> {
    let grouped = ctx.services.sessions.recent().all_statuses(&ctx.caller.tenant);
    let broadcast = ChatId::from(STATUS_BROADCAST_CHAT);
    let mut read = 0;
    for (poster, posts) in &grouped {
        let ids: Vec<MessageId> = posts.iter().map(|p| p.id.clone()).collect();
        match ctx.client.mark_read(&broadcast, poster, &ids).await {
            Ok(()) => read += ids.len(),
            Err(e) => warn!(tenant = %ctx.caller.tenant, poster = %poster, error = %e, "status read failed"),
        }
    }
    info!(tenant = %ctx.caller.tenant, read, posters = grouped.len(), "statuses marked read");
    ctx.reply(
        Card::new("STATUSES READ")
            .line(format!("✅ {} statuses from {} contacts marked read", read, grouped.len())),
    )
    .await;
    Ok(())
}

/// `status <copy|all> <number>`: repost the latest (or every) cached status
/// post of a contact into this chat.
pub async fn save_status(ctx: &CommandContext) -> Result<()> {
    let args = ctx.args();
    let [mode, number] = args.as_slice() else {
        return Err(ctx.usage());
    };
    let all = match mode.to_lowercase().as_str() {
        "copy" => false,
        "all" => true,
        _ => return Err(ctx.usage()),
    };
    let who = Identity::from_phone_input(number).ok_or_else(|| ctx.usage())?;

    let mut posts = ctx.services.sessions.recent().statuses(&ctx.caller.tenant, &who);
    if posts.is_empty() {
        ctx.reply(Card::new("STATUS SAVER").line(format!("⚠️ No status found for {}", who)))
            .await;
        return Ok(());
    }
    if all {
        ctx.reply(Card::new("STATUS SAVER").line(format!("📂 Sending {} statuses...", posts.len())))
            .await;
    } else {
        posts = posts.split_off(posts.len() - 1);
    }

    let mut sent = 0;
    for post in &posts {
        match relay::repost(ctx.client(), ctx.chat(), post).await? {
            Some(_) => sent += 1,
            None => debug!(poster = %who, message = %post.id, kind = post.content.label(), "status not copyable"),
        }
    }
    if sent == 0 {
        ctx.reply(Card::new("STATUS SAVER").line("⚠️ Nothing in those statuses could be copied"))
            .await;
    }
    Ok(())
}

/// `antidelete <on|off|set>`; `set` makes the current group the dump chat
/// and switches the feature on.
pub async fn anti_delete(ctx: &CommandContext) -> Result<()> {
    let word = ctx.arg(0).ok_or_else(|| ctx.usage())?;
    let tenant = &ctx.caller.tenant;
    let settings = &ctx.services.settings;

    let line = if word.eq_ignore_ascii_case("set") {
        if !ctx.caller.is_group {
            return Err(CommandError::unavailable("Use antidelete set inside a group"));
        }
        let chat = ctx.chat().clone();
        settings.update_tenant(tenant, |t| {
            t.anti_delete = true;
            t.anti_delete_chat = Some(chat);
        });
        "✅ Deleted messages will be reposted here".to_string()
    } else {
        let enabled = parse_switch(word).ok_or_else(|| ctx.usage())?;
        settings.update_tenant(tenant, |t| t.anti_delete = enabled);
        format!("AntiDelete is now {}", on_off(enabled))
    };
    info!(tenant = %tenant, chat = %ctx.chat(), arg = %word, "anti-delete changed");

    ctx.reply(Card::new("ANTIDELETE").line(line)).await;
    Ok(())
}

/// `setprefix <p> [here]`.
pub async fn set_prefix(ctx: &CommandContext) -> Result<()> {
    let args = ctx.args();
    let (prefix, here) = match args.as_slice() {
        [p] => (*p, false),
        [p, h] if h.eq_ignore_ascii_case("here") => (*p, true),
        _ => return Err(ctx.usage()),
    };
    if prefix.chars().count() > MAX_PREFIX_LEN {
        return Err(ctx.usage());
    }

    let tenant = &ctx.caller.tenant;
    if here {
        ctx.services
            .settings
            .update(tenant, ctx.chat(), |s| s.prefix = Some(prefix.to_string()));
    } else {
        ctx.services
            .settings
            .update_tenant(tenant, |t| t.prefix = prefix.to_string());
    }
    info!(tenant = %tenant, chat = %ctx.chat(), prefix = %prefix, here, "prefix changed");

    let scope = if here { " in this chat" } else { "" };
    ctx.reply(Card::new("SETTINGS").line(format!("Prefix is now {}{}", prefix, scope)))
        .await;
    Ok(())
}
