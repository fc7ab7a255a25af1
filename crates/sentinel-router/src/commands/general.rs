use std::time::Duration;

use chrono::Utc;
use sentinel_platform::card::Card;

use crate::context::CommandContext;
use crate::error::Result;
use crate::table::{Category, COMMANDS};

pub async fn menu(ctx: &CommandContext) -> Result<()> {
    ctx.react("📜").await;
    let services = &ctx.services;
    let mode = if ctx.caller.is_group {
        services
            .settings
            .get(&ctx.caller.tenant, ctx.chat())
            .mode
            .as_str()
            .to_uppercase()
    } else {
        "PRIVATE CHAT".to_string()
    };

    let mut card = Card::new(&services.bot.name)
        .line(format!("👑 Owner: {}", services.bot.owner_name))
        .line(format!("🛡️ Mode: {}", mode))
        .line(format!("🔣 Prefix: {}", ctx.prefix))
        .line(format!("⏳ Uptime: {}", format_uptime(services.started.elapsed())));

    for category in Category::ALL {
        let names: Vec<String> = COMMANDS
            .iter()
            .filter(|c| c.category == category)
            .filter(|c| services.catalog.is_some() || c.category != Category::Media)
            .map(|c| format!("{}{}", ctx.prefix, c.name))
            .collect();
        if names.is_empty() {
            continue;
        }
        card = card.blank().line(format!("〔 {} 〕", category.title()));
        for pair in names.chunks(2) {
            card = card.line(format!("🔸 {}", pair.join(" | ")));
        }
    }

    ctx.reply(card).await;
    Ok(())
}

pub async fn ping(ctx: &CommandContext) -> Result<()> {
    ctx.react("⚡").await;
    let latency_ms = (Utc::now() - ctx.message.timestamp).num_milliseconds().max(0);
    ctx.reply(
        Card::new("STATUS")
            .line(format!("👑 Owner: {}", ctx.services.bot.owner_name))
            .line(format!("⚡ Latency: {} MS", latency_ms))
            .line(format!("⏱ Uptime: {}", format_uptime(ctx.services.started.elapsed()))),
    )
    .await;
    Ok(())
}

pub async fn id(ctx: &CommandContext) -> Result<()> {
    ctx.reply(
        Card::new("ID INFO")
            .line(format!("👤 User: {}", ctx.caller.sender))
            .line(format!("👥 Chat: {}", ctx.chat().short())),
    )
    .await;
    Ok(())
}

pub async fn owner(ctx: &CommandContext) -> Result<()> {
    let status = if ctx.caller.is_owner {
        "👑 Access Granted (OWNER)"
    } else {
        "❌ Access Denied"
    };
    ctx.reply(
        Card::new("OWNER VERIFICATION")
            .line(format!("🤖 Bot: {}", ctx.caller.tenant))
            .line(format!("👤 User: {}", ctx.caller.sender))
            .blank()
            .line(status),
    )
    .await;
    Ok(())
}

/// `1d 2h 3m 4s`, dropping leading zero units.
pub fn format_uptime(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let (days, hours, mins, secs) = (secs / 86_400, secs / 3600 % 24, secs / 60 % 60, secs % 60);
    if days > 0 {
        format!("{}d {}h {}m {}s", days, hours, mins, secs)
    } else if hours > 0 {
        format!("{}h {}m {}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}
