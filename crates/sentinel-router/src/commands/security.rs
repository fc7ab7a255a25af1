use sentinel_moderation::WARN_LIMIT;
use sentinel_platform::card::Card;
use sentinel_settings::{ChatMode, Feature};
use tracing::info;

use super::{parse_switch, target};
use crate::context::CommandContext;
use crate::error::Result;

/// `mode <public|private|admin>`.
pub async fn mode(ctx: &CommandContext) -> Result<()> {
    let mode: ChatMode = ctx
        .arg(0)
        .and_then(|m| m.parse().ok())
        .ok_or_else(|| ctx.usage())?;
    ctx.services
        .settings
        .update(&ctx.caller.tenant, ctx.chat(), |s| s.mode = mode);
    info!(tenant = %ctx.caller.tenant, chat = %ctx.chat(), mode = %mode, "chat mode changed");
    ctx.reply(Card::new("SETTINGS").line(format!("🛡️ Mode: {}", mode.as_str().to_uppercase())))
        .await;
    Ok(())
}

/// `antilink|antipic|antivideo|antisticker [on|off]`. No argument starts the
/// setup wizard.
pub async fn guard(ctx: &CommandContext, feature: Feature) -> Result<()> {
    let Some(word) = ctx.arg(0) else {
        ctx.services
            .wizard
            .start(ctx.client(), &ctx.caller, feature, &ctx.message.id)
            .await;
        return Ok(());
    };
    let enabled = parse_switch(word).ok_or_else(|| ctx.usage())?;

    let action = ctx.services.settings.update(&ctx.caller.tenant, ctx.chat(), |s| {
        let rule = s.rule_mut(feature);
        rule.enabled = enabled;
        rule.action
    });
    info!(tenant = %ctx.caller.tenant, chat = %ctx.chat(), feature = ?feature, enabled, "rule toggled");

    let card = if enabled {
        Card::new(format!("✅ {} ENABLED", feature.title()))
            .line(format!("Action: {}", action.describe()))
    } else {
        Card::new(format!("❌ {} DISABLED", feature.title()))
    };
    ctx.reply(card).await;
    Ok(())
}

/// `warnings` lists counters; `warnings reset [number]` clears one or all.
pub async fn warnings(ctx: &CommandContext) -> Result<()> {
    let tenant = &ctx.caller.tenant;
    match ctx.arg(0) {
        None => {
            let counters = ctx.services.settings.get(tenant, ctx.chat()).warnings;
            let mut card = Card::new("⚠️ WARNINGS");
            if counters.is_empty() {
                card = card.line("No warnings recorded");
            }
            for (who, count) in &counters {
                card = card
                    .line(format!("@{}: {}/{}", who, count, WARN_LIMIT))
                    .mention(who);
            }
            ctx.reply(card).await;
        }
        Some(word) if word.eq_ignore_ascii_case("reset") => {
            let line = match target(ctx, 1) {
                Some(who) => {
                    ctx.services
                        .settings
                        .update(tenant, ctx.chat(), |s| s.clear_warnings(&who));
                    format!("Warnings cleared for {}", who)
                }
                None => {
                    ctx.services
                        .settings
                        .update(tenant, ctx.chat(), |s| s.warnings.clear());
                    "All warnings cleared".to_string()
                }
            };
            ctx.reply(Card::new("⚠️ WARNINGS").line(line)).await;
        }
        Some(_) => return Err(ctx.usage()),
    }
    Ok(())
}
