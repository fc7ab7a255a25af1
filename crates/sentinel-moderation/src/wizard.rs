use std::sync::Arc;

use sentinel_core::types::MessageId;
use sentinel_platform::card::Card;
use sentinel_platform::PlatformClient;
use sentinel_sessions::{SessionKey, SessionManager, SetupSession, WizardStage};
use sentinel_settings::{EnforcementAction, Feature, SettingsStore};
use sentinel_users::Caller;
use tracing::{debug, info, warn};

/// Result of offering a message to the wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardReply {
    /// The sender has no wizard in this chat; route the message normally.
    NotInWizard,
    /// Unexpected token; the stage card was sent again.
    Reprompted(WizardStage),
    /// Stage 1 answered; admin bypass recorded.
    Advanced { allow_admins: bool },
    /// Stage 2 answered; rule enabled and session closed.
    Completed {
        feature: Feature,
        action: EnforcementAction,
    },
}

/// Two-stage rule configuration: admin bypass, then enforcement action.
///
/// Permission to start is enforced by the command router. Once started, any
/// reply from the same identity in the same chat is accepted.
pub struct Wizard {
    sessions: Arc<SessionManager>,
    settings: Arc<SettingsStore>,
}

impl Wizard {
    pub fn new(sessions: Arc<SessionManager>, settings: Arc<SettingsStore>) -> Self {
        Self { sessions, settings }
    }

    fn key(caller: &Caller) -> SessionKey {
        SessionKey::new(caller.tenant.clone(), caller.sender.clone())
    }

    /// Open a wizard for `feature` and send the stage-1 card.
    pub async fn start(
        &self,
        client: &dyn PlatformClient,
        caller: &Caller,
        feature: Feature,
        quoted: &MessageId,
    ) {
        let session = SetupSession::start(feature, caller.chat.clone());
        self.sessions.start_wizard(Self::key(caller), session);
        info!(tenant = %caller.tenant, chat = %caller.chat, sender = %caller.sender, feature = ?feature, "wizard started");
        stage_card(feature, WizardStage::AdminBypass)
            .reply(client, &caller.chat, quoted)
            .await;
    }

    /// Feed one text reply to the caller's wizard, if any.
    pub async fn handle_reply(
        &self,
        client: &dyn PlatformClient,
        caller: &Caller,
        text: &str,
        message: &MessageId,
    ) -> WizardReply {
        let key = Self::key(caller);
        let Some(session) = self.sessions.wizard(&key, &caller.chat) else {
            return WizardReply::NotInWizard;
        };

        let choice = text.trim();
        match session.stage {
            WizardStage::AdminBypass => {
                let allow_admins = match choice {
                    "1" => true,
                    "2" => false,
                    _ => return self.reprompt(client, caller, &session, message).await,
                };
                self.settings
                    .update(&caller.tenant, &caller.chat, |s| s.allow_admins = allow_admins);
                if let Err(e) = self.sessions.advance_wizard(&key, WizardStage::Action) {
                    // Expired between lookup and advance; the bypass choice stays.
                    warn!(key = %key, error = %e, "wizard vanished before stage 2");
                    return WizardReply::NotInWizard;
                }
                stage_card(session.feature, WizardStage::Action)
                    .reply(client, &caller.chat, message)
                    .await;
                WizardReply::Advanced { allow_admins }
            }
            WizardStage::Action => {
                let Some(action) = EnforcementAction::from_choice(choice) else {
                    return self.reprompt(client, caller, &session, message).await;
                };
                let feature = session.feature;
                self.settings.update(&caller.tenant, &caller.chat, |s| {
                    let rule = s.rule_mut(feature);
                    rule.action = action;
                    rule.enabled = true;
                });
                self.sessions.finish_wizard(&key);
                info!(tenant = %caller.tenant, chat = %caller.chat, feature = ?feature, action = action.label(), "wizard completed");
                Card::new(format!("✅ {} ENABLED", feature.title()))
                    .line(format!("Action: {}", action.describe()))
                    .reply(client, &caller.chat, message)
                    .await;
                WizardReply::Completed { feature, action }
            }
        }
    }

    async fn reprompt(
        &self,
        client: &dyn PlatformClient,
        caller: &Caller,
        session: &SetupSession,
        message: &MessageId,
    ) -> WizardReply {
        debug!(tenant = %caller.tenant, sender = %caller.sender, stage = session.stage.number(), "invalid wizard reply");
        stage_card(session.feature, session.stage)
            .reply(client, &caller.chat, message)
            .await;
        WizardReply::Reprompted(session.stage)
    }
}

fn stage_card(feature: Feature, stage: WizardStage) -> Card {
    match stage {
        WizardStage::AdminBypass => Card::new(format!("🛡️ {} (1/2)", feature.title()))
            .line("Allow Admins?")
            .line("1️⃣ YES | 2️⃣ NO"),
        WizardStage::Action => Card::new(format!("⚡ {} (2/2)", feature.title()))
            .line(format!("1️⃣ {}", EnforcementAction::Delete.describe().to_uppercase()))
            .line(format!("2️⃣ {}", EnforcementAction::DeleteKick.describe().to_uppercase()))
            .line(format!("3️⃣ {}", EnforcementAction::DeleteWarn.describe().to_uppercase())),
    }
}
