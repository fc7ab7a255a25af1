//! End-to-end pipeline scenarios against recording clients.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use sentinel_core::config::BotConfig;
use sentinel_core::types::{ChatId, Identity, MessageId, TenantId};
use sentinel_core::WorkerPool;
use sentinel_dispatch::{Connectivity, Disposition, Dispatcher, StatusAction, AUTO_REACTION};
use sentinel_moderation::{ModerationEngine, Wizard, WizardReply};
use sentinel_platform::error::Result as PlatformResult;
use sentinel_platform::recording::{Action, RecordingClient};
use sentinel_platform::registry::Backoff;
use sentinel_platform::{
    ConnectionEvent, ConnectionState, ConnectionStatus, GroupEvent, GroupInfo, InboundEvent, MediaKind,
    MessageContent, MessageEvent, OutboundMedia, OutboundText, Participant, ParticipantChange,
    PlatformClient, Presence, TenantRegistry, UploadedMedia,
};
use sentinel_router::{CommandId, CommandRouter, RouteOutcome, Services};
use sentinel_sessions::{MenuKind, MenuOption, PendingSelection, SessionKey, SessionManager, WizardStage};
use sentinel_settings::{ChatMode, EnforcementAction, Feature, MemoryBackend, SettingsStore};
use sentinel_users::{DenialReason, Resolver};

const TENANT: &str = "15550001111";
const OTHER_TENANT: &str = "15550004444";
const ADMIN: &str = "15550002222";
const MEMBER: &str = "15550003333";
const GROUP: &str = "120363@g.us";

static NEXT_ID: AtomicUsize = AtomicUsize::new(1);

struct Harness {
    dispatcher: Arc<Dispatcher>,
    client: Arc<RecordingClient>,
    other: Arc<RecordingClient>,
    settings: Arc<SettingsStore>,
    sessions: Arc<SessionManager>,
}

fn harness() -> Harness {
    let settings = Arc::new(SettingsStore::new(Arc::new(MemoryBackend::new()), "."));
    let sessions = Arc::new(SessionManager::new(Duration::from_secs(600)));
    let resolver = Arc::new(Resolver::new(settings.clone(), Duration::from_secs(1)));
    let services = Arc::new(Services {
        settings: settings.clone(),
        sessions: sessions.clone(),
        resolver: resolver.clone(),
        wizard: Arc::new(Wizard::new(sessions.clone(), settings.clone())),
        workers: WorkerPool::new(4),
        catalog: None,
        catalog_rows: 10,
        bot: BotConfig::default(),
        started: Instant::now(),
        max_media_bytes: 1024,
    });

    let participants = vec![Participant::admin(ADMIN), Participant::member(MEMBER)];
    let client = Arc::new(RecordingClient::new(TENANT).with_participants(participants.clone()));
    let other = Arc::new(RecordingClient::new(OTHER_TENANT).with_participants(participants));
    let registry = Arc::new(TenantRegistry::new());
    registry.register(client.clone() as Arc<dyn PlatformClient>);
    registry.register(other.clone() as Arc<dyn PlatformClient>);

    let backoff = Backoff {
        base: Duration::from_millis(1),
        max: Duration::from_millis(4),
        attempts: 3,
    };
    let dispatcher = Arc::new(Dispatcher::new(
        registry.clone(),
        Arc::new(CommandRouter::new(services)),
        Arc::new(ModerationEngine::new(settings.clone(), resolver)),
        Arc::new(Connectivity::new(registry, settings.clone(), backoff)),
    ));
    Harness {
        dispatcher,
        client,
        other,
        settings,
        sessions,
    }
}

fn message(chat: &str, sender: &str, body: &str) -> MessageEvent {
    let chat = ChatId::from(chat);
    MessageEvent {
        id: MessageId(format!("E{}", NEXT_ID.fetch_add(1, Ordering::SeqCst))),
        is_group: chat.is_group(),
        chat,
        sender: Identity::from(sender),
        from_me: false,
        timestamp: Utc::now(),
        push_name: None,
        content: MessageContent::Text { text: body.into() },
        media: None,
    }
}

fn in_group(sender: &str, body: &str) -> InboundEvent {
    InboundEvent::Message(message(GROUP, sender, body))
}

fn tenant() -> TenantId {
    TenantId::from(TENANT)
}

fn group() -> ChatId {
    ChatId::from(GROUP)
}

async fn eventually(cond: impl Fn() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met within 2s");
}

// ── Permissions ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn private_mode_answers_only_the_owner() {
    let h = harness();
    h.settings.update(&tenant(), &group(), |s| s.mode = ChatMode::Private);

    let d = h.dispatcher.handle(&tenant(), in_group(MEMBER, ".ping")).await;
    assert_eq!(d, Disposition::Command(RouteOutcome::Denied(DenialReason::PrivateMode)));
    assert!(h.client.texts().is_empty());

    let d = h.dispatcher.handle(&tenant(), in_group(TENANT, ".ping")).await;
    assert_eq!(d, Disposition::Command(RouteOutcome::Completed(CommandId::Ping)));
    assert!(h.client.sent_text_containing("STATUS"));
}

#[tokio::test]
async fn unknown_commands_stay_silent() {
    let h = harness();
    let dm = InboundEvent::Message(message(&format!("{}@s.whatsapp.net", MEMBER), MEMBER, ".frobnicate"));
    assert_eq!(h.dispatcher.handle(&tenant(), dm).await, Disposition::Ignored);
    assert!(h.client.actions().is_empty());
}

// ── Rule wizard and enforcement ─────────────────────────────────────────────

#[tokio::test]
async fn antilink_wizard_then_kick() {
    let h = harness();
    let d = h.dispatcher.handle(&tenant(), in_group(ADMIN, ".antilink")).await;
    assert_eq!(
        d,
        Disposition::Command(RouteOutcome::Completed(CommandId::Guard(Feature::Link)))
    );
    assert!(h.client.sent_text_containing("Allow Admins?"));

    let d = h.dispatcher.handle(&tenant(), in_group(ADMIN, "2")).await;
    assert_eq!(d, Disposition::Wizard(WizardReply::Advanced { allow_admins: false }));

    let d = h.dispatcher.handle(&tenant(), in_group(ADMIN, "maybe")).await;
    assert_eq!(d, Disposition::Wizard(WizardReply::Reprompted(WizardStage::Action)));

    let d = h.dispatcher.handle(&tenant(), in_group(ADMIN, "2")).await;
    assert_eq!(
        d,
        Disposition::Wizard(WizardReply::Completed {
            feature: Feature::Link,
            action: EnforcementAction::DeleteKick,
        })
    );
    assert_eq!(h.sessions.counts(), (0, 0));

    let d = h
        .dispatcher
        .handle(&tenant(), in_group(MEMBER, "free stuff https://spam.example"))
        .await;
    assert_eq!(d, Disposition::Moderating);
    eventually(|| {
        h.client
            .participant_updates()
            .contains(&(vec![Identity::from(MEMBER)], ParticipantChange::Remove))
    })
    .await;
    assert_eq!(h.client.revokes().len(), 1);
}

#[tokio::test]
async fn warnings_escalate_to_kick_and_reset() {
    let h = harness();
    h.settings.update(&tenant(), &group(), |s| {
        s.antilink.enabled = true;
        s.antilink.action = EnforcementAction::DeleteWarn;
    });

    for n in 1..=2 {
        h.dispatcher
            .handle(&tenant(), in_group(MEMBER, "see www.spam.example"))
            .await;
        let expected = format!("Count: {}/3", n);
        eventually(|| h.client.sent_text_containing(&expected)).await;
    }
    assert!(h.client.participant_updates().is_empty());

    h.dispatcher
        .handle(&tenant(), in_group(MEMBER, "see www.spam.example"))
        .await;
    eventually(|| h.client.sent_text_containing("Kicked Out")).await;
    assert_eq!(h.client.participant_updates().len(), 1);
    assert_eq!(h.client.revokes().len(), 3);
    let warnings = h.settings.get(&tenant(), &group()).warnings;
    assert!(!warnings.contains_key(&Identity::from(MEMBER)));
}

#[tokio::test]
async fn failed_delete_is_reported() {
    let h = harness();
    h.client.fail_revoke(true);
    h.settings.update(&tenant(), &group(), |s| s.antilink.enabled = true);

    h.dispatcher
        .handle(&tenant(), in_group(MEMBER, "https://spam.example"))
        .await;
    eventually(|| h.client.sent_text_containing("DELETE FAILED")).await;
    assert!(h.client.participant_updates().is_empty());
}

#[tokio::test]
async fn own_messages_skip_moderation_but_run_commands() {
    let h = harness();
    h.settings.update(&tenant(), &group(), |s| s.antilink.enabled = true);

    let mut msg = message(GROUP, TENANT, "https://my.link");
    msg.from_me = true;
    let d = h.dispatcher.handle(&tenant(), InboundEvent::Message(msg)).await;
    assert_eq!(d, Disposition::Ignored);

    let mut msg = message(GROUP, TENANT, ".ping");
    msg.from_me = true;
    let d = h.dispatcher.handle(&tenant(), InboundEvent::Message(msg)).await;
    assert_eq!(d, Disposition::Command(RouteOutcome::Completed(CommandId::Ping)));

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(h.client.revokes().is_empty());
}

#[tokio::test]
async fn open_and_denied_commands_are_still_moderated() {
    let h = harness();
    h.settings.update(&tenant(), &group(), |s| s.antilink.enabled = true);

    let d = h
        .dispatcher
        .handle(&tenant(), in_group(MEMBER, ".ping https://t.me/spam"))
        .await;
    assert_eq!(d, Disposition::Command(RouteOutcome::Completed(CommandId::Ping)));
    eventually(|| h.client.revokes().len() == 1).await;

    let d = h
        .dispatcher
        .handle(&tenant(), in_group(MEMBER, ".kick https://t.me/spam"))
        .await;
    assert_eq!(d, Disposition::Command(RouteOutcome::Denied(DenialReason::AdminRequired)));
    eventually(|| h.client.revokes().len() == 2).await;
}

#[tokio::test]
async fn admin_commands_are_not_moderated() {
    let h = harness();
    h.settings.update(&tenant(), &group(), |s| {
        s.antilink.enabled = true;
        s.allow_admins = false;
    });

    let d = h
        .dispatcher
        .handle(&tenant(), in_group(ADMIN, ".tagall join https://chat.example/x"))
        .await;
    assert_eq!(d, Disposition::Command(RouteOutcome::Completed(CommandId::TagAll)));
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(h.client.revokes().is_empty());

    h.dispatcher
        .handle(&tenant(), in_group(ADMIN, "plain https://chat.example/x"))
        .await;
    eventually(|| h.client.revokes().len() == 1).await;
}

#[tokio::test]
async fn concurrent_toggles_all_land() {
    let h = harness();
    let commands = [".antilink on", ".antipic on", ".antivideo on", ".antisticker on"];
    let handles: Vec<_> = commands
        .iter()
        .map(|c| h.dispatcher.dispatch(tenant(), in_group(ADMIN, c)))
        .collect();
    for handle in handles {
        handle.await.expect("event task");
    }

    let s = h.settings.get(&tenant(), &group());
    for feature in Feature::ALL {
        assert!(s.rule(feature).enabled, "{:?} not enabled", feature);
    }
}

// ── Sessions ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn menus_belong_to_their_tenant() {
    let h = harness();
    let menu = PendingSelection {
        kind: MenuKind::Search,
        tenant: tenant(),
        chat: group(),
        options: vec![MenuOption::new("Night of the Living Dead", "night_1968")],
        context: None,
    };
    h.sessions
        .open_menu(SessionKey::new(tenant(), Identity::from(MEMBER)), menu)
        .expect("open menu");

    let other = TenantId::from(OTHER_TENANT);
    let d = h.dispatcher.handle(&other, in_group(MEMBER, "1")).await;
    assert_ne!(d, Disposition::Menu);
    assert_eq!(h.sessions.counts().1, 1);

    let d = h.dispatcher.handle(&tenant(), in_group(MEMBER, "1")).await;
    assert_eq!(d, Disposition::Menu);
    assert_eq!(h.sessions.counts().1, 0);
    // The catalog is disabled, so the follow-up answers with an error card.
    eventually(|| h.client.sent_text_containing("Archive search is disabled.")).await;
    assert!(h.other.texts().is_empty());
}

// ── Auto actions ────────────────────────────────────────────────────────────

#[tokio::test]
async fn auto_read_and_react() {
    let h = harness();
    h.settings.update_tenant(&tenant(), |t| {
        t.auto_read = true;
        t.auto_react = true;
    });
    let dm = InboundEvent::Message(message(&format!("{}@s.whatsapp.net", MEMBER), MEMBER, "hello"));
    assert_eq!(h.dispatcher.handle(&tenant(), dm).await, Disposition::Ignored);

    let actions = h.client.actions();
    assert!(matches!(actions[0], Action::Read { .. }));
    assert_eq!(h.client.reactions(), vec![AUTO_REACTION.to_string()]);
}

#[tokio::test]
async fn status_posts_are_viewed() {
    let h = harness();
    h.settings.update_tenant(&tenant(), |t| t.auto_status = true);
    let mut post = message("status@broadcast", MEMBER, "");
    post.content = MessageContent::Image { caption: None };

    let d = h.dispatcher.handle(&tenant(), InboundEvent::Message(post)).await;
    assert_eq!(d, Disposition::Status(StatusAction::Viewed));
    assert!(h.client.reactions().is_empty());
}

#[tokio::test]
async fn status_posts_are_kept_for_the_saver() {
    let h = harness();
    let post = message("status@broadcast", MEMBER, "sunset");
    h.dispatcher.handle(&tenant(), InboundEvent::Message(post)).await;
    assert_eq!(
        h.sessions.recent().statuses(&tenant(), &Identity::from(MEMBER)).len(),
        1
    );

    let own = format!("{}@s.whatsapp.net", TENANT);
    let d = h
        .dispatcher
        .handle(&tenant(), InboundEvent::Message(message(&own, TENANT, &format!(".status copy {}", MEMBER))))
        .await;
    assert_eq!(d, Disposition::Command(RouteOutcome::Completed(CommandId::SaveStatus)));
    assert!(h.client.texts().contains(&"sunset".to_string()));
}

// ── Anti-delete ─────────────────────────────────────────────────────────────

fn revoke_of(sender: &str, target: &MessageId) -> InboundEvent {
    let mut notice = message(&format!("{}@s.whatsapp.net", sender), sender, "");
    notice.content = MessageContent::Revoke {
        target: target.clone(),
    };
    InboundEvent::Message(notice)
}

#[tokio::test]
async fn deleted_direct_message_is_reposted_once() {
    let h = harness();
    h.settings.update_tenant(&tenant(), |t| t.anti_delete = true);
    let original = message(&format!("{}@s.whatsapp.net", MEMBER), MEMBER, "secret plan");
    let id = original.id.clone();
    let d = h.dispatcher.handle(&tenant(), InboundEvent::Message(original)).await;
    assert_eq!(d, Disposition::Ignored);

    let d = h.dispatcher.handle(&tenant(), revoke_of(MEMBER, &id)).await;
    assert_eq!(d, Disposition::AntiDelete(true));
    let own = ChatId::from(format!("{}@s.whatsapp.net", TENANT).as_str());
    let sent: Vec<_> = h
        .client
        .actions()
        .into_iter()
        .filter_map(|a| match a {
            Action::Text { chat, msg } => Some((chat, msg.text)),
            _ => None,
        })
        .collect();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0], (own.clone(), "secret plan".to_string()));
    assert_eq!(sent[1].0, own);
    assert!(sent[1].1.contains("ANTIDELETE ALERT"));

    let d = h.dispatcher.handle(&tenant(), revoke_of(MEMBER, &id)).await;
    assert_eq!(d, Disposition::AntiDelete(false));
}

#[tokio::test]
async fn anti_delete_off_or_foreign_notice_restores_nothing() {
    let h = harness();
    let first = message(&format!("{}@s.whatsapp.net", MEMBER), MEMBER, "one");
    let first_id = first.id.clone();
    h.dispatcher.handle(&tenant(), InboundEvent::Message(first)).await;
    let d = h.dispatcher.handle(&tenant(), revoke_of(MEMBER, &first_id)).await;
    assert_eq!(d, Disposition::AntiDelete(false));

    h.settings.update_tenant(&tenant(), |t| t.anti_delete = true);
    let second = message(&format!("{}@s.whatsapp.net", MEMBER), MEMBER, "two");
    let second_id = second.id.clone();
    h.dispatcher.handle(&tenant(), InboundEvent::Message(second)).await;
    let d = h.dispatcher.handle(&tenant(), revoke_of(ADMIN, &second_id)).await;
    assert_eq!(d, Disposition::AntiDelete(false));

    let mut group_notice = message(GROUP, MEMBER, "");
    group_notice.content = MessageContent::Revoke { target: second_id };
    let d = h.dispatcher.handle(&tenant(), InboundEvent::Message(group_notice)).await;
    assert_eq!(d, Disposition::Ignored);
    assert!(h.client.texts().is_empty());
}

// ── Group and connection events ─────────────────────────────────────────────

#[tokio::test]
async fn membership_changes_are_announced() {
    let h = harness();
    let event = InboundEvent::Group(GroupEvent {
        chat: group(),
        actor: Some(Identity::from(ADMIN)),
        joined: vec![Identity::from("15550005555")],
        left: vec![Identity::from(MEMBER)],
        promoted: Vec::new(),
        demoted: Vec::new(),
    });
    assert_eq!(h.dispatcher.handle(&tenant(), event).await, Disposition::Group(2));
    assert!(h.client.sent_text_containing("MEMBER KICKED"));
    assert!(h.client.sent_text_containing("JOINED"));
}

#[tokio::test]
async fn logout_drops_the_tenant() {
    let h = harness();
    let event = InboundEvent::Connection(ConnectionEvent {
        state: ConnectionState::LoggedOut,
    });
    assert_eq!(h.dispatcher.handle(&tenant(), event).await, Disposition::Connection);
    assert!(h.dispatcher.registry().get(&tenant()).is_none());

    let d = h.dispatcher.handle(&tenant(), in_group(ADMIN, ".ping")).await;
    assert_eq!(d, Disposition::NoClient);
}

// ── Fault isolation ─────────────────────────────────────────────────────────

struct ExplodingClient(TenantId);

#[async_trait]
impl PlatformClient for ExplodingClient {
    fn tenant(&self) -> &TenantId {
        &self.0
    }
    async fn connect(&self) -> PlatformResult<()> {
        panic!("connect exploded")
    }
    async fn send_text(&self, _: &ChatId, _: &OutboundText) -> PlatformResult<MessageId> {
        panic!("send exploded")
    }
    async fn upload(&self, _: Vec<u8>, _: MediaKind) -> PlatformResult<UploadedMedia> {
        panic!("upload exploded")
    }
    async fn send_media(&self, _: &ChatId, _: &OutboundMedia) -> PlatformResult<MessageId> {
        panic!("send exploded")
    }
    async fn react(&self, _: &ChatId, _: &MessageId, _: &str) -> PlatformResult<()> {
        panic!("react exploded")
    }
    async fn revoke(&self, _: &ChatId, _: &Identity, _: &MessageId) -> PlatformResult<()> {
        panic!("revoke exploded")
    }
    async fn update_participants(
        &self,
        _: &ChatId,
        _: &[Identity],
        _: ParticipantChange,
    ) -> PlatformResult<()> {
        panic!("participants exploded")
    }
    async fn mark_read(&self, _: &ChatId, _: &Identity, _: &[MessageId]) -> PlatformResult<()> {
        panic!("read exploded")
    }
    async fn group_info(&self, _: &ChatId) -> PlatformResult<GroupInfo> {
        panic!("group info exploded")
    }
    async fn set_announce(&self, _: &ChatId, _: bool) -> PlatformResult<()> {
        panic!("announce exploded")
    }
    async fn invite_link(&self, _: &ChatId) -> PlatformResult<String> {
        panic!("invite exploded")
    }
    async fn set_presence(&self, _: Presence) -> PlatformResult<()> {
        panic!("presence exploded")
    }
}

#[tokio::test]
async fn a_panicking_event_does_not_take_down_others() {
    let h = harness();
    let broken = TenantId::from("15550008888");
    h.dispatcher
        .registry()
        .register(Arc::new(ExplodingClient(broken.clone())));

    let task = h.dispatcher.dispatch(broken, in_group(ADMIN, ".ping"));
    assert!(task.await.is_ok());

    let task = h.dispatcher.dispatch(tenant(), in_group(ADMIN, ".ping"));
    task.await.expect("event task");
    assert!(h.client.sent_text_containing("STATUS"));
}

#[tokio::test]
async fn a_panicking_connect_frees_the_reconnect_slot() {
    let h = harness();
    let broken = TenantId::from("15550008888");
    h.dispatcher
        .registry()
        .register(Arc::new(ExplodingClient(broken.clone())));
    let connectivity = h.dispatcher.connectivity();

    let first = connectivity.spawn_connect(broken.clone()).expect("first connect");
    assert!(first.await.is_ok());
    assert!(matches!(
        h.dispatcher.registry().status(&broken),
        Some(ConnectionStatus::Error(_))
    ));

    let again = connectivity.spawn_connect(broken).expect("slot freed after the panic");
    assert!(again.await.is_ok());
}
