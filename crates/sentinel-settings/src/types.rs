use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sentinel_core::config::DEFAULT_PREFIX;
use sentinel_core::types::{ChatId, Identity, TenantId};

/// Who may run commands in a group chat. Owners and one-to-one chats are
/// never restricted by the mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    #[default]
    Public,
    /// Only the owner; the moderation engine is inert.
    Private,
    /// Only group administrators (and the owner).
    #[serde(alias = "admin-only", alias = "admin_only")]
    Admin,
}

impl ChatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatMode::Public => "public",
            ChatMode::Private => "private",
            ChatMode::Admin => "admin",
        }
    }
}

impl fmt::Display for ChatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChatMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "public" => Ok(ChatMode::Public),
            "private" => Ok(ChatMode::Private),
            "admin" | "admin-only" | "adminonly" => Ok(ChatMode::Admin),
            other => Err(format!("unknown mode: {other}")),
        }
    }
}

/// What happens to a rule-violating message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementAction {
    #[default]
    Delete,
    DeleteKick,
    DeleteWarn,
}

impl EnforcementAction {
    /// Map a wizard choice (`1`, `2`, `3`) to an action.
    pub fn from_choice(choice: &str) -> Option<Self> {
        match choice.trim() {
            "1" => Some(EnforcementAction::Delete),
            "2" => Some(EnforcementAction::DeleteKick),
            "3" => Some(EnforcementAction::DeleteWarn),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EnforcementAction::Delete => "Delete",
            EnforcementAction::DeleteKick => "Delete+Kick",
            EnforcementAction::DeleteWarn => "Delete+Warn",
        }
    }

    /// Wording used on the wizard's menu and confirmation cards.
    pub fn describe(&self) -> &'static str {
        match self {
            EnforcementAction::Delete => "Delete Only",
            EnforcementAction::DeleteKick => "Delete + Kick",
            EnforcementAction::DeleteWarn => "Delete + Warn",
        }
    }
}

/// A moderated content category. `ALL` is the evaluation priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feature {
    Link,
    Image,
    Video,
    Sticker,
}

impl Feature {
    pub const ALL: [Feature; 4] = [Feature::Link, Feature::Image, Feature::Video, Feature::Sticker];

    /// Card title, e.g. `ANTILINK`.
    pub fn title(&self) -> &'static str {
        match self {
            Feature::Link => "ANTILINK",
            Feature::Image => "ANTIPIC",
            Feature::Video => "ANTIVIDEO",
            Feature::Sticker => "ANTISTICKER",
        }
    }

    /// Reason line shown on the deletion card.
    pub fn reason(&self) -> &'static str {
        match self {
            Feature::Link => "Link detected",
            Feature::Image => "Image not allowed",
            Feature::Video => "Video not allowed",
            Feature::Sticker => "Sticker not allowed",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub action: EnforcementAction,
}

/// Per-(tenant, chat) behavior and moderation configuration.
///
/// `Default` is the safe first-access record: public mode, every rule off
/// with action `delete`, admins exempt, no overrides, no warnings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSettings {
    #[serde(default)]
    pub mode: ChatMode,
    /// Overrides the tenant prefix in this chat.
    #[serde(default)]
    pub prefix: Option<String>,
    /// Group admins bypass every moderation rule.
    #[serde(default = "bool_true")]
    pub allow_admins: bool,
    #[serde(default)]
    pub antilink: Rule,
    #[serde(default)]
    pub antipic: Rule,
    #[serde(default)]
    pub antivideo: Rule,
    #[serde(default)]
    pub antisticker: Rule,
    #[serde(default)]
    pub auto_read: Option<bool>,
    #[serde(default)]
    pub auto_react: Option<bool>,
    /// Violation counters, keyed by offender.
    #[serde(default)]
    pub warnings: BTreeMap<Identity, u32>,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            mode: ChatMode::Public,
            prefix: None,
            allow_admins: true,
            antilink: Rule::default(),
            antipic: Rule::default(),
            antivideo: Rule::default(),
            antisticker: Rule::default(),
            auto_read: None,
            auto_react: None,
            warnings: BTreeMap::new(),
        }
    }
}

impl ChatSettings {
    pub fn rule(&self, feature: Feature) -> &Rule {
        match feature {
            Feature::Link => &self.antilink,
            Feature::Image => &self.antipic,
            Feature::Video => &self.antivideo,
            Feature::Sticker => &self.antisticker,
        }
    }

    pub fn rule_mut(&mut self, feature: Feature) -> &mut Rule {
        match feature {
            Feature::Link => &mut self.antilink,
            Feature::Image => &mut self.antipic,
            Feature::Video => &mut self.antivideo,
            Feature::Sticker => &mut self.antisticker,
        }
    }

    pub fn warning_count(&self, who: &Identity) -> u32 {
        self.warnings.get(who).copied().unwrap_or(0)
    }

    /// Increment `who`'s counter and return the new value.
    pub fn record_violation(&mut self, who: &Identity) -> u32 {
        let count = self.warnings.entry(who.clone()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn clear_warnings(&mut self, who: &Identity) {
        self.warnings.remove(who);
    }

    pub fn effective_auto_read(&self, tenant: &TenantSettings) -> bool {
        self.auto_read.unwrap_or(tenant.auto_read)
    }

    pub fn effective_auto_react(&self, tenant: &TenantSettings) -> bool {
        self.auto_react.unwrap_or(tenant.auto_react)
    }
}

/// Per-tenant global toggles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantSettings {
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default)]
    pub always_online: bool,
    #[serde(default)]
    pub auto_read: bool,
    #[serde(default)]
    pub auto_react: bool,
    /// Mark status-broadcast posts as viewed.
    #[serde(default)]
    pub auto_status: bool,
    /// React to viewed status posts.
    #[serde(default)]
    pub status_react: bool,
    /// When non-empty, only these identities' statuses are viewed.
    #[serde(default)]
    pub status_targets: Vec<Identity>,
    /// Repost one-to-one messages the sender deletes for everyone.
    #[serde(default)]
    pub anti_delete: bool,
    /// Where reposted messages go; the tenant's own chat when unset.
    #[serde(default)]
    pub anti_delete_chat: Option<ChatId>,
}

impl TenantSettings {
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    pub fn watches_status_of(&self, who: &Identity) -> bool {
        self.status_targets.is_empty() || self.status_targets.contains(who)
    }

    /// Chat that receives reposted deletions for `tenant`.
    pub fn dump_chat(&self, tenant: &TenantId) -> ChatId {
        self.anti_delete_chat
            .clone()
            .unwrap_or_else(|| tenant.own_chat())
    }
}

impl Default for TenantSettings {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            always_online: false,
            auto_read: false,
            auto_react: false,
            auto_status: false,
            status_react: false,
            status_targets: Vec::new(),
            anti_delete: false,
            anti_delete_chat: None,
        }
    }
}

fn bool_true() -> bool {
    true
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_safe() {
        let s = ChatSettings::default();
        assert_eq!(s.mode, ChatMode::Public);
        assert!(s.allow_admins);
        assert!(Feature::ALL.iter().all(|f| !s.rule(*f).enabled));
        assert_eq!(s.antilink.action, EnforcementAction::Delete);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let s: ChatSettings =
            serde_json::from_str(r#"{"antilink": {"enabled": true}}"#).expect("decode");
        assert!(s.antilink.enabled);
        assert_eq!(s.antilink.action, EnforcementAction::Delete);
        assert!(s.allow_admins);
        assert_eq!(s.mode, ChatMode::Public);
    }

    #[test]
    fn warnings_serialize_as_string_keyed_map() {
        let mut s = ChatSettings::default();
        let who = Identity::from("15550002222@s.whatsapp.net");
        assert_eq!(s.record_violation(&who), 1);
        assert_eq!(s.record_violation(&who), 2);
        let json = serde_json::to_value(&s).expect("encode");
        assert_eq!(json["warnings"]["15550002222"], 2);
        let back: ChatSettings = serde_json::from_value(json).expect("decode");
        assert_eq!(back.warning_count(&who), 2);
    }

    #[test]
    fn mode_parsing_accepts_aliases() {
        assert_eq!("ADMIN".parse::<ChatMode>(), Ok(ChatMode::Admin));
        assert_eq!("admin-only".parse::<ChatMode>(), Ok(ChatMode::Admin));
        assert!("nobody".parse::<ChatMode>().is_err());
        let m: ChatMode = serde_json::from_str("\"admin-only\"").expect("alias");
        assert_eq!(m, ChatMode::Admin);
    }

    #[test]
    fn wizard_choices_map_to_actions() {
        assert_eq!(EnforcementAction::from_choice("1"), Some(EnforcementAction::Delete));
        assert_eq!(EnforcementAction::from_choice(" 3 "), Some(EnforcementAction::DeleteWarn));
        assert_eq!(EnforcementAction::from_choice("4"), None);
    }

    #[test]
    fn chat_overrides_win_over_tenant() {
        let tenant = TenantSettings {
            auto_read: true,
            ..TenantSettings::default()
        };
        let mut chat = ChatSettings::default();
        assert!(chat.effective_auto_read(&tenant));
        chat.auto_read = Some(false);
        assert!(!chat.effective_auto_read(&tenant));
        assert!(!chat.effective_auto_react(&tenant));
        chat.auto_react = Some(true);
        assert!(chat.effective_auto_react(&tenant));
    }

    #[test]
    fn status_targets_filter() {
        let mut t = TenantSettings::default();
        let a = Identity::from("1");
        assert!(t.watches_status_of(&a));
        t.status_targets.push(Identity::from("2"));
        assert!(!t.watches_status_of(&a));
    }

    #[test]
    fn anti_delete_defaults_to_own_chat() {
        let tenant = TenantId::from("15550001111");
        let old: TenantSettings = serde_json::from_str(r#"{"prefix":"!"}"#).expect("decode");
        assert!(!old.anti_delete);
        assert_eq!(old.dump_chat(&tenant), ChatId::from("15550001111@s.whatsapp.net"));

        let moved = TenantSettings {
            anti_delete: true,
            anti_delete_chat: Some(ChatId::from("120363@g.us")),
            ..TenantSettings::default()
        };
        assert_eq!(moved.dump_chat(&tenant), ChatId::from("120363@g.us"));
    }
}
