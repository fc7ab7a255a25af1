use std::collections::HashMap;

use sentinel_settings::Feature;
use sentinel_users::Requirement;

/// Logical command, independent of the name or alias used to invoke it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandId {
    Menu,
    Ping,
    Id,
    Owner,
    AlwaysOnline,
    AutoRead,
    AutoReact,
    AutoStatus,
    StatusReact,
    AddStatus,
    DelStatus,
    ListStatus,
    ReadAllStatus,
    SaveStatus,
    AntiDelete,
    SetPrefix,
    Mode,
    Guard(Feature),
    Warnings,
    Kick,
    Promote,
    Demote,
    Add,
    TagAll,
    HideTag,
    Group,
    Delete,
    Movie,
}

/// Section a command is listed under on the menu card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    General,
    Group,
    Security,
    Settings,
    Media,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::General,
        Category::Group,
        Category::Security,
        Category::Settings,
        Category::Media,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Category::General => "GENERAL",
            Category::Group => "GROUP",
            Category::Security => "SECURITY",
            Category::Settings => "SETTINGS",
            Category::Media => "MEDIA",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub id: CommandId,
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub requirement: Requirement,
    pub group_only: bool,
    /// Runs on the worker pool instead of inline.
    pub heavy: bool,
    pub category: Category,
    /// Argument synopsis shown on usage cards.
    pub usage: &'static str,
}

const fn spec(
    id: CommandId,
    name: &'static str,
    requirement: Requirement,
    group_only: bool,
    category: Category,
    usage: &'static str,
) -> CommandSpec {
    CommandSpec {
        id,
        name,
        aliases: &[],
        requirement,
        group_only,
        heavy: false,
        category,
        usage,
    }
}

const fn aliased(mut s: CommandSpec, aliases: &'static [&'static str]) -> CommandSpec {
    s.aliases = aliases;
    s
}

const fn heavy(mut s: CommandSpec) -> CommandSpec {
    s.heavy = true;
    s
}

use Category as C;
use CommandId as Id;
use Requirement::{Admin, Anyone, Owner};

/// Every built-in command, in menu order.
pub const COMMANDS: &[CommandSpec] = &[
    aliased(spec(Id::Menu, "menu", Anyone, false, C::General, ""), &["help", "list"]),
    spec(Id::Ping, "ping", Anyone, false, C::General, ""),
    spec(Id::Id, "id", Anyone, false, C::General, ""),
    spec(Id::Owner, "owner", Anyone, false, C::General, ""),
    spec(Id::Kick, "kick", Admin, true, C::Group, "<number> (or reply to a message)"),
    spec(Id::Add, "add", Admin, true, C::Group, "<number>"),
    spec(Id::Promote, "promote", Admin, true, C::Group, "<number> (or reply to a message)"),
    spec(Id::Demote, "demote", Admin, true, C::Group, "<number> (or reply to a message)"),
    spec(Id::TagAll, "tagall", Admin, true, C::Group, "[text]"),
    spec(Id::HideTag, "hidetag", Admin, true, C::Group, "[text]"),
    spec(Id::Group, "group", Admin, true, C::Group, "<open|close|link>"),
    aliased(
        spec(Id::Delete, "del", Admin, true, C::Group, "(reply to a message)"),
        &["delete"],
    ),
    spec(Id::Mode, "mode", Admin, true, C::Security, "<public|private|admin>"),
    spec(Id::Guard(Feature::Link), "antilink", Admin, true, C::Security, "[on|off]"),
    spec(Id::Guard(Feature::Image), "antipic", Admin, true, C::Security, "[on|off]"),
    spec(Id::Guard(Feature::Video), "antivideo", Admin, true, C::Security, "[on|off]"),
    spec(Id::Guard(Feature::Sticker), "antisticker", Admin, true, C::Security, "[on|off]"),
    spec(Id::Warnings, "warnings", Admin, true, C::Security, "[reset [number]]"),
    spec(Id::AlwaysOnline, "alwaysonline", Owner, false, C::Settings, "[on|off]"),
    spec(Id::AutoRead, "autoread", Owner, false, C::Settings, "[on|off] [here]"),
    spec(Id::AutoReact, "autoreact", Owner, false, C::Settings, "[on|off] [here]"),
    spec(Id::AutoStatus, "autostatus", Owner, false, C::Settings, "[on|off]"),
    spec(Id::StatusReact, "statusreact", Owner, false, C::Settings, "[on|off]"),
    spec(Id::AddStatus, "addstatus", Owner, false, C::Settings, "<number>"),
    spec(Id::DelStatus, "delstatus", Owner, false, C::Settings, "<number>"),
    spec(Id::ListStatus, "liststatus", Owner, false, C::Settings, ""),
    spec(Id::ReadAllStatus, "readallstatus", Owner, false, C::Settings, ""),
    aliased(
        spec(Id::SaveStatus, "status", Owner, false, C::Settings, "<copy|all> <number>"),
        &["savestatus"],
    ),
    spec(Id::AntiDelete, "antidelete", Owner, false, C::Settings, "<on|off|set>"),
    spec(Id::SetPrefix, "setprefix", Owner, false, C::Settings, "<prefix> [here]"),
    aliased(
        heavy(spec(Id::Movie, "movie", Anyone, false, C::Media, "<title>")),
        &["archive"],
    ),
];

/// The table entry for `id`.
pub fn spec_of(id: CommandId) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|s| s.id == id)
}

/// Name and alias lookup over [`COMMANDS`].
pub struct CommandTable {
    by_name: HashMap<&'static str, &'static CommandSpec>,
}

impl CommandTable {
    pub fn builtin() -> Self {
        let mut by_name = HashMap::new();
        for spec in COMMANDS {
            by_name.insert(spec.name, spec);
            for alias in spec.aliases {
                by_name.insert(*alias, spec);
            }
        }
        Self { by_name }
    }

    /// Look up a lowercased command name or alias.
    pub fn lookup(&self, name: &str) -> Option<&'static CommandSpec> {
        self.by_name.get(name).copied()
    }

    /// Number of invocable names, aliases included.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn aliases_resolve_to_one_spec() {
        let table = CommandTable::builtin();
        assert_eq!(table.lookup("help").unwrap().id, CommandId::Menu);
        assert_eq!(table.lookup("list").unwrap().id, CommandId::Menu);
        assert_eq!(table.lookup("delete").unwrap().id, CommandId::Delete);
        assert_eq!(table.lookup("archive").unwrap().id, CommandId::Movie);
        assert!(table.lookup("nonexistent").is_none());
    }

    #[test]
    fn names_are_unique() {
        let mut seen = HashSet::new();
        for spec in COMMANDS {
            for name in std::iter::once(&spec.name).chain(spec.aliases) {
                assert!(seen.insert(*name), "duplicate command name {name}");
            }
        }
        assert_eq!(CommandTable::builtin().len(), seen.len());
    }

    #[test]
    fn requirements_match_roles() {
        let table = CommandTable::builtin();
        let kick = table.lookup("kick").unwrap();
        assert_eq!(kick.requirement, Requirement::Admin);
        assert!(kick.group_only);
        assert_eq!(table.lookup("setprefix").unwrap().requirement, Requirement::Owner);
        let movie = table.lookup("movie").unwrap();
        assert!(movie.heavy);
        assert_eq!(movie.requirement, Requirement::Anyone);
        assert_eq!(
            table.lookup("antisticker").unwrap().id,
            CommandId::Guard(Feature::Sticker)
        );
        assert_eq!(table.lookup("savestatus").unwrap().id, CommandId::SaveStatus);
        assert_eq!(table.lookup("antidelete").unwrap().requirement, Requirement::Owner);
    }

    #[test]
    fn every_id_has_a_spec() {
        assert_eq!(spec_of(CommandId::Ping).unwrap().name, "ping");
        assert_eq!(spec_of(CommandId::Guard(Feature::Video)).unwrap().name, "antivideo");
        assert_eq!(spec_of(CommandId::ReadAllStatus).unwrap().requirement, Requirement::Owner);
    }
}
