/// A prefixed message split into a command name and its raw arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Lowercased first token after the prefix.
    pub name: String,
    /// Everything after the name, trimmed. Inner spacing is preserved so
    /// free-text commands (`tagall`, `movie`) see what the user typed.
    pub raw_args: String,
}

impl ParsedCommand {
    pub fn args(&self) -> Vec<&str> {
        self.raw_args.split_whitespace().collect()
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.raw_args.split_whitespace().nth(index)
    }
}

/// Parse `text` as a command under `prefix`.
///
/// Returns `None` when the text does not start with the prefix or nothing
/// follows it.
pub fn parse(text: &str, prefix: &str) -> Option<ParsedCommand> {
    if prefix.is_empty() {
        return None;
    }
    let rest = text.trim_start().strip_prefix(prefix)?.trim();
    let (name, raw_args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };
    if name.is_empty() {
        return None;
    }
    Some(ParsedCommand {
        name: name.to_lowercase(),
        raw_args: raw_args.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_name_and_args() {
        let cmd = parse(".Kick 15550002222", ".").unwrap();
        assert_eq!(cmd.name, "kick");
        assert_eq!(cmd.args(), vec!["15550002222"]);
    }

    #[test]
    fn keeps_free_text_spacing() {
        let cmd = parse("!tagall  meeting at  5 ", "!").unwrap();
        assert_eq!(cmd.raw_args, "meeting at  5");
        assert_eq!(cmd.arg(1), Some("at"));
        assert_eq!(cmd.arg(3), None);
    }

    #[test]
    fn rejects_unprefixed_and_bare_prefix() {
        assert!(parse("kick", ".").is_none());
        assert!(parse(".", ".").is_none());
        assert!(parse(".   ", ".").is_none());
        assert!(parse("hello .kick", ".").is_none());
    }

    #[test]
    fn multi_char_prefix() {
        let cmd = parse("#!ping", "#!").unwrap();
        assert_eq!(cmd.name, "ping");
        assert!(cmd.args().is_empty());
        assert!(parse("#ping", "#!").is_none());
    }
}
