//! Parsing of slash commands from message text

/// Commands understood by the bot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    /// Raw text after `/ask`, untrimmed
    Ask(String),
}

/// Names and localization keys for the command menu
pub const COMMAND_MENU: &[(&str, &str)] = &[
    ("start", "command-start"),
    ("help", "command-help"),
    ("ask", "command-ask"),
];

/// Parse `/command[@bot_username] [args]`
///
/// Returns `None` for plain text, unknown commands, and commands addressed
/// to a different bot.
pub fn parse_command(text: &str, bot_username: Option<&str>) -> Option<Command> {
    let rest = text.trim_start().strip_prefix('/')?;
    let (head, args) = match rest.find(char::is_whitespace) {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, ""),
    };

    let (name, mention) = match head.split_once('@') {
        Some((name, mention)) => (name, Some(mention)),
        None => (head, None),
    };
    if let (Some(mention), Some(username)) = (mention, bot_username) {
        if !mention.eq_ignore_ascii_case(username) {
            return None;
        }
    }

    match name.to_ascii_lowercase().as_str() {
        "start" => Some(Command::Start),
        "help" => Some(Command::Help),
        "ask" => Some(Command::Ask(args.to_string())),
        _ => None,
    }
}
