//! Chat command parsing.

/// A chat line addressed to the bot, e.g. `!tts george hello there`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatCommand {
    pub name: String,           // Lower-cased command name without the prefix
    pub arguments: Vec<String>, // Whitespace-separated words after the name
}

/// Parse a chat line into a command.
///
/// # Returns
/// `None` if the line does not start with `prefix` or has no command name.
pub fn parse_command(line: &str, prefix: &str) -> Option<ChatCommand> {
    let rest = line.trim_start().strip_prefix(prefix)?;
    let mut words = rest.split_whitespace();

    // The name must follow the prefix directly ("! tts" is not a command)
    if rest.starts_with(char::is_whitespace) {
        return None;
    }

    let name = words.next()?.to_lowercase();
    Some(ChatCommand { name, arguments: words.map(str::to_string).collect() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tts_command() {
        let command = parse_command("!tts george  hello   there", "!").unwrap();
        assert_eq!(command.name, "tts");
        assert_eq!(command.arguments, vec!["george", "hello", "there"]);
    }

    #[test]
    fn test_command_name_ignores_case() {
        assert_eq!(parse_command("!TTS hi", "!").unwrap().name, "tts");
    }

    #[test]
    fn test_plain_messages_are_not_commands() {
        assert!(parse_command("hello !tts", "!").is_none());
        assert!(parse_command("! tts hi", "!").is_none());
        assert!(parse_command("!", "!").is_none());
        assert!(parse_command("", "!").is_none());
    }

    #[test]
    fn test_command_without_arguments() {
        let command = parse_command("!tts", "!").unwrap();
        assert!(command.arguments.is_empty());
    }

    #[test]
    fn test_custom_prefix() {
        assert_eq!(parse_command("~~tts dump hi", "~~").unwrap().arguments, vec!["dump", "hi"]);
        assert!(parse_command("!tts dump hi", "~~").is_none());
    }
}
