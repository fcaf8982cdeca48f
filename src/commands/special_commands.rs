//! Special commands parser for interactive chat mode
//!
//! This module parses the commands that can be entered during an
//! interactive chat session instead of a question. Special commands allow
//! users to:
//! - Switch the subject questions are asked about
//! - List the subjects available on the server
//! - Review, copy, or clear the conversation
//! - Display help information
//! - Exit the session
//!
//! Commands are prefixed with `/`. Command names are case-insensitive;
//! arguments such as subject names are kept as typed.

use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command was given an unsupported argument
    #[error("Unsupported argument for {command}: {arg}\n\nType '/help' to see valid usage")]
    UnsupportedArgument { command: String, arg: String },

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// Special commands that can be executed during interactive chat
///
/// These commands change the session or show information, rather than
/// being sent to the knowledge service as a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Ask future questions about another subject
    SelectSubject(String),

    /// Refresh and show the subjects known to the server
    ListSubjects,

    /// Show the numbered conversation history
    History,

    /// Print the raw text of history entry `n` (1-based)
    Copy(usize),

    /// Clear the conversation history
    Clear,

    /// Display help information
    Help,

    /// Exit the interactive session
    Exit,

    /// Not a special command; send the input as a question
    None,
}

/// Parse user input into a special command
///
/// Supported commands:
/// - `/subject <name>` - Ask about `<name>` from now on
/// - `/subjects` - List subjects
/// - `/history` - Show the conversation
/// - `/copy <n>` - Print message `n` as plain text
/// - `/clear` - Clear the conversation
/// - `/help` or `/?` - Show help information
/// - `/exit`, `/quit`, `exit` or `quit` - Exit the session
///
/// # Examples
///
/// ```
/// use notemind::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// let cmd = parse_special_command("/subject Organic Chemistry").unwrap();
/// assert_eq!(cmd, SpecialCommand::SelectSubject("Organic Chemistry".to_string()));
///
/// let cmd = parse_special_command("/copy 2").unwrap();
/// assert_eq!(cmd, SpecialCommand::Copy(2));
///
/// let cmd = parse_special_command("what is entropy?").unwrap();
/// assert_eq!(cmd, SpecialCommand::None);
///
/// // Invalid command returns error
/// assert!(parse_special_command("/foo").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    // If input doesn't start with "/", it's not a command (except exit/quit)
    if !trimmed.starts_with('/') {
        return match lower.as_str() {
            "exit" | "quit" => Ok(SpecialCommand::Exit),
            _ => Ok(SpecialCommand::None),
        };
    }

    let (name, arg) = match trimmed.split_once(char::is_whitespace) {
        Some((name, arg)) => (name.to_lowercase(), arg.trim()),
        None => (lower.clone(), ""),
    };

    match name.as_str() {
        "/subject" | "/topic" => {
            if arg.is_empty() {
                Err(CommandError::MissingArgument {
                    command: name.clone(),
                    usage: format!("{} <name>", name),
                })
            } else {
                Ok(SpecialCommand::SelectSubject(arg.to_string()))
            }
        }

        "/copy" => {
            if arg.is_empty() {
                return Err(CommandError::MissingArgument {
                    command: "/copy".to_string(),
                    usage: "/copy <message number>".to_string(),
                });
            }
            match arg.parse::<usize>() {
                Ok(n) if n > 0 => Ok(SpecialCommand::Copy(n)),
                _ => Err(CommandError::UnsupportedArgument {
                    command: "/copy".to_string(),
                    arg: arg.to_string(),
                }),
            }
        }

        // Commands that take no argument
        "/subjects" | "/history" | "/clear" | "/help" | "/?" | "/exit" | "/quit"
            if !arg.is_empty() =>
        {
            Err(CommandError::UnsupportedArgument {
                command: name.clone(),
                arg: arg.to_string(),
            })
        }
        "/subjects" => Ok(SpecialCommand::ListSubjects),
        "/history" => Ok(SpecialCommand::History),
        "/clear" => Ok(SpecialCommand::Clear),
        "/help" | "/?" => Ok(SpecialCommand::Help),
        "/exit" | "/quit" => Ok(SpecialCommand::Exit),

        // Unknown command starting with "/"
        _ => Err(CommandError::UnknownCommand(name.clone())),
    }
}

/// Display help text for special commands
pub fn print_help() {
    println!(
        r#"
Special Commands for Interactive Chat Mode
===========================================

SUBJECTS:
  /subject <name> - Ask questions about <name> (history is kept)
  /topic <name>   - Same as /subject
  /subjects       - List subjects available on the server

CONVERSATION:
  /history        - Show the numbered conversation
  /copy <n>       - Print message <n> as plain text
  /clear          - Clear the conversation history

SESSION CONTROL:
  /help           - Show this help message
  /?              - Same as /help
  exit            - Exit interactive mode
  quit            - Same as exit

NOTES:
  - Command names are case-insensitive; subject names are not
  - Regular text (not starting with /) is sent as a question
  - Only one question can be in flight at a time
"#
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_select_subject() {
        let cmd = parse_special_command("/subject Physics").unwrap();
        assert_eq!(cmd, SpecialCommand::SelectSubject("Physics".to_string()));
    }

    #[test]
    fn test_parse_select_subject_keeps_case_and_spaces() {
        let cmd = parse_special_command("/SUBJECT   Organic Chemistry  ").unwrap();
        assert_eq!(
            cmd,
            SpecialCommand::SelectSubject("Organic Chemistry".to_string())
        );
    }

    #[test]
    fn test_parse_topic_alias() {
        let cmd = parse_special_command("/topic Math").unwrap();
        assert_eq!(cmd, SpecialCommand::SelectSubject("Math".to_string()));
    }

    #[test]
    fn test_parse_subject_without_name() {
        let err = parse_special_command("/subject").unwrap_err();
        assert_eq!(
            err,
            CommandError::MissingArgument {
                command: "/subject".to_string(),
                usage: "/subject <name>".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_list_subjects() {
        let cmd = parse_special_command("/subjects").unwrap();
        assert_eq!(cmd, SpecialCommand::ListSubjects);
    }

    #[test]
    fn test_parse_history() {
        let cmd = parse_special_command("/history").unwrap();
        assert_eq!(cmd, SpecialCommand::History);
    }

    #[test]
    fn test_parse_copy() {
        let cmd = parse_special_command("/copy 3").unwrap();
        assert_eq!(cmd, SpecialCommand::Copy(3));
    }

    #[test]
    fn test_parse_copy_invalid_number() {
        assert!(matches!(
            parse_special_command("/copy zero"),
            Err(CommandError::UnsupportedArgument { .. })
        ));
        assert!(matches!(
            parse_special_command("/copy 0"),
            Err(CommandError::UnsupportedArgument { .. })
        ));
        assert!(matches!(
            parse_special_command("/copy"),
            Err(CommandError::MissingArgument { .. })
        ));
    }

    #[test]
    fn test_parse_clear() {
        let cmd = parse_special_command("/clear").unwrap();
        assert_eq!(cmd, SpecialCommand::Clear);
    }

    #[test]
    fn test_parse_clear_with_argument() {
        let err = parse_special_command("/clear all").unwrap_err();
        assert_eq!(
            err,
            CommandError::UnsupportedArgument {
                command: "/clear".to_string(),
                arg: "all".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_help() {
        let cmd = parse_special_command("/help").unwrap();
        assert_eq!(cmd, SpecialCommand::Help);
    }

    #[test]
    fn test_parse_help_shorthand() {
        let cmd = parse_special_command("/?").unwrap();
        assert_eq!(cmd, SpecialCommand::Help);
    }

    #[test]
    fn test_parse_exit() {
        let cmd = parse_special_command("exit").unwrap();
        assert_eq!(cmd, SpecialCommand::Exit);
    }

    #[test]
    fn test_parse_exit_with_slash() {
        let cmd = parse_special_command("/exit").unwrap();
        assert_eq!(cmd, SpecialCommand::Exit);
    }

    #[test]
    fn test_parse_quit() {
        let cmd = parse_special_command("QUIT").unwrap();
        assert_eq!(cmd, SpecialCommand::Exit);
    }

    #[test]
    fn test_parse_regular_text_returns_none() {
        let cmd = parse_special_command("what is the second law?").unwrap();
        assert_eq!(cmd, SpecialCommand::None);
    }

    #[test]
    fn test_parse_text_mentioning_exit_returns_none() {
        let cmd = parse_special_command("exit velocity of a rocket").unwrap();
        assert_eq!(cmd, SpecialCommand::None);
    }

    #[test]
    fn test_parse_empty_string_returns_none() {
        let cmd = parse_special_command("").unwrap();
        assert_eq!(cmd, SpecialCommand::None);
    }

    #[test]
    fn test_parse_whitespace_only_returns_none() {
        let cmd = parse_special_command("   ").unwrap();
        assert_eq!(cmd, SpecialCommand::None);
    }

    #[test]
    fn test_parse_unknown_command() {
        let err = parse_special_command("/mode write").unwrap_err();
        assert_eq!(err, CommandError::UnknownCommand("/mode".to_string()));
    }

    #[test]
    fn test_command_error_messages() {
        let err = CommandError::UnknownCommand("/foo".to_string());
        assert!(err.to_string().contains("/help"));

        let err = CommandError::MissingArgument {
            command: "/copy".to_string(),
            usage: "/copy <message number>".to_string(),
        };
        assert!(err.to_string().contains("Usage: /copy <message number>"));
    }
}
