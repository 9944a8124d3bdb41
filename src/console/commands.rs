//! Console input parsing.

use bytes::Bytes;
use thiserror::Error;

/// A parsed line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Plain text for the current language room.
    Say(String),
    ClanSay(String),
    ChangeLanguage(String),
    Online,
    /// Chat and API connection state.
    Status,
    ServerTime,
    Auth,
    AuthChallenge,
    /// Hand-computed key-exchange reply for the chat server.
    AuthReply(Bytes),
    Help,
    Quit,
}

/// Why a line could not be turned into a command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("/{command} needs {what}")]
    MissingArgument { command: &'static str, what: &'static str },

    #[error("Not a hex string: {0}")]
    InvalidHex(String),

    #[error("Unrecognized command: /{0}")]
    Unknown(String),
}

pub const HELP: &str = "\
Commands:
  <text>            say in the current room
  /clan <text>      say in clan chat
  /change <lang>    switch language room (ru, en, de, fr, pl, ua)
  /online           show the last online-user count
  /status           show chat and game API state
  /time             ask the game API for server time
  /auth             log in to the game API and show its servers
  /challenge        send the game API challenge step
  /authreply <hex>  send a key-exchange reply to the chat server
  /quit, /q         leave";

/// Parse one input line. Blank lines yield `None`.
///
/// Plain text is sent as typed, surrounding spaces included.
pub fn parse_line(line: &str) -> Option<Result<Command, ParseError>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let Some(input) = trimmed.strip_prefix('/') else {
        return Some(Ok(Command::Say(line.to_string())));
    };

    let (name, args) = match input.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (input, ""),
    };

    let command = match name.to_lowercase().as_str() {
        "clan" if args.is_empty() => Err(ParseError::MissingArgument {
            command: "clan",
            what: "a message",
        }),
        "clan" => Ok(Command::ClanSay(args.to_string())),
        "change" if args.is_empty() => Err(ParseError::MissingArgument {
            command: "change",
            what: "a language",
        }),
        "change" => Ok(Command::ChangeLanguage(args.to_lowercase())),
        "online" => Ok(Command::Online),
        "status" => Ok(Command::Status),
        "time" => Ok(Command::ServerTime),
        "auth" => Ok(Command::Auth),
        "challenge" => Ok(Command::AuthChallenge),
        "authreply" if args.is_empty() => Err(ParseError::MissingArgument {
            command: "authreply",
            what: "a hex key",
        }),
        "authreply" => parse_hex(args).map(Command::AuthReply),
        "help" => Ok(Command::Help),
        "quit" | "q" => Ok(Command::Quit),
        other => Err(ParseError::Unknown(other.to_string())),
    };
    Some(command)
}

fn parse_hex(text: &str) -> Result<Bytes, ParseError> {
    let digits: Vec<u8> = text.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    if digits.len() % 2 != 0 || !digits.iter().all(u8::is_ascii_hexdigit) {
        return Err(ParseError::InvalidHex(text.to_string()));
    }

    let nibble = |digit: u8| (digit as char).to_digit(16).unwrap_or_default() as u8;
    Ok(digits
        .chunks(2)
        .map(|pair| nibble(pair[0]) << 4 | nibble(pair[1]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_say() {
        assert_eq!(
            parse_line("  hello there "),
            Some(Ok(Command::Say("  hello there ".to_string())))
        );
    }

    #[test]
    fn test_blank_line() {
        assert_eq!(parse_line("   "), None);
    }

    #[test]
    fn test_commands() {
        assert_eq!(
            parse_line("/clan gg all"),
            Some(Ok(Command::ClanSay("gg all".to_string())))
        );
        assert_eq!(
            parse_line("/CHANGE DE"),
            Some(Ok(Command::ChangeLanguage("de".to_string())))
        );
        assert_eq!(parse_line("/online"), Some(Ok(Command::Online)));
        assert_eq!(parse_line("/time"), Some(Ok(Command::ServerTime)));
        assert_eq!(parse_line("/auth"), Some(Ok(Command::Auth)));
        assert_eq!(parse_line("/status"), Some(Ok(Command::Status)));
        assert_eq!(parse_line("/challenge"), Some(Ok(Command::AuthChallenge)));
        assert_eq!(parse_line("  /online  "), Some(Ok(Command::Online)));
        assert_eq!(parse_line("/q"), Some(Ok(Command::Quit)));
        assert_eq!(parse_line("/quit"), Some(Ok(Command::Quit)));
    }

    #[test]
    fn test_missing_argument() {
        let err = parse_line("/change").unwrap().unwrap_err();
        assert_eq!(err.to_string(), "/change needs a language");
    }

    #[test]
    fn test_auth_reply_hex() {
        assert_eq!(
            parse_line("/authreply DE ad be ef"),
            Some(Ok(Command::AuthReply(Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]))))
        );
        assert_eq!(
            parse_line("/authreply abc"),
            Some(Err(ParseError::InvalidHex("abc".to_string())))
        );
        assert_eq!(
            parse_line("/authreply zz"),
            Some(Err(ParseError::InvalidHex("zz".to_string())))
        );
        assert_eq!(
            parse_line("/authreply").unwrap().unwrap_err().to_string(),
            "/authreply needs a hex key"
        );
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(
            parse_line("/dance now"),
            Some(Err(ParseError::Unknown("dance".to_string())))
        );
    }
}
