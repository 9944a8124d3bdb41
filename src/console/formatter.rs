//! Message formatting for display.
//!
//! Handles placeholder substitution in message format strings.
//! Supports placeholders: %time, %uid, %title, %user, %info, %message, %channel

use chrono::Local;

use crate::common::titles::display_title;
use crate::common::types::ChatMessage;

/// Default format for received chat lines.
pub const DEFAULT_FORMAT: &str = "[%time] [%channel] %user%info <%title>: %message";

const TIME_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

const PLACEHOLDERS: [&str; 7] = [
    "%time", "%uid", "%title", "%user", "%info", "%message", "%channel",
];

/// Message formatter that substitutes placeholders in format strings.
#[derive(Debug, Clone)]
pub struct MessageFormatter {
    /// Format string for this formatter.
    format: String,
}

impl Default for MessageFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_FORMAT)
    }
}

impl MessageFormatter {
    /// Create a new formatter with the given format string.
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
        }
    }

    /// Format a received chat line.
    ///
    /// Substitutes the following placeholders:
    /// - `%time` - Server send time in local time (DD.MM.YYYY HH:MM:SS)
    /// - `%uid` - Sender uid
    /// - `%title` - Sender title name, or the raw id when unknown
    /// - `%user` - Sender name
    /// - `%info` - Sender tag with a leading space, or nothing
    /// - `%message` - The message text
    /// - `%channel` - `clan` for clan lines, otherwise `language`
    ///
    /// Substitution is a single pass, so placeholder text inside a message
    /// is printed as-is.
    pub fn format(&self, message: &ChatMessage, language: &str) -> String {
        let mut out = String::with_capacity(self.format.len() + message.text.len());
        let mut rest = self.format.as_str();

        while let Some(pos) = rest.find('%') {
            out.push_str(&rest[..pos]);
            rest = &rest[pos..];

            match PLACEHOLDERS.iter().find(|p| rest.starts_with(**p)) {
                Some(placeholder) => {
                    out.push_str(&expand(placeholder, message, language));
                    rest = &rest[placeholder.len()..];
                }
                None => {
                    out.push('%');
                    rest = &rest[1..];
                }
            }
        }
        out.push_str(rest);
        out
    }
}

fn expand(placeholder: &str, message: &ChatMessage, language: &str) -> String {
    match placeholder {
        "%time" => message
            .timestamp
            .with_timezone(&Local)
            .format(TIME_FORMAT)
            .to_string(),
        "%uid" => message.uid.to_string(),
        "%title" => display_title(message.title_id),
        "%user" => message.name.clone(),
        "%info" if message.info.is_empty() => String::new(),
        "%info" => format!(" {}", message.info),
        "%message" => message.text.clone(),
        "%channel" if message.is_clan => "clan".to_string(),
        "%channel" => language.to_string(),
        _ => placeholder.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::titles::NO_TITLE;
    use crate::common::types::timestamp_from_unix;

    fn make_message() -> ChatMessage {
        ChatMessage {
            uid: 7,
            name: "Ann".to_string(),
            title_id: 71087,
            info: String::new(),
            text: "hi".to_string(),
            timestamp: timestamp_from_unix(1_700_000_000),
            is_clan: false,
        }
    }

    #[test]
    fn test_basic_format() {
        let formatter = MessageFormatter::new("[%user]: %message");
        assert_eq!(formatter.format(&make_message(), "en"), "[Ann]: hi");
    }

    #[test]
    fn test_title_and_uid() {
        let formatter = MessageFormatter::new("%user (%uid) <%title>");
        let mut message = make_message();
        assert_eq!(formatter.format(&message, "en"), "Ann (7) <Pioneer>");

        message.title_id = NO_TITLE;
        assert_eq!(formatter.format(&message, "en"), "Ann (7) <NONE>");

        message.title_id = 12345;
        assert_eq!(formatter.format(&message, "en"), "Ann (7) <12345>");
    }

    #[test]
    fn test_info_and_channel() {
        let formatter = MessageFormatter::new("[%channel] %user%info: %message");
        let mut message = make_message();
        assert_eq!(formatter.format(&message, "de"), "[de] Ann: hi");

        message.info = "[GM]".to_string();
        message.is_clan = true;
        assert_eq!(formatter.format(&message, "de"), "[clan] Ann [GM]: hi");
    }

    #[test]
    fn test_placeholders_in_message_are_not_expanded() {
        let formatter = MessageFormatter::new("%user: %message");
        let mut message = make_message();
        message.text = "100% sure about %user".to_string();
        assert_eq!(
            formatter.format(&message, "en"),
            "Ann: 100% sure about %user"
        );
    }

    #[test]
    fn test_format_with_time() {
        let formatter = MessageFormatter::new("[%time] %user: %message");
        let result = formatter.format(&make_message(), "en");

        // DD.MM.YYYY HH:MM:SS in local time
        assert!(result.ends_with("] Ann: hi"));
        assert_eq!(result.find(']'), Some(20));
    }

    #[test]
    fn test_default_format() {
        let message = make_message();
        assert_eq!(
            MessageFormatter::default().format(&message, "en"),
            MessageFormatter::new(DEFAULT_FORMAT.to_string()).format(&message, "en")
        );
    }
}
