//! Shared types used across the application.

use chrono::{DateTime, Utc};

/// A chat line broadcast by the chat server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Sender's user id.
    pub uid: u32,
    /// Sender's display name.
    pub name: String,
    /// Id of the title shown next to the sender (see `common::titles`).
    pub title_id: u32,
    /// Extra tag shown after the name (usually empty).
    pub info: String,
    /// Message text.
    pub text: String,
    /// Server-side send time.
    pub timestamp: DateTime<Utc>,
    /// True for clan chat lines.
    pub is_clan: bool,
}

/// Convert a wire unix timestamp into a UTC instant.
pub fn timestamp_from_unix(secs: u32) -> DateTime<Utc> {
    DateTime::from_timestamp(i64::from(secs), 0).unwrap_or_default()
}

/// Convert a UTC instant back into the 32-bit wire representation.
pub fn timestamp_to_unix(time: &DateTime<Utc>) -> u32 {
    u32::try_from(time.timestamp()).unwrap_or(0)
}
