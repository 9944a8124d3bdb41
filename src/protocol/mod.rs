//! Wire protocols: the chat stream and the game HTTP API.

pub mod api;
pub mod chat;
pub mod varint;
