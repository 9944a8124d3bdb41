//! Chat server connection and protocol handling.

pub mod codec;
pub mod opcodes;
pub mod packets;
pub mod session;

pub use session::{languages, ChatSender, ChatSession};
