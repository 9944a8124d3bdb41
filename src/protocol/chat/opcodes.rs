//! Chat packet discriminators and the static decode registry.

use crate::common::error::ProtocolError;
use crate::protocol::chat::codec::{FieldReader, ReadResult};
use crate::protocol::chat::packets::{self, ChatPacket};

// --- Session ---
pub const JOIN: u8 = 0x01;
pub const CHANGE_LANGUAGE: u8 = 0x07;
pub const JOIN_CLAN: u8 = 0x0b;

// --- Chat ---
pub const MESSAGE: u8 = 0x03;
pub const CLAN_MESSAGE: u8 = 0x0c;

// --- Status ---
pub const STATUS_RESPONSE: u8 = 0x06;
pub const STATUS_REQUEST: u8 = 0x08;

// --- Key exchange ---
pub const AUTH_REQUEST: u8 = 0x0e;
pub const AUTH_RESPONSE: u8 = 0x0f;

/// Decode routine for the body that follows a discriminator byte.
pub(crate) type DecodeFn = fn(&mut FieldReader<'_>) -> ReadResult<ChatPacket>;

/// One registered packet type.
pub(crate) struct PacketEntry {
    pub id: u8,
    pub name: &'static str,
    pub decode: DecodeFn,
}

/// Every packet the chat protocol knows. Anything else on the wire is fatal.
pub(crate) static REGISTRY: &[PacketEntry] = &[
    PacketEntry { id: JOIN, name: "JOIN", decode: packets::decode_join },
    PacketEntry { id: MESSAGE, name: "MESSAGE", decode: packets::decode_message },
    PacketEntry { id: STATUS_RESPONSE, name: "STATUS_RESPONSE", decode: packets::decode_status_response },
    PacketEntry { id: CHANGE_LANGUAGE, name: "CHANGE_LANGUAGE", decode: packets::decode_change_language },
    PacketEntry { id: STATUS_REQUEST, name: "STATUS_REQUEST", decode: packets::decode_status_request },
    PacketEntry { id: JOIN_CLAN, name: "JOIN_CLAN", decode: packets::decode_join_clan },
    PacketEntry { id: CLAN_MESSAGE, name: "CLAN_MESSAGE", decode: packets::decode_clan_message },
    PacketEntry { id: AUTH_REQUEST, name: "AUTH_REQUEST", decode: packets::decode_auth_request },
    PacketEntry { id: AUTH_RESPONSE, name: "AUTH_RESPONSE", decode: packets::decode_auth_response },
];

/// Find the registry entry for a discriminator byte.
pub(crate) fn lookup(id: u8) -> Result<&'static PacketEntry, ProtocolError> {
    REGISTRY
        .iter()
        .find(|entry| entry.id == id)
        .ok_or(ProtocolError::UnknownPacket { id })
}

/// Get a human-readable name for a discriminator.
pub fn opcode_name(id: u8) -> &'static str {
    lookup(id).map_or("UNKNOWN", |entry| entry.name)
}
