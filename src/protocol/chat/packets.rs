//! Chat packet definitions.
//!
//! Each variant is tagged on the wire by the discriminator in
//! `protocol::chat::opcodes`. Integers are little-endian, strings carry a
//! varint byte length.

use bytes::{BufMut, Bytes, BytesMut};

use crate::common::error::{ProtocolError, ProtocolResult};
use crate::common::types::{timestamp_from_unix, timestamp_to_unix, ChatMessage};
use crate::protocol::chat::codec::{put_string, FieldReader, ReadResult};
use crate::protocol::chat::opcodes;

/// Status byte the server sends inside a status response.
const STATUS_MARKER: u8 = 0x09;

/// Body of a Message or ClanMessage packet.
///
/// The client sends only the text; the server relays the full line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessagePayload {
    /// Client -> Server: text to say.
    Say { text: String },
    /// Server -> Client: a relayed chat line.
    Broadcast(ChatMessage),
}

/// A chat protocol packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatPacket {
    /// Enter the chat room for a language.
    Join {
        version: u32,
        uid: u32,
        language: String,
    },
    Message(MessagePayload),
    /// Server status; only the online-user count is meaningful.
    StatusResponse { online_users: u32 },
    /// Switch to another language room.
    ChangeLanguage {
        version: u32,
        uid: u32,
        language: String,
    },
    StatusRequest,
    JoinClan { clan_id: u32 },
    ClanMessage(MessagePayload),
    /// Server key-exchange notice. The key is opaque to this client.
    AuthRequest { key: Bytes },
    /// Client key-exchange reply.
    AuthResponse { key: Bytes },
}

impl ChatPacket {
    /// Discriminator byte for this packet.
    pub fn opcode(&self) -> u8 {
        match self {
            Self::Join { .. } => opcodes::JOIN,
            Self::Message(_) => opcodes::MESSAGE,
            Self::StatusResponse { .. } => opcodes::STATUS_RESPONSE,
            Self::ChangeLanguage { .. } => opcodes::CHANGE_LANGUAGE,
            Self::StatusRequest => opcodes::STATUS_REQUEST,
            Self::JoinClan { .. } => opcodes::JOIN_CLAN,
            Self::ClanMessage(_) => opcodes::CLAN_MESSAGE,
            Self::AuthRequest { .. } => opcodes::AUTH_REQUEST,
            Self::AuthResponse { .. } => opcodes::AUTH_RESPONSE,
        }
    }

    /// Append the full packet, discriminator included, to `buf`.
    pub fn encode(&self, buf: &mut BytesMut) -> ProtocolResult<()> {
        buf.put_u8(self.opcode());

        match self {
            Self::Join {
                version,
                uid,
                language,
            } => {
                buf.put_u32_le(*version);
                buf.put_u32_le(*uid);
                put_string(buf, language)?;
            }
            Self::ChangeLanguage {
                version,
                uid,
                language,
            } => {
                buf.put_u32_le(*version);
                buf.put_u32_le(*uid);
                put_string(buf, language)?;
                buf.put_u32_le(0); // reserved
            }
            Self::Message(payload) | Self::ClanMessage(payload) => {
                encode_message(payload, buf)?;
            }
            Self::StatusResponse { online_users } => {
                buf.put_u32_le(0);
                buf.put_u8(STATUS_MARKER);
                buf.put_u32_le(*online_users);
            }
            Self::StatusRequest => {}
            Self::JoinClan { clan_id } => {
                buf.put_u32_le(*clan_id);
            }
            Self::AuthRequest { key } | Self::AuthResponse { key } => {
                let len = u32::try_from(key.len()).map_err(|_| ProtocolError::FieldTooLarge {
                    len: key.len(),
                    max: u32::MAX as usize,
                })?;
                buf.put_u32_le(len);
                buf.put_slice(key);
            }
        }

        Ok(())
    }
}

fn encode_message(payload: &MessagePayload, buf: &mut BytesMut) -> ProtocolResult<()> {
    match payload {
        MessagePayload::Say { text } => put_string(buf, text),
        MessagePayload::Broadcast(message) => {
            buf.put_u32_le(message.uid);
            put_string(buf, &message.name)?;
            buf.put_u32_le(message.title_id);
            put_string(buf, &message.info)?;
            put_string(buf, &message.text)?;
            buf.put_u32_le(timestamp_to_unix(&message.timestamp));
            Ok(())
        }
    }
}

fn read_chat_message(reader: &mut FieldReader<'_>, is_clan: bool) -> ReadResult<ChatMessage> {
    let uid = reader.read_u32()?;
    let name = reader.read_string()?;
    let title_id = reader.read_u32()?;
    let info = reader.read_string()?;
    let text = reader.read_string()?;
    let timestamp = timestamp_from_unix(reader.read_u32()?);

    Ok(ChatMessage {
        uid,
        name,
        title_id,
        info,
        text,
        timestamp,
        is_clan,
    })
}

// Decode routines below read the body after the discriminator byte. They are
// wired into `opcodes::REGISTRY`.

pub(crate) fn decode_join(reader: &mut FieldReader<'_>) -> ReadResult<ChatPacket> {
    Ok(ChatPacket::Join {
        version: reader.read_u32()?,
        uid: reader.read_u32()?,
        language: reader.read_string()?,
    })
}

pub(crate) fn decode_message(reader: &mut FieldReader<'_>) -> ReadResult<ChatPacket> {
    let message = read_chat_message(reader, false)?;
    Ok(ChatPacket::Message(MessagePayload::Broadcast(message)))
}

pub(crate) fn decode_clan_message(reader: &mut FieldReader<'_>) -> ReadResult<ChatPacket> {
    let message = read_chat_message(reader, true)?;
    Ok(ChatPacket::ClanMessage(MessagePayload::Broadcast(message)))
}

pub(crate) fn decode_status_response(reader: &mut FieldReader<'_>) -> ReadResult<ChatPacket> {
    reader.read_u32()?; // unknown
    reader.read_u8()?; // usually 0x09
    Ok(ChatPacket::StatusResponse {
        online_users: reader.read_u32()?,
    })
}

pub(crate) fn decode_change_language(reader: &mut FieldReader<'_>) -> ReadResult<ChatPacket> {
    let version = reader.read_u32()?;
    let uid = reader.read_u32()?;
    let language = reader.read_string()?;
    reader.read_u32()?; // reserved
    Ok(ChatPacket::ChangeLanguage {
        version,
        uid,
        language,
    })
}

pub(crate) fn decode_status_request(_reader: &mut FieldReader<'_>) -> ReadResult<ChatPacket> {
    Ok(ChatPacket::StatusRequest)
}

pub(crate) fn decode_join_clan(reader: &mut FieldReader<'_>) -> ReadResult<ChatPacket> {
    Ok(ChatPacket::JoinClan {
        clan_id: reader.read_u32()?,
    })
}

pub(crate) fn decode_auth_request(reader: &mut FieldReader<'_>) -> ReadResult<ChatPacket> {
    let len = reader.read_u32()? as usize;
    Ok(ChatPacket::AuthRequest {
        key: reader.read_bytes(len)?,
    })
}

pub(crate) fn decode_auth_response(reader: &mut FieldReader<'_>) -> ReadResult<ChatPacket> {
    let len = reader.read_u32()? as usize;
    Ok(ChatPacket::AuthResponse {
        key: reader.read_bytes(len)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    fn encoded(packet: &ChatPacket) -> Vec<u8> {
        let mut buf = BytesMut::new();
        packet.encode(&mut buf).unwrap();
        buf.to_vec()
    }

    #[test]
    fn test_join_encode() {
        let join = ChatPacket::Join {
            version: 1,
            uid: 42,
            language: "en".to_string(),
        };
        assert_eq!(encoded(&join), hex!("01 01000000 2a000000 02 656e"));
    }

    #[test]
    fn test_change_language_has_reserved_tail() {
        let change = ChatPacket::ChangeLanguage {
            version: 1,
            uid: 42,
            language: "de".to_string(),
        };
        assert_eq!(
            encoded(&change),
            hex!("07 01000000 2a000000 02 6465 00000000")
        );
    }

    #[test]
    fn test_join_clan_encode() {
        let join = ChatPacket::JoinClan { clan_id: 0x0102 };
        assert_eq!(encoded(&join), hex!("0b 02010000"));
    }

    #[test]
    fn test_say_encode() {
        let say = ChatPacket::Message(MessagePayload::Say {
            text: "hi".to_string(),
        });
        let clan_say = ChatPacket::ClanMessage(MessagePayload::Say {
            text: "hi".to_string(),
        });
        assert_eq!(encoded(&say), hex!("03 02 6869"));
        assert_eq!(encoded(&clan_say), hex!("0c 02 6869"));
    }

    #[test]
    fn test_status_request_is_single_byte() {
        assert_eq!(encoded(&ChatPacket::StatusRequest), [0x08]);
    }

    #[test]
    fn test_auth_response_encode() {
        let reply = ChatPacket::AuthResponse {
            key: Bytes::from_static(&[0xaa, 0xbb]),
        };
        assert_eq!(encoded(&reply), hex!("0f 02000000 aabb"));
    }

    #[test]
    fn test_long_string_uses_multibyte_length() {
        let text = "x".repeat(300);
        let say = ChatPacket::Message(MessagePayload::Say { text });
        let bytes = encoded(&say);
        assert_eq!(&bytes[..3], &[0x03, 0xac, 0x02]);
        assert_eq!(bytes.len(), 3 + 300);
    }
}
