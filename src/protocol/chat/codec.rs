//! Chat stream framing.
//!
//! The chat protocol has no outer length header: a frame is a discriminator
//! byte followed by whatever fields that packet type defines. Decoding
//! therefore runs the packet's field reader over the buffered bytes and
//! only commits once every field is present.

use std::io;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::common::error::{ProtocolError, ProtocolResult};
use crate::protocol::chat::opcodes;
use crate::protocol::chat::packets::ChatPacket;
use crate::protocol::varint::{self, VarintError, MAX_VARINT_LEN};

/// Largest length field accepted from the peer.
pub const MAX_FIELD_LEN: usize = 1 << 20;

/// Why a field read stopped.
#[derive(Debug)]
pub(crate) enum ReadFailure {
    /// Not enough bytes buffered yet.
    Incomplete,
    /// The bytes can never form a valid packet.
    Malformed(ProtocolError),
}

impl From<ProtocolError> for ReadFailure {
    fn from(err: ProtocolError) -> Self {
        Self::Malformed(err)
    }
}

pub(crate) type ReadResult<T> = Result<T, ReadFailure>;

/// Cursor over buffered bytes that reports shortage instead of panicking.
pub(crate) struct FieldReader<'a> {
    buf: &'a [u8],
    start_len: usize,
}

impl<'a> FieldReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            start_len: buf.len(),
        }
    }

    /// Bytes consumed so far.
    pub fn consumed(&self) -> usize {
        self.start_len - self.buf.len()
    }

    fn need(&self, n: usize) -> ReadResult<()> {
        if self.buf.len() < n {
            Err(ReadFailure::Incomplete)
        } else {
            Ok(())
        }
    }

    pub fn read_u8(&mut self) -> ReadResult<u8> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn read_u32(&mut self) -> ReadResult<u32> {
        self.need(4)?;
        Ok(self.buf.get_u32_le())
    }

    pub fn read_varint(&mut self) -> ReadResult<u32> {
        varint::decode(&mut self.buf).map_err(|e| match e {
            VarintError::Incomplete => ReadFailure::Incomplete,
            VarintError::Malformed => ReadFailure::Malformed(ProtocolError::MalformedVarint {
                max_bytes: MAX_VARINT_LEN,
            }),
        })
    }

    pub fn read_bytes(&mut self, len: usize) -> ReadResult<Bytes> {
        if len > MAX_FIELD_LEN {
            return Err(ProtocolError::FieldTooLarge {
                len,
                max: MAX_FIELD_LEN,
            }
            .into());
        }
        self.need(len)?;
        Ok(self.buf.copy_to_bytes(len))
    }

    /// Varint-length-prefixed UTF-8 text.
    pub fn read_string(&mut self) -> ReadResult<String> {
        let len = self.read_varint()? as usize;
        let bytes = self.read_bytes(len)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Write varint-length-prefixed text.
pub(crate) fn put_string(buf: &mut BytesMut, value: &str) -> ProtocolResult<()> {
    let len = u32::try_from(value.len()).map_err(|_| ProtocolError::FieldTooLarge {
        len: value.len(),
        max: u32::MAX as usize,
    })?;
    varint::encode(len, buf);
    buf.put_slice(value.as_bytes());
    Ok(())
}

/// Codec for the chat byte stream.
#[derive(Debug, Default)]
pub struct ChatCodec;

impl ChatCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for ChatCodec {
    type Item = ChatPacket;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(&id) = src.first() else {
            return Ok(None);
        };

        // An unknown discriminator means the stream is out of sync.
        let entry = opcodes::lookup(id)?;

        let mut reader = FieldReader::new(&src[1..]);
        match (entry.decode)(&mut reader) {
            Ok(packet) => {
                let frame_len = 1 + reader.consumed();
                src.advance(frame_len);
                trace!("Decoded {} ({} bytes)", entry.name, frame_len);
                Ok(Some(packet))
            }
            Err(ReadFailure::Incomplete) => Ok(None),
            Err(ReadFailure::Malformed(e)) => Err(e),
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(packet) => Ok(Some(packet)),
            None if src.is_empty() => Ok(None),
            None => {
                let remaining = src.len();
                src.clear();
                Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("stream closed with {} bytes of a partial packet", remaining),
                )
                .into())
            }
        }
    }
}

impl Encoder<ChatPacket> for ChatCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: ChatPacket, dst: &mut BytesMut) -> Result<(), Self::Error> {
        // Stage into a scratch buffer so a failed encode leaves `dst` untouched.
        let mut frame = BytesMut::new();
        item.encode(&mut frame)?;
        dst.extend_from_slice(&frame);
        Ok(())
    }
}
