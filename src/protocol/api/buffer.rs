//! Byte buffers for the game API encoding.
//!
//! Responses are read strictly front to back. Every read is bounds-checked
//! and reports `PacketTooShort` instead of panicking, since an offset error
//! anywhere poisons all later fields.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::common::error::{ProtocolError, ProtocolResult};

/// Flag bits that select the two-byte length form.
const LONG_FORM_MASK: u8 = 0x80 | 0x02;

/// The four string framings found in API responses.
///
/// They differ only in the overhead subtracted from the declared length and
/// in how many padding bytes follow the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringLayout {
    A,
    B,
    C,
    D,
}

impl StringLayout {
    /// Bytes subtracted from the declared length to get the payload size.
    pub fn overhead(self) -> usize {
        match self {
            Self::A | Self::B | Self::C => 3,
            Self::D => 4,
        }
    }

    /// Padding bytes skipped after the payload.
    pub fn padding(self) -> usize {
        match self {
            Self::A | Self::D => 3,
            Self::B => 2,
            Self::C => 1,
        }
    }
}

/// Sequential reader over a response body.
#[derive(Debug)]
pub struct PacketReader {
    buf: Bytes,
}

impl PacketReader {
    pub fn new(buf: Bytes) -> Self {
        Self { buf }
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn need(&self, n: usize) -> ProtocolResult<()> {
        if self.buf.remaining() < n {
            return Err(ProtocolError::PacketTooShort {
                needed: n,
                got: self.buf.remaining(),
            });
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> ProtocolResult<u8> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn read_u16(&mut self) -> ProtocolResult<u16> {
        self.need(2)?;
        Ok(self.buf.get_u16_le())
    }

    pub fn read_u32(&mut self) -> ProtocolResult<u32> {
        self.need(4)?;
        Ok(self.buf.get_u32_le())
    }

    pub fn read_bytes(&mut self, n: usize) -> ProtocolResult<Bytes> {
        self.need(n)?;
        Ok(self.buf.split_to(n))
    }

    /// Read exactly `N` bytes into an array.
    pub fn read_array<const N: usize>(&mut self) -> ProtocolResult<[u8; N]> {
        self.need(N)?;
        let mut out = [0u8; N];
        self.buf.copy_to_slice(&mut out);
        Ok(out)
    }

    pub fn skip(&mut self, n: usize) -> ProtocolResult<()> {
        self.need(n)?;
        self.buf.advance(n);
        Ok(())
    }

    /// Read a flag-prefixed UTF-16LE string in the given layout.
    ///
    /// Unpaired surrogates decode to U+FFFD; an odd trailing byte is dropped.
    pub fn read_string(&mut self, layout: StringLayout) -> ProtocolResult<String> {
        let flag = self.read_u8()?;
        let declared = if flag & LONG_FORM_MASK != 0 {
            usize::from(self.read_u16()?)
        } else {
            usize::from(flag)
        };

        let overhead = layout.overhead();
        let len = declared
            .checked_sub(overhead)
            .ok_or(ProtocolError::DataFormat { declared, overhead })?;

        let payload = self.read_bytes(len)?;
        self.skip(layout.padding())?;

        Ok(decode_utf16le(&payload))
    }
}

/// Lossy UTF-16LE decode.
pub fn decode_utf16le(bytes: &[u8]) -> String {
    let units = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
    char::decode_utf16(units)
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

/// Accumulating writer for request bodies.
#[derive(Debug, Default)]
pub struct PacketWriter {
    buf: BytesMut,
}

impl PacketWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.put_u32_le(value);
    }

    /// One-byte length followed by the raw bytes.
    pub fn write_string(&mut self, value: &str) -> ProtocolResult<()> {
        let len = u8::try_from(value.len())
            .map_err(|_| ProtocolError::StringTooLong { len: value.len() })?;
        self.buf.put_u8(len);
        self.buf.put_slice(value.as_bytes());
        Ok(())
    }

    /// Take the written bytes, leaving the writer empty.
    pub fn finish(&mut self) -> Bytes {
        self.buf.split().freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    fn utf16(text: &str) -> Vec<u8> {
        text.encode_utf16().flat_map(u16::to_le_bytes).collect()
    }

    #[test]
    fn test_short_form_uses_flag_as_length() {
        // flag 0x09 = 3 overhead + 6 payload bytes ("abc"), then 3 padding bytes.
        let mut data = vec![0x09];
        data.extend(utf16("abc"));
        data.extend([0xee; 3]);
        data.push(0x42);

        let mut reader = PacketReader::new(Bytes::from(data));
        assert_eq!(reader.read_string(StringLayout::A).unwrap(), "abc");
        assert_eq!(reader.read_u8().unwrap(), 0x42);
    }

    #[test]
    fn test_long_form_reads_u16_length() {
        let text = "game.example.org";
        let payload = utf16(text);
        let declared = (payload.len() + 4) as u16;

        let mut data = vec![0x80];
        data.extend(declared.to_le_bytes());
        data.extend(&payload);
        data.extend([0x00; 3]);

        let mut reader = PacketReader::new(Bytes::from(data));
        assert_eq!(reader.read_string(StringLayout::D).unwrap(), text);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_bit_one_selects_long_form() {
        let mut data = vec![0x02, 0x05, 0x00];
        data.extend(utf16("x"));
        data.extend([0x00; 1]);

        let mut reader = PacketReader::new(Bytes::from(data));
        assert_eq!(reader.read_string(StringLayout::C).unwrap(), "x");
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_padding_per_layout() {
        for (layout, padding) in [
            (StringLayout::A, 3),
            (StringLayout::B, 2),
            (StringLayout::C, 1),
            (StringLayout::D, 3),
        ] {
            let mut data = vec![0x80, layout.overhead() as u8, 0x00];
            data.extend(vec![0xaa; padding]);
            data.push(0x7f);

            let mut reader = PacketReader::new(Bytes::from(data));
            assert_eq!(reader.read_string(layout).unwrap(), "");
            assert_eq!(reader.read_u8().unwrap(), 0x7f, "{:?}", layout);
        }
    }

    #[test]
    fn test_length_below_overhead_is_data_format_error() {
        let mut reader = PacketReader::new(Bytes::from_static(&hex!("80 0200 41004200")));
        assert!(matches!(
            reader.read_string(StringLayout::A),
            Err(ProtocolError::DataFormat {
                declared: 2,
                overhead: 3
            })
        ));
        // The payload bytes after the length were never touched.
        assert_eq!(reader.remaining(), 4);
    }

    #[test]
    fn test_truncated_payload_is_too_short() {
        let mut reader = PacketReader::new(Bytes::from_static(&hex!("09 4100")));
        assert!(matches!(
            reader.read_string(StringLayout::A),
            Err(ProtocolError::PacketTooShort { needed: 6, got: 2 })
        ));
    }

    #[test]
    fn test_lossy_utf16() {
        assert_eq!(decode_utf16le(&hex!("3d d8 41 00")), "\u{fffd}A");
        assert_eq!(decode_utf16le(&hex!("41 00 42")), "A");
    }

    #[test]
    fn test_read_array_and_u32() {
        let mut reader = PacketReader::new(Bytes::from_static(&hex!("010203 00f15365")));
        assert_eq!(reader.read_array::<3>().unwrap(), [1, 2, 3]);
        assert_eq!(reader.read_u32().unwrap(), 1_700_000_000);
        assert!(matches!(
            reader.read_u32(),
            Err(ProtocolError::PacketTooShort { needed: 4, got: 0 })
        ));
    }

    #[test]
    fn test_writer_finish_resets() {
        let mut writer = PacketWriter::new();
        writer.write_u8(0x00);
        writer.write_u32(0xffff_ffff);
        writer.write_string("1.0").unwrap();

        assert_eq!(&writer.finish()[..], hex!("00 ffffffff 03 312e30"));
        assert!(writer.is_empty());
    }

    #[test]
    fn test_writer_rejects_long_string() {
        let mut writer = PacketWriter::new();
        let long = "v".repeat(256);
        assert!(matches!(
            writer.write_string(&long),
            Err(ProtocolError::StringTooLong { len: 256 })
        ));
    }
}
