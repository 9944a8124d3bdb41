//! Unsigned LEB128-style varints used by the chat protocol.
//!
//! Seven bits per byte, low group first; the high bit marks a following byte.

use bytes::{Buf, BufMut};

/// Longest encoding of a `u32`.
pub const MAX_VARINT_LEN: usize = 5;

/// Outcome of a failed varint read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarintError {
    /// The buffer ended before the terminating byte.
    Incomplete,
    /// More than `MAX_VARINT_LEN` bytes, or bits beyond 32.
    Malformed,
}

/// Append the encoding of `value` to `dst`.
pub fn encode(mut value: u32, dst: &mut impl BufMut) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            dst.put_u8(byte);
            return;
        }
        dst.put_u8(byte | 0x80);
    }
}

/// Read one varint from `src`.
///
/// On `Incomplete` some bytes may already have been consumed; callers that
/// retry must read from a copy of the cursor.
pub fn decode(src: &mut impl Buf) -> Result<u32, VarintError> {
    let mut value = 0u32;
    for index in 0..MAX_VARINT_LEN {
        if !src.has_remaining() {
            return Err(VarintError::Incomplete);
        }
        let byte = src.get_u8();
        let group = u32::from(byte & 0x7f);
        // The fifth group only has room for the top four bits.
        if index == MAX_VARINT_LEN - 1 && group > 0x0f {
            return Err(VarintError::Malformed);
        }
        value |= group << (7 * index);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(VarintError::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    fn encoded(value: u32) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode(value, &mut buf);
        buf.to_vec()
    }

    #[test]
    fn test_known_encodings() {
        assert_eq!(encoded(0), [0x00]);
        assert_eq!(encoded(127), [0x7f]);
        assert_eq!(encoded(128), [0x80, 0x01]);
        assert_eq!(encoded(300), [0xac, 0x02]);
        assert_eq!(encoded(u32::MAX), [0xff, 0xff, 0xff, 0xff, 0x0f]);
    }

    #[test]
    fn test_roundtrip_boundaries() {
        for value in [0, 1, 127, 128, 16_383, 16_384, 2_097_151, 2_097_152, u32::MAX - 1, u32::MAX] {
            let bytes = encoded(value);
            assert!(bytes.len() <= MAX_VARINT_LEN);
            let mut src = &bytes[..];
            assert_eq!(decode(&mut src), Ok(value));
            assert!(src.is_empty());
        }
    }

    #[test]
    fn test_decode_stops_at_terminator() {
        let mut src: &[u8] = &[0xac, 0x02, 0x55];
        assert_eq!(decode(&mut src), Ok(300));
        assert_eq!(src, [0x55]);
    }

    #[test]
    fn test_incomplete() {
        let mut src: &[u8] = &[0x80, 0x80];
        assert_eq!(decode(&mut src), Err(VarintError::Incomplete));
    }

    #[test]
    fn test_endless_continuation_is_rejected() {
        let mut src: &[u8] = &[0xff; 16];
        assert_eq!(decode(&mut src), Err(VarintError::Malformed));
        // Never reads past the bound.
        assert_eq!(src.len(), 16 - MAX_VARINT_LEN);
    }

    #[test]
    fn test_overflowing_fifth_byte_is_rejected() {
        let mut src: &[u8] = &[0xff, 0xff, 0xff, 0xff, 0x10];
        assert_eq!(decode(&mut src), Err(VarintError::Malformed));
    }
}
