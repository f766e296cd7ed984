//! Little-endian base-128 varints.
//!
//! Seven payload bits per byte, least significant group first. The high bit
//! (0x80) is set on every byte except the last. Values up to `u64::MAX` are
//! supported, which takes at most [`MAX_VARINT_LEN`] bytes.

use bytes::BufMut;

use crate::error::{ProtoError, Result};

/// Longest encoding of a `u64`
pub const MAX_VARINT_LEN: usize = 10;

const CONTINUATION: u8 = 0x80;
const PAYLOAD_MASK: u8 = 0x7f;

/// Append the varint encoding of `value` to `dst`.
pub fn encode_varint(mut value: u64, dst: &mut impl BufMut) {
    while value >= u64::from(CONTINUATION) {
        dst.put_u8((value as u8 & PAYLOAD_MASK) | CONTINUATION);
        value >>= 7;
    }
    dst.put_u8(value as u8);
}

/// Number of bytes [`encode_varint`] writes for `value`.
pub fn encoded_len(value: u64) -> usize {
    let bits = 64 - (value | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}

/// Decode one varint from the front of `src`.
///
/// Returns the value and the number of bytes consumed, or `None` when `src`
/// ends before the final byte. Callers that have the complete input treat
/// `None` as truncation; streaming callers wait for more bytes.
///
/// # Errors
///
/// - `ProtoError::VarintOverflow` if the encoding is longer than ten bytes or
///   the tenth byte carries bits beyond `u64`
pub fn decode_varint(src: &[u8]) -> Result<Option<(u64, usize)>> {
    let mut value = 0u64;

    for (index, &byte) in src.iter().take(MAX_VARINT_LEN).enumerate() {
        if index == MAX_VARINT_LEN - 1 && byte > 1 {
            return Err(ProtoError::VarintOverflow);
        }

        value |= u64::from(byte & PAYLOAD_MASK) << (7 * index);

        if byte & CONTINUATION == 0 {
            return Ok(Some((value, index + 1)));
        }
    }

    debug_assert!(src.len() < MAX_VARINT_LEN);
    Ok(None)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn encode(value: u64) -> Vec<u8> {
        let mut buf = Vec::new();
        encode_varint(value, &mut buf);
        buf
    }

    #[test]
    fn known_encodings() {
        assert_eq!(encode(0), [0x00]);
        assert_eq!(encode(1), [0x01]);
        assert_eq!(encode(127), [0x7f]);
        assert_eq!(encode(128), [0x80, 0x01]);
        assert_eq!(encode(300), [0xac, 0x02]);
        assert_eq!(encode(16383), [0xff, 0x7f]);
        assert_eq!(encode(16384), [0x80, 0x80, 0x01]);
        assert_eq!(encode(u64::MAX).len(), MAX_VARINT_LEN);
    }

    #[test]
    fn two_byte_lengths_decode() {
        assert_eq!(decode_varint(&[0xac, 0x02, 0xff]), Ok(Some((300, 2))));
        assert_eq!(decode_varint(&[0xff, 0x7f]), Ok(Some((16383, 2))));
    }

    #[test]
    fn incomplete_varint_is_none() {
        assert_eq!(decode_varint(&[]), Ok(None));
        assert_eq!(decode_varint(&[0x80]), Ok(None));
        assert_eq!(decode_varint(&[0xff, 0xff, 0xff]), Ok(None));
    }

    #[test]
    fn overlong_varint_rejected() {
        assert_eq!(decode_varint(&[0xff; 11]), Err(ProtoError::VarintOverflow));
        assert_eq!(decode_varint(&[0xff; 10]), Err(ProtoError::VarintOverflow));

        let mut too_big = vec![0xff; 9];
        too_big.push(0x02);
        assert_eq!(decode_varint(&too_big), Err(ProtoError::VarintOverflow));
    }

    proptest! {
        #[test]
        fn encoded_len_matches(value in any::<u64>()) {
            prop_assert_eq!(encode(value).len(), encoded_len(value));
        }

        #[test]
        fn decode_ignores_trailing_bytes(value in any::<u64>(), tail in any::<Vec<u8>>()) {
            let mut buf = encode(value);
            let len = buf.len();
            buf.extend_from_slice(&tail);
            prop_assert_eq!(decode_varint(&buf), Ok(Some((value, len))));
        }
    }
}
