//! Order-preserving variable-length key encoding.
//!
//! The count of leading one bits in the first byte gives the total length:
//!
//! ```text
//! 0xxxxxxx                    1 byte,  7 payload bits
//! 10xxxxxx + 1 byte           2 bytes, 14 bits
//! 110xxxxx + 2 bytes          3 bytes, 21 bits
//! ...
//! 11111110 + 7 bytes          8 bytes, 56 bits
//! 11111111 + 8 bytes          9 bytes, 64 bits
//! ```
//!
//! Payload is big-endian and every value uses its shortest class, so
//! comparing two encodings byte-wise orders them like the integers.

use crate::error::{IndexError, Result};

pub const MAX_LEN: usize = 9;

/// Minimal encoded length of `value` (1..=9).
pub fn nencode(value: u64) -> usize {
    for len in 1..MAX_LEN {
        if value >> (7 * len) == 0 {
            return len;
        }
    }
    MAX_LEN
}

/// Append the encoding of `value`. Returns bytes written.
pub fn encode(value: u64, out: &mut Vec<u8>) -> usize {
    let len = nencode(value);
    if len == MAX_LEN {
        out.push(0xff);
        out.extend_from_slice(&value.to_be_bytes());
        return len;
    }
    // (len - 1) one bits, then a zero
    let prefix = !(0xffu64 >> (len - 1)) & 0xff;
    let word = (prefix << (8 * (len - 1))) | value;
    out.extend_from_slice(&word.to_be_bytes()[8 - len..]);
    len
}

/// Encode into a fresh buffer.
pub fn to_vec(value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(MAX_LEN);
    encode(value, &mut out);
    out
}

/// Decode one key from the front of `input`. Returns (value, bytes consumed).
pub fn decode(input: &[u8]) -> Result<(u64, usize)> {
    let first = *input
        .first()
        .ok_or_else(|| IndexError::InvalidFormat("Empty vbkey".into()))?;
    let len = (first.leading_ones() as usize + 1).min(MAX_LEN);
    if input.len() < len {
        return Err(IndexError::InvalidFormat(format!(
            "Truncated vbkey: need {} bytes, have {}",
            len,
            input.len()
        )));
    }
    if len == MAX_LEN {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&input[1..MAX_LEN]);
        return Ok((u64::from_be_bytes(buf), MAX_LEN));
    }
    let word = input[..len]
        .iter()
        .fold(0u64, |acc, &b| (acc << 8) | b as u64);
    let mask = (1u64 << (7 * len)) - 1;
    Ok((word & mask, len))
}
