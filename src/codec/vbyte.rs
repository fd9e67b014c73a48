//! Classic variable-byte integers: 7 payload bits per byte, least
//! significant group first, high bit set on every byte except the last.
//!
//! Used for the per-chunk element count in the chunk header.

use crate::error::{IndexError, Result};

/// Longest encoding of a u64.
pub const MAX_LEN: usize = 10;

/// Number of bytes `encode` writes for `value`.
pub fn encoded_len(mut value: u64) -> usize {
    let mut len = 1;
    while value >= 0x80 {
        value >>= 7;
        len += 1;
    }
    len
}

/// Append `value` to `out`. Returns bytes written.
pub fn encode(mut value: u64, out: &mut Vec<u8>) -> usize {
    let start = out.len();
    while value >= 0x80 {
        out.push((value as u8) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
    out.len() - start
}

/// Decode one value from the front of `input`. Returns (value, bytes consumed).
pub fn decode(input: &[u8]) -> Result<(u64, usize)> {
    let mut value = 0u64;
    for (i, &byte) in input.iter().enumerate().take(MAX_LEN) {
        let payload = (byte & 0x7f) as u64;
        // the tenth byte may only carry the top bit of a u64
        if i == MAX_LEN - 1 && payload > 1 {
            return Err(IndexError::InvalidFormat("vbyte value overflows u64".into()));
        }
        value |= payload << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    Err(IndexError::InvalidFormat(
        "Truncated or overlong vbyte value".into(),
    ))
}

/// Decode a value that must fit in 32 bits.
pub fn decode_u32(input: &[u8]) -> Result<(u32, usize)> {
    let (value, used) = decode(input)?;
    let value = u32::try_from(value).map_err(|_| {
        IndexError::InvalidFormat(format!("vbyte value {} does not fit in u32", value))
    })?;
    Ok((value, used))
}
