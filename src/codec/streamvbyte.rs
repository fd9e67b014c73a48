//! Stream-VByte D1 blocks.
//!
//! ```text
//! [ceil(n / 4) control bytes][payload]
//! ```
//!
//! Each control byte holds four 2-bit length codes, element `i` at bits
//! `2 * (i % 4)`: 00 = 1 byte, 01 = 2, 10 = 3, 11 = 4. The payload is the
//! concatenation of each delta's low bytes, little-endian.

use crate::codec::{ensure_len, BlockCodec, Method};
use crate::error::Result;

#[derive(Debug, Clone, Copy, Default)]
pub struct StreamVByteD1<const N: usize>;

pub type StreamVByte128 = StreamVByteD1<128>;
pub type StreamVByte256 = StreamVByteD1<256>;

/// Bytes needed for `v` (1..=4).
#[inline]
pub fn byte_len(v: u32) -> usize {
    match v {
        0..=0xff => 1,
        0x100..=0xffff => 2,
        0x1_0000..=0xff_ffff => 3,
        _ => 4,
    }
}

/// Control stream length for `n` elements.
#[inline]
pub fn control_len(n: usize) -> usize {
    (n + 3) / 4
}

#[inline]
pub(crate) fn read_le(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf[..bytes.len()].copy_from_slice(bytes);
    u32::from_le_bytes(buf)
}

impl<const N: usize> BlockCodec for StreamVByteD1<N> {
    const METHOD: Method = if N == 256 {
        Method::StreamVByte256
    } else {
        Method::StreamVByte128
    };
    const BLOCK_LEN: usize = N;

    fn encode(input: &[u32], start: u32, out: &mut Vec<u8>) -> usize {
        debug_assert!(input.len() <= N);
        let base = out.len();
        out.resize(base + control_len(input.len()), 0);
        let mut prev = start;
        for (i, &cur) in input.iter().enumerate() {
            let d = cur.wrapping_sub(prev);
            prev = cur;
            let len = byte_len(d);
            out[base + i / 4] |= ((len - 1) as u8) << (2 * (i % 4));
            out.extend_from_slice(&d.to_le_bytes()[..len]);
        }
        out.len() - base
    }

    fn decode(input: &[u8], start: u32, out: &mut [u32]) -> Result<usize> {
        let ctrl = control_len(out.len());
        ensure_len(input, ctrl, "stream-vbyte control stream")?;
        let mut pos = ctrl;
        let mut acc = start;
        for (i, v) in out.iter_mut().enumerate() {
            let len = ((input[i / 4] >> (2 * (i % 4))) & 0b11) as usize + 1;
            ensure_len(&input[pos..], len, "stream-vbyte payload")?;
            acc = acc.wrapping_add(read_le(&input[pos..pos + len]));
            *v = acc;
            pos += len;
        }
        Ok(pos)
    }

    fn estimate_compressed_size() -> usize {
        control_len(N) + N * 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_layout() {
        // deltas: 1, 300, 70000, 0x1000_0000
        let input = [1u32, 301, 70301, 70301 + 0x1000_0000];
        let mut out = Vec::new();
        let n = StreamVByte128::encode(&input, 0, &mut out);
        assert_eq!(out[0], 0b11_10_01_00);
        assert_eq!(n, 1 + 1 + 2 + 3 + 4);
        assert_eq!(&out[1..2], &[1]);
        assert_eq!(&out[2..4], &300u16.to_le_bytes());
    }

    #[test]
    fn test_padded_block_roundtrip() {
        let mut block: Vec<u32> = vec![16, 400, 70_000, 9_000_000];
        block.resize(128, 9_000_000);
        let mut out = Vec::new();
        let written = StreamVByte128::encode(&block, 0, &mut out);
        // 32 control bytes, padding deltas are 0 -> 1 byte each
        assert_eq!(written, 32 + 1 + 2 + 3 + 3 + 124);

        let mut decoded = vec![0u32; 128];
        assert_eq!(StreamVByte128::decode(&out, 0, &mut decoded).unwrap(), written);
        assert_eq!(decoded, block);
    }

    #[test]
    fn test_continuation_start_value() {
        let block: Vec<u32> = (0..256).map(|i| 5_000 + i).collect();
        let mut out = Vec::new();
        StreamVByte256::encode(&block, 4_999, &mut out);
        let mut decoded = vec![0u32; 256];
        StreamVByte256::decode(&out, 4_999, &mut decoded).unwrap();
        assert_eq!(decoded, block);
    }

    #[test]
    fn test_truncated_payload() {
        let block = [0u32, 1 << 30];
        let mut out = Vec::new();
        StreamVByte128::encode(&block, 0, &mut out);
        let mut decoded = [0u32; 2];
        assert!(StreamVByte128::decode(&out[..out.len() - 2], 0, &mut decoded)
            .unwrap_err()
            .is_malformed());
    }

    #[test]
    fn test_byte_len() {
        assert_eq!(byte_len(0), 1);
        assert_eq!(byte_len(255), 1);
        assert_eq!(byte_len(256), 2);
        assert_eq!(byte_len(0xff_ffff), 3);
        assert_eq!(byte_len(u32::MAX), 4);
    }
}
