//! Quad-grouped Stream-VByte D1 blocks.
//!
//! This layout is specific to this crate. Deltas are grouped in quads of
//! four consecutive lanes; each quad stores all of its lanes with the byte
//! length of its widest delta, so one 2-bit code covers four values:
//!
//! ```text
//! [ceil(ceil(n / 4) / 4) control bytes][payload]
//! ```
//!
//! Quad `q` has its code at bits `2 * (q % 4)` of control byte `q / 4`
//! (00 = 1 byte per lane ... 11 = 4). A trailing partial quad stores only
//! its real lanes.

use crate::codec::streamvbyte::{byte_len, read_le};
use crate::codec::{ensure_len, BlockCodec, Method};
use crate::error::Result;

const QUAD: usize = 4;

#[derive(Debug, Clone, Copy, Default)]
pub struct StreamVByteQuadD1<const N: usize>;

pub type StreamVByteQuad128 = StreamVByteQuadD1<128>;
pub type StreamVByteQuad256 = StreamVByteQuadD1<256>;

/// Control stream length for `n` elements.
#[inline]
pub fn control_len(n: usize) -> usize {
    let quads = (n + QUAD - 1) / QUAD;
    (quads + 3) / 4
}

impl<const N: usize> BlockCodec for StreamVByteQuadD1<N> {
    const METHOD: Method = if N == 256 {
        Method::StreamVByteQuad256
    } else {
        Method::StreamVByteQuad128
    };
    const BLOCK_LEN: usize = N;

    fn encode(input: &[u32], start: u32, out: &mut Vec<u8>) -> usize {
        debug_assert!(input.len() <= N);
        let base = out.len();
        out.resize(base + control_len(input.len()), 0);
        let mut prev = start;
        for (q, quad) in input.chunks(QUAD).enumerate() {
            let mut deltas = [0u32; QUAD];
            let mut widest = 1;
            for (d, &cur) in deltas.iter_mut().zip(quad) {
                *d = cur.wrapping_sub(prev);
                prev = cur;
                widest = widest.max(byte_len(*d));
            }
            out[base + q / 4] |= ((widest - 1) as u8) << (2 * (q % 4));
            for d in &deltas[..quad.len()] {
                out.extend_from_slice(&d.to_le_bytes()[..widest]);
            }
        }
        out.len() - base
    }

    fn decode(input: &[u8], start: u32, out: &mut [u32]) -> Result<usize> {
        let ctrl = control_len(out.len());
        ensure_len(input, ctrl, "quad control stream")?;
        let mut pos = ctrl;
        let mut acc = start;
        for (q, quad) in out.chunks_mut(QUAD).enumerate() {
            let width = ((input[q / 4] >> (2 * (q % 4))) & 0b11) as usize + 1;
            ensure_len(&input[pos..], width * quad.len(), "quad payload")?;
            for v in quad.iter_mut() {
                acc = acc.wrapping_add(read_le(&input[pos..pos + width]));
                *v = acc;
                pos += width;
            }
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
    fn test_quad_shares_widest_length() {
        // one wide delta forces its whole quad to 3 bytes per lane
        let input = [1u32, 2, 3, 70_003, 70_004, 70_005, 70_006, 70_007];
        let mut out = Vec::new();
        let n = StreamVByteQuad128::encode(&input, 0, &mut out);
        assert_eq!(out[0], 0b00_10);
        assert_eq!(n, 1 + 4 * 3 + 4);

        let mut decoded = [0u32; 8];
        assert_eq!(StreamVByteQuad128::decode(&out, 0, &mut decoded).unwrap(), n);
        assert_eq!(decoded, input);
    }

    #[test]
    fn test_partial_quad() {
        let input = [10u32, 20, 30, 40, 50, 300];
        let mut out = Vec::new();
        let n = StreamVByteQuad128::encode(&input, 5, &mut out);
        // second quad holds two lanes, delta 250 fits in one byte
        assert_eq!(n, 1 + 4 + 2);
        let mut decoded = [0u32; 6];
        StreamVByteQuad128::decode(&out, 5, &mut decoded).unwrap();
        assert_eq!(decoded, input);
    }

    #[test]
    fn test_full_block_sizes() {
        assert_eq!(control_len(128), 8);
        assert_eq!(control_len(256), 16);
        let block: Vec<u32> = (0..256u32).map(|i| i * 3).collect();
        let mut out = Vec::new();
        assert_eq!(StreamVByteQuad256::encode(&block, 0, &mut out), 16 + 256);
        assert!(out.len() <= StreamVByteQuad256::estimate_compressed_size());
    }

    #[test]
    fn test_truncated() {
        let input = [1u32 << 20; 8];
        let mut out = Vec::new();
        StreamVByteQuad128::encode(&input, 0, &mut out);
        let mut decoded = [0u32; 8];
        assert!(StreamVByteQuad128::decode(&out[..5], 0, &mut decoded).is_err());
    }
}
