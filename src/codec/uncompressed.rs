//! Raw little-endian u32 blocks, no delta. Debugging and fuzzing baseline.

use crate::codec::{ensure_len, BlockCodec, Method};
use crate::error::Result;

#[derive(Debug, Clone, Copy, Default)]
pub struct Uncompressed<const N: usize>;

pub type Uncompressed128 = Uncompressed<128>;
pub type Uncompressed256 = Uncompressed<256>;

impl<const N: usize> BlockCodec for Uncompressed<N> {
    const METHOD: Method = if N == 256 {
        Method::Uncompressed256
    } else {
        Method::Uncompressed128
    };
    const BLOCK_LEN: usize = N;

    fn encode(input: &[u32], _start: u32, out: &mut Vec<u8>) -> usize {
        debug_assert!(input.len() <= N);
        for v in input {
            out.extend_from_slice(&v.to_le_bytes());
        }
        input.len() * 4
    }

    fn decode(input: &[u8], _start: u32, out: &mut [u32]) -> Result<usize> {
        let len = out.len() * 4;
        ensure_len(input, len, "uncompressed block")?;
        for (v, raw) in out.iter_mut().zip(input[..len].chunks_exact(4)) {
            *v = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
        }
        Ok(len)
    }

    fn estimate_compressed_size() -> usize {
        N * 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_layout() {
        let mut out = Vec::new();
        assert_eq!(Uncompressed128::encode(&[1, 0x0102_0304], 99, &mut out), 8);
        assert_eq!(out, vec![1, 0, 0, 0, 4, 3, 2, 1]);

        let mut decoded = [0u32; 2];
        assert_eq!(Uncompressed128::decode(&out, 99, &mut decoded).unwrap(), 8);
        assert_eq!(decoded, [1, 0x0102_0304]);
        assert!(Uncompressed128::decode(&out[..7], 0, &mut decoded).is_err());
    }
}
