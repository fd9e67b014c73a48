//! Bit-packed D1 blocks.
//!
//! Layout of one block of `n` values:
//!
//! ```text
//! [bit width: u8][ceil(n * width / 8) bytes, LSB-first bitstream]
//! ```
//!
//! The width is that of the largest delta, so a block of identical
//! padding values costs one bit per element.

use crate::codec::delta::delta_maxbits;
use crate::codec::delta::undelta;
use crate::codec::{ensure_len, BlockCodec, Method};
use crate::error::{IndexError, Result};

/// Bit-packing with delta coding, `N` values per block.
#[derive(Debug, Clone, Copy, Default)]
pub struct BitPackD1<const N: usize>;

pub type BitPack128 = BitPackD1<128>;
pub type BitPack256 = BitPackD1<256>;

/// Payload bytes for `n` values at `bits` each.
pub fn packed_len(n: usize, bits: u32) -> usize {
    (n * bits as usize + 7) / 8
}

/// Append `values` to `out` using `bits` bits each.
pub fn pack(values: &[u32], bits: u32, out: &mut Vec<u8>) {
    let mask = low_mask(bits);
    let mut acc = 0u64;
    let mut filled = 0u32;
    for &v in values {
        acc |= (v as u64 & mask) << filled;
        filled += bits;
        while filled >= 8 {
            out.push(acc as u8);
            acc >>= 8;
            filled -= 8;
        }
    }
    if filled > 0 {
        out.push(acc as u8);
    }
}

/// Fill `out` from a bitstream of `bits`-wide values.
///
/// `bytes` must hold at least `packed_len(out.len(), bits)` bytes.
pub fn unpack(bytes: &[u8], bits: u32, out: &mut [u32]) {
    let mask = low_mask(bits);
    let mut acc = 0u64;
    let mut filled = 0u32;
    let mut src = bytes.iter();
    for v in out.iter_mut() {
        while filled < bits {
            acc |= (*src.next().unwrap_or(&0) as u64) << filled;
            filled += 8;
        }
        *v = (acc & mask) as u32;
        acc >>= bits;
        filled -= bits;
    }
}

#[inline]
fn low_mask(bits: u32) -> u64 {
    (1u64 << bits) - 1
}

impl<const N: usize> BlockCodec for BitPackD1<N> {
    const METHOD: Method = if N == 256 {
        Method::BitPack256
    } else {
        Method::BitPack128
    };
    const BLOCK_LEN: usize = N;

    fn encode(input: &[u32], start: u32, out: &mut Vec<u8>) -> usize {
        debug_assert!(input.len() <= N);
        let mut deltas = [0u32; N];
        let deltas = &mut deltas[..input.len()];
        let bits = delta_maxbits(input, start, deltas);
        out.push(bits as u8);
        pack(deltas, bits, out);
        1 + packed_len(input.len(), bits)
    }

    fn decode(input: &[u8], start: u32, out: &mut [u32]) -> Result<usize> {
        ensure_len(input, 1, "bit-packed block header")?;
        let bits = input[0] as u32;
        if bits == 0 || bits > 32 {
            return Err(IndexError::InvalidFormat(format!(
                "Invalid bit width: {}",
                bits
            )));
        }
        let body = packed_len(out.len(), bits);
        ensure_len(&input[1..], body, "bit-packed block")?;
        unpack(&input[1..1 + body], bits, out);
        undelta(out, start);
        Ok(1 + body)
    }

    fn estimate_compressed_size() -> usize {
        1 + N * 4
    }
}
