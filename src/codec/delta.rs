//! Delta transform over 32-bit offset blocks.
//!
//! `delta` subtracts each element's predecessor (the first element's
//! predecessor is `start`), `undelta` runs the prefix sum back. Both wrap,
//! so decreasing input produces defined output that still inverts exactly.

/// Lanes used by the wide OR-reduction in [`maxbits`].
const LANES: usize = 8;

/// Bits needed to store `x`, never less than 1.
#[inline]
pub fn bit_width(x: u32) -> u32 {
    32 - (x | 1).leading_zeros()
}

/// In-place delta against `start`.
pub fn delta(block: &mut [u32], start: u32) {
    let mut prev = start;
    for v in block.iter_mut() {
        let cur = *v;
        *v = cur.wrapping_sub(prev);
        prev = cur;
    }
}

/// In-place prefix sum starting from `start`.
pub fn undelta(block: &mut [u32], start: u32) {
    let mut acc = start;
    for v in block.iter_mut() {
        acc = acc.wrapping_add(*v);
        *v = acc;
    }
}

/// Delta `input` into `out` and return the bit width of the largest delta.
pub fn delta_maxbits(input: &[u32], start: u32, out: &mut [u32]) -> u32 {
    debug_assert_eq!(input.len(), out.len());
    let mut prev = start;
    let mut acc = 0u32;
    for (d, &cur) in out.iter_mut().zip(input) {
        *d = cur.wrapping_sub(prev);
        acc |= *d;
        prev = cur;
    }
    bit_width(acc)
}

/// Bit width of the largest value, one bit per element compared.
pub fn maxbits_scalar(values: &[u32]) -> u32 {
    values.iter().map(|&v| bit_width(v)).max().unwrap_or(1)
}

/// Bit width of the largest value via a lane-wise OR reduction.
///
/// Same result as [`maxbits_scalar`]; the fixed-width accumulator lets the
/// compiler vectorize the main loop.
pub fn maxbits(values: &[u32]) -> u32 {
    let mut lanes = [0u32; LANES];
    let mut chunks = values.chunks_exact(LANES);
    for chunk in &mut chunks {
        for (acc, &v) in lanes.iter_mut().zip(chunk) {
            *acc |= v;
        }
    }
    let tail = chunks.remainder().iter().fold(0u32, |a, &v| a | v);
    bit_width(lanes.iter().fold(tail, |a, &v| a | v))
}
