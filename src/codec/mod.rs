//! Integer codecs for offset blocks and keys.
//!
//! Leaf primitives (`vbyte`, `vbkey`, `delta`) are plain functions. The block
//! codecs implement [`BlockCodec`] and are selected at write time by
//! [`Method`]; readers recover the method from the one-byte tag stored in
//! every chunk header and in the index trailer.
//!
//! All block codecs except `Uncompressed` are D1: they delta-code the block
//! against a start value before packing, so inputs are expected to be
//! non-decreasing. Decreasing input still round-trips through wrapping
//! arithmetic but compresses badly.

pub mod bitpack;
pub mod delta;
pub mod quad;
pub mod streamvbyte;
pub mod uncompressed;
pub mod vbkey;
pub mod vbyte;

pub use bitpack::BitPackD1;
pub use quad::StreamVByteQuadD1;
pub use streamvbyte::StreamVByteD1;
pub use uncompressed::Uncompressed;

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};

/// Block codec over fixed-width blocks of 32-bit offsets.
///
/// `encode` accepts up to `BLOCK_LEN` values; writers always pass full,
/// padded blocks. `decode` produces exactly `out.len()` values and returns
/// the number of input bytes consumed.
pub trait BlockCodec {
    const METHOD: Method;
    const BLOCK_LEN: usize;

    /// Encode `input` delta-coded against `start`. Returns bytes written.
    fn encode(input: &[u32], start: u32, out: &mut Vec<u8>) -> usize;

    /// Decode `out.len()` values, undoing the delta against `start`.
    fn decode(input: &[u8], start: u32, out: &mut [u32]) -> Result<usize>;

    /// Upper bound on the encoded size of one full block.
    fn estimate_compressed_size() -> usize;
}

/// Compression method tag, stored as one byte on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Method {
    #[serde(rename = "uncompressed128")]
    Uncompressed128 = 0x10,
    #[serde(rename = "uncompressed256")]
    Uncompressed256 = 0x11,
    #[serde(rename = "bitpack128")]
    BitPack128 = 0x20,
    #[serde(rename = "bitpack256")]
    BitPack256 = 0x21,
    #[serde(rename = "streamvbyte128")]
    StreamVByte128 = 0x30,
    #[serde(rename = "streamvbyte256")]
    StreamVByte256 = 0x31,
    /// Quad-grouped stream-vbyte. Format introduced by this crate.
    #[serde(rename = "streamvbyte_quad128")]
    StreamVByteQuad128 = 0x40,
    #[serde(rename = "streamvbyte_quad256")]
    StreamVByteQuad256 = 0x41,
}

impl Method {
    pub const ALL: [Method; 8] = [
        Method::Uncompressed128,
        Method::Uncompressed256,
        Method::BitPack128,
        Method::BitPack256,
        Method::StreamVByte128,
        Method::StreamVByte256,
        Method::StreamVByteQuad128,
        Method::StreamVByteQuad256,
    ];

    pub fn from_u8(v: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|m| *m as u8 == v)
    }

    /// Parse a method tag, reporting unknown values as malformed input.
    pub fn from_tag(v: u8) -> Result<Self> {
        Self::from_u8(v)
            .ok_or_else(|| IndexError::InvalidFormat(format!("Unknown method tag: 0x{:02x}", v)))
    }

    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Number of offsets per compressed block.
    pub fn block_len(self) -> usize {
        match self {
            Method::Uncompressed128
            | Method::BitPack128
            | Method::StreamVByte128
            | Method::StreamVByteQuad128 => 128,
            Method::Uncompressed256
            | Method::BitPack256
            | Method::StreamVByte256
            | Method::StreamVByteQuad256 => 256,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Method::Uncompressed128 => "uncompressed128",
            Method::Uncompressed256 => "uncompressed256",
            Method::BitPack128 => "bitpack128",
            Method::BitPack256 => "bitpack256",
            Method::StreamVByte128 => "streamvbyte128",
            Method::StreamVByte256 => "streamvbyte256",
            Method::StreamVByteQuad128 => "streamvbyte_quad128",
            Method::StreamVByteQuad256 => "streamvbyte_quad256",
        }
    }
}

impl Default for Method {
    fn default() -> Self {
        Method::StreamVByte128
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Method {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.name() == s)
            .ok_or_else(|| IndexError::InvalidArgument(format!("Unknown method: {}", s)))
    }
}

/// Fail with a truncation error unless `input` holds at least `needed` bytes.
pub(crate) fn ensure_len(input: &[u8], needed: usize, what: &str) -> Result<()> {
    if input.len() < needed {
        return Err(IndexError::InvalidFormat(format!(
            "Truncated {}: need {} bytes, have {}",
            what,
            needed,
            input.len()
        )));
    }
    Ok(())
}
