//! Binary layout of a serialized index.
//!
//! # File Layout
//!
//! ```text
//! [compressed chunks]        per key, ascending, each with a ChunkHeader
//! [key block]                key_count fixed-width keys, padded to block width
//! [offset-pointer block]     key_count u32 chunk offsets, padded to block width
//! [Trailer]                  32 bytes, always last
//! ```
//!
//! Readers bootstrap from the trailer at `len - TRAILER_SIZE`; every other
//! region is located through it.
//!
//! The trailer layout (`PKIX` magic, key count, version, method in the last
//! byte) is pktidx's own. Files written by other packet indexers with a
//! 1-byte leading method tag are not readable here, and vice versa.

use std::io::Write;

use crate::codec::{vbyte, Method};
use crate::error::{IndexError, Result};
use crate::index::key::KeyWidth;

// ── Trailer ───────────────────────────────────────────────────────

/// Magic bytes at the start of the trailer.
pub const TRAILER_MAGIC: [u8; 4] = *b"PKIX";

/// Trailer format version.
pub const FORMAT_VERSION: u8 = 1;

/// Trailer size in bytes.
pub const TRAILER_SIZE: usize = 32;

/// Index trailer -- exactly 32 bytes, little-endian.
///
/// ```text
/// Offset  Size  Field
/// 0       4     magic: b"PKIX"
/// 4       4     key_block_offset: u32
/// 8       4     offset_block_offset: u32
/// 12      4     key_count: u32
/// 16      8     segment_offset: u64
/// 24      1     key_width: u8 (bytes per key)
/// 25      1     version: u8 = 1
/// 26      5     _reserved
/// 31      1     method: u8
/// ```
///
/// The method tag is the last byte of the file so a reader can pick the
/// codec before parsing anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trailer {
    pub key_block_offset: u32,
    pub offset_block_offset: u32,
    pub key_count: u32,
    /// Absolute capture position all stored offsets are relative to.
    pub segment_offset: u64,
    pub key_width: KeyWidth,
    pub method: Method,
}

impl Trailer {
    /// Write trailer (exactly TRAILER_SIZE bytes).
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(&TRAILER_MAGIC)?;
        w.write_all(&self.key_block_offset.to_le_bytes())?;
        w.write_all(&self.offset_block_offset.to_le_bytes())?;
        w.write_all(&self.key_count.to_le_bytes())?;
        w.write_all(&self.segment_offset.to_le_bytes())?;
        w.write_all(&[self.key_width as u8, FORMAT_VERSION])?;
        w.write_all(&[0u8; 5])?; // reserved
        w.write_all(&[self.method.tag()])?;
        Ok(())
    }

    /// Parse a trailer from exactly TRAILER_SIZE bytes.
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() != TRAILER_SIZE {
            return Err(IndexError::InvalidFormat(format!(
                "Trailer must be {} bytes, got {}",
                TRAILER_SIZE,
                buf.len()
            )));
        }
        if buf[0..4] != TRAILER_MAGIC {
            return Err(IndexError::InvalidFormat(format!(
                "Not an index file: expected PKIX, got {:?}",
                &buf[0..4]
            )));
        }
        if buf[25] != FORMAT_VERSION {
            return Err(IndexError::InvalidFormat(format!(
                "Unsupported index version: {}",
                buf[25]
            )));
        }
        Ok(Self {
            key_block_offset: read_u32_at(buf, 4),
            offset_block_offset: read_u32_at(buf, 8),
            key_count: read_u32_at(buf, 12),
            segment_offset: read_u64_at(buf, 16),
            key_width: KeyWidth::from_tag(buf[24])?,
            method: Method::from_tag(buf[31])?,
        })
    }

    /// Locate and validate the trailer of a complete index buffer.
    ///
    /// Checks that the key and pointer blocks lie inside the buffer, in
    /// order, and are large enough for `key_count` entries.
    pub fn read_from_end(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < TRAILER_SIZE {
            return Err(IndexError::InvalidFormat(format!(
                "File too small for index trailer: {} bytes",
                bytes.len()
            )));
        }
        let end = bytes.len() - TRAILER_SIZE;
        let trailer = Self::from_bytes(&bytes[end..])?;

        let kb = trailer.key_block_offset as usize;
        let ob = trailer.offset_block_offset as usize;
        let padded = trailer.padded_key_count();
        let key_bytes = padded * trailer.key_width.bytes();
        if kb > ob || kb + key_bytes > ob {
            return Err(IndexError::InvalidFormat(format!(
                "Key block [{}..{}) overlaps offset block at {}",
                kb,
                kb + key_bytes,
                ob
            )));
        }
        if ob + padded * 4 > end {
            return Err(IndexError::InvalidFormat(format!(
                "Offset block [{}..{}) runs past trailer at {}",
                ob,
                ob + padded * 4,
                end
            )));
        }
        Ok(trailer)
    }

    /// Key count rounded up to a whole number of blocks.
    pub fn padded_key_count(&self) -> usize {
        padded_len(self.key_count as usize, self.method.block_len())
    }
}

/// `n` rounded up to a multiple of `block_len`.
pub fn padded_len(n: usize, block_len: usize) -> usize {
    (n + block_len - 1) / block_len * block_len
}

// ── Chunk Header ──────────────────────────────────────────────────

/// Header written in front of every compressed chunk.
///
/// ```text
/// [method: u8][vbyte(count << 1 | last)]
/// ```
///
/// `count` is the number of real offsets in the chunk (1..=block_len); the
/// rest of the block is padding. `last` marks the end of a key's chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub method: Method,
    pub count: u32,
    pub last: bool,
}

impl ChunkHeader {
    pub fn write(&self, out: &mut Vec<u8>) -> usize {
        out.push(self.method.tag());
        1 + vbyte::encode(((self.count as u64) << 1) | self.last as u64, out)
    }

    /// Parse a header. Returns (header, bytes consumed).
    pub fn parse(bytes: &[u8]) -> Result<(Self, usize)> {
        let tag = *bytes
            .first()
            .ok_or_else(|| IndexError::InvalidFormat("Truncated chunk header".into()))?;
        let method = Method::from_tag(tag)?;
        let (word, used) = vbyte::decode(&bytes[1..])?;
        let count = word >> 1;
        if count == 0 || count > method.block_len() as u64 {
            return Err(IndexError::InvalidFormat(format!(
                "Chunk count {} out of range for {}",
                count, method
            )));
        }
        Ok((
            Self {
                method,
                count: count as u32,
                last: word & 1 == 1,
            },
            1 + used,
        ))
    }
}

// ── Helpers ───────────────────────────────────────────────────────

#[inline]
pub(crate) fn read_u32_at(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
}

#[inline]
pub(crate) fn read_u64_at(buf: &[u8], offset: usize) -> u64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&buf[offset..offset + 8]);
    u64::from_le_bytes(b)
}

// ── Tests ─────────────────────────────────────────────────────────
