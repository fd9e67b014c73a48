//! Zero-copy index reader.
//!
//! `IndexView` borrows a complete index buffer (mapped file or heap bytes),
//! validates the trailer once, and decodes offset chains on demand. It holds
//! no mutable state, so a view can be shared across threads freely.
//!
//! `make_poly_index_view` reads the method tag from the last byte and
//! returns the matching codec behind the `OffsetIndex` trait object.

use std::marker::PhantomData;

use crate::codec::bitpack::{BitPack128, BitPack256};
use crate::codec::quad::{StreamVByteQuad128, StreamVByteQuad256};
use crate::codec::streamvbyte::{StreamVByte128, StreamVByte256};
use crate::codec::uncompressed::{Uncompressed128, Uncompressed256};
use crate::codec::{BlockCodec, Method};
use crate::error::{IndexError, Result};
use crate::index::format::{read_u32_at, ChunkHeader, Trailer, TRAILER_SIZE};
use crate::index::key::{IndexKey, KeyWidth};
use crate::index::resultset::ResultSet;

/// Largest block width of any method.
const MAX_BLOCK_LEN: usize = 256;

// ── Stats ─────────────────────────────────────────────────────────

/// Region sizes and metadata of one index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    pub method: Method,
    pub key_width: KeyWidth,
    pub key_count: usize,
    pub segment_offset: u64,
    pub chunk_bytes: usize,
    pub key_block_bytes: usize,
    pub offset_block_bytes: usize,
    pub total_bytes: usize,
}

// ── Capability-erased interface ───────────────────────────────────

/// Read-only index of one segment, independent of the codec that wrote it.
///
/// The fixed-width lookups return an empty set when the index stores keys
/// of a different width.
pub trait OffsetIndex: Send + Sync {
    fn method(&self) -> Method;
    fn key_width(&self) -> KeyWidth;
    fn key_count(&self) -> usize;
    fn segment_offset(&self) -> u64;
    fn stats(&self) -> IndexStats;

    fn lookup_forward_16(&self, key: u16) -> Result<ResultSet>;
    fn lookup_forward_32(&self, key: u32) -> Result<ResultSet>;
    fn lookup_forward_64(&self, key: u64) -> Result<ResultSet>;
    fn lookup_forward_128(&self, key: u128) -> Result<ResultSet>;

    /// Lookup for an untyped numeric key, narrowed to the stored width.
    /// A key too large for the width is a miss.
    fn lookup_numeric(&self, key: u128) -> Result<ResultSet>;

    /// Append the offsets of an untyped numeric key to `out`.
    /// Returns false on a miss.
    fn query_numeric(&self, key: u128, out: &mut Vec<u32>) -> Result<bool>;

    /// All stored keys, ascending, widened to u128.
    fn keys(&self) -> Vec<u128>;
}

// ── Typed view ────────────────────────────────────────────────────

/// View over an index written with codec `C`.
pub struct IndexView<'a, C: BlockCodec> {
    bytes: &'a [u8],
    trailer: Trailer,
    _codec: PhantomData<fn() -> C>,
}

impl<C: BlockCodec> Clone for IndexView<'_, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C: BlockCodec> Copy for IndexView<'_, C> {}

impl<'a, C: BlockCodec> IndexView<'a, C> {
    /// Validate the trailer of `bytes` and check it was written by `C`.
    pub fn new(bytes: &'a [u8]) -> Result<Self> {
        let trailer = Trailer::read_from_end(bytes)?;
        if trailer.method != C::METHOD {
            return Err(IndexError::InvalidFormat(format!(
                "Index written with {}, opened as {}",
                trailer.method,
                C::METHOD
            )));
        }
        Ok(Self {
            bytes,
            trailer,
            _codec: PhantomData,
        })
    }

    pub fn trailer(&self) -> &Trailer {
        &self.trailer
    }

    fn key_at<K: IndexKey>(&self, i: usize) -> K {
        let w = K::WIDTH.bytes();
        let start = self.trailer.key_block_offset as usize + i * w;
        K::read_le(&self.bytes[start..start + w])
    }

    /// Position of `key` in the key block.
    ///
    /// Searches block first keys, then inside the one block that can hold
    /// `key`. Padding keys past `key_count` are never considered.
    pub fn find_key<K: IndexKey>(&self, key: K) -> Option<usize> {
        if K::WIDTH != self.trailer.key_width {
            return None;
        }
        let count = self.trailer.key_count as usize;
        let block_len = C::BLOCK_LEN;
        let blocks = (count + block_len - 1) / block_len;
        if blocks == 0 {
            return None;
        }

        // last block whose first key is <= key
        let after = partition_point(blocks, |b| self.key_at::<K>(b * block_len) <= key);
        if after == 0 {
            return None;
        }
        let lo = (after - 1) * block_len;
        let hi = (lo + block_len).min(count);
        let pos = lo + partition_point(hi - lo, |i| self.key_at::<K>(lo + i) < key);
        (pos < hi && self.key_at::<K>(pos) == key).then_some(pos)
    }

    /// Append the offsets stored for `key` to `out`. Returns false on a miss
    /// (including a key-width mismatch).
    pub fn query<K: IndexKey>(&self, key: K, out: &mut Vec<u32>) -> Result<bool> {
        let Some(idx) = self.find_key(key) else {
            return Ok(false);
        };
        let ptr_at = self.trailer.offset_block_offset as usize + idx * 4;
        let pointer = read_u32_at(self.bytes, ptr_at) as usize;
        self.decode_chain(pointer, out)?;
        Ok(true)
    }

    /// Offsets for `key` as a result set tagged with this segment.
    pub fn lookup_forward<K: IndexKey>(&self, key: K) -> Result<ResultSet> {
        let mut values = Vec::new();
        self.query(key, &mut values)?;
        Ok(ResultSet::new(self.trailer.segment_offset, values))
    }

    fn decode_chain(&self, mut pos: usize, out: &mut Vec<u32>) -> Result<()> {
        // chunks live strictly before the key block
        let region = &self.bytes[..self.trailer.key_block_offset as usize];
        let mut block = [0u32; MAX_BLOCK_LEN];
        let block = &mut block[..C::BLOCK_LEN];
        let mut start = 0u32;
        loop {
            if pos >= region.len() {
                return Err(IndexError::InvalidFormat(format!(
                    "Chunk pointer {} outside chunk region of {} bytes",
                    pos,
                    region.len()
                )));
            }
            let (header, header_len) = ChunkHeader::parse(&region[pos..])?;
            if header.method != C::METHOD {
                return Err(IndexError::InvalidFormat(format!(
                    "Chunk at {} tagged {}, index is {}",
                    pos, header.method, C::METHOD
                )));
            }
            pos += header_len;
            pos += C::decode(&region[pos..], start, block)?;

            let count = header.count as usize;
            out.extend_from_slice(&block[..count]);
            start = block[count - 1];
            if header.last {
                return Ok(());
            }
        }
    }

    fn key_list(&self) -> Vec<u128> {
        let count = self.trailer.key_count as usize;
        match self.trailer.key_width {
            KeyWidth::W16 => (0..count).map(|i| self.key_at::<u16>(i).to_u128()).collect(),
            KeyWidth::W32 => (0..count).map(|i| self.key_at::<u32>(i).to_u128()).collect(),
            KeyWidth::W64 => (0..count).map(|i| self.key_at::<u64>(i).to_u128()).collect(),
            KeyWidth::W128 => (0..count).map(|i| self.key_at::<u128>(i)).collect(),
        }
    }
}

/// First index in `0..n` for which `pred` is false, `pred` being
/// true-then-false over the range.
fn partition_point(n: usize, pred: impl Fn(usize) -> bool) -> usize {
    let (mut lo, mut hi) = (0, n);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if pred(mid) {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

impl<C: BlockCodec> OffsetIndex for IndexView<'_, C> {
    fn method(&self) -> Method {
        C::METHOD
    }

    fn key_width(&self) -> KeyWidth {
        self.trailer.key_width
    }

    fn key_count(&self) -> usize {
        self.trailer.key_count as usize
    }

    fn segment_offset(&self) -> u64 {
        self.trailer.segment_offset
    }

    fn stats(&self) -> IndexStats {
        let t = &self.trailer;
        IndexStats {
            method: t.method,
            key_width: t.key_width,
            key_count: t.key_count as usize,
            segment_offset: t.segment_offset,
            chunk_bytes: t.key_block_offset as usize,
            key_block_bytes: (t.offset_block_offset - t.key_block_offset) as usize,
            offset_block_bytes: self.bytes.len() - TRAILER_SIZE - t.offset_block_offset as usize,
            total_bytes: self.bytes.len(),
        }
    }

    fn lookup_forward_16(&self, key: u16) -> Result<ResultSet> {
        self.lookup_forward(key)
    }

    fn lookup_forward_32(&self, key: u32) -> Result<ResultSet> {
        self.lookup_forward(key)
    }

    fn lookup_forward_64(&self, key: u64) -> Result<ResultSet> {
        self.lookup_forward(key)
    }

    fn lookup_forward_128(&self, key: u128) -> Result<ResultSet> {
        self.lookup_forward(key)
    }

    fn lookup_numeric(&self, key: u128) -> Result<ResultSet> {
        let mut values = Vec::new();
        self.query_numeric(key, &mut values)?;
        Ok(ResultSet::new(self.trailer.segment_offset, values))
    }

    fn query_numeric(&self, key: u128, out: &mut Vec<u32>) -> Result<bool> {
        match self.trailer.key_width {
            KeyWidth::W16 => u16::from_u128(key).map_or(Ok(false), |k| self.query(k, out)),
            KeyWidth::W32 => u32::from_u128(key).map_or(Ok(false), |k| self.query(k, out)),
            KeyWidth::W64 => u64::from_u128(key).map_or(Ok(false), |k| self.query(k, out)),
            KeyWidth::W128 => self.query(key, out),
        }
    }

    fn keys(&self) -> Vec<u128> {
        self.key_list()
    }
}

// ── Factory ───────────────────────────────────────────────────────

/// Open `bytes` with whichever codec its trailer names.
pub fn make_poly_index_view<'a>(bytes: &'a [u8]) -> Result<Box<dyn OffsetIndex + 'a>> {
    let tag = *bytes
        .last()
        .ok_or_else(|| IndexError::InvalidFormat("Empty index buffer".into()))?;
    let view: Box<dyn OffsetIndex + 'a> = match Method::from_tag(tag)? {
        Method::Uncompressed128 => Box::new(IndexView::<Uncompressed128>::new(bytes)?),
        Method::Uncompressed256 => Box::new(IndexView::<Uncompressed256>::new(bytes)?),
        Method::BitPack128 => Box::new(IndexView::<BitPack128>::new(bytes)?),
        Method::BitPack256 => Box::new(IndexView::<BitPack256>::new(bytes)?),
        Method::StreamVByte128 => Box::new(IndexView::<StreamVByte128>::new(bytes)?),
        Method::StreamVByte256 => Box::new(IndexView::<StreamVByte256>::new(bytes)?),
        Method::StreamVByteQuad128 => Box::new(IndexView::<StreamVByteQuad128>::new(bytes)?),
        Method::StreamVByteQuad256 => Box::new(IndexView::<StreamVByteQuad256>::new(bytes)?),
    };
    Ok(view)
}

// ── Tests ─────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::builder::IndexBuilder;
    use crate::index::serializer::serialize_to_vec;

    fn sample(method: Method) -> Vec<u8> {
        let mut b = IndexBuilder::<u32>::for_method(method);
        b.add(23421337, 16);
        b.add(13372342, 24);
        b.add(23421337, 400);
        b.add(1, 300);
        b.add(13372342, 3000);
        serialize_to_vec(b, method, 0).unwrap()
    }

    #[test]
    fn test_lookup_sample_keys() {
        let bytes = sample(Method::BitPack128);
        let view = make_poly_index_view(&bytes).unwrap();
        assert_eq!(view.lookup_forward_32(1).unwrap().values(), &[300]);
        assert_eq!(view.lookup_forward_32(13372342).unwrap().values(), &[24, 3000]);
        assert_eq!(view.lookup_forward_32(23421337).unwrap().values(), &[16, 400]);
        assert!(view.lookup_forward_128(1).unwrap().is_empty());
        assert!(view.lookup_forward_16(1).unwrap().is_empty());
    }

    #[test]
    fn test_miss_is_empty_not_error() {
        let bytes = sample(Method::StreamVByte256);
        let view = make_poly_index_view(&bytes).unwrap();
        let r = view.lookup_forward_32(2).unwrap();
        assert!(r.is_empty());
        assert_eq!(r.segment_offset(), Some(0));
        assert!(view.lookup_forward_32(0).unwrap().is_empty());
        assert!(view.lookup_forward_32(u32::MAX).unwrap().is_empty());
    }

    #[test]
    fn test_typed_view_query_appends() {
        let bytes = sample(Method::StreamVByte128);
        let view = IndexView::<StreamVByte128>::new(&bytes).unwrap();
        let mut out = vec![7];
        assert!(view.query(13372342u32, &mut out).unwrap());
        assert!(!view.query(5u32, &mut out).unwrap());
        assert_eq!(out, vec![7, 24, 3000]);
    }

    #[test]
    fn test_typed_view_rejects_other_codec() {
        let bytes = sample(Method::BitPack128);
        assert!(IndexView::<StreamVByte128>::new(&bytes).is_err());
    }

    #[test]
    fn test_numeric_lookup_narrows() {
        let mut b = IndexBuilder::<u16>::new(128);
        b.add(443, 10);
        let bytes = serialize_to_vec(b, Method::Uncompressed128, 0).unwrap();
        let view = make_poly_index_view(&bytes).unwrap();
        assert_eq!(view.lookup_numeric(443).unwrap().values(), &[10]);
        assert!(view.lookup_numeric(443 + 65536).unwrap().is_empty());
    }

    #[test]
    fn test_many_keys_across_key_blocks() {
        let mut b = IndexBuilder::<u64>::new(128);
        for k in 0..1000u64 {
            b.add(k * 3, k as u32);
        }
        let bytes = serialize_to_vec(b, Method::BitPack128, 9).unwrap();
        let view = make_poly_index_view(&bytes).unwrap();
        assert_eq!(view.key_count(), 1000);
        for k in [0u64, 381, 384, 2997, 1500] {
            assert_eq!(view.lookup_forward_64(k).unwrap().values(), &[(k / 3) as u32]);
        }
        for k in [1u64, 385, 2998, 5000] {
            assert!(view.lookup_forward_64(k).unwrap().is_empty());
        }
        assert_eq!(view.keys().len(), 1000);
    }

    #[test]
    fn test_long_chain_across_chunks() {
        let mut b = IndexBuilder::<u128>::new(256);
        let offsets: Vec<u32> = (0..1000u32).map(|i| i * 1500).collect();
        for &o in &offsets {
            b.add(u128::MAX, o);
        }
        let bytes = serialize_to_vec(b, Method::StreamVByteQuad256, 0).unwrap();
        let view = make_poly_index_view(&bytes).unwrap();
        assert_eq!(view.lookup_forward_128(u128::MAX).unwrap().values(), offsets.as_slice());
    }

    #[test]
    fn test_stats() {
        let bytes = sample(Method::BitPack256);
        let stats = make_poly_index_view(&bytes).unwrap().stats();
        assert_eq!(stats.key_count, 3);
        assert_eq!(stats.key_width, KeyWidth::W32);
        assert_eq!(stats.key_block_bytes, 256 * 4);
        assert_eq!(stats.offset_block_bytes, 256 * 4);
        assert_eq!(stats.total_bytes, bytes.len());
    }

    #[test]
    fn test_corrupt_pointer_is_malformed() {
        let mut bytes = sample(Method::BitPack128);
        let trailer = Trailer::read_from_end(&bytes).unwrap();
        let ob = trailer.offset_block_offset as usize;
        bytes[ob..ob + 4].copy_from_slice(&u32::MAX.to_le_bytes());
        let view = make_poly_index_view(&bytes).unwrap();
        // key 1 sorts first, so its pointer was overwritten
        assert!(view.lookup_forward_32(1).unwrap_err().is_malformed());
    }

    #[test]
    fn test_truncated_buffer_rejected() {
        let bytes = sample(Method::BitPack128);
        assert!(make_poly_index_view(&bytes[..bytes.len() - 1]).is_err());
        assert!(make_poly_index_view(&[]).is_err());
    }
}
