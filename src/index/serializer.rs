//! Index serializers.
//!
//! A serializer writes the four regions of an index through any `Write`
//! sink and tracks the byte position, which the builder records as key
//! chunk pointers. Positions are u32: an index file is capped at 4 GiB.
//!
//! [`BlockSerializer`] is generic over the block codec; [`serialize_index`]
//! picks the codec for a runtime [`Method`].

use std::io::Write;
use std::marker::PhantomData;

use crate::codec::bitpack::{BitPack128, BitPack256};
use crate::codec::quad::{StreamVByteQuad128, StreamVByteQuad256};
use crate::codec::streamvbyte::{StreamVByte128, StreamVByte256};
use crate::codec::uncompressed::{Uncompressed128, Uncompressed256};
use crate::codec::{BlockCodec, Method};
use crate::error::{IndexError, Result};
use crate::index::builder::{AcceptStats, IndexBuilder};
use crate::index::format::{padded_len, ChunkHeader, Trailer};
use crate::index::key::IndexKey;

/// Where a chunk sits in its key's chain.
///
/// A continuation chunk is delta-coded against the tail value of the
/// previous chunk so the chain decodes as one sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkPosition {
    FirstChunk,
    ContinuationChunk(u32),
}

impl ChunkPosition {
    /// Delta base for this chunk.
    pub fn start_value(self) -> u32 {
        match self {
            ChunkPosition::FirstChunk => 0,
            ChunkPosition::ContinuationChunk(prev_tail) => prev_tail,
        }
    }
}

/// Writes index regions. Each `encode_*` call returns `current_position()`
/// after the write.
pub trait Serializer {
    fn method(&self) -> Method;

    /// Bytes written so far.
    fn current_position(&self) -> u32;

    /// Write one full, padded block of offsets. `count` is the number of
    /// real values; `last` marks the final chunk of a key.
    fn encode_cblock(&mut self, block: &[u32], count: usize, position: ChunkPosition, last: bool) -> Result<u32>;

    /// Write ascending keys, padded to block width.
    fn encode_kblock<K: IndexKey>(&mut self, keys: &[K]) -> Result<u32>;

    /// Write per-key chunk pointers, padded to block width.
    fn encode_oblock(&mut self, pointers: &[u32]) -> Result<u32>;

    /// Write the trailer.
    fn encode_mblock<K: IndexKey>(
        &mut self,
        keys_begin: u32,
        offsets_begin: u32,
        key_count: u32,
        segment_begin: u64,
    ) -> Result<u32>;
}

// ── Block Serializer ──────────────────────────────────────────────

/// Serializer over block codec `C` writing to `W`.
pub struct BlockSerializer<C: BlockCodec, W: Write> {
    out: W,
    position: u64,
    scratch: Vec<u8>,
    _codec: PhantomData<C>,
}

/// Uncompressed serializer for debugging and fuzzing baselines.
pub type BytestreamSerializer<W> = BlockSerializer<Uncompressed128, W>;

impl<C: BlockCodec, W: Write> BlockSerializer<C, W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            position: 0,
            scratch: Vec::with_capacity(C::estimate_compressed_size() + 16),
            _codec: PhantomData,
        }
    }

    /// Recover the sink.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn flush_scratch(&mut self) -> Result<u32> {
        let end = self.position + self.scratch.len() as u64;
        if end > u32::MAX as u64 {
            return Err(IndexError::InvalidArgument(format!(
                "Index exceeds 4 GiB ({} bytes)",
                end
            )));
        }
        self.out.write_all(&self.scratch)?;
        self.scratch.clear();
        self.position = end;
        Ok(end as u32)
    }

    /// Append `items` then repeat the last one up to a block boundary.
    fn write_padded<T: Copy>(&mut self, items: &[T], mut put: impl FnMut(T, &mut Vec<u8>)) -> Result<u32> {
        self.scratch.clear();
        for &item in items {
            put(item, &mut self.scratch);
        }
        if let Some(&tail) = items.last() {
            for _ in items.len()..padded_len(items.len(), C::BLOCK_LEN) {
                put(tail, &mut self.scratch);
            }
        }
        self.flush_scratch()
    }
}

impl<C: BlockCodec, W: Write> Serializer for BlockSerializer<C, W> {
    fn method(&self) -> Method {
        C::METHOD
    }

    fn current_position(&self) -> u32 {
        self.position as u32
    }

    fn encode_cblock(&mut self, block: &[u32], count: usize, position: ChunkPosition, last: bool) -> Result<u32> {
        if block.len() != C::BLOCK_LEN || count == 0 || count > C::BLOCK_LEN {
            return Err(IndexError::InvalidArgument(format!(
                "Chunk of {} ({} real) does not fit {}",
                block.len(),
                count,
                C::METHOD
            )));
        }
        self.scratch.clear();
        ChunkHeader {
            method: C::METHOD,
            count: count as u32,
            last,
        }
        .write(&mut self.scratch);
        C::encode(block, position.start_value(), &mut self.scratch);
        self.flush_scratch()
    }

    fn encode_kblock<K: IndexKey>(&mut self, keys: &[K]) -> Result<u32> {
        self.write_padded(keys, |k, out| k.write_le(out))
    }

    fn encode_oblock(&mut self, pointers: &[u32]) -> Result<u32> {
        self.write_padded(pointers, |p, out| out.extend_from_slice(&p.to_le_bytes()))
    }

    fn encode_mblock<K: IndexKey>(
        &mut self,
        keys_begin: u32,
        offsets_begin: u32,
        key_count: u32,
        segment_begin: u64,
    ) -> Result<u32> {
        self.scratch.clear();
        Trailer {
            key_block_offset: keys_begin,
            offset_block_offset: offsets_begin,
            key_count,
            segment_offset: segment_begin,
            key_width: K::WIDTH,
            method: C::METHOD,
        }
        .write_to(&mut self.scratch)?;
        let end = self.flush_scratch()?;
        self.out.flush()?;
        Ok(end)
    }
}

// ── Method Dispatch ───────────────────────────────────────────────

/// Serialize `builder` with the codec selected by `method`.
///
/// Returns the sink and the accept stats.
pub fn serialize_index<K: IndexKey, W: Write>(
    builder: IndexBuilder<K>,
    method: Method,
    segment_begin: u64,
    out: W,
) -> Result<(W, AcceptStats)> {
    fn run<C: BlockCodec, K: IndexKey, W: Write>(
        builder: IndexBuilder<K>,
        segment_begin: u64,
        out: W,
    ) -> Result<(W, AcceptStats)> {
        let mut serializer = BlockSerializer::<C, W>::new(out);
        let stats = builder.accept(&mut serializer, segment_begin)?;
        Ok((serializer.into_inner(), stats))
    }

    match method {
        Method::Uncompressed128 => run::<Uncompressed128, K, W>(builder, segment_begin, out),
        Method::Uncompressed256 => run::<Uncompressed256, K, W>(builder, segment_begin, out),
        Method::BitPack128 => run::<BitPack128, K, W>(builder, segment_begin, out),
        Method::BitPack256 => run::<BitPack256, K, W>(builder, segment_begin, out),
        Method::StreamVByte128 => run::<StreamVByte128, K, W>(builder, segment_begin, out),
        Method::StreamVByte256 => run::<StreamVByte256, K, W>(builder, segment_begin, out),
        Method::StreamVByteQuad128 => run::<StreamVByteQuad128, K, W>(builder, segment_begin, out),
        Method::StreamVByteQuad256 => run::<StreamVByteQuad256, K, W>(builder, segment_begin, out),
    }
}

/// Serialize into a fresh in-memory buffer.
pub fn serialize_to_vec<K: IndexKey>(builder: IndexBuilder<K>, method: Method, segment_begin: u64) -> Result<Vec<u8>> {
    let (bytes, _) = serialize_index(builder, method, segment_begin, Vec::new())?;
    Ok(bytes)
}

// ── Tests ─────────────────────────────────────────────────────────
