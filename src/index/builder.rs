//! In-memory index builder.
//!
//! Offsets are appended per key into chains of fixed-capacity chunks that
//! live in one shared arena. Each chunk is one future compressed block, so
//! the block width is fixed when the builder is created and must match the
//! serializer's method.
//!
//! `accept` consumes the builder: adding after serialization, or
//! serializing twice, does not compile.

use std::collections::BTreeMap;

use crate::codec::Method;
use crate::error::{IndexError, Result};
use crate::index::key::IndexKey;
use crate::index::serializer::{ChunkPosition, Serializer};

// ── Chunked Vector ────────────────────────────────────────────────

/// Link terminator for chunk chains.
const NO_CHUNK: u32 = u32::MAX;

#[derive(Debug)]
struct Chunk {
    values: Vec<u32>,
    next: u32,
}

/// Head/tail handle of one key's chunk chain.
#[derive(Debug, Clone, Copy)]
pub struct ChunkChain {
    head: u32,
    tail: u32,
    len: usize,
    last: u32,
}

impl ChunkChain {
    /// Number of stored offsets.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Most recently pushed offset.
    pub fn last(&self) -> u32 {
        self.last
    }
}

/// Arena of fixed-capacity chunks linked by index.
#[derive(Debug)]
pub struct ChunkedVec {
    chunks: Vec<Chunk>,
    block_len: usize,
}

impl ChunkedVec {
    pub fn new(block_len: usize) -> Self {
        Self {
            chunks: Vec::new(),
            block_len,
        }
    }

    pub fn block_len(&self) -> usize {
        self.block_len
    }

    /// Number of allocated chunks across all chains.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    fn alloc(&mut self) -> u32 {
        self.chunks.push(Chunk {
            values: Vec::with_capacity(self.block_len),
            next: NO_CHUNK,
        });
        (self.chunks.len() - 1) as u32
    }

    /// Start a chain holding `first`.
    pub fn new_chain(&mut self, first: u32) -> ChunkChain {
        let idx = self.alloc();
        self.chunks[idx as usize].values.push(first);
        ChunkChain {
            head: idx,
            tail: idx,
            len: 1,
            last: first,
        }
    }

    /// Append `value` unless it equals the chain's last value.
    ///
    /// Returns true when the value was stored.
    pub fn push(&mut self, chain: &mut ChunkChain, value: u32) -> bool {
        if chain.len > 0 && chain.last == value {
            return false;
        }
        if self.chunks[chain.tail as usize].values.len() == self.block_len {
            let idx = self.alloc();
            self.chunks[chain.tail as usize].next = idx;
            chain.tail = idx;
        }
        self.chunks[chain.tail as usize].values.push(value);
        chain.len += 1;
        chain.last = value;
        true
    }

    /// Chunks of `chain` in order, each with its real (unpadded) values.
    pub fn chunks<'a>(&'a self, chain: &ChunkChain) -> impl Iterator<Item = &'a [u32]> + 'a {
        let mut cursor = chain.head;
        std::iter::from_fn(move || {
            if cursor == NO_CHUNK {
                return None;
            }
            let chunk = &self.chunks[cursor as usize];
            cursor = chunk.next;
            Some(chunk.values.as_slice())
        })
    }

    /// Flatten a chain into one vector.
    pub fn to_vec(&self, chain: &ChunkChain) -> Vec<u32> {
        let mut out = Vec::with_capacity(chain.len);
        for chunk in self.chunks(chain) {
            out.extend_from_slice(chunk);
        }
        out
    }
}

// ── Index Builder ─────────────────────────────────────────────────

/// Sizes reported by a completed `accept`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AcceptStats {
    pub key_count: usize,
    pub value_count: usize,
    pub chunk_count: usize,
    /// Total serialized size including the trailer.
    pub bytes_written: u64,
}

/// Accumulates key -> offsets associations for one segment.
#[derive(Debug)]
pub struct IndexBuilder<K: IndexKey> {
    keys: BTreeMap<K, ChunkChain>,
    arena: ChunkedVec,
    value_count: usize,
}

impl<K: IndexKey> Default for IndexBuilder<K> {
    fn default() -> Self {
        Self::new(Method::default().block_len())
    }
}

impl<K: IndexKey> IndexBuilder<K> {
    /// Builder producing blocks of `block_len` offsets (128 or 256).
    pub fn new(block_len: usize) -> Self {
        Self {
            keys: BTreeMap::new(),
            arena: ChunkedVec::new(block_len),
            value_count: 0,
        }
    }

    /// Builder whose block width matches `method`.
    pub fn for_method(method: Method) -> Self {
        Self::new(method.block_len())
    }

    pub fn block_len(&self) -> usize {
        self.arena.block_len()
    }

    /// Associate `offset` with `key`. Returns false when `offset` repeats
    /// the last offset recorded for `key` and was skipped.
    pub fn add(&mut self, key: K, offset: u32) -> bool {
        let stored = match self.keys.get_mut(&key) {
            Some(chain) => self.arena.push(chain, offset),
            None => {
                let chain = self.arena.new_chain(offset);
                self.keys.insert(key, chain);
                true
            }
        };
        if stored {
            self.value_count += 1;
        }
        stored
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Total stored offsets across keys.
    pub fn value_count(&self) -> usize {
        self.value_count
    }

    /// Stored offset count for `key`, 0 if absent.
    pub fn count(&self, key: K) -> usize {
        self.keys.get(&key).map_or(0, |c| c.len())
    }

    /// Offsets stored for `key`, in insertion order.
    pub fn offsets(&self, key: K) -> Vec<u32> {
        self.keys
            .get(&key)
            .map(|c| self.arena.to_vec(c))
            .unwrap_or_default()
    }

    /// Keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.keys.keys().copied()
    }

    /// Serialize every key in ascending order, then the key block, the
    /// offset-pointer block and the trailer.
    ///
    /// Final chunks are padded to block width by repeating their last
    /// value, so the delta codecs see non-decreasing full blocks.
    pub fn accept<S: Serializer>(self, serializer: &mut S, segment_begin: u64) -> Result<AcceptStats> {
        let block_len = self.block_len();
        if serializer.method().block_len() != block_len {
            return Err(IndexError::InvalidArgument(format!(
                "Builder block width {} does not match method {}",
                block_len,
                serializer.method()
            )));
        }

        let start = serializer.current_position();
        let mut keys = Vec::with_capacity(self.keys.len());
        let mut pointers = Vec::with_capacity(self.keys.len());
        let mut block = vec![0u32; block_len];

        for (key, chain) in &self.keys {
            keys.push(*key);
            pointers.push(serializer.current_position());

            let mut position = ChunkPosition::FirstChunk;
            let mut remaining = chain.len();
            for values in self.arena.chunks(chain) {
                let n = values.len();
                let tail = values[n - 1];
                block[..n].copy_from_slice(values);
                block[n..].fill(tail);
                remaining -= n;

                serializer.encode_cblock(&block, n, position, remaining == 0)?;
                position = ChunkPosition::ContinuationChunk(tail);
            }
        }

        let keys_begin = serializer.current_position();
        serializer.encode_kblock(&keys)?;
        let offsets_begin = serializer.current_position();
        serializer.encode_oblock(&pointers)?;
        let end = serializer.encode_mblock::<K>(keys_begin, offsets_begin, keys.len() as u32, segment_begin)?;

        Ok(AcceptStats {
            key_count: keys.len(),
            value_count: self.value_count,
            chunk_count: self.arena.chunk_count(),
            bytes_written: (end - start) as u64,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_offset_is_skipped() {
        let mut b = IndexBuilder::<u32>::new(128);
        assert!(b.add(7, 100));
        assert!(!b.add(7, 100));
        assert_eq!(b.count(7), 1);
        assert!(b.add(7, 101));
        assert_eq!(b.count(7), 2);
        assert_eq!(b.value_count(), 2);
    }

    #[test]
    fn test_dedup_only_compares_last_value() {
        let mut b = IndexBuilder::<u16>::new(128);
        b.add(1, 5);
        b.add(1, 6);
        b.add(1, 5);
        assert_eq!(b.offsets(1), vec![5, 6, 5]);
    }

    #[test]
    fn test_keys_are_sorted() {
        let mut b = IndexBuilder::<u64>::new(128);
        for k in [9u64, 3, 7, 1] {
            b.add(k, 0);
        }
        assert_eq!(b.keys().collect::<Vec<_>>(), vec![1, 3, 7, 9]);
        assert_eq!(b.len(), 4);
    }

    #[test]
    fn test_chain_spans_chunks() {
        let mut b = IndexBuilder::<u32>::new(128);
        for off in 0..300u32 {
            b.add(42, off * 2);
        }
        let chain = b.keys[&42];
        let sizes: Vec<usize> = b.arena.chunks(&chain).map(|c| c.len()).collect();
        assert_eq!(sizes, vec![128, 128, 44]);
        assert_eq!(b.offsets(42), (0..300u32).map(|o| o * 2).collect::<Vec<_>>());
    }

    #[test]
    fn test_interleaved_keys_keep_separate_chains() {
        let mut b = IndexBuilder::<u32>::new(128);
        for off in 0..200u32 {
            b.add(off % 2, off);
        }
        assert_eq!(b.count(0), 100);
        assert_eq!(b.count(1), 100);
        assert!(b.offsets(1).iter().all(|o| o % 2 == 1));
        assert_eq!(b.count(5), 0);
        assert!(b.offsets(5).is_empty());
    }
}
