//! Segment indexer: the producer side of the write pipeline.
//!
//! Consumes `(offset, key)` pairs from a packet source, keeps one builder
//! per index kind for the current segment, and hands the builders to the
//! background writer whenever the capture position moves past the segment
//! cap. Offsets stored in an index are relative to its segment's first
//! offset, which is recorded in the trailer.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::config::IndexConfig;
use crate::error::{IndexError, Result};
use crate::index::builder::IndexBuilder;
use crate::index::file::{index_path, IndexKind};
use crate::pipeline::writer::{AnyBuilder, IndexWriter, WriteJob, WriterStats};

/// One parsed header field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyVariant {
    Ipv4(u32),
    Ipv6(u128),
    Port(u16),
    Pattern(u64),
}

impl KeyVariant {
    pub fn kind(&self) -> IndexKind {
        match self {
            KeyVariant::Ipv4(_) => IndexKind::Ipv4,
            KeyVariant::Ipv6(_) => IndexKind::Ipv6,
            KeyVariant::Port(_) => IndexKind::Port,
            KeyVariant::Pattern(_) => IndexKind::Pattern,
        }
    }
}

impl From<Ipv4Addr> for KeyVariant {
    fn from(a: Ipv4Addr) -> Self {
        KeyVariant::Ipv4(u32::from(a))
    }
}

impl From<Ipv6Addr> for KeyVariant {
    fn from(a: Ipv6Addr) -> Self {
        KeyVariant::Ipv6(u128::from(a))
    }
}

impl From<IpAddr> for KeyVariant {
    fn from(a: IpAddr) -> Self {
        match a {
            IpAddr::V4(a) => a.into(),
            IpAddr::V6(a) => a.into(),
        }
    }
}

/// Per-kind builders of the segment being filled.
struct SegmentBuilders {
    v4: IndexBuilder<u32>,
    v6: IndexBuilder<u128>,
    port: IndexBuilder<u16>,
    pattern: IndexBuilder<u64>,
}

impl SegmentBuilders {
    fn new(block_len: usize) -> Self {
        Self {
            v4: IndexBuilder::new(block_len),
            v6: IndexBuilder::new(block_len),
            port: IndexBuilder::new(block_len),
            pattern: IndexBuilder::new(block_len),
        }
    }

    fn add(&mut self, key: KeyVariant, offset: u32) {
        match key {
            KeyVariant::Ipv4(k) => self.v4.add(k, offset),
            KeyVariant::Ipv6(k) => self.v6.add(k, offset),
            KeyVariant::Port(k) => self.port.add(k, offset),
            KeyVariant::Pattern(k) => self.pattern.add(k, offset),
        };
    }

    fn into_jobs(self) -> [(IndexKind, AnyBuilder); 4] {
        [
            (IndexKind::Ipv4, AnyBuilder::U32(self.v4)),
            (IndexKind::Ipv6, AnyBuilder::U128(self.v6)),
            (IndexKind::Port, AnyBuilder::U16(self.port)),
            (IndexKind::Pattern, AnyBuilder::U64(self.pattern)),
        ]
    }
}

/// Counters for a whole indexing run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexingSummary {
    pub segments: u32,
    pub pairs: u64,
    pub writer: WriterStats,
}

pub struct SegmentIndexer {
    config: IndexConfig,
    writer: IndexWriter,
    builders: SegmentBuilders,
    seq: u32,
    segment_begin: Option<u64>,
    last_offset: u64,
    segments_submitted: u32,
    pairs: u64,
}

impl SegmentIndexer {
    /// Validate `config`, create the output directory and start the writer.
    pub fn new(config: IndexConfig) -> Result<Self> {
        config.validate()?;
        std::fs::create_dir_all(&config.output_dir)?;
        let writer = IndexWriter::spawn(config.mailbox_capacity)?;
        let builders = SegmentBuilders::new(config.method.block_len());
        Ok(Self {
            config,
            writer,
            builders,
            seq: 0,
            segment_begin: None,
            last_offset: 0,
            segments_submitted: 0,
            pairs: 0,
        })
    }

    /// Sequence number of the segment currently being filled.
    pub fn current_seq(&self) -> u32 {
        self.seq
    }

    /// Index `key` at absolute capture position `offset`.
    ///
    /// Offsets must not decrease across calls.
    pub fn add(&mut self, offset: u64, key: KeyVariant) -> Result<()> {
        if offset < self.last_offset {
            return Err(IndexError::InvalidArgument(format!(
                "offset {} is before previous offset {}",
                offset, self.last_offset
            )));
        }
        self.last_offset = offset;

        let mut begin = *self.segment_begin.get_or_insert(offset);
        if offset - begin > self.config.segment_cap {
            self.roll()?;
            self.segment_begin = Some(offset);
            begin = offset;
        }
        self.builders.add(key, (offset - begin) as u32);
        self.pairs += 1;
        Ok(())
    }

    /// Hand the current segment to the writer and start the next one.
    fn roll(&mut self) -> Result<()> {
        let Some(begin) = self.segment_begin.take() else {
            return Ok(());
        };
        let block_len = self.config.method.block_len();
        let builders = std::mem::replace(&mut self.builders, SegmentBuilders::new(block_len));

        tracing::debug!("closing segment {} at capture offset {}", self.seq, begin);
        for (kind, builder) in builders.into_jobs() {
            if builder.is_empty() {
                continue;
            }
            self.writer.submit(WriteJob {
                path: index_path(&self.config.output_dir, &self.config.prefix, self.seq, kind),
                method: self.config.method,
                segment_offset: begin,
                builder,
            })?;
        }
        self.seq += 1;
        self.segments_submitted += 1;
        Ok(())
    }

    /// Write the last segment and wait for every queued file.
    ///
    /// Fails with `WriteFailed` if any index file could not be written.
    pub fn finish(mut self) -> Result<IndexingSummary> {
        self.roll()?;
        let SegmentIndexer {
            writer,
            segments_submitted,
            pairs,
            ..
        } = self;
        let stats = writer.shutdown()?;
        if stats.failures > 0 {
            return Err(IndexError::WriteFailed {
                failed: stats.failures,
                written: stats.files_written,
            });
        }
        Ok(IndexingSummary {
            segments: segments_submitted,
            pairs,
            writer: stats,
        })
    }
}

// ── Tests ──────────────────────────────────────────────────────────
