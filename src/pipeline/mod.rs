//! Index write pipeline: segment rolling on the producer thread,
//! serialization on a background writer thread.

pub mod segment;
pub mod writer;

pub use segment::{IndexingSummary, KeyVariant, SegmentIndexer};
pub use writer::{AnyBuilder, IndexWriter, WriteJob, WriterStats};
