//! pktidx: compressed inverted indexes over packet-capture segments.
//!
//! Maps packet-header keys (IPv4/IPv6 addresses, ports, pattern ids) to
//! byte offsets within a capture segment, so a capture can be sliced by
//! query without a full scan.
//!
//! - [`codec`]: varints, delta transform and block codecs
//! - [`index`]: builder, serializer, zero-copy view, result sets, files
//! - [`query`]: set-algebra query AST, parser and evaluator
//! - [`pipeline`]: segment rolling and the background writer
//! - [`config`]: JSON indexing configuration

pub mod codec;
pub mod config;
pub mod error;
pub mod index;
pub mod pipeline;
pub mod query;

pub use codec::Method;
pub use config::IndexConfig;
pub use error::{IndexError, Result};
pub use index::{make_poly_index_view, IndexBuilder, IndexKind, OffsetIndex, ResultSet};
pub use pipeline::{KeyVariant, SegmentIndexer};
pub use query::{Environment, Evaluator, Expr};
