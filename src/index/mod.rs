//! Compressed inverted indexes: key -> offsets within one capture segment.
//!
//! - `builder` accumulates offsets per key in chunked memory.
//! - `serializer` writes chunks, key block, pointer block and trailer.
//! - `view` reads an index back without copying.
//! - `resultset` combines lookups from the same segment.
//! - `file` names, writes and maps index files.

pub mod builder;
pub mod file;
pub mod format;
pub mod key;
pub mod resultset;
pub mod serializer;
pub mod view;

pub use builder::{AcceptStats, ChunkedVec, IndexBuilder};
pub use file::{index_file_name, index_path, write_index_file, IndexKind, IndexSet, MappedIndex};
pub use format::{Trailer, TRAILER_SIZE};
pub use key::{IndexKey, KeyWidth};
pub use resultset::ResultSet;
pub use serializer::{serialize_index, serialize_to_vec, BlockSerializer, ChunkPosition, Serializer};
pub use view::{make_poly_index_view, IndexStats, IndexView, OffsetIndex};
