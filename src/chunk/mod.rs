//! Chunked JSON storage
//!
//! Stores JSON documents of any size on a key-value backend that caps the
//! size of a single value.
//!
//! # Write path
//!
//! 1. A document within the direct-write limit is stored as-is.
//! 2. Otherwise it is split into pieces of at most the chunk body limit.
//!    A metadata record goes under the document key, then one chunk
//!    record per piece.
//! 3. A chunk record that still exceeds the direct-write limit is
//!    compacted: fields that do not fit are replaced by size markers.
//!
//! # Read path
//!
//! The metadata record says how many chunks to fetch and how to merge
//! them. Missing chunks are skipped; any other failure reads as absent.

mod compactor;
mod errors;
mod inspect;
mod reader;
mod record;
mod size;
mod splitter;
mod store;
mod writer;

pub use compactor::{compact, DEFAULT_COMPACTION_MARGIN};
pub use errors::{ChunkError, ChunkResult};
pub use inspect::{LargestEntry, Layout, RecordSummary, ShapeReport};
pub use reader::ChunkReader;
pub use record::{
    chunk_key, document_key, is_envelope_field, is_metadata_shaped, ChunkRecord, ChunkedMeta,
    DataType, StorageRecord, CHUNK_INDEX_FIELD, CHUNK_NAMESPACE, DOCUMENT_NAMESPACE, ITEMS_FIELD,
    OVERSIZED_FIELD, PARTS_FIELD, PART_FIELD, PATH_FIELD, TOTAL_CHUNKS_FIELD,
};
pub use size::{entry_size, size_of, string_size};
pub use splitter::{split, split_array, Chunk, GroupPosition, VALUE_TOO_LARGE};
pub use store::ChunkStore;
pub use writer::{ChunkWriter, StoreOutcome};

/// Largest document stored as a single record
pub const DEFAULT_DIRECT_WRITE_LIMIT: usize = 60_000;

/// Budget for the payload of one chunk
pub const DEFAULT_CHUNK_BODY_LIMIT: usize = 40_000;

/// Size thresholds used by the write path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLimits {
    /// Documents up to this size are written directly; also the ceiling
    /// for every metadata and chunk record
    pub direct_write_limit: usize,
    /// Budget for one chunk's payload, leaving room for the envelope
    pub chunk_body_limit: usize,
    /// Headroom the compactor keeps free
    pub compaction_margin: usize,
}

impl Default for ChunkLimits {
    fn default() -> Self {
        Self {
            direct_write_limit: DEFAULT_DIRECT_WRITE_LIMIT,
            chunk_body_limit: DEFAULT_CHUNK_BODY_LIMIT,
            compaction_margin: DEFAULT_COMPACTION_MARGIN,
        }
    }
}
