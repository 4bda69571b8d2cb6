//! Chunked store error types
//!
//! Error codes:
//! - KVCHUNK_METADATA_TOO_LARGE (fatal for the store call)
//! - KVCHUNK_METADATA_WRITE_FAILED (fatal for the store call)
//! - KVCHUNK_CHUNK_WRITE_FAILED (fatal for the store call)
//! - KVCHUNK_UNSPLITTABLE_DOCUMENT (fatal for the store call)
//! - KVCHUNK_RESERVED_FIELD_NAME (fatal for the store call)
//! - KVCHUNK_INVALID_RECORD (read side, reported as not found)
//! - KVCHUNK_BACKEND (read side, reported as not found)
//!
//! Conditions the store recovers from locally (rejected direct writes,
//! oversized chunk records, oversized scalars, missing chunks) are logged
//! and counted, never returned.

use thiserror::Error;

use crate::kv::KvError;

/// Result type for chunked store operations
pub type ChunkResult<T> = Result<T, ChunkError>;

/// Chunked store errors
#[derive(Debug, Error)]
pub enum ChunkError {
    /// The metadata record alone does not fit under the direct-write ceiling
    #[error("Metadata record too large: {size} bytes (max: {max})")]
    MetadataTooLarge { size: usize, max: usize },

    #[error("Failed to write metadata record: {source}")]
    MetadataWriteFailure {
        #[source]
        source: KvError,
    },

    /// Earlier chunks stay on the backend; nothing is rolled back
    #[error("Failed to write chunk {index} of {total}: {source}")]
    ChunkWriteFailure {
        index: usize,
        total: usize,
        #[source]
        source: KvError,
    },

    /// A scalar too large for a direct write has no chunked representation
    #[error("Document of {size} bytes is a scalar and cannot be split")]
    UnsplittableDocument { size: usize },

    /// A payload field would land on a chunk envelope field name
    #[error("Field '{field}' collides with a reserved chunk envelope field")]
    ReservedFieldName { field: String },

    #[error("Invalid stored record: {0}")]
    InvalidRecord(String),

    #[error("Backend error: {0}")]
    Backend(#[from] KvError),
}

impl ChunkError {
    /// Stable error code string
    pub fn code(&self) -> &'static str {
        match self {
            ChunkError::MetadataTooLarge { .. } => "KVCHUNK_METADATA_TOO_LARGE",
            ChunkError::MetadataWriteFailure { .. } => "KVCHUNK_METADATA_WRITE_FAILED",
            ChunkError::ChunkWriteFailure { .. } => "KVCHUNK_CHUNK_WRITE_FAILED",
            ChunkError::UnsplittableDocument { .. } => "KVCHUNK_UNSPLITTABLE_DOCUMENT",
            ChunkError::ReservedFieldName { .. } => "KVCHUNK_RESERVED_FIELD_NAME",
            ChunkError::InvalidRecord(_) => "KVCHUNK_INVALID_RECORD",
            ChunkError::Backend(_) => "KVCHUNK_BACKEND",
        }
    }

    /// Whether this error aborts a store call
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ChunkError::MetadataTooLarge { .. }
                | ChunkError::MetadataWriteFailure { .. }
                | ChunkError::ChunkWriteFailure { .. }
                | ChunkError::UnsplittableDocument { .. }
                | ChunkError::ReservedFieldName { .. }
        )
    }
}

impl From<serde_json::Error> for ChunkError {
    fn from(e: serde_json::Error) -> Self {
        ChunkError::InvalidRecord(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_write_errors_are_fatal() {
        assert!(ChunkError::MetadataTooLarge { size: 70_000, max: 60_000 }.is_fatal());
        assert!(ChunkError::UnsplittableDocument { size: 1 }.is_fatal());
        assert!(ChunkError::ReservedFieldName { field: "_path".into() }.is_fatal());
        assert!(ChunkError::ChunkWriteFailure {
            index: 2,
            total: 5,
            source: KvError::Io("boom".into()),
        }
        .is_fatal());
    }

    #[test]
    fn test_read_errors_are_not_fatal() {
        assert!(!ChunkError::InvalidRecord("bad".into()).is_fatal());
        assert!(!ChunkError::Backend(KvError::LockPoisoned).is_fatal());
    }

    #[test]
    fn test_chunk_write_failure_keeps_source() {
        let err = ChunkError::ChunkWriteFailure {
            index: 3,
            total: 4,
            source: KvError::ValueTooLarge { size: 70_000, max: 65_536 },
        };
        assert_eq!(err.code(), "KVCHUNK_CHUNK_WRITE_FAILED");
        assert!(err.to_string().contains("chunk 3 of 4"));
        assert!(err.source().is_some());
    }
}
