//! Observable events of the chunked store
//!
//! Events are explicit and typed. Every log line emitted by the store
//! and the CLI uses one of these names.

use std::fmt;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Configuration loaded
    ConfigLoaded,
    /// Backend opened
    BackendOpened,
    /// A write command runs on a backend that does not outlive the process
    VolatileBackend,

    // Write path
    /// store() called
    StoreBegin,
    /// Document written as a single record
    DirectWrite,
    /// Backend refused a direct write, falling back to chunks
    DirectWriteRejected,
    /// Document is being split into chunks
    ChunkedWriteBegin,
    /// Metadata record written
    MetadataWritten,
    /// One chunk record written
    ChunkWritten,
    /// Chunk record over the ceiling, compactor applied
    ChunkCompacted,
    /// Chunked write finished
    ChunkedWriteComplete,
    /// store() aborted
    StoreFailed,

    // Splitting
    /// A single array item exceeds the chunk budget
    OversizedItem,
    /// A single field exceeds the chunk budget and is split recursively
    OversizedField,
    /// A scalar field exceeds the chunk budget and was replaced by a sentinel
    ValueTooLarge,

    // Read path
    /// load() called
    LoadBegin,
    /// Key absent
    LoadNotFound,
    /// Direct record returned
    LoadDirect,
    /// Chunked document reassembled
    LoadReassembled,
    /// A chunk record was absent on read
    ChunkMissing,
    /// A chunk record had an unexpected shape
    ChunkMalformed,
    /// Two chunks carried the same field
    FieldCollision,
    /// Read failed, reported as not found
    LoadFailed,

    // Migration
    /// Migration started
    MigrateBegin,
    /// One file migrated
    MigrateFile,
    /// One file failed to migrate
    MigrateFileFailed,
    /// Migration finished
    MigrateComplete,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::BackendOpened => "BACKEND_OPENED",
            Event::VolatileBackend => "VOLATILE_BACKEND",

            Event::StoreBegin => "STORE_BEGIN",
            Event::DirectWrite => "DIRECT_WRITE",
            Event::DirectWriteRejected => "DIRECT_WRITE_REJECTED",
            Event::ChunkedWriteBegin => "CHUNKED_WRITE_BEGIN",
            Event::MetadataWritten => "METADATA_WRITTEN",
            Event::ChunkWritten => "CHUNK_WRITTEN",
            Event::ChunkCompacted => "CHUNK_COMPACTED",
            Event::ChunkedWriteComplete => "CHUNKED_WRITE_COMPLETE",
            Event::StoreFailed => "STORE_FAILED",

            Event::OversizedItem => "OVERSIZED_ITEM",
            Event::OversizedField => "OVERSIZED_FIELD",
            Event::ValueTooLarge => "VALUE_TOO_LARGE",

            Event::LoadBegin => "LOAD_BEGIN",
            Event::LoadNotFound => "LOAD_NOT_FOUND",
            Event::LoadDirect => "LOAD_DIRECT",
            Event::LoadReassembled => "LOAD_REASSEMBLED",
            Event::ChunkMissing => "CHUNK_MISSING",
            Event::ChunkMalformed => "CHUNK_MALFORMED",
            Event::FieldCollision => "FIELD_COLLISION",
            Event::LoadFailed => "LOAD_FAILED",

            Event::MigrateBegin => "MIGRATE_BEGIN",
            Event::MigrateFile => "MIGRATE_FILE",
            Event::MigrateFileFailed => "MIGRATE_FILE_FAILED",
            Event::MigrateComplete => "MIGRATE_COMPLETE",
        }
    }

    /// Returns true if this event means a store call was aborted
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::StoreFailed)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
