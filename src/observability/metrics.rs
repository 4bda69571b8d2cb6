//! Counters for the chunked store
//!
//! - Counters only
//! - Monotonic increase
//! - Thread-safe, lock-free

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Registry of operational counters.
///
/// Relaxed ordering throughout; values are exact once the
/// incrementing calls have returned.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    direct_writes: AtomicU64,
    direct_writes_rejected: AtomicU64,
    chunked_writes: AtomicU64,
    chunks_written: AtomicU64,
    chunks_compacted: AtomicU64,
    store_failures: AtomicU64,
    loads: AtomicU64,
    loads_not_found: AtomicU64,
    chunks_missing: AtomicU64,
    read_failures: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    // Write path

    pub fn increment_direct_writes(&self) {
        self.direct_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_direct_writes_rejected(&self) {
        self.direct_writes_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_chunked_writes(&self) {
        self.chunked_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_chunks_written(&self) {
        self.chunks_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_chunks_compacted(&self) {
        self.chunks_compacted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_store_failures(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
    }

    // Read path

    pub fn increment_loads(&self) {
        self.loads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_loads_not_found(&self) {
        self.loads_not_found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_chunks_missing(&self) {
        self.chunks_missing.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_read_failures(&self) {
        self.read_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            direct_writes: self.direct_writes.load(Ordering::Relaxed),
            direct_writes_rejected: self.direct_writes_rejected.load(Ordering::Relaxed),
            chunked_writes: self.chunked_writes.load(Ordering::Relaxed),
            chunks_written: self.chunks_written.load(Ordering::Relaxed),
            chunks_compacted: self.chunks_compacted.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            loads_not_found: self.loads_not_found.load(Ordering::Relaxed),
            chunks_missing: self.chunks_missing.load(Ordering::Relaxed),
            read_failures: self.read_failures.load(Ordering::Relaxed),
        }
    }
}

/// Immutable copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub direct_writes: u64,
    pub direct_writes_rejected: u64,
    pub chunked_writes: u64,
    pub chunks_written: u64,
    pub chunks_compacted: u64,
    pub store_failures: u64,
    pub loads: u64,
    pub loads_not_found: u64,
    pub chunks_missing: u64,
    pub read_failures: u64,
}
