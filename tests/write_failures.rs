//! Write Failure Tests
//!
//! Tests for:
//! - A failed metadata or chunk write aborts the store call
//! - Chunks written before a failure stay on the backend
//! - Metadata that cannot fit under the ceiling is rejected up front
//! - A top-level scalar over the ceiling cannot be stored

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use kvchunk::chunk::{chunk_key, document_key, ChunkError, ChunkLimits, ChunkStore};
use kvchunk::kv::{KvBackend, KvError, KvFuture, KvKey, MemoryBackend};
use serde_json::{json, Value};

// =============================================================================
// Test Utilities
// =============================================================================

/// Backend that fails the `fail_at`-th set call (zero-based)
#[derive(Debug)]
struct FailingBackend {
    inner: MemoryBackend,
    sets: AtomicUsize,
    fail_at: usize,
}

impl FailingBackend {
    fn new(fail_at: usize) -> Self {
        Self {
            inner: MemoryBackend::new(),
            sets: AtomicUsize::new(0),
            fail_at,
        }
    }
}

impl KvBackend for FailingBackend {
    fn get<'a>(&'a self, key: &'a KvKey) -> KvFuture<'a, Option<Value>> {
        self.inner.get(key)
    }

    fn set<'a>(&'a self, key: &'a KvKey, value: Value) -> KvFuture<'a, ()> {
        if self.sets.fetch_add(1, Ordering::SeqCst) == self.fail_at {
            return Box::pin(async { Err(KvError::Io("injected failure".to_string())) });
        }
        self.inner.set(key, value)
    }

    fn delete<'a>(&'a self, key: &'a KvKey) -> KvFuture<'a, ()> {
        self.inner.delete(key)
    }

    fn max_value_bytes(&self) -> usize {
        self.inner.max_value_bytes()
    }
}

fn three_chunk_document() -> Value {
    let rows: Vec<Value> = (0..1_197)
        .map(|i| json!({"id": i, "name": format!("{:0>80}", i)}))
        .collect();
    json!({ "rows": rows })
}

fn store_over(backend: &Arc<FailingBackend>) -> ChunkStore {
    ChunkStore::new(
        Arc::clone(backend) as Arc<dyn KvBackend>,
        ChunkLimits::default(),
    )
}

// =============================================================================
// Backend Write Failures
// =============================================================================

#[tokio::test]
async fn test_metadata_write_failure_is_fatal() {
    let backend = Arc::new(FailingBackend::new(0));
    let store = store_over(&backend);

    let err = store.store("k", &three_chunk_document()).await.unwrap_err();

    assert!(matches!(err, ChunkError::MetadataWriteFailure { .. }));
    assert_eq!(err.code(), "KVCHUNK_METADATA_WRITE_FAILED");
    assert!(err.is_fatal());
    assert_eq!(backend.get(&chunk_key("k", 0)).await.unwrap(), None);
    assert_eq!(store.metrics().store_failures, 1);
}

#[tokio::test]
async fn test_chunk_write_failure_names_the_chunk() {
    // set #0 is metadata, #1 chunk 0, #2 chunk 1
    let backend = Arc::new(FailingBackend::new(2));
    let store = store_over(&backend);

    let err = store.store("k", &three_chunk_document()).await.unwrap_err();

    match &err {
        ChunkError::ChunkWriteFailure { index, total, .. } => {
            assert_eq!(*index, 1);
            assert!(*total > 1);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(err.code(), "KVCHUNK_CHUNK_WRITE_FAILED");
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_chunks_before_failure_are_not_rolled_back() {
    let backend = Arc::new(FailingBackend::new(2));
    let store = store_over(&backend);

    store.store("k", &three_chunk_document()).await.unwrap_err();

    assert!(backend.get(&document_key("k")).await.unwrap().is_some());
    assert!(backend.get(&chunk_key("k", 0)).await.unwrap().is_some());
    assert_eq!(backend.get(&chunk_key("k", 1)).await.unwrap(), None);
}

#[tokio::test]
async fn test_failed_direct_write_falls_back() {
    // The direct write is the first set; chunked writes that follow succeed
    let backend = Arc::new(FailingBackend::new(0));
    let store = store_over(&backend);
    let doc = json!({"a": "x"});

    let outcome = store.store("k", &doc).await.unwrap();

    assert!(outcome.chunked);
    assert_eq!(outcome.chunks_count, Some(1));
    assert_eq!(store.load("k").await, Some(doc));
}

// =============================================================================
// Unstorable Documents
// =============================================================================

#[tokio::test]
async fn test_metadata_too_large() {
    let backend = Arc::new(MemoryBackend::new());
    let store = ChunkStore::new(
        Arc::clone(&backend) as Arc<dyn KvBackend>,
        ChunkLimits::default(),
    );
    let root_key = "r".repeat(61_000);
    let doc = json!({ root_key: [1, 2, 3] });

    let err = store.store("k", &doc).await.unwrap_err();

    match err {
        ChunkError::MetadataTooLarge { size, max } => {
            assert!(size > 61_000);
            assert_eq!(max, 60_000);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(backend.is_empty());
}

#[tokio::test]
async fn test_top_level_scalar_too_large() {
    let store = ChunkStore::in_memory();
    let doc = json!("s".repeat(70_000));

    let err = store.store("k", &doc).await.unwrap_err();

    assert!(matches!(err, ChunkError::UnsplittableDocument { size } if size == 70_002));
    assert!(err.is_fatal());
    assert_eq!(store.load("k").await, None);
}
