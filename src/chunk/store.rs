//! Chunked store facade

use std::sync::Arc;

use serde_json::Value;

use super::errors::ChunkResult;
use super::inspect::RecordSummary;
use super::reader::ChunkReader;
use super::writer::{ChunkWriter, StoreOutcome};
use super::ChunkLimits;
use crate::config::ChunkStoreConfig;
use crate::kv::{KvBackend, MemoryBackend};
use crate::observability::{MetricsRegistry, MetricsSnapshot};

/// Store and load JSON documents of any size.
///
/// Cloning is cheap; clones share the backend and counters.
#[derive(Debug, Clone)]
pub struct ChunkStore {
    writer: ChunkWriter,
    reader: ChunkReader,
    backend: Arc<dyn KvBackend>,
    metrics: Arc<MetricsRegistry>,
    limits: ChunkLimits,
}

impl ChunkStore {
    pub fn new(backend: Arc<dyn KvBackend>, limits: ChunkLimits) -> Self {
        let metrics = Arc::new(MetricsRegistry::new());
        Self {
            writer: ChunkWriter::new(Arc::clone(&backend), limits, Arc::clone(&metrics)),
            reader: ChunkReader::new(Arc::clone(&backend), Arc::clone(&metrics)),
            backend,
            metrics,
            limits,
        }
    }

    /// Store over a fresh in-memory backend with default limits
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()), ChunkLimits::default())
    }

    /// Open the backend named by `config`
    pub async fn open(config: &ChunkStoreConfig) -> ChunkResult<Self> {
        let backend = config.open_backend().await?;
        Ok(Self::new(backend, config.limits()))
    }

    /// Persist `content` under `key`, chunking it when needed
    pub async fn store(&self, key: &str, content: &Value) -> ChunkResult<StoreOutcome> {
        self.writer.store(key, content).await
    }

    /// Reassemble the document under `key`; `None` if absent or unreadable
    pub async fn load(&self, key: &str) -> Option<Value> {
        self.reader.load(key).await
    }

    /// Describe how `key` is stored
    pub async fn inspect(&self, key: &str) -> Option<RecordSummary> {
        self.reader.inspect(key).await
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn backend(&self) -> &Arc<dyn KvBackend> {
        &self.backend
    }

    pub fn limits(&self) -> ChunkLimits {
        self.limits
    }
}
