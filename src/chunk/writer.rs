//! Write path
//!
//! 1. Documents within the direct-write ceiling go out as one record.
//! 2. Anything larger, or anything the backend refused, is split:
//!    metadata first, then chunk records in index order.
//! 3. A chunk record still over the ceiling after the envelope is added
//!    goes through the compactor before it is written.
//!
//! Writes are strictly sequential. A failure part-way leaves the chunks
//! written so far in place.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use super::compactor::compact;
use super::errors::{ChunkError, ChunkResult};
use super::record::{
    chunk_key, document_key, is_envelope_field, is_metadata_shaped, ChunkRecord, ChunkedMeta, DataType, ITEMS_FIELD,
};
use super::size::size_of;
use super::splitter::{split, Chunk};
use super::ChunkLimits;
use crate::kv::KvBackend;
use crate::observability::{log_event_with_fields, trace_event, warn_event, Event, MetricsRegistry};

/// Result of a successful store call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreOutcome {
    pub success: bool,
    pub chunked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks_count: Option<usize>,
}

impl StoreOutcome {
    fn direct() -> Self {
        Self {
            success: true,
            chunked: false,
            chunks_count: None,
        }
    }

    fn chunked(chunks_count: usize) -> Self {
        Self {
            success: true,
            chunked: true,
            chunks_count: Some(chunks_count),
        }
    }
}

/// How a document is laid out across chunks
#[derive(Debug)]
struct ChunkPlan {
    data_type: DataType,
    root_key: Option<String>,
    /// Field that carries array slices in each chunk record
    holder: Option<String>,
    chunks: Vec<Chunk>,
}

impl ChunkPlan {
    fn build(content: &Value, size: usize, budget: usize) -> ChunkResult<Self> {
        match content {
            Value::Object(map) if map.len() == 1 => {
                let (root_key, inner) = map
                    .iter()
                    .next()
                    .ok_or_else(|| ChunkError::InvalidRecord("empty single-key object".into()))?;
                if inner.is_array() {
                    Ok(Self {
                        data_type: DataType::Array,
                        root_key: Some(root_key.clone()),
                        holder: Some(root_key.clone()),
                        chunks: split(inner, budget),
                    })
                } else {
                    Ok(Self {
                        data_type: DataType::Object,
                        root_key: None,
                        holder: None,
                        chunks: split(content, budget),
                    })
                }
            }
            Value::Object(map) => Ok(Self {
                data_type: if map.is_empty() {
                    DataType::Object
                } else {
                    DataType::MultiRoot
                },
                root_key: None,
                holder: None,
                chunks: split(content, budget),
            }),
            Value::Array(_) => Ok(Self {
                data_type: DataType::Array,
                root_key: None,
                holder: Some(ITEMS_FIELD.to_string()),
                chunks: split(content, budget),
            }),
            _ => Err(ChunkError::UnsplittableDocument { size }),
        }
    }

    /// Chunk records in index order.
    ///
    /// Fails before anything is written when a payload field would sit
    /// next to the envelope under one of its names.
    fn into_records(self) -> ChunkResult<Vec<ChunkRecord>> {
        let total = self.chunks.len();
        let mut records = Vec::with_capacity(total);
        for (index, chunk) in self.chunks.into_iter().enumerate() {
            let record = ChunkRecord::from_chunk(index, total, chunk, self.holder.as_deref());
            if let Some(field) = record.fields.keys().find(|f| is_envelope_field(f)) {
                return Err(ChunkError::ReservedFieldName {
                    field: field.clone(),
                });
            }
            records.push(record);
        }
        Ok(records)
    }
}

/// Orchestrates direct and chunked writes
#[derive(Debug, Clone)]
pub struct ChunkWriter {
    backend: Arc<dyn KvBackend>,
    limits: ChunkLimits,
    metrics: Arc<MetricsRegistry>,
}

impl ChunkWriter {
    pub fn new(backend: Arc<dyn KvBackend>, limits: ChunkLimits, metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            backend,
            limits,
            metrics,
        }
    }

    /// Persist `content` under `key`.
    ///
    /// # Errors
    ///
    /// Every returned error is fatal for this call: oversized metadata,
    /// a failed metadata or chunk write, a scalar too large to store, or a
    /// payload field named like an envelope field.
    pub async fn store(&self, key: &str, content: &Value) -> ChunkResult<StoreOutcome> {
        let size = size_of(content);
        let size_str = size.to_string();
        log_event_with_fields(Event::StoreBegin, &[("key", key), ("size", &size_str)]);

        let result = self.store_sized(key, content, size).await;
        if let Err(ref e) = result {
            self.metrics.increment_store_failures();
            let message = e.to_string();
            log_event_with_fields(
                Event::StoreFailed,
                &[("code", e.code()), ("error", &message), ("key", key)],
            );
        }
        result
    }

    async fn store_sized(&self, key: &str, content: &Value, size: usize) -> ChunkResult<StoreOutcome> {
        // A document that looks like metadata must never sit under the
        // document key as-is.
        if size <= self.limits.direct_write_limit && !is_metadata_shaped(content) {
            match self.backend.set(&document_key(key), content.clone()).await {
                Ok(()) => {
                    self.metrics.increment_direct_writes();
                    log_event_with_fields(
                        Event::DirectWrite,
                        &[("key", key), ("size", &size.to_string())],
                    );
                    return Ok(StoreOutcome::direct());
                }
                Err(e) => {
                    self.metrics.increment_direct_writes_rejected();
                    warn_event(
                        Event::DirectWriteRejected,
                        &[("error", &e.to_string()), ("key", key)],
                    );
                }
            }
        }

        let plan = ChunkPlan::build(content, size, self.limits.chunk_body_limit)?;
        self.write_chunked(key, plan, size).await
    }

    async fn write_chunked(&self, key: &str, plan: ChunkPlan, size: usize) -> ChunkResult<StoreOutcome> {
        let total = plan.chunks.len();
        let data_type = plan.data_type;
        let meta = ChunkedMeta::new(total, data_type, plan.root_key.clone(), size);
        let meta_value = serde_json::to_value(&meta)?;

        let meta_size = size_of(&meta_value);
        if meta_size > self.limits.direct_write_limit {
            return Err(ChunkError::MetadataTooLarge {
                size: meta_size,
                max: self.limits.direct_write_limit,
            });
        }
        let records = plan.into_records()?;

        let total_str = total.to_string();
        log_event_with_fields(
            Event::ChunkedWriteBegin,
            &[
                ("chunks", &total_str),
                ("data_type", data_type.as_str()),
                ("key", key),
            ],
        );

        self.backend
            .set(&document_key(key), meta_value)
            .await
            .map_err(|source| ChunkError::MetadataWriteFailure { source })?;
        trace_event(Event::MetadataWritten, &[("key", key)]);

        for (index, record) in records.into_iter().enumerate() {
            let body = self.fit_record(key, record.encode(), index);
            let body_size = size_of(&body);

            self.backend
                .set(&chunk_key(key, index), Value::Object(body))
                .await
                .map_err(|source| ChunkError::ChunkWriteFailure {
                    index,
                    total,
                    source,
                })?;

            self.metrics.increment_chunks_written();
            trace_event(
                Event::ChunkWritten,
                &[
                    ("index", &index.to_string()),
                    ("key", key),
                    ("size", &body_size.to_string()),
                    ("total", &total_str),
                ],
            );
        }

        self.metrics.increment_chunked_writes();
        log_event_with_fields(Event::ChunkedWriteComplete, &[("chunks", &total_str), ("key", key)]);
        Ok(StoreOutcome::chunked(total))
    }

    /// Compact a record that exceeds the ceiling once its envelope is added
    fn fit_record(&self, key: &str, body: Map<String, Value>, index: usize) -> Map<String, Value> {
        let body_size = size_of(&body);
        if body_size <= self.limits.direct_write_limit {
            return body;
        }

        let compacted = compact(
            &body,
            self.limits.direct_write_limit,
            self.limits.compaction_margin,
        );
        self.metrics.increment_chunks_compacted();
        warn_event(
            Event::ChunkCompacted,
            &[
                ("after", &size_of(&compacted).to_string()),
                ("before", &body_size.to_string()),
                ("index", &index.to_string()),
                ("key", key),
            ],
        );
        compacted
    }
}
