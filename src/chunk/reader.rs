//! Read path and reassembly
//!
//! Reads never fail. An absent key, a corrupt record or a backend error
//! all come back as `None`; a missing chunk is skipped and the rest of
//! the document is returned.

use std::sync::Arc;

use serde_json::{Map, Value};

use super::errors::ChunkResult;
use super::inspect::RecordSummary;
use super::record::{
    chunk_key, document_key, ChunkRecord, ChunkedMeta, DataType, StorageRecord, ITEMS_FIELD,
};
use super::size::size_of;
use crate::kv::KvBackend;
use crate::observability::{
    error_event, log_event_with_fields, trace_event, warn_event, Event, MetricsRegistry,
};

/// Loads documents and merges chunk records back together
#[derive(Debug, Clone)]
pub struct ChunkReader {
    backend: Arc<dyn KvBackend>,
    metrics: Arc<MetricsRegistry>,
}

impl ChunkReader {
    pub fn new(backend: Arc<dyn KvBackend>, metrics: Arc<MetricsRegistry>) -> Self {
        Self { backend, metrics }
    }

    /// Load the document stored under `key`, `None` if it cannot be produced
    pub async fn load(&self, key: &str) -> Option<Value> {
        self.metrics.increment_loads();
        trace_event(Event::LoadBegin, &[("key", key)]);

        match self.try_load(key).await {
            Ok(Some(value)) => Some(value),
            Ok(None) => {
                self.metrics.increment_loads_not_found();
                log_event_with_fields(Event::LoadNotFound, &[("key", key)]);
                None
            }
            Err(e) => {
                self.metrics.increment_read_failures();
                error_event(
                    Event::LoadFailed,
                    &[("code", e.code()), ("error", &e.to_string()), ("key", key)],
                );
                None
            }
        }
    }

    async fn try_load(&self, key: &str) -> ChunkResult<Option<Value>> {
        let Some(value) = self.backend.get(&document_key(key)).await? else {
            return Ok(None);
        };

        match StorageRecord::decode(value)? {
            StorageRecord::Direct(value) => {
                trace_event(
                    Event::LoadDirect,
                    &[("key", key), ("size", &size_of(&value).to_string())],
                );
                Ok(Some(value))
            }
            StorageRecord::Chunked(meta) => {
                let records = self.fetch_chunks(key, meta.chunks_count).await?;
                let value = match meta.data_type {
                    DataType::Array => merge_array(key, &meta, records),
                    DataType::Object | DataType::MultiRoot => merge_object(key, records),
                };
                log_event_with_fields(
                    Event::LoadReassembled,
                    &[
                        ("chunks", &meta.chunks_count.to_string()),
                        ("data_type", meta.data_type.as_str()),
                        ("key", key),
                        ("size", &size_of(&value).to_string()),
                    ],
                );
                Ok(Some(value))
            }
        }
    }

    /// Fetch chunk records in index order, skipping absent ones
    async fn fetch_chunks(&self, key: &str, count: usize) -> ChunkResult<Vec<ChunkRecord>> {
        let mut records = Vec::with_capacity(count);
        for index in 0..count {
            match self.backend.get(&chunk_key(key, index)).await? {
                Some(value) => records.push(ChunkRecord::decode(value)?),
                None => {
                    self.metrics.increment_chunks_missing();
                    warn_event(
                        Event::ChunkMissing,
                        &[
                            ("index", &index.to_string()),
                            ("key", key),
                            ("total", &count.to_string()),
                        ],
                    );
                }
            }
        }
        Ok(records)
    }

    /// Describe how `key` is stored without reassembling it
    pub async fn inspect(&self, key: &str) -> Option<RecordSummary> {
        match self.try_inspect(key).await {
            Ok(summary) => summary,
            Err(e) => {
                self.metrics.increment_read_failures();
                error_event(
                    Event::LoadFailed,
                    &[("code", e.code()), ("error", &e.to_string()), ("key", key)],
                );
                None
            }
        }
    }

    async fn try_inspect(&self, key: &str) -> ChunkResult<Option<RecordSummary>> {
        let Some(value) = self.backend.get(&document_key(key)).await? else {
            return Ok(None);
        };

        match StorageRecord::decode(value)? {
            StorageRecord::Direct(value) => Ok(Some(RecordSummary::direct(key, &value))),
            StorageRecord::Chunked(meta) => {
                let mut summary = RecordSummary::chunked(key, meta.clone());
                for index in 0..meta.chunks_count {
                    match self.backend.get(&chunk_key(key, index)).await? {
                        Some(value) => {
                            let size = size_of(&value);
                            let record = ChunkRecord::decode(value)?;
                            summary.add_present(index, size, record.oversized);
                        }
                        None => summary.add_missing(index),
                    }
                }
                Ok(Some(summary))
            }
        }
    }
}

fn merge_array(key: &str, meta: &ChunkedMeta, records: Vec<ChunkRecord>) -> Value {
    let holder = meta.root_key.as_deref().unwrap_or(ITEMS_FIELD);
    let mut items = Vec::new();

    for mut record in records {
        match record.fields.remove(holder) {
            Some(Value::Array(slice)) => items.extend(slice),
            _ => {
                warn_event(
                    Event::ChunkMalformed,
                    &[
                        ("expected", holder),
                        ("index", &record.index.to_string()),
                        ("key", key),
                    ],
                );
            }
        }
    }

    match &meta.root_key {
        Some(root_key) => {
            let mut root = Map::new();
            root.insert(root_key.clone(), Value::Array(items));
            Value::Object(root)
        }
        None => Value::Array(items),
    }
}

fn merge_object(key: &str, records: Vec<ChunkRecord>) -> Value {
    let mut root = Map::new();

    for record in records {
        let index = record.index;
        let Some((last, prefix)) = record.path.split_last() else {
            for (field, value) in record.fields {
                insert_field(key, index, &mut root, field, value);
            }
            continue;
        };

        let Some(target) = object_at(&mut root, prefix) else {
            warn_event(
                Event::ChunkMalformed,
                &[
                    ("index", &index.to_string()),
                    ("key", key),
                    ("path", &record.path.join(".")),
                ],
            );
            continue;
        };

        for (field, value) in record.fields {
            if &field == last {
                merge_slice(key, index, target, field, value);
            } else {
                insert_field(key, index, target, field, value);
            }
        }
    }

    Value::Object(root)
}

/// Walk `path` from `root`, creating empty objects along the way.
/// `None` if a segment already holds a non-object value.
fn object_at<'m>(root: &'m mut Map<String, Value>, path: &[String]) -> Option<&'m mut Map<String, Value>> {
    let mut current = root;
    for segment in path {
        current = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()?;
    }
    Some(current)
}

/// Insert a field; on collision the later chunk wins
fn insert_field(key: &str, index: usize, target: &mut Map<String, Value>, field: String, value: Value) {
    if target.contains_key(&field) {
        warn_event(
            Event::FieldCollision,
            &[("field", &field), ("index", &index.to_string()), ("key", key)],
        );
    }
    target.insert(field, value);
}

/// Append an array slice or merge an object slice into `target[field]`
fn merge_slice(key: &str, index: usize, target: &mut Map<String, Value>, field: String, value: Value) {
    let value = match (target.get_mut(&field), value) {
        (Some(Value::Array(existing)), Value::Array(slice)) => {
            existing.extend(slice);
            return;
        }
        (Some(Value::Object(existing)), Value::Object(slice)) => {
            for (k, v) in slice {
                insert_field(key, index, existing, k, v);
            }
            return;
        }
        (_, value) => value,
    };
    insert_field(key, index, target, field, value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::splitter::GroupPosition;
    use serde_json::json;

    fn nested(index: usize, path: &[&str], part: usize, parts: usize, fields: Value) -> ChunkRecord {
        ChunkRecord {
            index,
            total: 0,
            path: path.iter().map(|s| s.to_string()).collect(),
            position: Some(GroupPosition { part, parts }),
            oversized: false,
            fields: fields.as_object().cloned().unwrap(),
        }
    }

    fn root(index: usize, fields: Value) -> ChunkRecord {
        ChunkRecord {
            index,
            total: 0,
            path: Vec::new(),
            position: None,
            oversized: false,
            fields: fields.as_object().cloned().unwrap(),
        }
    }

    #[test]
    fn test_merge_array_wrapped() {
        let meta = ChunkedMeta::new(2, DataType::Array, Some("rows".into()), 0);
        let records = vec![root(0, json!({"rows": [1, 2]})), root(1, json!({"rows": [3]}))];
        assert_eq!(merge_array("k", &meta, records), json!({"rows": [1, 2, 3]}));
    }

    #[test]
    fn test_merge_array_skips_non_array_slice() {
        let meta = ChunkedMeta::new(3, DataType::Array, Some("rows".into()), 0);
        let records = vec![
            root(0, json!({"rows": [1]})),
            root(1, json!({"rows_oversized": true, "rows_size": 70000})),
            root(2, json!({"rows": [3]})),
        ];
        assert_eq!(merge_array("k", &meta, records), json!({"rows": [1, 3]}));
    }

    #[test]
    fn test_merge_array_bare() {
        let meta = ChunkedMeta::new(2, DataType::Array, None, 0);
        let records = vec![root(0, json!({"_items": ["a"]})), root(1, json!({"_items": ["b"]}))];
        assert_eq!(merge_array("k", &meta, records), json!(["a", "b"]));
    }

    #[test]
    fn test_merge_object_later_chunk_wins() {
        let records = vec![root(0, json!({"a": 1, "b": 2})), root(1, json!({"b": 3, "c": 4}))];
        assert_eq!(merge_object("k", records), json!({"a": 1, "b": 3, "c": 4}));
    }

    #[test]
    fn test_merge_nested_groups() {
        let records = vec![
            root(0, json!({"title": "t"})),
            nested(1, &["rows"], 0, 2, json!({"rows": [1, 2]})),
            nested(2, &["rows"], 1, 2, json!({"rows": [3]})),
            nested(3, &["config", "flags"], 0, 1, json!({"flags": {"x": true}})),
            nested(4, &["config"], 0, 1, json!({"config": {"name": "n"}})),
            root(5, json!({"end": null})),
        ];
        assert_eq!(
            merge_object("k", records),
            json!({
                "title": "t",
                "rows": [1, 2, 3],
                "config": {"flags": {"x": true}, "name": "n"},
                "end": null
            })
        );
    }

    #[test]
    fn test_merge_nested_markers_land_in_parent() {
        let records = vec![nested(
            0,
            &["config", "blob"],
            0,
            1,
            json!({"blob_oversized": true, "blob_size": 61000}),
        )];
        assert_eq!(
            merge_object("k", records),
            json!({"config": {"blob_oversized": true, "blob_size": 61000}})
        );
    }

    #[test]
    fn test_merge_nested_under_scalar_is_skipped() {
        let records = vec![
            root(0, json!({"config": 5})),
            nested(1, &["config", "x"], 0, 1, json!({"x": [1]})),
        ];
        assert_eq!(merge_object("k", records), json!({"config": 5}));
    }
}
