//! Stored record shapes
//!
//! Key layout:
//!
//! ```text
//! ("json_data", key)               -> Direct document | ChunkedMeta
//! ("json_data_chunk", key, index)  -> ChunkRecord
//! ```
//!
//! A metadata record is any object whose top-level `chunked` field is
//! `true`. Chunk records are objects holding their payload fields next
//! to underscore-prefixed envelope fields.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::{ChunkError, ChunkResult};
use super::splitter::{Chunk, GroupPosition};
use crate::kv::{KeyPart, KvKey};

/// Namespace of direct documents and metadata records
pub const DOCUMENT_NAMESPACE: &str = "json_data";
/// Namespace of chunk records
pub const CHUNK_NAMESPACE: &str = "json_data_chunk";

/// Envelope: position of the record among the document's chunks
pub const CHUNK_INDEX_FIELD: &str = "_chunkIndex";
/// Envelope: number of chunks of the document
pub const TOTAL_CHUNKS_FIELD: &str = "_totalChunks";
/// Envelope: field path of a nested slice
pub const PATH_FIELD: &str = "_path";
/// Envelope: position inside the nested slice's group
pub const PART_FIELD: &str = "_part";
/// Envelope: size of the nested slice's group
pub const PARTS_FIELD: &str = "_parts";
/// Envelope: set by the compactor
pub const OVERSIZED_FIELD: &str = "_oversized";
/// Payload field holding a slice of a top-level array
pub const ITEMS_FIELD: &str = "_items";

const ENVELOPE_FIELDS: [&str; 6] = [
    CHUNK_INDEX_FIELD,
    TOTAL_CHUNKS_FIELD,
    PATH_FIELD,
    PART_FIELD,
    PARTS_FIELD,
    OVERSIZED_FIELD,
];

/// Whether `field` is envelope rather than payload
pub fn is_envelope_field(field: &str) -> bool {
    ENVELOPE_FIELDS.contains(&field)
}

/// Backend key of the document or metadata record
pub fn document_key(key: &str) -> KvKey {
    KvKey::new(vec![KeyPart::from(DOCUMENT_NAMESPACE), KeyPart::from(key)])
}

/// Backend key of chunk `index`
pub fn chunk_key(key: &str, index: usize) -> KvKey {
    KvKey::new(vec![
        KeyPart::from(CHUNK_NAMESPACE),
        KeyPart::from(key),
        KeyPart::from(index),
    ])
}

/// How a chunked document was split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataType {
    /// Array, bare or wrapped as `{rootKey: [...]}`
    Array,
    /// Single-field object whose value is not an array
    Object,
    /// Object with several top-level fields
    MultiRoot,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Array => "array",
            DataType::Object => "object",
            DataType::MultiRoot => "multi-root",
        }
    }
}

/// Metadata record of a chunked document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkedMeta {
    /// Always `true`; tags the record as metadata
    pub chunked: bool,
    pub chunks_count: usize,
    pub data_type: DataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_key: Option<String>,
    /// Serialized size of the document when it was stored
    pub original_size: usize,
}

impl ChunkedMeta {
    pub fn new(
        chunks_count: usize,
        data_type: DataType,
        root_key: Option<String>,
        original_size: usize,
    ) -> Self {
        Self {
            chunked: true,
            chunks_count,
            data_type,
            root_key,
            original_size,
        }
    }
}

/// What lives under `("json_data", key)`
#[derive(Debug, Clone, PartialEq)]
pub enum StorageRecord {
    Direct(Value),
    Chunked(ChunkedMeta),
}

impl StorageRecord {
    /// Interpret a stored value.
    ///
    /// # Errors
    ///
    /// `ChunkError::InvalidRecord` if the value is tagged as metadata but
    /// the metadata fields are missing or malformed.
    pub fn decode(value: Value) -> ChunkResult<Self> {
        if is_metadata_shaped(&value) {
            let meta: ChunkedMeta = serde_json::from_value(value)?;
            Ok(StorageRecord::Chunked(meta))
        } else {
            Ok(StorageRecord::Direct(value))
        }
    }
}

/// Whether `value` would be read back as a metadata record
pub fn is_metadata_shaped(value: &Value) -> bool {
    value
        .get("chunked")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// One stored chunk
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRecord {
    pub index: usize,
    pub total: usize,
    /// Field path of a nested slice; empty for top-level slices
    pub path: Vec<String>,
    pub position: Option<GroupPosition>,
    /// Set when the compactor dropped fields from this record
    pub oversized: bool,
    /// Payload fields
    pub fields: Map<String, Value>,
}

impl ChunkRecord {
    /// Build the record for a split piece.
    ///
    /// `holder` names the field that carries array slices (the root key, or
    /// [`ITEMS_FIELD`] for a bare top-level array). Object slices at the
    /// top level are spread into the record. Nested slices sit under the
    /// last segment of their path.
    pub fn from_chunk(index: usize, total: usize, chunk: Chunk, holder: Option<&str>) -> Self {
        let mut fields = Map::new();

        match (chunk.path.last(), holder, chunk.payload) {
            (Some(last), _, payload) => {
                fields.insert(last.clone(), payload);
            }
            (None, Some(holder), payload) => {
                fields.insert(holder.to_string(), payload);
            }
            (None, None, Value::Object(map)) => fields = map,
            (None, None, payload) => {
                fields.insert(ITEMS_FIELD.to_string(), payload);
            }
        }

        Self {
            index,
            total,
            path: chunk.path,
            position: chunk.position,
            oversized: false,
            fields,
        }
    }

    /// Stored form: payload fields followed by the envelope
    pub fn encode(&self) -> Map<String, Value> {
        let mut out = self.fields.clone();
        out.insert(CHUNK_INDEX_FIELD.to_string(), Value::from(self.index));
        out.insert(TOTAL_CHUNKS_FIELD.to_string(), Value::from(self.total));
        if !self.path.is_empty() {
            out.insert(
                PATH_FIELD.to_string(),
                Value::Array(self.path.iter().cloned().map(Value::from).collect()),
            );
        }
        if let Some(position) = self.position {
            out.insert(PART_FIELD.to_string(), Value::from(position.part));
            out.insert(PARTS_FIELD.to_string(), Value::from(position.parts));
        }
        if self.oversized {
            out.insert(OVERSIZED_FIELD.to_string(), Value::Bool(true));
        }
        out
    }

    /// Parse a stored chunk record.
    ///
    /// # Errors
    ///
    /// `ChunkError::InvalidRecord` if the value is not an object or the
    /// envelope is malformed.
    pub fn decode(value: Value) -> ChunkResult<Self> {
        let Value::Object(mut map) = value else {
            return Err(ChunkError::InvalidRecord(
                "chunk record is not an object".to_string(),
            ));
        };

        let index = take_usize(&mut map, CHUNK_INDEX_FIELD)?
            .ok_or_else(|| ChunkError::InvalidRecord(format!("missing {}", CHUNK_INDEX_FIELD)))?;
        let total = take_usize(&mut map, TOTAL_CHUNKS_FIELD)?.unwrap_or(0);

        let path = match map.remove(PATH_FIELD) {
            None => Vec::new(),
            Some(Value::Array(segments)) => segments
                .into_iter()
                .map(|s| match s {
                    Value::String(s) => Ok(s),
                    other => Err(ChunkError::InvalidRecord(format!(
                        "non-string path segment: {}",
                        other
                    ))),
                })
                .collect::<ChunkResult<Vec<String>>>()?,
            Some(other) => {
                return Err(ChunkError::InvalidRecord(format!(
                    "{} is not an array: {}",
                    PATH_FIELD, other
                )))
            }
        };

        let part = take_usize(&mut map, PART_FIELD)?;
        let parts = take_usize(&mut map, PARTS_FIELD)?;
        let position = match (part, parts) {
            (Some(part), Some(parts)) => Some(GroupPosition { part, parts }),
            _ => None,
        };

        let oversized = map
            .remove(OVERSIZED_FIELD)
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        Ok(Self {
            index,
            total,
            path,
            position,
            oversized,
            fields: map,
        })
    }
}

fn take_usize(map: &mut Map<String, Value>, field: &str) -> ChunkResult<Option<usize>> {
    match map.remove(field) {
        None => Ok(None),
        Some(value) => value
            .as_u64()
            .map(|n| Some(n as usize))
            .ok_or_else(|| ChunkError::InvalidRecord(format!("{} is not an index: {}", field, value))),
    }
}
