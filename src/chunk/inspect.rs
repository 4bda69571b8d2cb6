//! Storage diagnostics

use serde::Serialize;
use serde_json::Value;

use super::record::ChunkedMeta;
use super::size::{entry_size, size_of};

/// How a document is laid out on the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    Direct,
    Chunked,
}

/// Summary of the records stored for one key
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSummary {
    pub key: String,
    pub layout: Layout,
    /// Serialized size of the document record (direct) or the original
    /// document (chunked)
    pub size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ChunkedMeta>,
    pub present_chunks: Vec<usize>,
    pub missing_chunks: Vec<usize>,
    pub compacted_chunks: Vec<usize>,
    /// Largest stored chunk record in bytes
    pub largest_chunk: usize,
}

impl RecordSummary {
    pub fn direct(key: &str, value: &Value) -> Self {
        Self {
            key: key.to_string(),
            layout: Layout::Direct,
            size: size_of(value),
            meta: None,
            present_chunks: Vec::new(),
            missing_chunks: Vec::new(),
            compacted_chunks: Vec::new(),
            largest_chunk: 0,
        }
    }

    pub fn chunked(key: &str, meta: ChunkedMeta) -> Self {
        Self {
            key: key.to_string(),
            layout: Layout::Chunked,
            size: meta.original_size,
            meta: Some(meta),
            present_chunks: Vec::new(),
            missing_chunks: Vec::new(),
            compacted_chunks: Vec::new(),
            largest_chunk: 0,
        }
    }

    pub fn add_present(&mut self, index: usize, size: usize, compacted: bool) {
        self.present_chunks.push(index);
        if compacted {
            self.compacted_chunks.push(index);
        }
        self.largest_chunk = self.largest_chunk.max(size);
    }

    pub fn add_missing(&mut self, index: usize) {
        self.missing_chunks.push(index);
    }

    /// Every chunk named by the metadata is present
    pub fn is_complete(&self) -> bool {
        self.missing_chunks.is_empty()
    }
}

/// Shape of a document before it is stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeReport {
    pub kind: &'static str,
    pub size: usize,
    /// Top-level fields (objects) or items (arrays)
    pub entries: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub largest_entry: Option<LargestEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LargestEntry {
    pub name: String,
    pub size: usize,
}

impl ShapeReport {
    pub fn of(value: &Value) -> Self {
        let (kind, entries, largest_entry) = match value {
            Value::Object(map) => {
                let largest = map
                    .iter()
                    .map(|(k, v)| (k, entry_size(k, v)))
                    .max_by_key(|(_, size)| *size)
                    .map(|(k, size)| LargestEntry {
                        name: k.clone(),
                        size,
                    });
                ("object", map.len(), largest)
            }
            Value::Array(items) => {
                let largest = items
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (i, size_of(v)))
                    .max_by_key(|(_, size)| *size)
                    .map(|(i, size)| LargestEntry {
                        name: i.to_string(),
                        size,
                    });
                ("array", items.len(), largest)
            }
            Value::String(_) => ("string", 0, None),
            Value::Number(_) => ("number", 0, None),
            Value::Bool(_) => ("bool", 0, None),
            Value::Null => ("null", 0, None),
        };

        Self {
            kind,
            size: size_of(value),
            entries,
            largest_entry,
        }
    }
}
