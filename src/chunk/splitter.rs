//! Greedy order-preserving splitter
//!
//! Splits an array into sub-arrays and an object into sub-objects so that
//! each piece serializes to at most `max_bytes`. Running totals are exact
//! serialized sizes, brackets and commas included.
//!
//! A piece may only exceed the budget when it is a single array item that
//! cannot be made smaller at this level.
//!
//! Oversized object fields are split recursively. Their pieces come out
//! in the same flat list, tagged with the field path they belong to and
//! their position inside that field's group, so the reader can put them
//! back where they came from.

use std::collections::HashMap;

use serde_json::{Map, Value};

use super::size::{entry_size, size_of};
use crate::observability::{error_event, warn_event, Event};

/// Sentinel stored in place of a scalar that does not fit in any chunk
pub const VALUE_TOO_LARGE: &str = "VALUE_TOO_LARGE";

/// Position of a chunk inside the group of chunks sharing one field path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupPosition {
    /// Zero-based index within the group
    pub part: usize,
    /// Number of chunks in the group
    pub parts: usize,
}

/// One piece produced by [`split`]
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Field path of the value this piece is a slice of; empty for the
    /// value passed to `split` itself
    pub path: Vec<String>,
    /// Set for every piece with a non-empty path
    pub position: Option<GroupPosition>,
    /// Sub-array or sub-object
    pub payload: Value,
}

impl Chunk {
    fn root(payload: Value) -> Self {
        Self {
            path: Vec::new(),
            position: None,
            payload,
        }
    }

    fn at(path: &[String], payload: Value) -> Self {
        Self {
            path: path.to_vec(),
            position: None,
            payload,
        }
    }

    /// Whether this piece is a slice of the top-level value
    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Serialized size of the payload
    pub fn payload_size(&self) -> usize {
        size_of(&self.payload)
    }
}

/// Split `value` into ordered pieces of at most `max_bytes` each.
///
/// Arrays are split item-wise, objects field-wise. A scalar cannot be
/// split and comes back as a single piece.
pub fn split(value: &Value, max_bytes: usize) -> Vec<Chunk> {
    let mut chunks = match value {
        Value::Array(items) => split_array(items, max_bytes, &[])
            .into_iter()
            .map(|slice| Chunk::root(Value::Array(slice)))
            .collect(),
        Value::Object(map) => {
            let mut out = Vec::new();
            split_object(&[], map, max_bytes, &mut out);
            out
        }
        scalar => vec![Chunk::root(scalar.clone())],
    };
    assign_positions(&mut chunks);
    chunks
}

/// Greedy item-wise split; returns the item slices in order.
pub fn split_array(items: &[Value], max_bytes: usize, path: &[String]) -> Vec<Vec<Value>> {
    let mut slices = Vec::new();
    let mut current: Vec<Value> = Vec::new();
    let mut current_size = 2;

    for item in items {
        let item_size = size_of(item);

        if item_size.saturating_add(2) > max_bytes {
            let path_str = path.join(".");
            let size_str = item_size.to_string();
            warn_event(
                Event::OversizedItem,
                &[("path", &path_str), ("size", &size_str)],
            );
            if !current.is_empty() {
                slices.push(std::mem::take(&mut current));
                current_size = 2;
            }
            slices.push(vec![item.clone()]);
            continue;
        }

        let new_size = if current.is_empty() {
            2 + item_size
        } else {
            current_size + 1 + item_size
        };

        if new_size > max_bytes {
            slices.push(std::mem::take(&mut current));
            current.push(item.clone());
            current_size = 2 + item_size;
        } else {
            current.push(item.clone());
            current_size = new_size;
        }
    }

    if !current.is_empty() {
        slices.push(current);
    }

    slices
}

fn split_object(path: &[String], map: &Map<String, Value>, max_bytes: usize, out: &mut Vec<Chunk>) {
    let mut current = Map::new();
    let mut current_size = 2;

    for (field, value) in map {
        let size = entry_size(field, value);

        if size.saturating_add(2) > max_bytes {
            if !current.is_empty() {
                out.push(Chunk::at(path, Value::Object(std::mem::take(&mut current))));
                current_size = 2;
            }

            let mut field_path = path.to_vec();
            field_path.push(field.clone());
            let path_str = field_path.join(".");
            let size_str = size.to_string();

            match value {
                Value::Array(items) => {
                    warn_event(
                        Event::OversizedField,
                        &[("kind", "array"), ("path", &path_str), ("size", &size_str)],
                    );
                    for slice in split_array(items, max_bytes, &field_path) {
                        out.push(Chunk::at(&field_path, Value::Array(slice)));
                    }
                }
                Value::Object(inner) => {
                    warn_event(
                        Event::OversizedField,
                        &[("kind", "object"), ("path", &path_str), ("size", &size_str)],
                    );
                    split_object(&field_path, inner, max_bytes, out);
                }
                _ => {
                    error_event(
                        Event::ValueTooLarge,
                        &[("path", &path_str), ("size", &size_str)],
                    );
                    let sentinel_field = format!("{}_error", field);
                    let sentinel = Value::from(VALUE_TOO_LARGE);
                    let sentinel_size = entry_size(&sentinel_field, &sentinel);
                    push_entry(
                        path,
                        &mut current,
                        &mut current_size,
                        sentinel_field,
                        sentinel,
                        sentinel_size,
                        max_bytes,
                        out,
                    );
                }
            }
            continue;
        }

        push_entry(
            path,
            &mut current,
            &mut current_size,
            field.clone(),
            value.clone(),
            size,
            max_bytes,
            out,
        );
    }

    if !current.is_empty() {
        out.push(Chunk::at(path, Value::Object(current)));
    }
}

#[allow(clippy::too_many_arguments)]
fn push_entry(
    path: &[String],
    current: &mut Map<String, Value>,
    current_size: &mut usize,
    field: String,
    value: Value,
    size: usize,
    max_bytes: usize,
    out: &mut Vec<Chunk>,
) {
    let new_size = if current.is_empty() {
        2 + size
    } else {
        *current_size + 1 + size
    };

    if new_size > max_bytes && !current.is_empty() {
        out.push(Chunk::at(path, Value::Object(std::mem::take(current))));
        current.insert(field, value);
        *current_size = 2 + size;
    } else {
        current.insert(field, value);
        *current_size = new_size;
    }
}

/// Number the pieces of every non-root group in emission order
fn assign_positions(chunks: &mut [Chunk]) {
    let mut totals: HashMap<Vec<String>, usize> = HashMap::new();
    for chunk in chunks.iter().filter(|c| !c.is_root()) {
        *totals.entry(chunk.path.clone()).or_insert(0) += 1;
    }

    let mut seen: HashMap<Vec<String>, usize> = HashMap::new();
    for chunk in chunks.iter_mut().filter(|c| !c.is_root()) {
        let part = seen.entry(chunk.path.clone()).or_insert(0);
        chunk.position = Some(GroupPosition {
            part: *part,
            parts: totals.get(&chunk.path).copied().unwrap_or(0),
        });
        *part += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn items(n: usize, pad: usize) -> Vec<Value> {
        (0..n)
            .map(|i| json!({"id": i, "name": "x".repeat(pad)}))
            .collect()
    }

    fn concat(chunks: &[Chunk]) -> Vec<Value> {
        chunks
            .iter()
            .flat_map(|c| c.payload.as_array().cloned().unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_array_preserves_order_and_count() {
        let all = items(500, 40);
        let chunks = split(&Value::Array(all.clone()), 2_000);

        assert!(chunks.len() > 1);
        assert_eq!(concat(&chunks), all);
    }

    #[test]
    fn test_array_chunks_within_budget() {
        let all = items(300, 25);
        for chunk in split(&Value::Array(all), 1_000) {
            assert!(chunk.payload_size() <= 1_000, "chunk of {} bytes", chunk.payload_size());
        }
    }

    #[test]
    fn test_exact_fit_stays_in_chunk() {
        // Three items of 5 bytes: [a,b,c] = 2 + 15 + 2 = 19
        let all = vec![json!("abc"), json!("def"), json!("ghi")];
        let chunks = split(&Value::Array(all.clone()), 19);
        assert_eq!(chunks.len(), 1);

        let chunks = split(&Value::Array(all), 18);
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn test_oversized_item_is_singleton() {
        let big = json!("y".repeat(500));
        let all = vec![json!(1), json!(2), big.clone(), json!(3)];
        let chunks = split(&Value::Array(all), 100);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].payload, json!([1, 2]));
        assert_eq!(chunks[1].payload, json!([big]));
        assert_eq!(chunks[2].payload, json!([3]));
    }

    #[test]
    fn test_object_split_keeps_fields_disjoint() {
        let mut map = Map::new();
        for i in 0..50 {
            map.insert(format!("field_{:02}", i), json!("v".repeat(30)));
        }
        let chunks = split(&Value::Object(map.clone()), 300);

        assert!(chunks.len() > 1);
        let mut seen = Vec::new();
        for chunk in &chunks {
            assert!(chunk.is_root());
            assert!(chunk.payload_size() <= 300);
            for key in chunk.payload.as_object().unwrap().keys() {
                seen.push(key.clone());
            }
        }
        let expected: Vec<String> = map.keys().cloned().collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_oversized_array_field_is_split_with_path() {
        let value = json!({
            "small": 1,
            "rows": items(100, 20),
            "tail": "end"
        });
        let chunks = split(&value, 500);

        assert_eq!(chunks[0].payload, json!({"small": 1}));
        assert!(chunks[0].is_root());

        let rows: Vec<&Chunk> = chunks.iter().filter(|c| c.path == vec!["rows"]).collect();
        assert!(rows.len() > 1);
        for (i, c) in rows.iter().enumerate() {
            assert_eq!(
                c.position,
                Some(GroupPosition { part: i, parts: rows.len() })
            );
        }

        let last = chunks.last().unwrap();
        assert_eq!(last.payload, json!({"tail": "end"}));
        assert!(last.is_root());
    }

    #[test]
    fn test_nested_object_field_recurses() {
        let mut inner = Map::new();
        for i in 0..20 {
            inner.insert(format!("k{}", i), json!("z".repeat(40)));
        }
        let value = json!({ "config": Value::Object(inner) });
        let chunks = split(&value, 200);

        assert!(chunks.len() > 1);
        for c in &chunks {
            assert_eq!(c.path, vec!["config".to_string()]);
            assert!(c.payload.is_object());
            assert!(c.payload_size() <= 200);
        }
    }

    #[test]
    fn test_oversized_scalar_becomes_sentinel() {
        let value = json!({"id": 7, "blob": "b".repeat(1_000)});
        let chunks = split(&value, 200);

        let merged: Map<String, Value> = chunks
            .iter()
            .flat_map(|c| c.payload.as_object().cloned().unwrap_or_default())
            .collect();
        assert_eq!(merged.get("id"), Some(&json!(7)));
        assert_eq!(merged.get("blob_error"), Some(&json!(VALUE_TOO_LARGE)));
        assert!(!merged.contains_key("blob"));
    }

    #[test]
    fn test_empty_inputs() {
        assert!(split(&json!([]), 100).is_empty());
        assert!(split(&json!({}), 100).is_empty());
    }
}
