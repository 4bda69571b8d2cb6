//! Oversized-field compactor
//!
//! Last resort for a chunk record that is still over the ceiling once its
//! envelope is added. Keeps the envelope, keeps as many payload fields as
//! fit (smallest first) and replaces every other field with a marker pair:
//!
//! ```text
//! "{field}_oversized": true
//! "{field}_size": <serialized size of "field":value>
//! ```
//!
//! Nothing is dropped without a trace. The envelope goes last, after
//! the kept fields and the markers.

use serde_json::{Map, Value};

use super::record::{is_envelope_field, OVERSIZED_FIELD};
use super::size::{entry_size, size_of};

/// Fixed headroom kept free on top of the envelope
pub const DEFAULT_COMPACTION_MARGIN: usize = 100;

fn markers(field: &str, size: usize) -> [(String, Value); 2] {
    [
        (format!("{}_oversized", field), Value::Bool(true)),
        (format!("{}_size", field), Value::from(size)),
    ]
}

fn markers_size(field: &str, size: usize) -> usize {
    markers(field, size)
        .iter()
        .map(|(k, v)| entry_size(k, v) + 1)
        .sum()
}

/// Shrink `record` to at most `max_bytes` by excluding payload fields.
///
/// Records already within budget come back unchanged. The result holds
/// whenever the envelope, `margin` and one marker pair per payload field
/// fit in `max_bytes`; otherwise every payload field is replaced by its
/// markers and the result is as small as it can be made.
pub fn compact(record: &Map<String, Value>, max_bytes: usize, margin: usize) -> Map<String, Value> {
    if size_of(record) <= max_bytes {
        return record.clone();
    }

    let mut envelope = Map::new();
    for (field, value) in record.iter().filter(|(k, _)| is_envelope_field(k)) {
        envelope.insert(field.clone(), value.clone());
    }
    envelope.insert(OVERSIZED_FIELD.to_string(), Value::Bool(true));

    struct Candidate<'a> {
        position: usize,
        field: &'a str,
        value: &'a Value,
        /// Serialized size of `"field":value`, as recorded in the marker
        size: usize,
        /// Bytes the field adds to the record, separator included
        cost: usize,
        markers: usize,
    }

    let mut candidates: Vec<Candidate<'_>> = record
        .iter()
        .filter(|(k, _)| !is_envelope_field(k))
        .enumerate()
        .map(|(position, (field, value))| {
            let size = entry_size(field, value);
            Candidate {
                position,
                field: field.as_str(),
                value,
                size,
                cost: size + 1,
                markers: markers_size(field, size),
            }
        })
        .collect();

    // Budget assumes every field ends up excluded; including one swaps its
    // markers for the field itself.
    let mut total = size_of(&envelope)
        .saturating_add(margin)
        .saturating_add(candidates.iter().map(|c| c.markers).sum::<usize>());

    candidates.sort_by_key(|c| (c.cost, c.position));

    let mut included = vec![false; candidates.len()];
    for candidate in &candidates {
        let with_field = total - candidate.markers + candidate.cost;
        if with_field <= max_bytes {
            included[candidate.position] = true;
            total = with_field;
        }
    }

    candidates.sort_by_key(|c| c.position);

    // Payload first, envelope last, as in an uncompacted record
    let mut result = Map::new();
    for candidate in &candidates {
        if included[candidate.position] {
            result.insert(candidate.field.to_string(), candidate.value.clone());
        }
    }
    for candidate in candidates.iter().filter(|c| !included[c.position]) {
        for (k, v) in markers(candidate.field, candidate.size) {
            result.insert(k, v);
        }
    }
    result.extend(envelope);

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::record::{CHUNK_INDEX_FIELD, TOTAL_CHUNKS_FIELD};
    use serde_json::json;

    fn record(fields: &[(&str, Value)]) -> Map<String, Value> {
        let mut map = Map::new();
        for (k, v) in fields {
            map.insert(k.to_string(), v.clone());
        }
        map.insert(CHUNK_INDEX_FIELD.to_string(), json!(2));
        map.insert(TOTAL_CHUNKS_FIELD.to_string(), json!(5));
        map
    }

    #[test]
    fn test_small_record_unchanged() {
        let input = record(&[("a", json!(1))]);
        assert_eq!(compact(&input, 1_000, DEFAULT_COMPACTION_MARGIN), input);
    }

    #[test]
    fn test_result_within_budget() {
        let input = record(&[
            ("small", json!("s".repeat(50))),
            ("medium", json!("m".repeat(400))),
            ("large", json!("l".repeat(2_000))),
        ]);
        let output = compact(&input, 1_000, DEFAULT_COMPACTION_MARGIN);

        assert!(size_of(&output) <= 1_000);
        assert_eq!(output["small"], input["small"]);
        assert_eq!(output["medium"], input["medium"]);
        assert!(!output.contains_key("large"));
        assert_eq!(output["large_oversized"], json!(true));
        assert_eq!(output["large_size"], json!(entry_size("large", &input["large"])));
        assert_eq!(output[OVERSIZED_FIELD], json!(true));
    }

    #[test]
    fn test_size_marker_matches_field_entry() {
        let input = record(&[("blob", json!("x".repeat(5_000)))]);
        let output = compact(&input, 500, DEFAULT_COMPACTION_MARGIN);

        assert_eq!(output["blob_size"], json!(size_of(&json!({"blob": "x".repeat(5_000)})) - 2));
    }

    #[test]
    fn test_envelope_preserved_verbatim() {
        let input = record(&[("blob", json!("x".repeat(5_000)))]);
        let output = compact(&input, 500, DEFAULT_COMPACTION_MARGIN);

        assert_eq!(output[CHUNK_INDEX_FIELD], json!(2));
        assert_eq!(output[TOTAL_CHUNKS_FIELD], json!(5));
    }

    #[test]
    fn test_every_field_accounted_for() {
        let fields: Vec<(String, Value)> = (0..30)
            .map(|i| (format!("f{}", i), json!("v".repeat(20 * (i + 1)))))
            .collect();
        let refs: Vec<(&str, Value)> = fields.iter().map(|(k, v)| (k.as_str(), v.clone())).collect();
        let input = record(&refs);
        let output = compact(&input, 3_000, DEFAULT_COMPACTION_MARGIN);

        assert!(size_of(&output) <= 3_000);
        for (field, value) in &fields {
            let kept = output.get(field) == Some(value);
            let marked = output.get(&format!("{}_oversized", field)) == Some(&json!(true))
                && output.contains_key(&format!("{}_size", field));
            assert!(kept ^ marked, "field {} vanished or duplicated", field);
        }
    }

    #[test]
    fn test_prefers_smaller_fields() {
        let input = record(&[
            ("big", json!("b".repeat(700))),
            ("tiny", json!(1)),
            ("mid", json!("m".repeat(300))),
        ]);
        let output = compact(&input, 700, DEFAULT_COMPACTION_MARGIN);

        assert!(output.contains_key("tiny"));
        assert!(output.contains_key("mid"));
        assert!(output.contains_key("big_oversized"));
    }

    #[test]
    fn test_included_fields_keep_original_order() {
        let input = record(&[
            ("zeta", json!(1)),
            ("alpha", json!(2)),
            ("huge", json!("h".repeat(1_000))),
        ]);
        let output = compact(&input, 400, DEFAULT_COMPACTION_MARGIN);

        let keys: Vec<&String> = output.keys().filter(|k| !k.starts_with('_')).collect();
        assert_eq!(keys[0], "zeta");
        assert_eq!(keys[1], "alpha");
    }
}
