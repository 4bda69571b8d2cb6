//! Serialized size estimation
//!
//! The size of a value is the length in bytes of its compact serde_json
//! serialization. This is the only measure of "fits" used by the
//! splitter, the compactor and the writer.

use std::io;

use serde::Serialize;
use serde_json::Value;

/// `io::Write` sink that only counts bytes
struct ByteCounter(usize);

impl io::Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0 += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Serialized size of `value` in bytes.
///
/// Deterministic and allocation-free. A value that cannot be serialized
/// reports `usize::MAX` so it never "fits" anywhere.
pub fn size_of<T: Serialize + ?Sized>(value: &T) -> usize {
    let mut counter = ByteCounter(0);
    match serde_json::to_writer(&mut counter, value) {
        Ok(()) => counter.0,
        Err(_) => usize::MAX,
    }
}

/// Bytes that `"field":value` occupies inside an object, without the
/// separating comma.
pub fn entry_size(field: &str, value: &Value) -> usize {
    string_size(field).saturating_add(1).saturating_add(size_of(value))
}

/// Serialized size of `s` as a JSON string literal, quotes included
pub fn string_size(s: &str) -> usize {
    size_of(s)
}
