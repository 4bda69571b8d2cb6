//! Observability for the chunked store
//!
//! - Structured logging (JSON lines)
//! - Typed lifecycle events
//! - Lock-free counters
//!
//! Observability is read-only: nothing here changes what a store or
//! load call does.
//!
//! # Usage
//!
//! ```ignore
//! use kvchunk::observability::{log_event_with_fields, Event, MetricsRegistry};
//!
//! log_event_with_fields(Event::ChunkWritten, &[("key", "table1"), ("index", "0")]);
//!
//! let metrics = MetricsRegistry::new();
//! metrics.increment_chunks_written();
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{LogTarget, Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_fatal() {
        Severity::Fatal
    } else {
        Severity::Info
    };
    Logger::log(severity, event.as_str(), fields);
}

/// Log a recovered condition
pub fn warn_event(event: Event, fields: &[(&str, &str)]) {
    Logger::warn(event.as_str(), fields);
}

/// Log a failed operation
pub fn error_event(event: Event, fields: &[(&str, &str)]) {
    Logger::error(event.as_str(), fields);
}

/// Log per-chunk detail
pub fn trace_event(event: Event, fields: &[(&str, &str)]) {
    Logger::trace(event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_event_logs() {
        // No panic on any path
        log_event_with_fields(Event::StoreBegin, &[]);
        log_event_with_fields(Event::StoreFailed, &[("code", "KVCHUNK_CHUNK_WRITE_FAILED")]);
    }

    #[test]
    fn test_log_event_with_fields() {
        log_event_with_fields(Event::ConfigLoaded, &[("backend", "memory")]);
        warn_event(Event::ChunkMissing, &[("key", "k"), ("index", "1")]);
        trace_event(Event::ChunkWritten, &[("index", "0")]);
    }
}
