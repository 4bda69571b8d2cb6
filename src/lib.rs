//! kvchunk - chunked JSON storage over size-capped key-value backends
//!
//! ```ignore
//! use kvchunk::chunk::ChunkStore;
//! use serde_json::json;
//!
//! let store = ChunkStore::in_memory();
//! store.store("table1", &json!({"rows": rows})).await?;
//! let rows = store.load("table1").await;
//! ```

pub mod chunk;
pub mod cli;
pub mod config;
pub mod kv;
pub mod observability;
