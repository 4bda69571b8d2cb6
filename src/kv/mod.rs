//! Key-value backends
//!
//! The chunked store talks to its backend only through [`KvBackend`]:
//! single-key `get`/`set`/`delete`, each asynchronous, each bounded by a
//! per-entry size limit. The concrete backend is chosen at construction
//! time and injected as `Arc<dyn KvBackend>`.

mod backend;
mod errors;
mod file;
mod key;
mod memory;

pub use backend::{KvBackend, KvFuture};
pub use errors::{KvError, KvResult};
pub use file::FileBackend;
pub use key::{KeyPart, KvKey};
pub use memory::{MemoryBackend, DEFAULT_MAX_VALUE_BYTES};
