//! # Key-Value Backend Trait

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use super::errors::KvResult;
use super::key::KvKey;

/// Future returned by every backend operation
pub type KvFuture<'a, T> = Pin<Box<dyn Future<Output = KvResult<T>> + Send + 'a>>;

/// A single-key key-value store with a hard per-entry size limit.
///
/// Each operation touches exactly one key and is atomic for that key.
/// There are no cross-key transactions.
///
/// # Implementors
///
/// - [`super::MemoryBackend`] - in-process map
/// - [`super::FileBackend`] - checksummed JSON snapshot on disk
pub trait KvBackend: Send + Sync + std::fmt::Debug {
    /// Fetch the value under `key`, `None` if absent
    fn get<'a>(&'a self, key: &'a KvKey) -> KvFuture<'a, Option<Value>>;

    /// Replace the value under `key`.
    ///
    /// # Errors
    ///
    /// `KvError::ValueTooLarge` when the serialized value exceeds
    /// [`KvBackend::max_value_bytes`].
    fn set<'a>(&'a self, key: &'a KvKey, value: Value) -> KvFuture<'a, ()>;

    /// Remove `key`; removing an absent key is not an error
    fn delete<'a>(&'a self, key: &'a KvKey) -> KvFuture<'a, ()>;

    /// Largest serialized value the backend accepts
    fn max_value_bytes(&self) -> usize;
}
