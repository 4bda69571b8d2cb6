//! # In-Memory Backend

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value;

use super::backend::{KvBackend, KvFuture};
use super::errors::{KvError, KvResult};
use super::key::KvKey;
use crate::chunk::size_of;

/// Default per-entry limit, matching the 64KB class of hosted KV stores
pub const DEFAULT_MAX_VALUE_BYTES: usize = 65_536;

/// In-process key-value map with an enforced per-entry limit.
///
/// Used as the fallback backend when no persistent store is configured,
/// and throughout the test suite.
#[derive(Debug)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<KvKey, Value>>,
    max_value_bytes: usize,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Create an empty backend with the default entry limit
    pub fn new() -> Self {
        Self::with_max_value_bytes(DEFAULT_MAX_VALUE_BYTES)
    }

    /// Create an empty backend with a custom entry limit
    pub fn with_max_value_bytes(max_value_bytes: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_value_bytes,
        }
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    /// Whether the backend holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All keys currently stored, sorted
    pub fn keys(&self) -> Vec<KvKey> {
        let mut keys: Vec<KvKey> = self
            .entries
            .read()
            .map(|e| e.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    fn get_sync(&self, key: &KvKey) -> KvResult<Option<Value>> {
        let entries = self.entries.read().map_err(|_| KvError::LockPoisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set_sync(&self, key: &KvKey, value: Value) -> KvResult<()> {
        let size = size_of(&value);
        if size > self.max_value_bytes {
            return Err(KvError::ValueTooLarge {
                size,
                max: self.max_value_bytes,
            });
        }
        let mut entries = self.entries.write().map_err(|_| KvError::LockPoisoned)?;
        entries.insert(key.clone(), value);
        Ok(())
    }

    fn delete_sync(&self, key: &KvKey) -> KvResult<()> {
        let mut entries = self.entries.write().map_err(|_| KvError::LockPoisoned)?;
        entries.remove(key);
        Ok(())
    }
}

impl KvBackend for MemoryBackend {
    fn get<'a>(&'a self, key: &'a KvKey) -> KvFuture<'a, Option<Value>> {
        Box::pin(async move { self.get_sync(key) })
    }

    fn set<'a>(&'a self, key: &'a KvKey, value: Value) -> KvFuture<'a, ()> {
        Box::pin(async move { self.set_sync(key, value) })
    }

    fn delete<'a>(&'a self, key: &'a KvKey) -> KvFuture<'a, ()> {
        Box::pin(async move { self.delete_sync(key) })
    }

    fn max_value_bytes(&self) -> usize {
        self.max_value_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv_key;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_get_delete() {
        let backend = MemoryBackend::new();
        let key = kv_key!("json_data", "k");

        assert_eq!(backend.get(&key).await.unwrap(), None);

        backend.set(&key, json!({"a": 1})).await.unwrap();
        assert_eq!(backend.get(&key).await.unwrap(), Some(json!({"a": 1})));

        backend.delete(&key).await.unwrap();
        assert_eq!(backend.get(&key).await.unwrap(), None);
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_values_over_limit() {
        let backend = MemoryBackend::with_max_value_bytes(16);
        let key = kv_key!("json_data", "big");

        let err = backend
            .set(&key, json!("this string is longer than sixteen bytes"))
            .await
            .unwrap_err();
        assert!(matches!(err, KvError::ValueTooLarge { max: 16, .. }));
        assert_eq!(backend.get(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_value_at_exact_limit_is_accepted() {
        let value = json!("abcd");
        let backend = MemoryBackend::with_max_value_bytes(size_of(&value));
        backend.set(&kv_key!("k"), value).await.unwrap();
        assert_eq!(backend.len(), 1);
    }

    #[tokio::test]
    async fn test_keys_are_sorted() {
        let backend = MemoryBackend::new();
        backend.set(&kv_key!("json_data_chunk", "t", 1usize), json!(1)).await.unwrap();
        backend.set(&kv_key!("json_data", "t"), json!(0)).await.unwrap();
        backend.set(&kv_key!("json_data_chunk", "t", 0usize), json!(2)).await.unwrap();

        let keys = backend.keys();
        assert_eq!(keys[0], kv_key!("json_data", "t"));
        assert_eq!(keys[1], kv_key!("json_data_chunk", "t", 0usize));
        assert_eq!(keys[2], kv_key!("json_data_chunk", "t", 1usize));
    }
}
