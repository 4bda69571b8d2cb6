//! # File Backend
//!
//! Persists the whole key space as one checksummed JSON snapshot.
//!
//! File layout:
//!
//! ```text
//! <crc32 of body, 8 lowercase hex digits>\n
//! <body: compact JSON object, encoded key -> value>
//! ```
//!
//! Every `set`/`delete` rewrites the snapshot through a temporary file
//! and a rename, so a crash leaves either the old or the new snapshot.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tokio::sync::Mutex;

use super::backend::{KvBackend, KvFuture};
use super::errors::{KvError, KvResult};
use super::key::KvKey;
use super::memory::DEFAULT_MAX_VALUE_BYTES;
use crate::chunk::size_of;

/// CRC32 (IEEE) over the snapshot body
fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Single-file persistent backend
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, Value>>,
    max_value_bytes: usize,
}

impl FileBackend {
    /// Open the snapshot at `path`, creating an empty store if missing.
    ///
    /// # Errors
    ///
    /// `KvError::Corrupted` if the file exists but fails checksum or
    /// format validation.
    pub async fn open(path: impl AsRef<Path>) -> KvResult<Self> {
        Self::open_with_max_value_bytes(path, DEFAULT_MAX_VALUE_BYTES).await
    }

    /// Open with a custom per-entry limit
    pub async fn open_with_max_value_bytes(
        path: impl AsRef<Path>,
        max_value_bytes: usize,
    ) -> KvResult<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match tokio::fs::read(&path).await {
            Ok(data) => Self::decode(&data)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
            max_value_bytes,
        })
    }

    /// Path of the snapshot file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn decode(data: &[u8]) -> KvResult<BTreeMap<String, Value>> {
        if data.is_empty() {
            return Ok(BTreeMap::new());
        }

        let newline = data
            .iter()
            .position(|b| *b == b'\n')
            .ok_or_else(|| KvError::Corrupted("missing checksum header".to_string()))?;
        let header = std::str::from_utf8(&data[..newline])
            .map_err(|_| KvError::Corrupted("checksum header is not UTF-8".to_string()))?;
        let stored = u32::from_str_radix(header.trim(), 16)
            .map_err(|_| KvError::Corrupted(format!("invalid checksum header: '{}'", header)))?;

        let body = &data[newline + 1..];
        let computed = compute_checksum(body);
        if computed != stored {
            return Err(KvError::Corrupted(format!(
                "Checksum mismatch: computed {:08x}, stored {:08x}",
                computed, stored
            )));
        }

        serde_json::from_slice(body).map_err(|e| KvError::Corrupted(e.to_string()))
    }

    fn encode(entries: &BTreeMap<String, Value>) -> KvResult<Vec<u8>> {
        let body = serde_json::to_vec(entries)?;
        let mut out = format!("{:08x}\n", compute_checksum(&body)).into_bytes();
        out.extend_from_slice(&body);
        Ok(out)
    }

    async fn persist(&self, entries: &BTreeMap<String, Value>) -> KvResult<()> {
        let data = Self::encode(entries)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, &data).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

impl KvBackend for FileBackend {
    fn get<'a>(&'a self, key: &'a KvKey) -> KvFuture<'a, Option<Value>> {
        Box::pin(async move {
            let entries = self.entries.lock().await;
            Ok(entries.get(&key.encode()).cloned())
        })
    }

    fn set<'a>(&'a self, key: &'a KvKey, value: Value) -> KvFuture<'a, ()> {
        Box::pin(async move {
            let size = size_of(&value);
            if size > self.max_value_bytes {
                return Err(KvError::ValueTooLarge {
                    size,
                    max: self.max_value_bytes,
                });
            }

            let mut entries = self.entries.lock().await;
            let encoded = key.encode();
            let previous = entries.insert(encoded.clone(), value);

            // Keep memory and disk in step if the rewrite fails
            if let Err(e) = self.persist(&entries).await {
                match previous {
                    Some(old) => entries.insert(encoded, old),
                    None => entries.remove(&encoded),
                };
                return Err(e);
            }
            Ok(())
        })
    }

    fn delete<'a>(&'a self, key: &'a KvKey) -> KvFuture<'a, ()> {
        Box::pin(async move {
            let mut entries = self.entries.lock().await;
            let encoded = key.encode();
            if let Some(old) = entries.remove(&encoded) {
                if let Err(e) = self.persist(&entries).await {
                    entries.insert(encoded, old);
                    return Err(e);
                }
            }
            Ok(())
        })
    }

    fn max_value_bytes(&self) -> usize {
        self.max_value_bytes
    }
}
