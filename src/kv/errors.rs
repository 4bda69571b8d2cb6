//! # Key-Value Backend Errors

use thiserror::Error;

/// Result type for backend operations
pub type KvResult<T> = Result<T, KvError>;

/// Key-value backend errors
#[derive(Debug, Clone, Error)]
pub enum KvError {
    /// The backend's per-entry payload limit was hit
    #[error("Value too large: {size} bytes (max: {max})")]
    ValueTooLarge { size: usize, max: usize },

    #[error("I/O error: {0}")]
    Io(String),

    /// The persisted store failed checksum or format validation
    #[error("Corrupted store: {0}")]
    Corrupted(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Lock poisoned")]
    LockPoisoned,
}

impl KvError {
    /// Stable error code string
    pub fn code(&self) -> &'static str {
        match self {
            KvError::ValueTooLarge { .. } => "KVCHUNK_KV_VALUE_TOO_LARGE",
            KvError::Io(_) => "KVCHUNK_KV_IO_ERROR",
            KvError::Corrupted(_) => "KVCHUNK_KV_CORRUPTED",
            KvError::Serialization(_) => "KVCHUNK_KV_SERIALIZATION",
            KvError::LockPoisoned => "KVCHUNK_KV_LOCK_POISONED",
        }
    }
}

impl From<std::io::Error> for KvError {
    fn from(e: std::io::Error) -> Self {
        KvError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for KvError {
    fn from(e: serde_json::Error) -> Self {
        KvError::Serialization(e.to_string())
    }
}
