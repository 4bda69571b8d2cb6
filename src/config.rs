//! Store configuration
//!
//! Loaded from a JSON file. Every field is optional:
//!
//! ```json
//! {
//!   "direct_write_limit": 60000,
//!   "chunk_body_limit": 40000,
//!   "compaction_margin": 100,
//!   "backend": { "type": "file", "path": "./kvchunk-data.json" },
//!   "log_level": "info"
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chunk::{
    ChunkLimits, DEFAULT_CHUNK_BODY_LIMIT, DEFAULT_COMPACTION_MARGIN, DEFAULT_DIRECT_WRITE_LIMIT,
};
use crate::kv::{FileBackend, KvBackend, KvResult, MemoryBackend, DEFAULT_MAX_VALUE_BYTES};
use crate::observability::{log_event_with_fields, Event, Severity};

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Read { .. } => "KVCHUNK_CONFIG_READ",
            ConfigError::Parse(_) => "KVCHUNK_CONFIG_PARSE",
            ConfigError::Invalid(_) => "KVCHUNK_CONFIG_INVALID",
        }
    }
}

/// Which backend holds the records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    Memory {
        #[serde(default = "default_max_value_bytes")]
        max_value_bytes: usize,
    },
    File {
        path: PathBuf,
        #[serde(default = "default_max_value_bytes")]
        max_value_bytes: usize,
    },
}

impl BackendConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            BackendConfig::Memory { .. } => "memory",
            BackendConfig::File { .. } => "file",
        }
    }

    /// Whether records are lost when the process exits
    pub fn is_volatile(&self) -> bool {
        matches!(self, BackendConfig::Memory { .. })
    }

    pub fn max_value_bytes(&self) -> usize {
        match self {
            BackendConfig::Memory { max_value_bytes } => *max_value_bytes,
            BackendConfig::File {
                max_value_bytes, ..
            } => *max_value_bytes,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Memory {
            max_value_bytes: DEFAULT_MAX_VALUE_BYTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkStoreConfig {
    /// Largest document written as a single record (default 60000)
    #[serde(default = "default_direct_write_limit")]
    pub direct_write_limit: usize,

    /// Payload budget of one chunk (default 40000)
    #[serde(default = "default_chunk_body_limit")]
    pub chunk_body_limit: usize,

    /// Compactor headroom (default 100)
    #[serde(default = "default_compaction_margin")]
    pub compaction_margin: usize,

    #[serde(default)]
    pub backend: BackendConfig,

    /// Minimum severity written to the log (default "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_direct_write_limit() -> usize {
    DEFAULT_DIRECT_WRITE_LIMIT
}
fn default_chunk_body_limit() -> usize {
    DEFAULT_CHUNK_BODY_LIMIT
}
fn default_compaction_margin() -> usize {
    DEFAULT_COMPACTION_MARGIN
}
fn default_max_value_bytes() -> usize {
    DEFAULT_MAX_VALUE_BYTES
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ChunkStoreConfig {
    fn default() -> Self {
        Self {
            direct_write_limit: default_direct_write_limit(),
            chunk_body_limit: default_chunk_body_limit(),
            compaction_margin: default_compaction_margin(),
            backend: BackendConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl ChunkStoreConfig {
    /// Load and validate configuration from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Parse and validate configuration from a JSON string
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: ChunkStoreConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.chunk_body_limit == 0 {
            return Err(ConfigError::Invalid("chunk_body_limit must be > 0".into()));
        }

        if self.chunk_body_limit >= self.direct_write_limit {
            return Err(ConfigError::Invalid(format!(
                "chunk_body_limit ({}) must be below direct_write_limit ({})",
                self.chunk_body_limit, self.direct_write_limit
            )));
        }

        if self.compaction_margin >= self.direct_write_limit {
            return Err(ConfigError::Invalid(format!(
                "compaction_margin ({}) must be below direct_write_limit ({})",
                self.compaction_margin, self.direct_write_limit
            )));
        }

        if self.backend.max_value_bytes() == 0 {
            return Err(ConfigError::Invalid("max_value_bytes must be > 0".into()));
        }

        // Metadata and compacted chunks are written up to this limit
        if self.direct_write_limit > self.backend.max_value_bytes() {
            return Err(ConfigError::Invalid(format!(
                "direct_write_limit ({}) exceeds the backend's max_value_bytes ({})",
                self.direct_write_limit,
                self.backend.max_value_bytes()
            )));
        }

        self.severity()?;
        Ok(())
    }

    /// Parsed `log_level`
    pub fn severity(&self) -> ConfigResult<Severity> {
        self.log_level
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("Unknown log_level: '{}'", self.log_level)))
    }

    pub fn limits(&self) -> ChunkLimits {
        ChunkLimits {
            direct_write_limit: self.direct_write_limit,
            chunk_body_limit: self.chunk_body_limit,
            compaction_margin: self.compaction_margin,
        }
    }

    /// Construct the configured backend
    pub async fn open_backend(&self) -> KvResult<Arc<dyn KvBackend>> {
        let backend: Arc<dyn KvBackend> = match &self.backend {
            BackendConfig::Memory { max_value_bytes } => {
                Arc::new(MemoryBackend::with_max_value_bytes(*max_value_bytes))
            }
            BackendConfig::File {
                path,
                max_value_bytes,
            } => Arc::new(FileBackend::open_with_max_value_bytes(path, *max_value_bytes).await?),
        };

        log_event_with_fields(
            Event::BackendOpened,
            &[
                ("backend", self.backend.kind()),
                ("max_value_bytes", &self.backend.max_value_bytes().to_string()),
            ],
        );
        Ok(backend)
    }
}
