//! CLI-specific error types
//!
//! Every CLI error ends the process with a non-zero exit code.

use std::fmt;
use std::io;

use crate::chunk::ChunkError;
use crate::config::ConfigError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file missing or invalid
    ConfigError,
    /// Reading an input file or writing output failed
    IoError,
    /// Input file is not valid JSON
    InvalidDocument,
    /// No document under the requested key
    NotFound,
    /// The store call failed
    StoreFailed,
    /// Runtime could not start
    RuntimeError,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "KVCHUNK_CLI_CONFIG_ERROR",
            Self::IoError => "KVCHUNK_CLI_IO_ERROR",
            Self::InvalidDocument => "KVCHUNK_CLI_INVALID_DOCUMENT",
            Self::NotFound => "KVCHUNK_CLI_NOT_FOUND",
            Self::StoreFailed => "KVCHUNK_CLI_STORE_FAILED",
            Self::RuntimeError => "KVCHUNK_CLI_RUNTIME_ERROR",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn invalid_document(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InvalidDocument, msg)
    }

    pub fn not_found(key: &str) -> Self {
        Self::new(CliErrorCode::NotFound, format!("No document under key '{}'", key))
    }

    pub fn store_failed(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::StoreFailed, msg)
    }

    pub fn runtime_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::RuntimeError, msg)
    }

    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::config_error(e.to_string())
    }
}

impl From<ChunkError> for CliError {
    fn from(e: ChunkError) -> Self {
        Self::store_failed(format!("{}: {}", e.code(), e))
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_code() {
        let err = CliError::not_found("table1");
        assert_eq!(err.code(), &CliErrorCode::NotFound);
        assert_eq!(
            err.to_string(),
            "KVCHUNK_CLI_NOT_FOUND: No document under key 'table1'"
        );
    }

    #[test]
    fn test_from_chunk_error() {
        let err: CliError = ChunkError::UnsplittableDocument { size: 70_000 }.into();
        assert_eq!(err.code_str(), "KVCHUNK_CLI_STORE_FAILED");
        assert!(err.message().contains("KVCHUNK_UNSPLITTABLE_DOCUMENT"));
    }
}
