//! Error types for ReelMiner.
//!
//! Library crates use [`ReelMinerError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all ReelMiner operations.
#[derive(Debug, thiserror::Error)]
pub enum ReelMinerError {
    /// Configuration loading or a required credential/env var is missing.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP transport error.
    #[error("network error: {0}")]
    Network(String),

    /// The video catalog rejected a request or returned an unexpected payload.
    #[error("catalog error: {0}")]
    Catalog(String),

    /// Remote storage (Drive) API error.
    #[error("drive error: {0}")]
    Drive(String),

    /// One or more local files could not be uploaded to remote storage.
    #[error("upload error: {0}")]
    Upload(String),

    /// Outbound notification could not be delivered.
    #[error("notify error: {0}")]
    Notify(String),

    /// Flat-file state could not be read or written.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Malformed JSON/TOML or API payload.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Data validation error.
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ReelMinerError>;

impl ReelMinerError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error means the run could not even start.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }
}
