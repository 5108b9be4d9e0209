//! Configuration error types

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse rule file at {path}: {source}")]
    RuleFileError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Rule file at {path} must be a JSON object of rule name to schema")]
    RuleFileShape { path: PathBuf },

    #[error("Failed to serialize configuration: {0}")]
    SerializeError(String),

    #[error("XDG directory error: {0}")]
    XdgError(String),
}
