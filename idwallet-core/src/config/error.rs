//! Configuration errors

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read wallet configuration {}: {reason}", .path.display())]
    Read { path: PathBuf, reason: String },

    #[error("Cannot write wallet configuration {}: {reason}", .path.display())]
    Write { path: PathBuf, reason: String },

    #[error("Malformed wallet configuration: {0}")]
    Parse(String),

    #[error("Failed to serialize configuration: {0}")]
    Serialize(String),

    /// An `IDWALLET_*` variable that does not parse
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}
