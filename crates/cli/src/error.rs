//! Error types for CLI operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the command layer.
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    /// Configuration failed to load or validate
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(#[from] contracts::TrackError),

    /// The `validate` command found a broken configuration
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// JSON output serialization error
    #[error("Failed to serialize output: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Pipeline execution error
    #[error(transparent)]
    Pipeline(#[from] anyhow::Error),
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
