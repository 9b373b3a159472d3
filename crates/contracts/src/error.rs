//! Layered error definitions
//!
//! Categorized by source: config / scan / sync / match / notify

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum TrackError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Scanner Errors =====
    /// Scanner connection error
    #[error("scanner connection error: {message}")]
    ScannerConnection { message: String },

    /// Scan line could not be parsed
    #[error("scan parse error: {message}: {line:?}")]
    ScanParse { line: String, message: String },

    // ===== Sync Errors =====
    /// Frame buffer overflow
    #[error("buffer overflow for camera '{camera_id}': depth={depth}, max={max}")]
    BufferOverflow {
        camera_id: String,
        depth: usize,
        max: usize,
    },

    // ===== Match Errors =====
    /// Route code not covered by the line configuration
    #[error("unknown route code: {route_code}")]
    UnknownRoute { route_code: String },

    // ===== Detection Errors =====
    /// Detector backend error
    #[error("detector error on camera '{camera_id}': {message}")]
    Detector { camera_id: String, message: String },

    // ===== Notify Errors =====
    /// Notifier delivery error
    #[error("notifier '{notifier}' send error: {message}")]
    NotifySend { notifier: String, message: String },

    /// Notifier connection error
    #[error("notifier '{notifier}' connection error: {message}")]
    NotifyConnection { notifier: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl TrackError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create detector error
    pub fn detector(camera_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Detector {
            camera_id: camera_id.into(),
            message: message.into(),
        }
    }

    /// Create notifier delivery error
    pub fn notify_send(notifier: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotifySend {
            notifier: notifier.into(),
            message: message.into(),
        }
    }
}
