//! Notifier error types

use thiserror::Error;

/// Notifier-specific errors
#[derive(Debug, Error)]
pub enum NotifierError {
    /// Notifier creation error
    #[error("failed to create notifier '{name}': {message}")]
    NotifierCreation { name: String, message: String },

    /// Queue full - notification dropped
    #[error("queue full for notifier '{notifier}', notification for {uid} dropped")]
    QueueFull { notifier: String, uid: String },

    /// Delivery error (from contract)
    #[error("notify error: {0}")]
    Track(#[from] contracts::TrackError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl NotifierError {
    pub fn creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotifierCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}
