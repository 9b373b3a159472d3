//! Ingestion error types

use thiserror::Error;

/// Ingestion error
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Frame channel is closed
    #[error("channel closed for camera {camera_id}")]
    ChannelClosed { camera_id: String },

    /// Camera is not listening
    #[error("camera {camera_id} is not listening")]
    CameraNotListening { camera_id: String },

    /// Camera is already listening
    #[error("camera {camera_id} is already listening")]
    AlreadyListening { camera_id: String },
}

/// Ingestion Result alias
pub type Result<T> = std::result::Result<T, IngestionError>;
