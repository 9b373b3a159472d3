//! Notifier trait and notification payloads
//!
//! Defines the abstract interface for downstream notification sinks.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::TrackError;

/// One tracking event pushed downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// Remaining distance to the pickup point changed
    Position {
        uid: String,
        /// Remaining distance in meters, quantized to 0.5
        distance: f64,
        /// Small JPEG of the parcel, captured at the local camera
        #[serde(skip_serializing_if = "Option::is_none")]
        thumbnail: Option<Bytes>,
    },

    /// Parcel was picked up inside its pickup zone
    Pickup { uid: String },

    /// Parcel passed its last pickup point without being taken
    Missing { uid: String },

    /// Parcel left the belt outside any pickup zone
    Disappear { uid: String },

    /// Parcel reached the end of the line
    Eol { uid: String },
}

impl Notification {
    pub fn uid(&self) -> &str {
        match self {
            Notification::Position { uid, .. }
            | Notification::Pickup { uid }
            | Notification::Missing { uid }
            | Notification::Disappear { uid }
            | Notification::Eol { uid } => uid,
        }
    }

    /// Short name for logging/metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::Position { .. } => "position",
            Notification::Pickup { .. } => "pickup",
            Notification::Missing { .. } => "missing",
            Notification::Disappear { .. } => "disappear",
            Notification::Eol { .. } => "eol",
        }
    }
}

/// Notification output trait
///
/// All notifier implementations must implement this trait.
#[trait_variant::make(Notifier: Send)]
pub trait LocalNotifier {
    /// Notifier name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Deliver one notification
    ///
    /// # Errors
    /// Returns delivery error (should include context)
    async fn send(&mut self, notification: &Notification) -> Result<(), TrackError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), TrackError>;

    /// Close notifier
    async fn close(&mut self) -> Result<(), TrackError>;
}
