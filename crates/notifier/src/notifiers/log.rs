//! LogNotifier - logs notification summary via tracing

use contracts::{Notifier, Notification, TrackError};
use tracing::{info, instrument};

/// Notifier that logs notification summaries for debugging
pub struct LogNotifier {
    name: String,
}

impl LogNotifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_notifier_send",
        skip(self, notification),
        fields(notifier = %self.name, uid = %notification.uid())
    )]
    async fn send(&mut self, notification: &Notification) -> Result<(), TrackError> {
        match notification {
            Notification::Position { uid, distance, thumbnail } => {
                info!(
                    notifier = %self.name,
                    uid = %uid,
                    distance,
                    has_thumbnail = thumbnail.is_some(),
                    "position update"
                );
            }
            other => {
                info!(
                    notifier = %self.name,
                    uid = %other.uid(),
                    kind = other.kind(),
                    "parcel event"
                );
            }
        }
        Ok(())
    }

    #[instrument(name = "log_notifier_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), TrackError> {
        // Nothing to flush for log notifier
        Ok(())
    }

    #[instrument(name = "log_notifier_close", skip(self))]
    async fn close(&mut self) -> Result<(), TrackError> {
        info!(notifier = %self.name, "LogNotifier closed");
        Ok(())
    }
}
