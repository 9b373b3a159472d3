//! FileNotifier - appends parcel events to a JSONL audit log

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use contracts::{Notifier, Notification, TrackError};
use serde_json::json;
use tracing::{debug, instrument};

/// Configuration for FileNotifier
#[derive(Debug, Clone)]
pub struct FileNotifierConfig {
    /// Output file path
    pub path: PathBuf,
}

impl FileNotifierConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let path = params
            .get("path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./events.jsonl"));

        Self { path }
    }
}

/// Notifier that appends one JSON line per event.
///
/// Thumbnails are never written here; the pipeline persists those to
/// the thumbnail directory separately.
pub struct FileNotifier {
    name: String,
    writer: BufWriter<File>,
}

impl FileNotifier {
    pub fn new(name: impl Into<String>, config: FileNotifierConfig) -> std::io::Result<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.path)?;

        Ok(Self {
            name: name.into(),
            writer: BufWriter::new(file),
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        Self::new(name, FileNotifierConfig::from_params(params))
    }

    fn append_line(&mut self, notification: &Notification) -> std::io::Result<()> {
        let ts = chrono::Local::now().to_rfc3339();
        let record = match notification {
            Notification::Position { uid, distance, .. } => json!({
                "ts": ts,
                "kind": "position",
                "uid": uid,
                "distance": distance,
            }),
            other => json!({
                "ts": ts,
                "kind": other.kind(),
                "uid": other.uid(),
            }),
        };
        serde_json::to_writer(&mut self.writer, &record)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

impl Notifier for FileNotifier {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_notifier_send",
        skip(self, notification),
        fields(notifier = %self.name, uid = %notification.uid())
    )]
    async fn send(&mut self, notification: &Notification) -> Result<(), TrackError> {
        self.append_line(notification)
            .map_err(|e| TrackError::notify_send(&self.name, e.to_string()))?;
        Ok(())
    }

    #[instrument(name = "file_notifier_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), TrackError> {
        self.writer
            .flush()
            .map_err(|e| TrackError::notify_send(&self.name, e.to_string()))?;
        Ok(())
    }

    #[instrument(name = "file_notifier_close", skip(self))]
    async fn close(&mut self) -> Result<(), TrackError> {
        self.writer
            .flush()
            .map_err(|e| TrackError::notify_send(&self.name, e.to_string()))?;
        debug!(notifier = %self.name, "FileNotifier closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn file_notifier_appends_jsonl() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let config = FileNotifierConfig { path: path.clone() };

        let mut notifier = FileNotifier::new("test_file", config).unwrap();
        notifier
            .send(&Notification::Position {
                uid: "u1".to_string(),
                distance: 3.5,
                thumbnail: None,
            })
            .await
            .unwrap();
        notifier
            .send(&Notification::Pickup {
                uid: "u1".to_string(),
            })
            .await
            .unwrap();
        notifier.flush().await.unwrap();

        let content = fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["kind"], "position");
        assert_eq!(first["uid"], "u1");
        assert_eq!(first["distance"], 3.5);

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["kind"], "pickup");
    }
}
