//! HttpNotifier - pushes parcel events to the line control REST API

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use contracts::{Notifier, Notification, TrackError};
use serde_json::json;
use tracing::{debug, instrument, warn};

/// Configuration for HttpNotifier
#[derive(Debug, Clone)]
pub struct HttpNotifierConfig {
    /// API base url, e.g. `http://192.168.1.100:8000/api`
    pub base_url: String,

    /// Where position thumbnails get persisted, if anywhere.
    /// The API itself never receives image bytes.
    pub thumbnail_dir: Option<PathBuf>,

    /// Per-request timeout
    pub timeout: Duration,
}

impl HttpNotifierConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let base_url = params
            .get("base_url")
            .cloned()
            .ok_or_else(|| "missing 'base_url' parameter".to_string())?;

        let thumbnail_dir = params.get("thumbnail_dir").map(PathBuf::from);

        let timeout_s: f64 = match params.get("timeout_s") {
            Some(raw) => raw
                .parse()
                .map_err(|e| format!("invalid timeout_s '{raw}': {e}"))?,
            None => 2.0,
        };

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            thumbnail_dir,
            timeout: Duration::from_secs_f64(timeout_s),
        })
    }
}

/// Notifier that delivers parcel events over HTTP.
///
/// Requests run on the blocking pool so a slow API server never stalls
/// the runtime. A failed request is reported upward for metrics but
/// the event is not retried; the API is advisory.
pub struct HttpNotifier {
    name: String,
    config: HttpNotifierConfig,
    agent: ureq::Agent,
}

/// One prepared API call, executed off the async runtime.
enum ApiCall {
    Patch { url: String, body: serde_json::Value },
    Delete { url: String },
}

impl HttpNotifier {
    pub fn new(name: impl Into<String>, config: HttpNotifierConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(config.timeout)
            .build();

        Self {
            name: name.into(),
            config,
            agent,
        }
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, String> {
        Ok(Self::new(name, HttpNotifierConfig::from_params(params)?))
    }

    fn prepare_call(&self, notification: &Notification) -> ApiCall {
        let base = &self.config.base_url;
        match notification {
            Notification::Position { uid, distance, .. } => ApiCall::Patch {
                url: format!("{base}/detect-position"),
                body: json!({ "uid": uid, "position": distance }),
            },
            Notification::Pickup { uid } => ApiCall::Patch {
                url: format!("{base}/detect-pickup"),
                body: json!({ "uid": uid, "received": true }),
            },
            Notification::Missing { uid } => ApiCall::Patch {
                url: format!("{base}/detect-missing"),
                body: json!({ "uid": uid, "missed": true }),
            },
            Notification::Disappear { uid } => ApiCall::Patch {
                url: format!("{base}/detect-disappear"),
                body: json!({ "uid": uid, "disappear": true }),
            },
            Notification::Eol { uid } => ApiCall::Delete {
                url: format!("{base}/detect-eol/{uid}"),
            },
        }
    }

    fn save_thumbnail(&self, uid: &str, jpeg: &[u8]) {
        let Some(dir) = &self.config.thumbnail_dir else {
            return;
        };
        let path = dir.join(format!("{uid}.jpg"));
        if let Err(e) = std::fs::write(&path, jpeg) {
            warn!(notifier = %self.name, uid = %uid, error = %e, "thumbnail write failed");
        } else {
            debug!(notifier = %self.name, uid = %uid, path = %path.display(), "thumbnail saved");
        }
    }
}

impl Notifier for HttpNotifier {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "http_notifier_send",
        skip(self, notification),
        fields(notifier = %self.name, uid = %notification.uid(), kind = notification.kind())
    )]
    async fn send(&mut self, notification: &Notification) -> Result<(), TrackError> {
        if let Notification::Position {
            uid,
            thumbnail: Some(jpeg),
            ..
        } = notification
        {
            self.save_thumbnail(uid, jpeg);
        }

        let call = self.prepare_call(notification);
        let agent = self.agent.clone();
        let name = self.name.clone();

        let result = tokio::task::spawn_blocking(move || match call {
            ApiCall::Patch { url, body } => agent.patch(&url).send_json(body).map(|_| ()),
            ApiCall::Delete { url } => agent.delete(&url).call().map(|_| ()),
        })
        .await
        .map_err(|e| TrackError::notify_send(&name, format!("request task failed: {e}")))?;

        result.map_err(|e| TrackError::notify_send(&self.name, e.to_string()))?;
        Ok(())
    }

    #[instrument(name = "http_notifier_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), TrackError> {
        // Requests are synchronous per event, nothing buffered
        Ok(())
    }

    #[instrument(name = "http_notifier_close", skip(self))]
    async fn close(&mut self) -> Result<(), TrackError> {
        debug!(notifier = %self.name, "HttpNotifier closed");
        Ok(())
    }
}
