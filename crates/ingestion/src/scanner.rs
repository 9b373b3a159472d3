//! Scanner feed listener
//!
//! Connects to the label scanner's event stream (newline-delimited
//! JSON over TCP) and turns insert events into `ScanEvent`s. The scan
//! time comes from the uid's embedded HHMMSS_mmm block; if the uid
//! doesn't carry one, the current wall clock is used so the event still
//! sorts near its true position.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use contracts::{parse_uid_seconds, ScanEvent, TrackError};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::clock::seconds_of_day;
use crate::config::IngestionMetrics;

/// Scanner listener configuration
#[derive(Debug, Clone)]
pub struct ScannerListenerConfig {
    pub host: String,
    pub port: u16,

    /// Delay between reconnect attempts
    pub retry_interval_s: f64,

    /// Give up after this long without a successful connection
    pub max_retry_time_s: Option<f64>,
}

impl ScannerListenerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            retry_interval_s: 5.0,
            max_retry_time_s: Some(300.0),
        }
    }
}

/// Scanner feed listener
///
/// Owns the reconnect loop; emits parsed events on a bounded channel.
pub struct ScannerListener {
    config: ScannerListenerConfig,
    metrics: Arc<IngestionMetrics>,
    running: Arc<AtomicBool>,
}

impl ScannerListener {
    pub fn new(config: ScannerListenerConfig, metrics: Arc<IngestionMetrics>) -> Self {
        Self {
            config,
            metrics,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start the listener task, returning the scan event stream.
    pub fn start(&self, channel_capacity: usize) -> mpsc::Receiver<ScanEvent> {
        let (tx, rx) = mpsc::channel(channel_capacity);
        let config = self.config.clone();
        let metrics = self.metrics.clone();
        let running = self.running.clone();

        running.store(true, Ordering::SeqCst);

        tokio::spawn(async move {
            let addr = format!("{}:{}", config.host, config.port);
            let retry_interval = Duration::from_secs_f64(config.retry_interval_s);
            let mut first_retry: Option<std::time::Instant> = None;

            info!(addr = %addr, "scanner listener starting");

            while running.load(Ordering::Relaxed) {
                let stream = match TcpStream::connect(&addr).await {
                    Ok(stream) => {
                        info!(addr = %addr, "scanner connected");
                        first_retry = None;
                        stream
                    }
                    Err(err) => {
                        let since = *first_retry.get_or_insert_with(std::time::Instant::now);
                        if let Some(max) = config.max_retry_time_s {
                            if since.elapsed().as_secs_f64() >= max {
                                warn!(addr = %addr, "scanner retry budget exhausted, giving up");
                                break;
                            }
                        }
                        warn!(addr = %addr, error = %err, "scanner connect failed, retrying");
                        tokio::time::sleep(retry_interval).await;
                        continue;
                    }
                };

                let mut lines = BufReader::new(stream).lines();
                loop {
                    if !running.load(Ordering::Relaxed) {
                        return;
                    }
                    match lines.next_line().await {
                        Ok(Some(line)) => {
                            let line = line.trim();
                            if line.is_empty() {
                                continue;
                            }
                            match parse_scan_line(line) {
                                Ok(Some(event)) => {
                                    debug!(
                                        uid = %event.uid,
                                        route = %event.route_code,
                                        time_s = event.time_s,
                                        "scan event"
                                    );
                                    if tx.send(event).await.is_err() {
                                        return;
                                    }
                                }
                                Ok(None) => {}
                                Err(err) => {
                                    metrics.record_scan_parse_error();
                                    warn!(error = %err, "scan line rejected");
                                }
                            }
                        }
                        Ok(None) => {
                            warn!(addr = %addr, "scanner stream closed, reconnecting");
                            break;
                        }
                        Err(err) => {
                            warn!(addr = %addr, error = %err, "scanner read error, reconnecting");
                            break;
                        }
                    }
                }

                if first_retry.is_none() {
                    first_retry = Some(std::time::Instant::now());
                }
                tokio::time::sleep(retry_interval).await;
            }

            info!(addr = %addr, "scanner listener stopped");
        });

        rx
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

/// Parse one scanner feed line.
///
/// Returns `Ok(None)` for well-formed messages that are not parcel
/// inserts. The payload nests the parcel document under `data` or
/// `fullDocument` depending on the upstream producer.
pub fn parse_scan_line(line: &str) -> Result<Option<ScanEvent>, TrackError> {
    let message: Value = serde_json::from_str(line)
        .map_err(|e| TrackError::ScanParse {
            line: line.to_string(),
            message: e.to_string(),
        })?;

    if let Some(op) = message.get("type").and_then(Value::as_str) {
        if op != "insert" {
            return Ok(None);
        }
    }

    let doc = message
        .get("data")
        .or_else(|| message.get("fullDocument"))
        .unwrap_or(&message);

    let uid = field(doc, &["uid", "_id"])
        .or_else(|| field(&message, &["uid", "_id", "id"]))
        .ok_or_else(|| TrackError::ScanParse {
            line: line.to_string(),
            message: "missing uid".to_string(),
        })?;

    let route_code = field(doc, &["route_code", "route"])
        .or_else(|| field(&message, &["route_code", "route"]))
        .ok_or_else(|| TrackError::ScanParse {
            line: line.to_string(),
            message: "missing route code".to_string(),
        })?;

    let time_s = match parse_uid_seconds(&uid) {
        Some(t) => t,
        None => {
            warn!(uid = %uid, "no timestamp in uid, using wall clock");
            seconds_of_day()
        }
    };

    Ok(Some(ScanEvent {
        uid,
        route_code,
        time_s,
    }))
}

fn field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| value.get(k).and_then(Value::as_str))
        .map(str::to_owned)
}
