//! Pipeline metrics collection
//!
//! Convenience recorders for the `metrics` facade plus an in-memory
//! aggregator for end-of-run summary reporting.

use contracts::CameraId;
use metrics::{counter, gauge, histogram};

/// Record a frame received from a camera.
pub fn record_frame_received(camera_id: &str) {
    counter!(
        "track_frames_received_total",
        "camera_id" => camera_id.to_string()
    )
    .increment(1);
}

/// Record a window extraction attempt.
pub fn record_window_extracted(complete: bool) {
    let status = if complete { "complete" } else { "incomplete" };
    counter!(
        "track_windows_total",
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record one match attempt outcome.
pub fn record_match_outcome(stage: &str, status: &str) {
    counter!(
        "track_match_attempts_total",
        "stage" => stage.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a notification handed to a notifier.
pub fn record_notify_dispatched(notifier: &str, success: bool) {
    let status = if success { "success" } else { "dropped" };
    counter!(
        "track_notifications_total",
        "notifier" => notifier.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record window processing latency (receive head to match done).
pub fn record_window_latency_ms(latency_ms: f64) {
    histogram!("track_window_latency_ms").record(latency_ms);
}

/// Record how long detection took on one camera's frame.
pub fn record_detect_latency_ms(camera_id: &str, latency_ms: f64) {
    histogram!(
        "track_detect_latency_ms",
        "camera_id" => camera_id.to_string()
    )
    .record(latency_ms);
}

/// Record a camera buffer depth.
pub fn record_buffer_depth(camera_id: &str, depth: usize) {
    gauge!(
        "track_buffer_depth",
        "camera_id" => camera_id.to_string()
    )
    .set(depth as f64);
}

/// Pipeline metrics aggregator
///
/// Aggregates counters in memory for the periodic stats line and the
/// shutdown summary.
#[derive(Debug, Clone, Default)]
pub struct TrackMetricsAggregator {
    /// Total windows extracted
    pub total_windows: u64,

    /// Windows that came back incomplete
    pub incomplete_windows: u64,

    /// Windows given up on via forced advance
    pub forced_advances: u64,

    /// Match attempts by outcome
    pub matches_ok: u64,
    pub matches_out_of_margin: u64,
    pub matches_empty_queue: u64,

    /// Terminal decisions
    pub pickups: u64,
    pub disappears: u64,
    pub missing: u64,

    /// Window latency statistics (ms)
    pub latency_stats: RunningStats,

    /// Per-camera counts of windows they were missing from
    pub missing_counts: std::collections::HashMap<CameraId, u64>,
}

impl TrackMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one window extraction.
    pub fn update_window(&mut self, complete: bool, missing: &[CameraId]) {
        self.total_windows += 1;
        if !complete {
            self.incomplete_windows += 1;
            for camera_id in missing {
                *self.missing_counts.entry(camera_id.clone()).or_insert(0) += 1;
            }
        }
    }

    pub fn record_forced_advance(&mut self) {
        self.forced_advances += 1;
    }

    pub fn record_latency_ms(&mut self, latency_ms: f64) {
        self.latency_stats.push(latency_ms);
    }

    /// Generate summary report.
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_windows: self.total_windows,
            incomplete_windows: self.incomplete_windows,
            forced_advances: self.forced_advances,
            incomplete_rate: if self.total_windows > 0 {
                self.incomplete_windows as f64 / self.total_windows as f64 * 100.0
            } else {
                0.0
            },
            matches_ok: self.matches_ok,
            matches_out_of_margin: self.matches_out_of_margin,
            pickups: self.pickups,
            disappears: self.disappears,
            missing: self.missing,
            latency_ms: StatsSummary::from(&self.latency_stats),
            camera_missing_counts: self
                .missing_counts
                .iter()
                .map(|(id, count)| (id.to_string(), *count))
                .collect(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Metrics summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_windows: u64,
    pub incomplete_windows: u64,
    pub forced_advances: u64,
    pub incomplete_rate: f64,
    pub matches_ok: u64,
    pub matches_out_of_margin: u64,
    pub pickups: u64,
    pub disappears: u64,
    pub missing: u64,
    pub latency_ms: StatsSummary,
    pub camera_missing_counts: std::collections::HashMap<String, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Track Metrics Summary ===")?;
        writeln!(f, "Total windows: {}", self.total_windows)?;
        writeln!(
            f,
            "Incomplete windows: {} ({:.2}%)",
            self.incomplete_windows, self.incomplete_rate
        )?;
        writeln!(f, "Forced advances: {}", self.forced_advances)?;
        writeln!(f, "Successful matches: {}", self.matches_ok)?;
        writeln!(f, "Out-of-margin attempts: {}", self.matches_out_of_margin)?;
        writeln!(
            f,
            "Terminal decisions: pickup={} disappear={} missing={}",
            self.pickups, self.disappears, self.missing
        )?;
        writeln!(f, "Window latency (ms): {}", self.latency_ms)?;

        if !self.camera_missing_counts.is_empty() {
            writeln!(f, "Camera missing counts:")?;
            for (camera, count) in &self.camera_missing_counts {
                writeln!(f, "  {}: {}", camera, count)?;
            }
        }

        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count(),
            min: stats.min(),
            max: stats.max(),
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics calculator (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
