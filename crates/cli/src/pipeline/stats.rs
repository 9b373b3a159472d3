//! Pipeline run statistics.

use std::time::Duration;

use observability::TrackMetricsAggregator;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Complete windows processed
    pub windows_complete: u64,

    /// Windows given up on via forced advance
    pub windows_forced: u64,

    /// Scan events consumed
    pub scans_received: u64,

    /// Frames consumed from the ingestion channel
    pub frames_received: u64,

    /// Successful match attempts
    pub matches_ok: u64,

    /// Notifications handed to the dispatcher
    pub notifications_sent: u64,

    /// Terminal decisions
    pub pickups: u64,
    pub disappears: u64,
    pub missing: u64,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Number of registered cameras
    pub active_cameras: usize,

    /// Number of configured notifiers
    pub active_notifiers: usize,

    /// Window-level metrics aggregator
    pub metrics: TrackMetricsAggregator,
}

impl PipelineStats {
    /// Windows per second over the whole run
    pub fn windows_per_second(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.windows_complete as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Forced advances as a percentage of all window decisions
    #[allow(dead_code)]
    pub fn forced_rate(&self) -> f64 {
        let total = self.windows_complete + self.windows_forced;
        if total > 0 {
            (self.windows_forced as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Pipeline Statistics ===\n");
        println!("Duration: {:.2}s", self.duration.as_secs_f64());
        println!(
            "Windows: {} complete, {} forced ({:.2}/s)",
            self.windows_complete,
            self.windows_forced,
            self.windows_per_second()
        );
        println!("Frames consumed: {}", self.frames_received);
        println!("Scans consumed: {}", self.scans_received);
        println!("Matches: {}", self.matches_ok);
        println!(
            "Terminal decisions: pickup={} disappear={} missing={}",
            self.pickups, self.disappears, self.missing
        );
        println!("Notifications sent: {}", self.notifications_sent);
        println!(
            "Active cameras: {}, notifiers: {}",
            self.active_cameras, self.active_notifiers
        );

        println!("\n{}", self.metrics.summary());
    }
}
