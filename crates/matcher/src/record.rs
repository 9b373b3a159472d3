//! MasterRecord - canonical tracking state for one parcel

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use contracts::Stage;

/// Lifecycle of a master record.
///
/// `Pickup`, `Disappear` and `Missing` are terminal; `Pending` can fall
/// back to `Tracking` when a downstream match lands before the timeout
/// decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MasterStatus {
    /// Progressing through its checkpoints as expected
    Tracking,
    /// Not locally observed at its current stage; awaiting a downstream
    /// match or a timeout decision
    Pending,
    /// Passed its last pickup checkpoint without being taken
    Missing,
    /// Left the belt inside its pickup zone
    Pickup,
    /// Left the belt outside any pickup zone
    Disappear,
}

impl MasterStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            MasterStatus::Missing | MasterStatus::Pickup | MasterStatus::Disappear
        )
    }

    /// Distance reporting only applies to live masters.
    pub fn is_live(self) -> bool {
        matches!(self, MasterStatus::Tracking | MasterStatus::Pending)
    }
}

/// Canonical tracking record for one physical parcel.
///
/// Created on a scanner event; mutated only by the pipeline thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterRecord {
    /// Parcel uid as printed on the label
    pub uid: String,

    /// Route code from the label
    pub route_code: String,

    /// Current lifecycle state
    pub status: MasterStatus,

    /// Last checkpoint this parcel was confirmed at
    pub last_stage: Stage,

    /// Capture time of the last confirmation; strictly increasing
    /// across successful matches
    pub last_time: f64,

    /// Box width at the last confirmation (pixels)
    pub last_width: i32,

    /// Scan time, anchor for distance reporting
    pub start_time: Option<f64>,

    /// Scanner-to-pickup belt distance for this route (meters)
    pub total_distance: f64,

    /// Last quantized distance pushed downstream, for dedup
    pub last_sent_distance: Option<f64>,

    /// Stage the parcel went unobserved at, while `Pending`
    pub pending_from_stage: Option<Stage>,

    /// Local detection id recorded per confirmed checkpoint
    pub detections: HashMap<Stage, u64>,

    /// When a terminal status was committed, for archival
    pub terminal_time: Option<f64>,
}

impl MasterRecord {
    pub fn new(uid: String, route_code: String, time_s: f64, total_distance: f64) -> Self {
        Self {
            uid,
            route_code,
            status: MasterStatus::Tracking,
            last_stage: Stage::Scanner,
            last_time: time_s,
            last_width: 0,
            start_time: Some(time_s),
            total_distance,
            last_sent_distance: None,
            pending_from_stage: None,
            detections: HashMap::new(),
            terminal_time: None,
        }
    }

    /// Remaining belt distance at `now`, clamped at zero.
    pub fn remaining_distance(&self, now_s: f64, belt_speed: f64) -> Option<f64> {
        let start = self.start_time?;
        let elapsed = (now_s - start).max(0.0);
        Some((self.total_distance - elapsed * belt_speed).max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_master_is_tracking_at_scanner() {
        let m = MasterRecord::new("u1".into(), "XSEA".into(), 100.0, 9.47);
        assert_eq!(m.status, MasterStatus::Tracking);
        assert_eq!(m.last_stage, Stage::Scanner);
        assert_eq!(m.last_time, 100.0);
        assert_eq!(m.last_width, 0);
        assert!(m.detections.is_empty());
    }

    #[test]
    fn remaining_distance_clamps_at_zero() {
        let m = MasterRecord::new("u1".into(), "XSEB".into(), 0.0, 12.8);
        assert_eq!(m.remaining_distance(5.0, 0.366), Some(12.8 - 5.0 * 0.366));
        assert_eq!(m.remaining_distance(1000.0, 0.366), Some(0.0));
    }

    #[test]
    fn terminal_and_live_partition() {
        assert!(MasterStatus::Pickup.is_terminal());
        assert!(MasterStatus::Missing.is_terminal());
        assert!(!MasterStatus::Pending.is_terminal());
        assert!(MasterStatus::Pending.is_live());
        assert!(!MasterStatus::Disappear.is_live());
    }
}
