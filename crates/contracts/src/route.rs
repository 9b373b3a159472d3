//! Route plans and matcher configuration shared across crates.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::Stage;

/// Expected travel between two adjacent checkpoints.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TransitionSpec {
    /// Average travel time between the checkpoints (seconds)
    pub avg_travel_s: f64,

    /// Tolerance band around the expected arrival (seconds)
    pub margin_s: f64,
}

/// Ordered checkpoint plan for one route code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutePlan {
    /// Route code as printed on labels, e.g. `XSEA`
    pub code: String,

    /// Checkpoints the parcel is expected to cross, in belt order
    pub stages: Vec<Stage>,

    /// Checkpoints whose span forms the pickup zone
    pub pickup_stages: Vec<Stage>,

    /// Belt distance from the scanner to the pickup point (meters)
    pub total_distance: f64,
}

impl RoutePlan {
    /// Next checkpoint after `from` on this route.
    pub fn next_stage(&self, from: Stage) -> Option<Stage> {
        let idx = self.stages.iter().position(|s| *s == from)?;
        self.stages.get(idx + 1).copied()
    }

    /// True when `stage` lies inside the pickup zone.
    pub fn is_pickup_stage(&self, stage: Stage) -> bool {
        self.pickup_stages.contains(&stage)
    }

    /// The last checkpoint on the route; a fresh sighting here means
    /// the parcel sailed past its pickup point.
    pub fn final_stage(&self) -> Option<Stage> {
        self.stages.last().copied()
    }
}

/// Matcher configuration, derived from the line blueprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Travel expectations per checkpoint pair
    pub transitions: HashMap<(Stage, Stage), TransitionSpec>,

    /// Route plans by route code
    pub routes: HashMap<String, RoutePlan>,

    /// Extra margin granted when re-checking a pending parcel (seconds)
    #[serde(default)]
    pub pending_extra_margin_s: f64,

    /// How long terminal records stay queryable before archival (seconds)
    #[serde(default = "default_archive_retention_s")]
    pub archive_retention_s: f64,

    /// Fallback scanner-to-pickup distance for unknown routes (meters)
    pub default_total_distance: f64,
}

fn default_archive_retention_s() -> f64 {
    600.0
}

/// Margin applied when a checkpoint pair has no configured transition.
pub const DEFAULT_MARGIN_S: f64 = 2.0;

impl MatcherConfig {
    /// Average travel time between two checkpoints, if configured.
    pub fn avg_travel(&self, from: Stage, to: Stage) -> Option<f64> {
        self.transitions.get(&(from, to)).map(|t| t.avg_travel_s)
    }

    /// Margin for a checkpoint pair, falling back to [`DEFAULT_MARGIN_S`].
    pub fn margin(&self, from: Stage, to: Stage) -> f64 {
        self.transitions
            .get(&(from, to))
            .map(|t| t.margin_s)
            .unwrap_or(DEFAULT_MARGIN_S)
    }

    pub fn route(&self, code: &str) -> Option<&RoutePlan> {
        self.routes.get(code)
    }

    /// Scanner-to-pickup distance for a route code, with fallback.
    pub fn total_distance(&self, code: &str) -> f64 {
        self.routes
            .get(code)
            .map(|r| r.total_distance)
            .unwrap_or(self.default_total_distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> RoutePlan {
        RoutePlan {
            code: "XSEA".into(),
            stages: vec![
                Stage::Scanner,
                Stage::Cam0,
                Stage::Cam1,
                Stage::Cam2,
                Stage::Cam3,
            ],
            pickup_stages: vec![Stage::Cam2, Stage::Cam3],
            total_distance: 9.47,
        }
    }

    #[test]
    fn walks_stages_in_order() {
        let plan = plan();
        assert_eq!(plan.next_stage(Stage::Scanner), Some(Stage::Cam0));
        assert_eq!(plan.next_stage(Stage::Cam2), Some(Stage::Cam3));
        assert_eq!(plan.next_stage(Stage::Cam3), None);
        assert_eq!(plan.final_stage(), Some(Stage::Cam3));
    }

    #[test]
    fn pickup_zone_membership() {
        let plan = plan();
        assert!(plan.is_pickup_stage(Stage::Cam3));
        assert!(!plan.is_pickup_stage(Stage::Cam1));
    }

    #[test]
    fn margin_falls_back_to_default() {
        let config = MatcherConfig {
            transitions: HashMap::from([(
                (Stage::Scanner, Stage::Cam0),
                TransitionSpec {
                    avg_travel_s: 2.5,
                    margin_s: 3.0,
                },
            )]),
            routes: HashMap::new(),
            pending_extra_margin_s: 0.0,
            archive_retention_s: 600.0,
            default_total_distance: 12.8,
        };

        assert_eq!(config.margin(Stage::Scanner, Stage::Cam0), 3.0);
        assert_eq!(config.margin(Stage::Cam1, Stage::Cam2), DEFAULT_MARGIN_S);
        assert_eq!(config.avg_travel(Stage::Cam1, Stage::Cam2), None);
        assert_eq!(config.total_distance("XSEB"), 12.8);
    }
}
