//! Frame synchronizer configuration contracts shared across crates.

use serde::{Deserialize, Serialize};

use crate::CameraId;

/// Frame synchronizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameSyncConfig {
    /// All cameras a complete set must cover
    pub cameras: Vec<CameraId>,

    /// The local-transport camera; picked by nearest-to-mean capture
    /// time instead of the median rule
    pub local_camera: Option<CameraId>,

    /// Window length (seconds of receive time)
    #[serde(default = "default_window_s")]
    pub window_s: f64,

    /// Wall-clock budget to wait for a window to complete
    #[serde(default = "default_max_wait_wall_s")]
    pub max_wait_wall_s: f64,

    /// Maximum buffered frames per camera before oldest are evicted
    #[serde(default = "default_max_per_camera")]
    pub max_per_camera: usize,
}

fn default_window_s() -> f64 {
    0.5
}

fn default_max_wait_wall_s() -> f64 {
    0.5
}

fn default_max_per_camera() -> usize {
    60
}

impl Default for FrameSyncConfig {
    fn default() -> Self {
        Self {
            cameras: Vec::new(),
            local_camera: None,
            window_s: default_window_s(),
            max_wait_wall_s: default_max_wait_wall_s(),
            max_per_camera: default_max_per_camera(),
        }
    }
}
