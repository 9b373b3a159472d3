//! LineBlueprint - Config Loader output
//!
//! Describes one conveyor line end to end: belt, sync windows, cameras,
//! travel-time transitions, route plans, scanner gate, notifier routing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::{
    CameraId, FrameSyncConfig, MatcherConfig, RegionConfig, RoutePlan, Stage, TransitionSpec,
};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete conveyor line blueprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Belt parameters
    pub line: LineConfig,

    /// Synchronizer and matcher timing knobs
    #[serde(default)]
    pub sync: SyncSettings,

    /// Camera definitions, one per checkpoint camera
    pub cameras: Vec<CameraConfig>,

    /// Travel expectations between adjacent checkpoints
    pub transitions: Vec<TransitionConfig>,

    /// Route plans by label code
    pub routes: Vec<RouteConfig>,

    /// Barcode scanner gate (optional; replay sources run without one)
    #[serde(default)]
    pub scanner: Option<ScannerConfig>,

    /// Notification routing
    #[serde(default)]
    pub notifiers: Vec<NotifierConfig>,
}

/// Belt parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineConfig {
    /// Belt speed in meters per second
    pub belt_speed: f64,

    /// Fallback scanner-to-pickup distance for unknown routes (meters)
    pub default_total_distance: f64,

    /// Where position thumbnails are written (optional)
    #[serde(default)]
    pub thumbnail_dir: Option<PathBuf>,
}

/// Synchronizer and matcher timing knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Window length in receive-time seconds
    #[serde(default = "default_window_s")]
    pub window_s: f64,

    /// Wall-clock budget to wait for a window to complete
    #[serde(default = "default_max_wait_wall_s")]
    pub max_wait_wall_s: f64,

    /// Maximum buffered frames per camera
    #[serde(default = "default_buffer_max")]
    pub buffer_max_per_camera: usize,

    /// Frames older than this against the wall clock are skipped
    #[serde(default = "default_stale_frame_s")]
    pub stale_frame_s: f64,

    /// Pending parcels are re-checked this far ahead of the window
    #[serde(default = "default_resolve_ahead_s")]
    pub resolve_ahead_s: f64,

    /// Extra margin when re-checking a pending parcel
    #[serde(default)]
    pub pending_extra_margin_s: f64,

    /// Retention for terminal records before archival (seconds)
    #[serde(default = "default_archive_retention_s")]
    pub archive_retention_s: f64,
}

fn default_window_s() -> f64 {
    0.5
}

fn default_max_wait_wall_s() -> f64 {
    0.5
}

fn default_buffer_max() -> usize {
    60
}

fn default_stale_frame_s() -> f64 {
    30.0
}

fn default_resolve_ahead_s() -> f64 {
    5.0
}

fn default_archive_retention_s() -> f64 {
    600.0
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            window_s: default_window_s(),
            max_wait_wall_s: default_max_wait_wall_s(),
            buffer_max_per_camera: default_buffer_max(),
            stale_frame_s: default_stale_frame_s(),
            resolve_ahead_s: default_resolve_ahead_s(),
            pending_extra_margin_s: 0.0,
            archive_retention_s: default_archive_retention_s(),
        }
    }
}

/// How frames reach this process from one camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    /// Frames arrive over the network
    #[default]
    Network,
    /// Camera is attached to this machine
    Local,
}

/// Camera configuration
///
/// Geometry knobs are height rates (fraction of frame height) so one
/// config works across capture resolutions; they are resolved to pixels
/// once the first frame arrives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Unique identifier
    pub id: String,

    /// Checkpoint this camera watches
    pub stage: Stage,

    /// Frame transport
    #[serde(default)]
    pub transport: Transport,

    /// Primary detection line Y, as a height rate
    #[serde(default = "default_roi_y_rate")]
    pub roi_y_rate: f64,

    /// Half-band around the primary line, as a height rate
    #[serde(default = "default_roi_margin_rate")]
    pub roi_margin_rate: f64,

    /// End-of-line detection line Y, as a height rate (last camera only)
    #[serde(default)]
    pub eol_y_rate: Option<f64>,

    /// Half-band around the end-of-line line, as a height rate
    #[serde(default)]
    pub eol_margin_rate: Option<f64>,

    /// Local association distance gate, as a height rate
    #[serde(default = "default_dist_eps_rate")]
    pub dist_eps_rate: f64,

    /// Local association forward-travel gate, as a height rate
    #[serde(default = "default_max_dy_rate")]
    pub max_dy_rate: f64,

    /// +1 when belt travel increases Y in this camera's image, -1 otherwise
    #[serde(default = "default_forward_sign")]
    pub forward_sign: i8,

    /// Image rotation applied upstream, degrees clockwise
    #[serde(default)]
    pub rotate: u16,
}

fn default_roi_y_rate() -> f64 {
    0.5
}

fn default_roi_margin_rate() -> f64 {
    0.05
}

fn default_dist_eps_rate() -> f64 {
    0.15
}

fn default_max_dy_rate() -> f64 {
    0.1
}

fn default_forward_sign() -> i8 {
    1
}

/// Pixel gates for per-camera local association.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LocalGates {
    /// Maximum horizontal offset for a plausible association (pixels)
    pub dist_eps: f64,

    /// Maximum forward travel between consecutive sets (pixels)
    pub max_dy: f64,

    /// Sign of forward travel in image Y
    pub forward_sign: f64,
}

impl CameraConfig {
    /// Resolve detection-line geometry to pixels for a frame height.
    pub fn region_for_height(&self, height: u32) -> RegionConfig {
        let h = height as f64;
        RegionConfig {
            primary_y: (self.roi_y_rate * h).round() as i32,
            primary_margin: (self.roi_margin_rate * h).round() as i32,
            eol_y: self.eol_y_rate.map(|r| (r * h).round() as i32),
            eol_margin: self.eol_margin_rate.map(|r| (r * h).round() as i32),
        }
    }

    /// Resolve local association gates to pixels for a frame height.
    pub fn gates_for_height(&self, height: u32) -> LocalGates {
        let h = height as f64;
        LocalGates {
            dist_eps: self.dist_eps_rate * h,
            max_dy: self.max_dy_rate * h,
            forward_sign: self.forward_sign as f64,
        }
    }
}

/// Travel expectation between two adjacent checkpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionConfig {
    pub from: Stage,
    pub to: Stage,

    /// Average travel time (seconds)
    pub avg_travel_s: f64,

    /// Tolerance band around the expected arrival (seconds)
    pub margin_s: f64,
}

/// Route plan configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Route code as printed on labels
    pub code: String,

    /// Checkpoints the parcel crosses, in belt order
    pub stages: Vec<Stage>,

    /// Checkpoints whose span forms the pickup zone
    pub pickup_stages: Vec<Stage>,

    /// Belt distance from scanner to pickup point (meters)
    pub total_distance: f64,
}

/// Barcode scanner gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    pub host: String,
    pub port: u16,
}

/// Notifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Notifier name
    pub name: String,

    /// Notifier type
    pub notifier_type: NotifierType,

    /// Queue capacity
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    100
}

/// Notifier type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifierType {
    /// Log output
    Log,
    /// JSONL file output
    File,
    /// HTTP sorting-system endpoint
    Http,
}

impl LineBlueprint {
    /// Cameras in belt order.
    pub fn cameras_in_order(&self) -> Vec<&CameraConfig> {
        let mut cameras: Vec<&CameraConfig> = self.cameras.iter().collect();
        cameras.sort_by_key(|c| c.stage);
        cameras
    }

    /// Camera watching a given checkpoint, if configured.
    pub fn camera_at(&self, stage: Stage) -> Option<&CameraConfig> {
        self.cameras.iter().find(|c| c.stage == stage)
    }

    /// Camera config by id.
    pub fn camera(&self, id: &str) -> Option<&CameraConfig> {
        self.cameras.iter().find(|c| c.id == id)
    }

    /// The local-transport camera, if any.
    pub fn local_camera(&self) -> Option<&CameraConfig> {
        self.cameras.iter().find(|c| c.transport == Transport::Local)
    }

    /// Build the frame synchronizer config from blueprint data.
    pub fn to_sync_config(&self) -> FrameSyncConfig {
        FrameSyncConfig {
            cameras: self
                .cameras_in_order()
                .iter()
                .map(|c| CameraId::from(c.id.as_str()))
                .collect(),
            local_camera: self.local_camera().map(|c| CameraId::from(c.id.as_str())),
            window_s: self.sync.window_s,
            max_wait_wall_s: self.sync.max_wait_wall_s,
            max_per_camera: self.sync.buffer_max_per_camera,
        }
    }

    /// Build the matcher config from blueprint data.
    pub fn to_matcher_config(&self) -> MatcherConfig {
        let transitions = self
            .transitions
            .iter()
            .map(|t| {
                (
                    (t.from, t.to),
                    TransitionSpec {
                        avg_travel_s: t.avg_travel_s,
                        margin_s: t.margin_s,
                    },
                )
            })
            .collect();

        let routes = self
            .routes
            .iter()
            .map(|r| {
                (
                    r.code.clone(),
                    RoutePlan {
                        code: r.code.clone(),
                        stages: r.stages.clone(),
                        pickup_stages: r.pickup_stages.clone(),
                        total_distance: r.total_distance,
                    },
                )
            })
            .collect();

        MatcherConfig {
            transitions,
            routes,
            pending_extra_margin_s: self.sync.pending_extra_margin_s,
            archive_retention_s: self.sync.archive_retention_s,
            default_total_distance: self.line.default_total_distance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_camera(id: &str, stage: Stage, transport: Transport) -> CameraConfig {
        CameraConfig {
            id: id.to_string(),
            stage,
            transport,
            roi_y_rate: 0.5,
            roi_margin_rate: 0.05,
            eol_y_rate: None,
            eol_margin_rate: None,
            dist_eps_rate: 0.15,
            max_dy_rate: 0.1,
            forward_sign: 1,
            rotate: 0,
        }
    }

    fn sample_blueprint() -> LineBlueprint {
        LineBlueprint {
            version: ConfigVersion::V1,
            line: LineConfig {
                belt_speed: 0.366,
                default_total_distance: 12.8,
                thumbnail_dir: None,
            },
            sync: SyncSettings::default(),
            cameras: vec![
                sample_camera("rpi_usb1", Stage::Cam1, Transport::Network),
                sample_camera("usb_local", Stage::Cam0, Transport::Local),
                sample_camera("rpi_usb2", Stage::Cam2, Transport::Network),
                sample_camera("rpi_usb3", Stage::Cam3, Transport::Network),
            ],
            transitions: vec![TransitionConfig {
                from: Stage::Scanner,
                to: Stage::Cam0,
                avg_travel_s: 2.5,
                margin_s: 3.0,
            }],
            routes: vec![RouteConfig {
                code: "XSEA".into(),
                stages: vec![Stage::Scanner, Stage::Cam0, Stage::Cam1, Stage::Cam2, Stage::Cam3],
                pickup_stages: vec![Stage::Cam2, Stage::Cam3],
                total_distance: 9.47,
            }],
            scanner: None,
            notifiers: vec![],
        }
    }

    #[test]
    fn sync_config_orders_cameras_by_stage() {
        let config = sample_blueprint().to_sync_config();
        assert_eq!(
            config.cameras,
            vec![
                CameraId::from("usb_local"),
                CameraId::from("rpi_usb1"),
                CameraId::from("rpi_usb2"),
                CameraId::from("rpi_usb3"),
            ]
        );
        assert_eq!(config.local_camera, Some(CameraId::from("usb_local")));
        assert_eq!(config.window_s, 0.5);
        assert_eq!(config.max_per_camera, 60);
    }

    #[test]
    fn matcher_config_carries_transitions_and_routes() {
        let config = sample_blueprint().to_matcher_config();
        assert_eq!(config.avg_travel(Stage::Scanner, Stage::Cam0), Some(2.5));
        assert_eq!(config.margin(Stage::Scanner, Stage::Cam0), 3.0);
        assert_eq!(config.total_distance("XSEA"), 9.47);
        assert_eq!(config.total_distance("unknown"), 12.8);
        assert!(config.route("XSEA").unwrap().is_pickup_stage(Stage::Cam3));
    }

    #[test]
    fn geometry_resolves_to_pixels() {
        let mut camera = sample_camera("rpi_usb3", Stage::Cam3, Transport::Network);
        camera.eol_y_rate = Some(0.9);
        camera.eol_margin_rate = Some(0.03);

        let region = camera.region_for_height(800);
        assert_eq!(region.primary_y, 400);
        assert_eq!(region.primary_margin, 40);
        assert_eq!(region.eol_y, Some(720));
        assert_eq!(region.eol_margin, Some(24));

        let gates = camera.gates_for_height(800);
        assert_eq!(gates.dist_eps, 120.0);
        assert_eq!(gates.max_dy, 80.0);
        assert_eq!(gates.forward_sign, 1.0);
    }
}
