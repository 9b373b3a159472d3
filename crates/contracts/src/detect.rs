//! Detector trait and detection geometry
//!
//! Detection is a pluggable collaborator: the pipeline hands it one
//! image at a time and only consumes box geometry back.

use serde::{Deserialize, Serialize};

use crate::{CameraId, ImageData, TrackError};

/// One detected parcel box in image coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Detection {
    /// Bounding box (x, y, w, h) in pixels
    pub bbox: (i32, i32, i32, i32),

    /// Box center in pixels
    pub center: (f64, f64),

    /// Center lies on the primary detection line (within margin)
    pub on_primary_line: bool,

    /// Center lies on the end-of-line detection line, if configured
    pub on_eol_line: bool,
}

impl Detection {
    /// Build a detection from a bounding box, classifying it against `region`.
    pub fn from_bbox(bbox: (i32, i32, i32, i32), region: &RegionConfig) -> Self {
        let (x, y, w, h) = bbox;
        let center = (x as f64 + w as f64 / 2.0, y as f64 + h as f64 / 2.0);
        let cy = center.1;

        let on_primary_line =
            (cy - region.primary_y as f64).abs() <= region.primary_margin as f64;
        let on_eol_line = match (region.eol_y, region.eol_margin) {
            (Some(line), Some(margin)) => (cy - line as f64).abs() <= margin as f64,
            _ => false,
        };

        Self {
            bbox,
            center,
            on_primary_line,
            on_eol_line,
        }
    }

    pub fn width(&self) -> i32 {
        self.bbox.2
    }
}

/// Detection-line geometry for one camera, in pixels.
///
/// Derived from per-camera height rates once the frame height is known.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RegionConfig {
    /// Primary detection line Y
    pub primary_y: i32,

    /// Half-band around the primary line
    pub primary_margin: i32,

    /// End-of-line detection line Y (last camera only)
    pub eol_y: Option<i32>,

    /// Half-band around the end-of-line line
    pub eol_margin: Option<i32>,
}

/// Parcel detector backend.
///
/// Runs on blocking worker threads; implementations must be cheap to
/// share and internally synchronized.
pub trait Detector: Send + Sync {
    /// Detect parcel boxes in one frame.
    ///
    /// # Errors
    /// Returns backend errors (model inference, decode). The pipeline
    /// logs and treats a failed detection as an empty result.
    fn detect(
        &self,
        camera: &CameraId,
        image: &ImageData,
        region: &RegionConfig,
    ) -> Result<Vec<Detection>, TrackError>;
}
