//! FramePacket / FrameSet - camera frame structures
//!
//! `FramePacket` is what a camera source produces; `FrameSet` is one
//! synchronized slice across all cameras for a receive-time window.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::CameraId;

/// Single frame as produced by a camera source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FramePacket {
    /// Producing camera
    pub camera_id: CameraId,

    /// Timestamp embedded by the camera (seconds since midnight)
    pub capture_time: f64,

    /// Arrival time at this process (seconds since midnight) - grouping key
    pub receive_time: f64,

    /// Pixel payload (zero-copy)
    pub image: ImageData,
}

/// Image payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageData {
    /// Image width
    pub width: u32,

    /// Image height
    pub height: u32,

    /// Pixel format
    pub format: ImageFormat,

    /// Raw pixel data
    pub data: Bytes,
}

/// Pixel format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFormat {
    Rgb8,
    Bgr8,
    Gray8,
    /// Already-compressed JPEG bytes
    Jpeg,
}

/// One representative frame inside a [`FrameSet`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetFrame {
    /// Timestamp embedded by the camera
    pub capture_time: f64,

    /// Arrival time at this process
    pub receive_time: f64,

    /// Pixel payload
    pub image: ImageData,
}

impl From<FramePacket> for SetFrame {
    fn from(packet: FramePacket) -> Self {
        Self {
            capture_time: packet.capture_time,
            receive_time: packet.receive_time,
            image: packet.image,
        }
    }
}

/// Synchronized frame set: one frame per camera for a receive-time window.
///
/// Only complete sets are ever emitted, so `frames` holds exactly one
/// entry for every configured camera.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameSet {
    /// Window start (inclusive, seconds since midnight)
    pub window_start: f64,

    /// Window end (exclusive)
    pub window_end: f64,

    /// Selected frame per camera
    pub frames: HashMap<CameraId, SetFrame>,
}

impl FrameSet {
    pub fn get(&self, camera: &str) -> Option<&SetFrame> {
        self.frames.get(camera)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
