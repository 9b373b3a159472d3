//! FrameSource trait - camera frame source abstraction
//!
//! Defines a unified interface for frame producers, decoupling the
//! ingestion pipeline from concrete camera implementations. Network
//! receivers and mock cameras share the same API.

use std::sync::Arc;

use crate::FramePacket;

/// Frame callback type
///
/// When a camera produces a frame, it sends a `FramePacket` through
/// this callback. Uses `Arc` to allow callback sharing across sources.
pub type FrameCallback = Arc<dyn Fn(FramePacket) + Send + Sync>;

/// Camera frame source trait
///
/// Abstracts real network cameras and mock sources behind one API so
/// the ingestion pipeline never cares where frames come from.
pub trait FrameSource: Send + Sync {
    /// Camera ID this source produces for
    fn camera_id(&self) -> &str;

    /// Register the frame callback
    ///
    /// Repeated calls are idempotent: a source holds at most one
    /// callback at a time.
    fn listen(&self, callback: FrameCallback);

    /// Stop producing frames
    fn stop(&self);

    /// Check if currently listening
    fn is_listening(&self) -> bool;
}
