//! Frame adapter trait

use std::sync::Arc;

use async_channel::Sender;
use contracts::FramePacket;

use crate::config::IngestionMetrics;

/// Frame adapter trait
///
/// One implementation per camera transport. Responsible for:
/// 1. Registering the source callback
/// 2. Stamping the receive time
/// 3. Forwarding frames to the shared channel (handling backpressure)
pub trait FrameAdapter: Send + Sync {
    fn camera_id(&self) -> &str;

    /// Start frame delivery into `tx`.
    fn start(&self, tx: Sender<FramePacket>, metrics: Arc<IngestionMetrics>);

    /// Stop frame delivery.
    fn stop(&self);

    fn is_listening(&self) -> bool;
}
