//! Generic frame adapter
//!
//! Adapts any `FrameSource` to the `FrameAdapter` interface, so the
//! pipeline handles network, local and mock cameras uniformly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_channel::{Sender, TrySendError};
use contracts::{FrameCallback, FramePacket, FrameSource};
use tracing::{debug, trace};

use crate::adapter::FrameAdapter;
use crate::clock::seconds_of_day;
use crate::config::{BackpressureConfig, DropPolicy, IngestionMetrics};

/// Forward a frame into the shared channel, applying the drop policy.
#[inline]
fn send_frame(
    tx: &Sender<FramePacket>,
    packet: FramePacket,
    metrics: &Arc<IngestionMetrics>,
    camera_id: &str,
    drop_policy: DropPolicy,
) {
    match tx.try_send(packet) {
        Ok(_) => {
            trace!(camera_id = %camera_id, "frame sent");
        }
        Err(TrySendError::Full(_)) => {
            metrics.record_dropped();
            match drop_policy {
                DropPolicy::DropNewest => {
                    trace!(camera_id = %camera_id, "frame dropped (newest)");
                }
                DropPolicy::DropOldest => {
                    // TODO: needs a channel with consumer-side pop to
                    // drop the oldest; falls back to dropping the newest
                    trace!(camera_id = %camera_id, "frame dropped (oldest fallback)");
                }
            }
        }
        Err(TrySendError::Closed(_)) => {
            tracing::warn!(camera_id = %camera_id, "frame channel closed");
        }
    }
}

/// Generic frame adapter
///
/// Stamps `receive_time` at callback delivery, which is the ordering
/// key the synchronizer buffers on.
pub struct GenericFrameAdapter {
    camera_id: String,
    source: Box<dyn FrameSource>,
    config: BackpressureConfig,
    listening: Arc<AtomicBool>,
}

impl GenericFrameAdapter {
    pub fn new(camera_id: String, source: Box<dyn FrameSource>, config: BackpressureConfig) -> Self {
        Self {
            camera_id,
            source,
            config,
            listening: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl FrameAdapter for GenericFrameAdapter {
    fn camera_id(&self) -> &str {
        &self.camera_id
    }

    fn start(&self, tx: Sender<FramePacket>, metrics: Arc<IngestionMetrics>) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let camera_id = self.camera_id.clone();
        let drop_policy = self.config.drop_policy;
        let listening = self.listening.clone();

        debug!(camera_id = %camera_id, "starting frame adapter");

        let callback: FrameCallback = Arc::new(move |mut packet: FramePacket| {
            if !listening.load(Ordering::Relaxed) {
                return;
            }

            packet.receive_time = seconds_of_day();
            metrics.record_received();
            trace!(camera_id = %camera_id, "frame adapter received packet");
            send_frame(&tx, packet, &metrics, &camera_id, drop_policy);
        });

        self.source.listen(callback);
    }

    fn stop(&self) {
        if self.listening.swap(false, Ordering::SeqCst) {
            debug!(camera_id = %self.camera_id, "stopping frame adapter");
            self.source.stop();
        }
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}
