//! Ingestion pipeline main entry

use std::collections::HashMap;
use std::sync::Arc;

use async_channel::{bounded, Receiver, Sender};
use contracts::{FramePacket, FrameSource};
use tracing::{debug, info, instrument};

use crate::adapter::FrameAdapter;
use crate::config::{BackpressureConfig, IngestionMetrics};
use crate::generic_adapter::GenericFrameAdapter;

/// Ingestion pipeline
///
/// Manages one frame adapter per camera and fans all frames into a
/// single bounded channel for the synchronizer.
pub struct IngestionPipeline {
    /// Registered adapters
    adapters: HashMap<String, Box<dyn FrameAdapter>>,

    /// Shared metrics
    metrics: Arc<IngestionMetrics>,

    /// Frame sender (shared by all adapters)
    tx: Sender<FramePacket>,

    /// Frame receiver
    rx: Option<Receiver<FramePacket>>,

    /// Default backpressure configuration
    default_config: BackpressureConfig,
}

impl IngestionPipeline {
    pub fn new(channel_capacity: usize) -> Self {
        let (tx, rx) = bounded(channel_capacity);

        Self {
            adapters: HashMap::new(),
            metrics: Arc::new(IngestionMetrics::new()),
            tx,
            rx: Some(rx),
            default_config: BackpressureConfig {
                channel_capacity,
                ..Default::default()
            },
        }
    }

    pub fn with_config(config: BackpressureConfig) -> Self {
        let (tx, rx) = bounded(config.channel_capacity);

        Self {
            adapters: HashMap::new(),
            metrics: Arc::new(IngestionMetrics::new()),
            tx,
            rx: Some(rx),
            default_config: config,
        }
    }

    /// Register a camera frame source.
    #[instrument(
        name = "ingestion_register_camera",
        skip(self, source, config),
        fields(camera_id = %camera_id)
    )]
    pub fn register_camera(
        &mut self,
        camera_id: String,
        source: Box<dyn FrameSource>,
        config: Option<BackpressureConfig>,
    ) {
        let adapter = GenericFrameAdapter::new(
            camera_id.clone(),
            source,
            config.unwrap_or_else(|| self.default_config.clone()),
        );
        debug!(camera_id = %camera_id, "registered camera source");
        self.adapters.insert(camera_id, Box::new(adapter));
    }

    /// Start all registered cameras.
    #[instrument(name = "ingestion_start_all", skip(self))]
    pub fn start_all(&self) {
        info!(count = self.adapters.len(), "starting all camera adapters");
        for (camera_id, adapter) in &self.adapters {
            if !adapter.is_listening() {
                debug!(camera_id = %camera_id, "starting adapter");
                adapter.start(self.tx.clone(), self.metrics.clone());
            }
        }
    }

    /// Stop all cameras.
    #[instrument(name = "ingestion_stop_all", skip(self))]
    pub fn stop_all(&self) {
        info!(count = self.adapters.len(), "stopping all camera adapters");
        for (camera_id, adapter) in &self.adapters {
            if adapter.is_listening() {
                debug!(camera_id = %camera_id, "stopping adapter");
                adapter.stop();
            }
        }
    }

    /// Get the frame stream receiver.
    ///
    /// Note: can only be called once, subsequent calls return None.
    pub fn take_receiver(&mut self) -> Option<Receiver<FramePacket>> {
        self.rx.take()
    }

    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.metrics.clone()
    }

    pub fn camera_count(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_camera_listening(&self, camera_id: &str) -> bool {
        self.adapters
            .get(camera_id)
            .map(|a| a.is_listening())
            .unwrap_or(false)
    }
}

impl Drop for IngestionPipeline {
    fn drop(&mut self) {
        self.stop_all();
    }
}
