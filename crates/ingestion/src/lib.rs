//! # Ingestion Pipeline
//!
//! Frame and scan ingestion module.
//!
//! Responsibilities:
//! - Register camera frame sources (real or mock)
//! - Stamp `receive_time` on every frame at delivery
//! - Backpressure management and drop policy
//! - Listen to the scanner feed and emit `ScanEvent`s
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::IngestionPipeline;
//! use contracts::FrameSource;
//!
//! let mut pipeline = IngestionPipeline::new(100);
//!
//! let source: Box<dyn FrameSource> = build_camera_source(&camera_config);
//! pipeline.register_camera(camera_id, source, None);
//!
//! pipeline.start_all();
//! let rx = pipeline.take_receiver().unwrap();
//! while let Ok(packet) = rx.recv().await {
//!     sync.put(packet);
//! }
//! ```

mod adapter;
mod clock;
mod config;
mod error;
mod generic_adapter;
mod mock;
mod pipeline;
mod scanner;

// Re-exports
pub use adapter::FrameAdapter;
pub use clock::seconds_of_day;
pub use config::{BackpressureConfig, DropPolicy, IngestionMetrics, MetricsSnapshot};
pub use contracts::FramePacket;
pub use error::{IngestionError, Result};
pub use generic_adapter::GenericFrameAdapter;
pub use mock::{MockCameraConfig, MockCameraSource};
pub use pipeline::IngestionPipeline;
pub use scanner::{parse_scan_line, ScannerListener, ScannerListenerConfig};
