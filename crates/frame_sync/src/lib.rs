//! # Frame Sync
//!
//! Time-windowed multi-camera frame synchronizer.
//!
//! Responsibilities:
//! - Buffer frames per camera, ordered by receive time
//! - Anchor windows on the earliest receive time across all heads
//! - Extract one representative frame per camera per window
//! - Per-second camera statistics
//!
//! ## Usage
//!
//! ```ignore
//! use frame_sync::{FrameSynchronizer, WindowExtract};
//!
//! let mut sync = FrameSynchronizer::new(config);
//!
//! // Producers push frames as they arrive
//! sync.put(packet);
//!
//! // The pipeline loop pulls windows
//! if let Some(start) = sync.min_head_receive_time() {
//!     match sync.extract_set(start, start + 0.5) {
//!         WindowExtract::Complete(set) => { /* process, cursor advances */ }
//!         WindowExtract::Incomplete { missing } => {
//!             // wait, or give up on the window:
//!             sync.remove_interval(start, start + 0.5);
//!         }
//!     }
//! }
//! ```

mod buffer;
mod synchronizer;

pub use synchronizer::{CameraStats, FrameSynchronizer, WindowExtract};

// Re-export contracts types
pub use contracts::{FramePacket, FrameSet, FrameSyncConfig, SetFrame};
