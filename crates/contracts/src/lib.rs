//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Seconds since midnight (f64) is the primary clock for every timestamp
//! - Frame sets are grouped on `receive_time`; matching compares `capture_time`

mod blueprint;
mod camera_id;
mod detect;
mod error;
mod frame;
mod frame_sync_config;
mod notify;
mod route;
mod scan;
mod source;
mod stage;

pub use blueprint::*;
pub use camera_id::CameraId;
pub use detect::*;
pub use error::*;
pub use frame::*;
pub use frame_sync_config::*;
pub use notify::*;
pub use route::*;
pub use scan::*;
pub use source::{FrameCallback, FrameSource};
pub use stage::Stage;
