//! # Matcher
//!
//! FIFO stage matcher: re-identifies scanned parcels across belt
//! checkpoints without any visual features, using only travel-time
//! expectations and the no-overtake property of a single belt.
//!
//! One [`MasterRecord`] per scanned parcel, one queue per checkpoint
//! transition. Detections at a checkpoint are offered to the head of
//! the feeding queue via [`StageMatcher::attempt_match`]; overdue heads
//! are retired through [`StageMatcher::resolve_pending`].

mod matcher;
mod queues;
mod record;

pub use matcher::{
    MatchAttempt, MatchFailure, MatchOutcome, PendingDecision, PendingResolution, StageMatcher,
};
pub use record::{MasterRecord, MasterStatus};

// Re-export contracts types
pub use contracts::{MatcherConfig, RoutePlan, ScanEvent, Stage, TransitionSpec};
