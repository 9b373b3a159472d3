//! # Notifier
//!
//! Parcel event delivery module.
//!
//! Responsibilities:
//! - Consume `Notification`s from the pipeline
//! - Fan out to multiple notifiers (log, file, HTTP API)
//! - Isolate slow notifiers so they never stall the match loop

pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod notifiers;

pub use contracts::{Notification, Notifier, NotifierConfig, NotifierType};
pub use dispatcher::{
    create_dispatcher, NotifyDispatcher, NotifyDispatcherBuilder, NotifyDispatcherConfig,
};
pub use error::NotifierError;
pub use handle::NotifierHandle;
pub use metrics::{MetricsSnapshot, NotifierMetrics};
pub use notifiers::{FileNotifier, HttpNotifier, LogNotifier};
