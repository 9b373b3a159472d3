//! Notifier implementations
//!
//! Contains LogNotifier, FileNotifier, and HttpNotifier.

mod file;
mod http;
mod log;

pub use self::file::FileNotifier;
pub use self::http::HttpNotifier;
pub use self::log::LogNotifier;
