//! Sink implementations for new jobs and status updates.
//!
//! - `AppendLog` - append-only text log of new jobs
//! - `DesktopNotifier` / `TracingNotifier` - new-job notifications
//! - `TracingStatus` - status snapshots as structured log events

mod log_file;
mod notify;
mod status;

pub use log_file::AppendLog;
pub use notify::{DesktopNotifier, TracingNotifier};
pub use status::TracingStatus;

// Re-export from traits for convenience
pub use crate::traits::sink::{JobLog, Notifier, StatusObserver};
