//! The watcher's control flow.
//!
//! - `RunDriver` - one pass over every site and URL
//! - `Scheduler` - runs cycles with a jittered countdown and manual trigger
//! - `StatusBoard` - shared status snapshot published to an observer
//! - `find_unseen`, `spawn_unseen_refresh` - lookups in and periodic
//!   recomputation of the unseen index

mod run;
mod scheduler;
mod status;
mod unseen;

pub use run::{Cycle, CycleSummary, RunDriver};
pub use scheduler::{CountdownEnd, ManualTrigger, Scheduler};
pub use status::StatusBoard;
pub use unseen::{find_unseen, refresh_unseen, spawn_unseen_refresh};
