//! Storage implementations.
//!
//! - `FileLedgerStore` - per-site JSON ledgers of seen jobs
//! - `ScreenshotStore` - rotating diagnostic page captures

pub mod ledger;
pub mod screenshots;

pub use ledger::FileLedgerStore;
pub use screenshots::ScreenshotStore;
