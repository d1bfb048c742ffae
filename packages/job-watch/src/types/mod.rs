//! Data types shared across the watcher.

pub mod config;
pub mod job;
pub mod status;
