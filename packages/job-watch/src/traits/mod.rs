//! Core trait abstractions for the watcher.
//!
//! These traits are the seams between the site-agnostic core (store,
//! scheduler, run driver) and everything it talks to: the browser, the
//! per-site scrapers and the log / notification / status consumers.

pub mod browser;
pub mod site;
pub mod sink;
pub mod store;
