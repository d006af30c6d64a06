// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - The [`WatchSet`] a pipeline run produces.
//! - Wiring up a cross-platform filesystem watcher (`notify`) that turns
//!   changes to watched files into [`LoopEvent::FilesChanged`](crate::engine::LoopEvent).
//!
//! It does **not** decide when to rebuild; coalescing and re-registration
//! belong to the serve loop.

pub mod watch_set;
pub mod watcher;

pub use watch_set::WatchSet;
pub use watcher::{FileWatcher, NotifyRegistration, NotifyWatcher, WatchRegistration};
