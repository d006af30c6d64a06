// src/engine/mod.rs

//! Watch–rebuild–serve engine.
//!
//! This module ties together:
//! - the pipeline (rendered once per change, never concurrently)
//! - the file watcher (re-registered against every fresh watch set)
//! - the preview server process (at most one, started lazily)
//! - shutdown signals
//!
//! The pure state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::path::PathBuf;
use std::time::Duration;

pub mod core;
pub mod runtime;
pub mod session;

pub use self::core::{CoreStep, LoopCommand, LoopCore};
pub use self::runtime::ServeLoop;
pub use self::session::{BuildPipeline, RenderSession};

/// States of the serve loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Waiting for a change (no preview server confirmed alive).
    Idle,
    /// A pipeline run is in flight.
    Rendering,
    /// Re-registering the file watcher after a successful render.
    Watching,
    /// Output is current and the preview server is up; waiting for changes.
    Serving,
    /// Shut down; no further transitions.
    Stopped,
}

/// Events flowing into the loop from the watcher, the shell itself and
/// signal handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopEvent {
    /// The loop was entered.
    Started,
    /// One or more watched files changed.
    FilesChanged { paths: Vec<PathBuf> },
    /// The pipeline run just finished successfully.
    RenderSucceeded,
    /// The pipeline run failed; the error has been logged.
    RenderFailed,
    /// The bounded wait elapsed without any event.
    PollElapsed,
    /// The preview server was found to have exited on its own.
    ServerExited,
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

/// Knobs for the serve loop, passed in by the caller.
#[derive(Debug, Clone, Copy)]
pub struct ServeOptions {
    /// Upper bound on a single wait for change events.
    pub poll_interval: Duration,
    /// How long to wait for the preview server to exit during teardown.
    pub terminate_timeout: Duration,
    /// Open the preview URL in a browser after the first server start.
    pub open_browser: bool,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            terminate_timeout: Duration::from_secs(5),
            open_browser: false,
        }
    }
}
