// src/engine/core.rs

//! Pure core state machine of the serve loop.
//!
//! This module contains a synchronous, deterministic "core" that consumes
//! [`LoopEvent`]s and produces:
//! - an updated state
//! - a list of commands describing what the IO shell should do next
//!
//! The async shell (`engine::runtime::ServeLoop`) is responsible for
//! running the pipeline, installing file watches, starting and stopping the
//! preview process and reading events from channels.
//!
//! The core has no channels, no Tokio types, and does not perform any IO,
//! so it can be unit tested exhaustively.

use tracing::{debug, warn};

use crate::engine::{LoopEvent, LoopState};

/// Command produced by the core, executed by the IO shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopCommand {
    /// Run the pipeline once.
    Render,
    /// Stop the current watch registration and watch the fresh watch set.
    Rewatch,
    /// No render has succeeded yet: watch whatever can still signal a fix
    /// (the config file), or give up if there is nothing.
    WatchFallback,
    /// Start the preview server.
    StartServer,
    /// Check whether the preview server is still alive.
    CheckServer,
}

/// Decision returned by the core after handling a single event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreStep {
    pub commands: Vec<LoopCommand>,
    /// Whether the outer loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn run(commands: Vec<LoopCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

#[derive(Debug)]
pub struct LoopCore {
    state: LoopState,
    /// A change arrived while rendering; render once more afterwards.
    rerender_pending: bool,
    has_registration: bool,
    server_running: bool,
    renders: u64,
}

impl Default for LoopCore {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopCore {
    pub fn new() -> Self {
        Self {
            state: LoopState::Idle,
            rerender_pending: false,
            has_registration: false,
            server_running: false,
            renders: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Number of renders requested so far.
    pub fn renders(&self) -> u64 {
        self.renders
    }

    pub fn server_running(&self) -> bool {
        self.server_running
    }

    /// Handle a single event, updating state and returning the commands for
    /// the IO shell.
    pub fn step(&mut self, event: LoopEvent) -> CoreStep {
        if self.state == LoopState::Stopped {
            return CoreStep {
                commands: Vec::new(),
                keep_running: false,
            };
        }

        match event {
            LoopEvent::Started => self.on_started(),
            LoopEvent::FilesChanged { paths } => self.on_files_changed(paths.len()),
            LoopEvent::RenderSucceeded => self.on_render_succeeded(),
            LoopEvent::RenderFailed => self.on_render_failed(),
            LoopEvent::PollElapsed => self.on_poll_elapsed(),
            LoopEvent::ServerExited => {
                warn!("preview server exited; it will be restarted after the next successful render");
                self.server_running = false;
                if self.state == LoopState::Serving {
                    self.state = LoopState::Idle;
                }
                CoreStep::run(Vec::new())
            }
            LoopEvent::ShutdownRequested => {
                debug!(from = ?self.state, "shutdown requested");
                self.state = LoopState::Stopped;
                CoreStep {
                    commands: Vec::new(),
                    keep_running: false,
                }
            }
        }
    }

    fn on_started(&mut self) -> CoreStep {
        if self.state != LoopState::Idle || self.renders > 0 {
            return CoreStep::run(Vec::new());
        }
        CoreStep::run(vec![self.begin_render()])
    }

    fn on_files_changed(&mut self, count: usize) -> CoreStep {
        if self.state == LoopState::Rendering {
            // Coalesce: however many arrive, one more render follows.
            debug!(count, "change during render; follow-up render queued");
            self.rerender_pending = true;
            return CoreStep::run(Vec::new());
        }
        debug!(count, from = ?self.state, "change detected");
        CoreStep::run(vec![self.begin_render()])
    }

    fn on_render_succeeded(&mut self) -> CoreStep {
        if self.state != LoopState::Rendering {
            return CoreStep::run(Vec::new());
        }

        self.state = LoopState::Watching;
        self.has_registration = true;
        let mut commands = vec![LoopCommand::Rewatch];

        if !self.server_running {
            commands.push(LoopCommand::StartServer);
            self.server_running = true;
        }
        self.state = LoopState::Serving;

        if let Some(render) = self.take_pending_render() {
            commands.push(render);
        }
        CoreStep::run(commands)
    }

    fn on_render_failed(&mut self) -> CoreStep {
        if self.state != LoopState::Rendering {
            return CoreStep::run(Vec::new());
        }

        let mut commands = Vec::new();
        if !self.has_registration {
            commands.push(LoopCommand::WatchFallback);
            self.has_registration = true;
        }
        self.state = if self.server_running {
            LoopState::Serving
        } else {
            LoopState::Idle
        };

        if let Some(render) = self.take_pending_render() {
            commands.push(render);
        }
        CoreStep::run(commands)
    }

    fn on_poll_elapsed(&mut self) -> CoreStep {
        match self.state {
            LoopState::Serving => {
                self.state = LoopState::Idle;
                CoreStep::run(vec![LoopCommand::CheckServer])
            }
            LoopState::Idle if self.server_running => CoreStep::run(vec![LoopCommand::CheckServer]),
            _ => CoreStep::run(Vec::new()),
        }
    }

    fn begin_render(&mut self) -> LoopCommand {
        self.state = LoopState::Rendering;
        self.rerender_pending = false;
        self.renders += 1;
        LoopCommand::Render
    }

    fn take_pending_render(&mut self) -> Option<LoopCommand> {
        if self.rerender_pending {
            Some(self.begin_render())
        } else {
            None
        }
    }
}
