// src/engine/runtime.rs

use std::collections::VecDeque;
use std::fmt;

use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, error, info, warn};

use crate::engine::core::{CoreStep, LoopCommand, LoopCore};
use crate::engine::session::BuildPipeline;
use crate::engine::{LoopEvent, ServeOptions};
use crate::errors::{DocpipeError, Result};
use crate::exec::{open_browser, PreviewProcess};
use crate::watch::{FileWatcher, WatchRegistration, WatchSet};

/// Drives the serve state machine in response to [`LoopEvent`]s and owns
/// every resource the loop creates.
///
/// This is an IO shell around [`LoopCore`], which holds the loop semantics.
/// The shell runs the pipeline, swaps watch registrations, and starts and
/// stops the preview process. It is the only owner of the registration and
/// the process handle; [`ServeLoop::run`] releases both exactly once on
/// every exit path.
pub struct ServeLoop<P: BuildPipeline, W: FileWatcher> {
    core: LoopCore,
    pipeline: P,
    watcher: W,
    options: ServeOptions,
    event_tx: mpsc::Sender<LoopEvent>,
    event_rx: mpsc::Receiver<LoopEvent>,
    /// Events produced by the shell itself, handled before waiting again.
    pending: VecDeque<LoopEvent>,
    watch_set: WatchSet,
    registration: Option<Box<dyn WatchRegistration>>,
    preview: Option<Box<dyn PreviewProcess>>,
    browser_opened: bool,
    last_failure: Option<DocpipeError>,
}

impl<P: BuildPipeline, W: FileWatcher> fmt::Debug for ServeLoop<P, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServeLoop")
            .field("core", &self.core)
            .field("watch_set", &self.watch_set)
            .field("watching", &self.registration.is_some())
            .field("serving", &self.preview.is_some())
            .finish_non_exhaustive()
    }
}

impl<P: BuildPipeline, W: FileWatcher> ServeLoop<P, W> {
    /// Build the loop. Refuses renderers without a serve capability.
    pub fn new(pipeline: P, watcher: W, options: ServeOptions) -> Result<Self> {
        if pipeline.preview_server().is_none() {
            return Err(DocpipeError::UnsupportedRenderer {
                kind: pipeline.renderer_kind().to_string(),
            });
        }

        let (event_tx, event_rx) = mpsc::channel::<LoopEvent>(64);
        Ok(Self {
            core: LoopCore::new(),
            pipeline,
            watcher,
            options,
            event_tx,
            event_rx,
            pending: VecDeque::new(),
            watch_set: WatchSet::new(),
            registration: None,
            preview: None,
            browser_opened: false,
            last_failure: None,
        })
    }

    /// Sender for injecting events, e.g. `ShutdownRequested` from a
    /// Ctrl-C handler.
    pub fn sender(&self) -> mpsc::Sender<LoopEvent> {
        self.event_tx.clone()
    }

    /// Run until shutdown or a fatal error, then tear down.
    pub async fn run(mut self) -> Result<()> {
        info!(renderer = self.pipeline.renderer_kind(), "serve loop started");
        let result = self.drive().await;
        self.teardown().await;
        match &result {
            Ok(()) => info!("serve loop exiting"),
            Err(err) => error!(error = %err, "serve loop stopped on error"),
        }
        result
    }

    async fn drive(&mut self) -> Result<()> {
        let mut step = self.core.step(LoopEvent::Started);

        loop {
            let CoreStep {
                commands,
                keep_running,
            } = step;

            for command in commands {
                self.execute(command).await?;
            }

            if !keep_running {
                info!("core requested exit; stopping serve loop");
                return Ok(());
            }

            let event = match self.pending.pop_front() {
                Some(event) => event,
                None => self.next_event().await,
            };
            debug!(?event, state = ?self.core.state(), "serve loop received event");
            step = self.core.step(event);
        }
    }

    /// Wait for the next event, bounded by the poll interval.
    ///
    /// A burst of change events is merged into one.
    async fn next_event(&mut self) -> LoopEvent {
        let received =
            tokio::time::timeout(self.options.poll_interval, self.event_rx.recv()).await;

        match received {
            Err(_elapsed) => LoopEvent::PollElapsed,
            Ok(None) => {
                info!("event channel closed; shutting down");
                LoopEvent::ShutdownRequested
            }
            Ok(Some(LoopEvent::FilesChanged { mut paths })) => {
                while let Ok(next) = self.event_rx.try_recv() {
                    match next {
                        LoopEvent::FilesChanged { paths: more } => paths.extend(more),
                        other => {
                            self.pending.push_back(other);
                            break;
                        }
                    }
                }
                paths.sort();
                paths.dedup();
                LoopEvent::FilesChanged { paths }
            }
            Ok(Some(other)) => other,
        }
    }

    async fn execute(&mut self, command: LoopCommand) -> Result<()> {
        match command {
            LoopCommand::Render => self.render(),
            LoopCommand::Rewatch => self.rewatch(),
            LoopCommand::WatchFallback => self.watch_fallback(),
            LoopCommand::StartServer => self.start_server(),
            LoopCommand::CheckServer => {
                self.check_server();
                Ok(())
            }
        }
    }

    fn render(&mut self) -> Result<()> {
        let pipeline = &mut self.pipeline;
        let result = run_blocking(|| pipeline.render());

        // Anything that arrived while rendering is handled before the
        // render outcome, so the core sees it as a mid-render change.
        self.drain_channel();

        match result {
            Ok(watch_set) => {
                self.watch_set = watch_set;
                self.last_failure = None;
                self.pending.push_back(LoopEvent::RenderSucceeded);
                Ok(())
            }
            Err(err) if err.is_recoverable() => {
                error!(error = %err, "render failed; waiting for the next change");
                self.last_failure = Some(err);
                self.pending.push_back(LoopEvent::RenderFailed);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn drain_channel(&mut self) {
        loop {
            match self.event_rx.try_recv() {
                Ok(event) => self.pending.push_back(event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    /// Replace the current registration with one for the fresh watch set.
    /// The old registration is stopped before the new one is installed.
    fn rewatch(&mut self) -> Result<()> {
        if let Some(mut old) = self.registration.take() {
            old.stop();
        }
        let registration = self.watcher.watch(&self.watch_set, self.event_tx.clone())?;
        info!(watched = self.watch_set.len(), "watching files for changes");
        self.registration = Some(registration);
        Ok(())
    }

    fn watch_fallback(&mut self) -> Result<()> {
        let fallback = self.pipeline.fallback_watch_set();
        if fallback.is_empty() {
            // Nothing could ever signal a fix; surface the render error.
            return Err(self.last_failure.take().unwrap_or_else(|| {
                DocpipeError::ConfigError("initial render failed and nothing can be watched".into())
            }));
        }
        warn!(
            watched = fallback.len(),
            "initial render failed; watching the configuration file only"
        );
        self.watch_set = fallback;
        self.rewatch()
    }

    fn start_server(&mut self) -> Result<()> {
        let server = self.pipeline.preview_server().ok_or_else(|| {
            DocpipeError::UnsupportedRenderer {
                kind: self.pipeline.renderer_kind().to_string(),
            }
        })?;
        let kind = server.kind();
        let url = server.preview_command().url;

        let process = server
            .start_preview()
            .map_err(|source| DocpipeError::ProcessSupervisionFailure {
                kind: kind.to_string(),
                source,
            })?;
        self.preview = Some(process);
        info!(server = kind, %url, "preview server running");

        if self.options.open_browser && !self.browser_opened {
            self.browser_opened = true;
            if let Err(err) = open_browser(&url) {
                warn!(error = %err, %url, "could not open browser");
            }
        }
        Ok(())
    }

    fn check_server(&mut self) {
        let exited = match self.preview.as_mut() {
            Some(process) => !process.is_running(),
            None => false,
        };
        if exited {
            self.preview = None;
            self.pending.push_back(LoopEvent::ServerExited);
        }
    }

    /// Release the watch registration and the preview process. Safe to
    /// call more than once; resources are taken on first use.
    async fn teardown(&mut self) {
        if let Some(mut registration) = self.registration.take() {
            registration.stop();
            debug!("watch registration released");
        }
        if let Some(mut process) = self.preview.take() {
            if let Err(err) = process.terminate(self.options.terminate_timeout).await {
                warn!(error = %err, "failed to terminate preview server");
            }
        }
    }
}

/// Run a synchronous render without stalling the runtime's other tasks.
///
/// On a multi-thread runtime the worker hands its queued tasks to another
/// thread first. A current-thread runtime cannot do that, so `f` runs inline.
fn run_blocking<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current().map(|handle| handle.runtime_flavor()) {
        Ok(RuntimeFlavor::MultiThread) => tokio::task::block_in_place(f),
        _ => f(),
    }
}
