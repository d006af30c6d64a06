#![allow(dead_code)]

//! In-memory stand-ins for the serve loop's collaborators.
//!
//! Each fake hands out a cloneable handle so a test can inspect what the
//! loop did after the fake itself has been moved into the loop.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::anyhow;
use tokio::sync::mpsc;

use docpipe::engine::{BuildPipeline, LoopEvent};
use docpipe::errors::{DocpipeError, Result, Stage};
use docpipe::exec::{PreviewCommand, PreviewProcess};
use docpipe::pipeline::PreviewServer;
use docpipe::watch::{FileWatcher, WatchRegistration, WatchSet};

pub fn watch_set(paths: &[&str]) -> WatchSet {
    paths.iter().map(PathBuf::from).collect()
}

pub fn files_changed(path: &str) -> LoopEvent {
    LoopEvent::FilesChanged {
        paths: vec![PathBuf::from(path)],
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// How a scripted render ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Succeed,
    /// A stage failure; the loop survives it.
    StageFailure,
    /// Any other error; the loop stops.
    Fatal,
}

/// Shared view of a [`FakePipeline`].
#[derive(Debug, Clone, Default)]
pub struct PipelineHandle {
    renders: Arc<AtomicUsize>,
    sender: Arc<Mutex<Option<mpsc::Sender<LoopEvent>>>>,
}

impl PipelineHandle {
    pub fn renders(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }

    /// Where scripted mid-render events go; normally `ServeLoop::sender()`.
    pub fn connect(&self, tx: mpsc::Sender<LoopEvent>) {
        *self.sender.lock().unwrap() = Some(tx);
    }
}

/// A pipeline whose renders are scripted by number (1-based).
#[derive(Debug)]
pub struct FakePipeline {
    handle: PipelineHandle,
    outcomes: HashMap<usize, RenderOutcome>,
    during: HashMap<usize, Vec<LoopEvent>>,
    needs_runtime: Option<usize>,
    watch_sets: Vec<WatchSet>,
    fallback: WatchSet,
    server: Option<FakePreviewServer>,
}

impl FakePipeline {
    /// Succeeds every time, watches `/src/a.py`, no preview server.
    pub fn new() -> Self {
        Self {
            handle: PipelineHandle::default(),
            outcomes: HashMap::new(),
            during: HashMap::new(),
            needs_runtime: None,
            watch_sets: vec![watch_set(&["/src/a.py"])],
            fallback: WatchSet::new(),
            server: None,
        }
    }

    pub fn handle(&self) -> PipelineHandle {
        self.handle.clone()
    }

    pub fn with_server(mut self, server: FakePreviewServer) -> Self {
        self.server = Some(server);
        self
    }

    pub fn outcome(mut self, render: usize, outcome: RenderOutcome) -> Self {
        self.outcomes.insert(render, outcome);
        self
    }

    /// Events delivered while render number `render` is in progress.
    pub fn during_render(mut self, render: usize, events: Vec<LoopEvent>) -> Self {
        self.during.entry(render).or_default().extend(events);
        self
    }

    /// Render number `render` spawns a task and blocks until it has run.
    ///
    /// The render fails fatally if the task has not run within two seconds,
    /// i.e. when rendering starves the runtime it was called from.
    pub fn needs_runtime_during_render(mut self, render: usize) -> Self {
        self.needs_runtime = Some(render);
        self
    }

    /// Watch sets returned by successive renders; the last one repeats.
    pub fn watch_sets(mut self, sets: Vec<WatchSet>) -> Self {
        self.watch_sets = sets;
        self
    }

    pub fn fallback(mut self, set: WatchSet) -> Self {
        self.fallback = set;
        self
    }
}

impl Default for FakePipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildPipeline for FakePipeline {
    fn render(&mut self) -> Result<WatchSet> {
        let n = self.handle.renders.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(events) = self.during.remove(&n) {
            let guard = self.handle.sender.lock().unwrap();
            let tx = guard
                .as_ref()
                .expect("FakePipeline has scripted events but no sender; call handle().connect()");
            for event in events {
                tx.try_send(event).expect("event channel full");
            }
        }

        if self.needs_runtime == Some(n) {
            let ran = Arc::new(AtomicBool::new(false));
            tokio::spawn({
                let ran = ran.clone();
                async move { ran.store(true, Ordering::SeqCst) }
            });
            let deadline = Instant::now() + Duration::from_secs(2);
            while !ran.load(Ordering::SeqCst) {
                if Instant::now() > deadline {
                    return Err(DocpipeError::Other(anyhow!("render {n} starved the runtime")));
                }
                std::thread::sleep(Duration::from_millis(5));
            }
        }

        match self.outcomes.get(&n).copied().unwrap_or(RenderOutcome::Succeed) {
            RenderOutcome::Succeed => {
                let index = (n - 1).min(self.watch_sets.len().saturating_sub(1));
                Ok(self.watch_sets.get(index).cloned().unwrap_or_default())
            }
            RenderOutcome::StageFailure => Err(DocpipeError::StageExecutionFailure {
                stage: Stage::Renderer,
                index: 0,
                kind: "fake".into(),
                source: anyhow!("render {n} failed"),
            }),
            RenderOutcome::Fatal => Err(DocpipeError::Other(anyhow!("render {n} crashed"))),
        }
    }

    fn fallback_watch_set(&self) -> WatchSet {
        self.fallback.clone()
    }

    fn renderer_kind(&self) -> &str {
        if self.server.is_some() { "fake-serving" } else { "fake" }
    }

    fn preview_server(&self) -> Option<&dyn PreviewServer> {
        self.server.as_ref().map(|s| s as &dyn PreviewServer)
    }
}

// ---------------------------------------------------------------------------
// Preview server
// ---------------------------------------------------------------------------

/// Shared view of a [`FakePreviewServer`] and the processes it started.
#[derive(Debug, Clone, Default)]
pub struct ServerHandle {
    starts: Arc<AtomicUsize>,
    terminations: Arc<AtomicUsize>,
    running: Arc<AtomicBool>,
}

impl ServerHandle {
    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn terminations(&self) -> usize {
        self.terminations.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Make the current process look like it exited on its own.
    pub fn crash(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakePreviewServer {
    handle: ServerHandle,
    fail_to_start: bool,
}

impl FakePreviewServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_to_start: true,
            ..Self::default()
        }
    }

    pub fn handle(&self) -> ServerHandle {
        self.handle.clone()
    }
}

impl PreviewServer for FakePreviewServer {
    fn kind(&self) -> &'static str {
        "fake"
    }

    fn preview_command(&self) -> PreviewCommand {
        PreviewCommand {
            program: "fake-server".into(),
            args: Vec::new(),
            cwd: PathBuf::from("."),
            url: "http://localhost:0".into(),
        }
    }

    fn start_preview(&self) -> anyhow::Result<Box<dyn PreviewProcess>> {
        self.handle.starts.fetch_add(1, Ordering::SeqCst);
        if self.fail_to_start {
            return Err(anyhow!("fake-server: command not found"));
        }
        self.handle.running.store(true, Ordering::SeqCst);
        Ok(Box::new(FakePreviewProcess {
            handle: self.handle.clone(),
        }))
    }
}

#[derive(Debug)]
pub struct FakePreviewProcess {
    handle: ServerHandle,
}

impl PreviewProcess for FakePreviewProcess {
    fn is_running(&mut self) -> bool {
        self.handle.is_running()
    }

    fn terminate(
        &mut self,
        _grace: Duration,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.handle.terminations.fetch_add(1, Ordering::SeqCst);
            self.handle.running.store(false, Ordering::SeqCst);
            Ok(())
        })
    }
}

// ---------------------------------------------------------------------------
// Watcher
// ---------------------------------------------------------------------------

/// Shared view of a [`FakeWatcher`] and its registrations.
#[derive(Debug, Clone, Default)]
pub struct WatcherHandle {
    watched: Arc<Mutex<Vec<WatchSet>>>,
    stops: Arc<AtomicUsize>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
    sender: Arc<Mutex<Option<mpsc::Sender<LoopEvent>>>>,
}

impl WatcherHandle {
    /// Every watch set registered so far, in order.
    pub fn watched(&self) -> Vec<WatchSet> {
        self.watched.lock().unwrap().clone()
    }

    pub fn registrations(&self) -> usize {
        self.watched.lock().unwrap().len()
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Highest number of registrations alive at the same time.
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    /// Simulate a change to `path` through the latest registration.
    pub fn emit(&self, path: &str) {
        let guard = self.sender.lock().unwrap();
        let tx = guard.as_ref().expect("nothing is being watched yet");
        tx.try_send(files_changed(path)).expect("event channel full");
    }
}

#[derive(Debug, Default)]
pub struct FakeWatcher {
    handle: WatcherHandle,
    fail: bool,
}

impl FakeWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn handle(&self) -> WatcherHandle {
        self.handle.clone()
    }
}

impl FileWatcher for FakeWatcher {
    fn watch(
        &mut self,
        paths: &WatchSet,
        events: mpsc::Sender<LoopEvent>,
    ) -> anyhow::Result<Box<dyn WatchRegistration>> {
        if self.fail {
            return Err(anyhow!("watch limit reached"));
        }
        self.handle.watched.lock().unwrap().push(paths.clone());
        *self.handle.sender.lock().unwrap() = Some(events);
        let now = self.handle.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.handle.max_active.fetch_max(now, Ordering::SeqCst);
        Ok(Box::new(FakeRegistration {
            handle: self.handle.clone(),
            stopped: false,
        }))
    }
}

#[derive(Debug)]
pub struct FakeRegistration {
    handle: WatcherHandle,
    stopped: bool,
}

impl WatchRegistration for FakeRegistration {
    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.handle.stops.fetch_add(1, Ordering::SeqCst);
            self.handle.active.fetch_sub(1, Ordering::SeqCst);
        }
    }
}
