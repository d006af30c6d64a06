// src/watch/watcher.rs

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use notify::event::EventKind;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::engine::LoopEvent;
use crate::watch::WatchSet;

/// A live file-watch registration.
pub trait WatchRegistration: Send {
    /// Stop delivering change events. Idempotent.
    fn stop(&mut self);
}

/// Installs file-watch registrations for a [`WatchSet`].
///
/// Production code uses [`NotifyWatcher`]; tests provide fakes that record
/// registrations and let the test inject changes.
pub trait FileWatcher: Send {
    fn watch(
        &mut self,
        paths: &WatchSet,
        events: mpsc::Sender<LoopEvent>,
    ) -> Result<Box<dyn WatchRegistration>>;
}

/// `notify`-backed watcher.
///
/// Registers each parent directory of the watch set non-recursively and
/// filters events down to the watched files. Watching directories rather
/// than files keeps working when editors save by rename. A Python source
/// created in one of those directories is forwarded too, so a new module in
/// a watched package triggers a rebuild that picks it up.
#[derive(Debug, Default)]
pub struct NotifyWatcher;

/// Handle for the filesystem watcher.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive for
/// as long as needed. Dropping it (or calling `stop`) ends file watching.
pub struct NotifyRegistration {
    inner: Option<RecommendedWatcher>,
}

impl std::fmt::Debug for NotifyRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyRegistration")
            .field("active", &self.inner.is_some())
            .finish()
    }
}

impl WatchRegistration for NotifyRegistration {
    fn stop(&mut self) {
        if self.inner.take().is_some() {
            debug!("file watcher stopped");
        }
    }
}

impl FileWatcher for NotifyWatcher {
    fn watch(
        &mut self,
        paths: &WatchSet,
        events: mpsc::Sender<LoopEvent>,
    ) -> Result<Box<dyn WatchRegistration>> {
        let watched = Arc::new(EventFilter::new(paths));

        // Called synchronously by notify on its own thread.
        let mut watcher = RecommendedWatcher::new(
            {
                let watched = Arc::clone(&watched);
                move |res: notify::Result<Event>| match res {
                    Ok(event) => forward_event(&watched, event, &events),
                    Err(err) => {
                        eprintln!("docpipe: file watch error: {err}");
                    }
                }
            },
            Config::default(),
        )?;

        for dir in paths.directories() {
            watcher
                .watch(&dir, RecursiveMode::NonRecursive)
                .with_context(|| format!("watching directory {:?}", dir))?;
        }

        info!(files = paths.len(), "file watcher started");
        Ok(Box::new(NotifyRegistration {
            inner: Some(watcher),
        }))
    }
}

/// Extension of sources whose creation in a watched directory matters.
const SOURCE_EXTENSION: &str = "py";

/// Decides which raw `notify` paths are changes to the watch set.
#[derive(Debug)]
struct EventFilter {
    files: WatchSet,
    directories: BTreeSet<PathBuf>,
}

impl EventFilter {
    fn new(files: &WatchSet) -> Self {
        Self {
            directories: files.directories(),
            files: files.clone(),
        }
    }

    fn wants(&self, kind: &EventKind, path: &Path) -> bool {
        match kind {
            EventKind::Access(_) => false,
            EventKind::Create(_) if !self.files.contains(path) => {
                path.extension().is_some_and(|ext| ext == SOURCE_EXTENSION)
                    && path.parent().is_some_and(|dir| self.directories.contains(dir))
            }
            _ => self.files.contains(path),
        }
    }
}

fn forward_event(filter: &EventFilter, event: Event, tx: &mpsc::Sender<LoopEvent>) {
    let kind = event.kind;
    let paths: Vec<_> = event
        .paths
        .into_iter()
        .filter(|p| filter.wants(&kind, p))
        .collect();
    if paths.is_empty() {
        return;
    }
    // A full channel already holds a pending change; dropping this one
    // loses nothing because the loop coalesces changes anyway.
    let _ = tx.try_send(LoopEvent::FilesChanged { paths });
}
