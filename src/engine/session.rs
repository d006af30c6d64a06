// src/engine/session.rs

use std::path::Path;

use tracing::{debug, info, warn};

use crate::config::{load_and_validate, ConfigSource, LoadedConfig, OverrideSet};
use crate::errors::{DocpipeError, Result};
use crate::pipeline::{PipelineRunner, PreviewServer};
use crate::watch::WatchSet;

/// What the serve loop needs from a pipeline.
///
/// Production code uses [`RenderSession`]; tests provide their own
/// implementation that records renders and fails on demand.
pub trait BuildPipeline: Send {
    /// Run the pipeline once and return the files to watch next.
    fn render(&mut self) -> Result<WatchSet>;

    /// Files to watch when no render has succeeded yet.
    fn fallback_watch_set(&self) -> WatchSet;

    /// Concrete renderer kind, for error messages.
    fn renderer_kind(&self) -> &str;

    /// The renderer's serve capability, if it has one.
    fn preview_server(&self) -> Option<&dyn PreviewServer>;
}

/// A loaded configuration with overrides applied, ready to render.
///
/// A configuration read from a file is read again before every render
/// after the first, so edits to it take effect on the next rebuild. The
/// command-line overrides are re-applied to each fresh copy.
#[derive(Debug, Clone)]
pub struct RenderSession {
    config: LoadedConfig,
    overrides: OverrideSet,
    runner: PipelineRunner,
    /// `config` was just loaded and has not been rendered yet.
    fresh: bool,
}

impl RenderSession {
    /// Apply `overrides` to `config` and validate the result.
    ///
    /// Fails before any render if an override has no capable stage.
    pub fn new(
        config: LoadedConfig,
        overrides: &OverrideSet,
        runner: PipelineRunner,
    ) -> Result<Self> {
        let config = with_overrides(config, overrides)?;
        if !overrides.is_empty() {
            info!(?overrides, "command-line overrides applied");
        }
        Ok(Self {
            config,
            overrides: overrides.clone(),
            runner,
            fresh: true,
        })
    }

    pub fn config(&self) -> &LoadedConfig {
        &self.config
    }

    /// Re-read the originating config file, if there is one.
    ///
    /// On failure the previous configuration is kept and the error is
    /// returned as a recoverable [`DocpipeError::ConfigReloadFailure`].
    pub fn reload(&mut self) -> Result<()> {
        let Some(origin) = self.config.origin.clone() else {
            return Ok(());
        };
        let reloaded = load_and_validate(&ConfigSource::File(origin.clone()))
            .and_then(|loaded| with_overrides(loaded, &self.overrides))
            .map_err(|err| reload_failure(&origin, err))?;

        if reloaded.pipeline != self.config.pipeline {
            info!(path = ?origin, "configuration changed; using the new pipeline");
        } else {
            debug!(path = ?origin, "configuration unchanged");
        }
        self.config = reloaded;
        Ok(())
    }
}

fn with_overrides(mut config: LoadedConfig, overrides: &OverrideSet) -> Result<LoadedConfig> {
    if !overrides.is_empty() {
        overrides.apply(&mut config.pipeline)?;
        config.pipeline.validate()?;
    }
    Ok(config)
}

fn reload_failure(path: &Path, err: DocpipeError) -> DocpipeError {
    warn!(path = ?path, error = %err, "keeping previous configuration");
    DocpipeError::ConfigReloadFailure {
        path: path.to_path_buf(),
        source: Box::new(err),
    }
}

impl BuildPipeline for RenderSession {
    fn render(&mut self) -> Result<WatchSet> {
        if !std::mem::take(&mut self.fresh) {
            self.reload()?;
        }
        info!("rendering");
        self.runner.run(&self.config)
    }

    fn fallback_watch_set(&self) -> WatchSet {
        self.runner.fallback_watch_set(&self.config)
    }

    fn renderer_kind(&self) -> &str {
        self.config.pipeline.renderer.kind()
    }

    fn preview_server(&self) -> Option<&dyn PreviewServer> {
        self.config.pipeline.renderer.as_preview_server()
    }
}
