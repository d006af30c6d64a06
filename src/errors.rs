// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Pipeline phase a stage belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Loader,
    Processor,
    Renderer,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Loader => "loader",
            Stage::Processor => "processor",
            Stage::Renderer => "renderer",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug)]
pub enum DocpipeError {
    /// An override was requested but no configured stage can accept it.
    #[error("no {stage} in the pipeline can accept {requested} (found: {found})")]
    MissingCapableStage {
        stage: Stage,
        requested: String,
        found: String,
    },

    /// The serve loop needs a renderer that can start a preview server.
    #[error("renderer '{kind}' cannot serve a preview; use a renderer such as \"mkdocs\" or \"hugo\"")]
    UnsupportedRenderer { kind: String },

    /// A load/process/render stage failed during a pipeline run.
    #[error("{stage} #{index} ('{kind}') failed: {source:#}")]
    StageExecutionFailure {
        stage: Stage,
        index: usize,
        kind: String,
        #[source]
        source: anyhow::Error,
    },

    /// The preview server process could not be started.
    #[error("preview server '{kind}' could not be started: {source:#}")]
    ProcessSupervisionFailure {
        kind: String,
        #[source]
        source: anyhow::Error,
    },

    /// The configuration file changed but could not be reloaded. The
    /// previous configuration stays in effect.
    #[error("reloading {path:?} failed: {source}")]
    ConfigReloadFailure {
        path: PathBuf,
        #[source]
        source: Box<DocpipeError>,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("config file not found (looked for {0:?})")]
    ConfigNotFound(Vec<PathBuf>),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DocpipeError {
    /// True for errors the serve loop reports and survives.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DocpipeError::StageExecutionFailure { .. } | DocpipeError::ConfigReloadFailure { .. }
        )
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, DocpipeError>;
