// src/config/model.rs

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::pipeline::{
    CrossrefProcessor, FilterProcessor, LoaderConfig, NormalizeProcessor, ProcessorConfig,
    PythonLoader, RendererConfig,
};

/// A declarative pipeline as read from TOML.
///
/// ```toml
/// [[loaders]]
/// type = "python"
/// modules = ["pkg.a"]
/// search_path = ["src"]
///
/// [[processors]]
/// type = "filter"
/// exclude = ["pkg._*"]
///
/// [renderer]
/// type = "mkdocs"
/// [renderer.markdown]
/// render_toc = true
/// ```
///
/// Omitted sections fall back to [`PipelineConfig::default`]: one `python`
/// loader, the `filter`/`normalize`/`crossref` processors and a `markdown`
/// renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_loaders")]
    pub loaders: Vec<LoaderConfig>,

    #[serde(default = "default_processors")]
    pub processors: Vec<ProcessorConfig>,

    #[serde(default)]
    pub renderer: RendererConfig,
}

fn default_loaders() -> Vec<LoaderConfig> {
    vec![LoaderConfig::Python(PythonLoader::default())]
}

fn default_processors() -> Vec<ProcessorConfig> {
    vec![
        ProcessorConfig::Filter(FilterProcessor::default()),
        ProcessorConfig::Normalize(NormalizeProcessor::default()),
        ProcessorConfig::Crossref(CrossrefProcessor::default()),
    ]
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            loaders: default_loaders(),
            processors: default_processors(),
            renderer: RendererConfig::default(),
        }
    }
}

/// Where a configuration comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// A TOML file on disk.
    File(PathBuf),
    /// An inline TOML document passed on the command line.
    Inline(String),
    /// No document; use [`PipelineConfig::default`].
    Default,
}

/// A pipeline together with the file it was read from, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedConfig {
    pub pipeline: PipelineConfig,
    pub origin: Option<PathBuf>,
}

impl LoadedConfig {
    pub fn new(pipeline: PipelineConfig) -> Self {
        Self {
            pipeline,
            origin: None,
        }
    }

    pub fn with_origin(mut self, origin: impl AsRef<Path>) -> Self {
        self.origin = Some(origin.as_ref().to_path_buf());
        self
    }
}
