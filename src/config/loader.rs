// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::config::model::{ConfigSource, LoadedConfig, PipelineConfig};
use crate::errors::{DocpipeError, Result};

/// File names tried, in order, when no config argument is given.
pub const CONFIG_FILENAMES: [&str; 2] = ["docpipe.toml", ".docpipe.toml"];

/// Decide how to interpret the positional config argument.
///
/// - An argument containing a newline or starting with `{` is an inline
///   document.
/// - Any other argument is a path.
/// - Without an argument, the first of [`CONFIG_FILENAMES`] found in `dir`
///   is used, unless `discover` is false (loader overrides on the command
///   line replace the implicit config), in which case the built-in default
///   pipeline applies.
pub fn resolve_source(arg: Option<&str>, discover: bool, dir: &Path) -> Result<ConfigSource> {
    match arg {
        Some(text) if is_inline(text) => Ok(ConfigSource::Inline(text.to_string())),
        Some(path) => Ok(ConfigSource::File(PathBuf::from(path))),
        None if !discover => Ok(ConfigSource::Default),
        None => discover_config_file(dir)
            .map(ConfigSource::File)
            .ok_or_else(|| {
                DocpipeError::ConfigNotFound(
                    CONFIG_FILENAMES.iter().map(|n| dir.join(n)).collect(),
                )
            }),
    }
}

pub fn is_inline(arg: &str) -> bool {
    arg.contains('\n') || arg.trim_start().starts_with('{')
}

/// First existing config file in `dir`, by fixed precedence.
pub fn discover_config_file(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}

/// Parse a TOML document. A document wrapped in `{ ... }` is read as a
/// single inline table.
pub fn load_from_str(text: &str) -> Result<PipelineConfig> {
    #[derive(Deserialize)]
    struct Wrapped {
        pipeline: PipelineConfig,
    }

    let trimmed = text.trim();
    if trimmed.starts_with('{') {
        let wrapped: Wrapped = toml::from_str(&format!("pipeline = {trimmed}"))?;
        return Ok(wrapped.pipeline);
    }
    Ok(toml::from_str(text)?)
}

/// Load a configuration file from a given path.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<PipelineConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| {
        DocpipeError::ConfigError(format!("cannot read config file {:?}: {e}", path))
    })?;
    load_from_str(&contents)
}

/// Load a configuration from any source and validate it.
///
/// The returned [`LoadedConfig`] remembers the originating file so that the
/// watch set includes it.
pub fn load_and_validate(source: &ConfigSource) -> Result<LoadedConfig> {
    let loaded = match source {
        ConfigSource::File(path) => {
            debug!(path = ?path, "loading config file");
            LoadedConfig::new(load_from_path(path)?).with_origin(path)
        }
        ConfigSource::Inline(text) => {
            debug!("loading inline config");
            LoadedConfig::new(load_from_str(text)?)
        }
        ConfigSource::Default => LoadedConfig::new(PipelineConfig::default()),
    };
    loaded.pipeline.validate()?;
    Ok(loaded)
}
