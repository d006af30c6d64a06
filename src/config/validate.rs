// src/config/validate.rs

use std::path::Path;

use crate::config::model::PipelineConfig;
use crate::errors::{DocpipeError, Result};
use crate::pipeline::{LoaderConfig, ProcessorConfig, RendererConfig};

impl PipelineConfig {
    /// Check invariants serde cannot express.
    pub fn validate(&self) -> Result<()> {
        validate_loaders(self)?;
        validate_processors(self)?;
        validate_renderer(&self.renderer)?;
        Ok(())
    }
}

fn validate_loaders(cfg: &PipelineConfig) -> Result<()> {
    for (index, loader) in cfg.loaders.iter().enumerate() {
        match loader {
            LoaderConfig::Python(l) => {
                if let Some(bad) = l.modules.iter().find(|m| !is_dotted_name(m)) {
                    return Err(DocpipeError::ConfigError(format!(
                        "loaders[{index}] (python): invalid module name '{bad}'"
                    )));
                }
            }
            LoaderConfig::Pages(l) => {
                if l.files.is_empty() {
                    return Err(DocpipeError::ConfigError(format!(
                        "loaders[{index}] (pages): `files` must not be empty"
                    )));
                }
            }
        }
    }
    Ok(())
}

fn validate_processors(cfg: &PipelineConfig) -> Result<()> {
    for (index, processor) in cfg.processors.iter().enumerate() {
        if let ProcessorConfig::Filter(f) = processor {
            f.compile().map_err(|e| {
                DocpipeError::ConfigError(format!("processors[{index}] (filter): {e:#}"))
            })?;
        }
    }
    Ok(())
}

fn validate_renderer(renderer: &RendererConfig) -> Result<()> {
    let kind = renderer.kind();
    for markdown in renderer.markdown_fields() {
        ensure_relative_file(kind, "markdown.filename", &markdown.filename)?;
    }
    match renderer {
        RendererConfig::Markdown(r) => ensure_file_name(kind, "filename", &r.filename),
        RendererConfig::Listing(r) => ensure_file_name(kind, "filename", &r.filename),
        RendererConfig::Mkdocs(r) => ensure_file_name(kind, "build_directory", &r.build_directory),
        RendererConfig::Hugo(r) => ensure_file_name(kind, "build_directory", &r.build_directory),
    }
}

fn ensure_file_name(kind: &str, field: &str, path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(DocpipeError::ConfigError(format!(
            "renderer ({kind}): `{field}` must not be empty"
        )));
    }
    Ok(())
}

/// Composite renderers place the nested Markdown output inside their own
/// content directory, so the path must be relative to it.
fn ensure_relative_file(kind: &str, field: &str, path: &Path) -> Result<()> {
    ensure_file_name(kind, field, path)?;
    if path.is_absolute() {
        return Err(DocpipeError::ConfigError(format!(
            "renderer ({kind}): `{field}` must be relative to the build directory (got {:?})",
            path
        )));
    }
    Ok(())
}

fn is_dotted_name(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
                && chars.all(|c| c.is_alphanumeric() || c == '_')
        })
}
