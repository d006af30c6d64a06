// src/config/bootstrap.rs

//! Starter configuration files written by `--bootstrap*`.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::loader::{discover_config_file, CONFIG_FILENAMES};
use crate::errors::{DocpipeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    Default,
    Mkdocs,
    Hugo,
}

const DEFAULT_CONFIG: &str = r#"[[loaders]]
type = "python"
search_path = ["."]

[[processors]]
type = "filter"

[[processors]]
type = "normalize"

[[processors]]
type = "crossref"

[renderer]
type = "markdown"
filename = "api.md"
"#;

const MKDOCS_CONFIG: &str = r#"[[loaders]]
type = "python"
search_path = ["."]

[[loaders]]
type = "pages"
files = ["README.md"]

[[processors]]
type = "filter"
exclude = ["*._*"]

[[processors]]
type = "normalize"

[[processors]]
type = "crossref"

[renderer]
type = "mkdocs"
build_directory = "build/docs"
site_name = "API Documentation"
theme = "readthedocs"

[renderer.markdown]
filename = "index.md"
render_toc = true
"#;

const HUGO_CONFIG: &str = r#"[[loaders]]
type = "python"
search_path = ["."]

[[processors]]
type = "filter"
exclude = ["*._*"]

[[processors]]
type = "normalize"

[[processors]]
type = "crossref"

[renderer]
type = "hugo"
build_directory = "build/hugo"
title = "API Documentation"

[renderer.markdown]
filename = "api.md"
render_toc = true
"#;

impl Template {
    pub fn contents(self) -> &'static str {
        match self {
            Template::Default => DEFAULT_CONFIG,
            Template::Mkdocs => MKDOCS_CONFIG,
            Template::Hugo => HUGO_CONFIG,
        }
    }
}

/// Write `template` as the primary config file in `dir`.
///
/// Refuses to run when any discoverable config file already exists there.
pub fn bootstrap(dir: &Path, template: Template) -> Result<PathBuf> {
    if let Some(existing) = discover_config_file(dir) {
        return Err(DocpipeError::ConfigError(format!(
            "file already exists: {:?}",
            existing
        )));
    }
    let path = dir.join(CONFIG_FILENAMES[0]);
    fs::write(&path, template.contents())?;
    info!(path = ?path, ?template, "wrote starter configuration");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::load_from_str;

    #[test]
    fn templates_are_valid_configs() {
        for t in [Template::Default, Template::Mkdocs, Template::Hugo] {
            let cfg = load_from_str(t.contents()).unwrap();
            cfg.validate().unwrap();
        }
    }

    #[test]
    fn bootstrap_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = bootstrap(dir.path(), Template::Mkdocs).unwrap();
        assert_eq!(path, dir.path().join("docpipe.toml"));

        let err = bootstrap(dir.path(), Template::Default).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }
}
