// src/config/overrides.rs

//! Command-line overrides applied to a loaded pipeline.
//!
//! Every target stage is resolved before anything is written, so a failed
//! application leaves the configuration untouched. Applying the same
//! [`OverrideSet`] again is a no-op (fields are replaced, never appended).

use std::path::PathBuf;

use tracing::debug;

use crate::config::model::PipelineConfig;
use crate::errors::{DocpipeError, Result, Stage};
use crate::pipeline::{ModuleLoader, RendererConfig, TocConfigurable};

/// Values from the command line that supersede the configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideSet {
    pub target_modules: Vec<String>,
    pub search_paths: Vec<PathBuf>,
    pub legacy_syntax: Option<bool>,
    pub render_toc: Option<bool>,
}

/// Which part of the renderer tree receives `render_toc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TocTarget {
    /// The n-th declared Markdown sub-field of a composite.
    SubField(usize),
    /// The renderer itself.
    Renderer,
}

impl OverrideSet {
    pub fn is_empty(&self) -> bool {
        !self.touches_loader() && self.render_toc.is_none()
    }

    /// True when any override targets the module loader.
    pub fn touches_loader(&self) -> bool {
        !self.target_modules.is_empty()
            || !self.search_paths.is_empty()
            || self.legacy_syntax.is_some()
    }

    /// Apply all overrides, or none.
    pub fn apply(&self, config: &mut PipelineConfig) -> Result<()> {
        let loader_index = if self.touches_loader() {
            Some(find_module_loader(config)?)
        } else {
            None
        };
        let toc_target = match self.render_toc {
            Some(_) => Some(find_toc_target(&config.renderer)?),
            None => None,
        };

        if let Some(index) = loader_index {
            if let Some(loader) = config.loaders[index].as_module_loader_mut() {
                self.apply_to_loader(loader);
                debug!(index, "applied loader overrides");
            }
        }

        if let (Some(enabled), Some(target)) = (self.render_toc, toc_target) {
            if let Some(markdown) = toc_target_mut(&mut config.renderer, target) {
                markdown.set_render_toc(enabled);
                debug!(?target, enabled, "applied render_toc override");
            }
        }

        Ok(())
    }

    fn apply_to_loader(&self, loader: &mut dyn ModuleLoader) {
        if !self.target_modules.is_empty() {
            *loader.modules_mut() = dedup_in_order(&self.target_modules);
        }
        if !self.search_paths.is_empty() {
            *loader.search_path_mut() = dedup_in_order(&self.search_paths);
        }
        if let Some(legacy) = self.legacy_syntax {
            loader.set_legacy_syntax(legacy);
        }
    }
}

/// Index of the first loader exposing the module-loader capability.
pub fn find_module_loader(config: &PipelineConfig) -> Result<usize> {
    config
        .loaders
        .iter()
        .position(|l| l.as_module_loader().is_some())
        .ok_or_else(|| {
            let found = if config.loaders.is_empty() {
                "no loaders configured".to_string()
            } else {
                config
                    .loaders
                    .iter()
                    .map(|l| l.kind())
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            DocpipeError::MissingCapableStage {
                stage: Stage::Loader,
                requested: "module, search path or legacy-syntax overrides".to_string(),
                found,
            }
        })
}

/// Locate the Markdown renderer that owns the TOC flag.
///
/// Declared Markdown sub-fields of a composite win (first match); otherwise
/// the renderer itself must be a Markdown renderer.
pub fn find_toc_target(renderer: &RendererConfig) -> Result<TocTarget> {
    if !renderer.markdown_fields().is_empty() {
        return Ok(TocTarget::SubField(0));
    }
    if renderer.as_markdown().is_some() {
        return Ok(TocTarget::Renderer);
    }
    Err(DocpipeError::MissingCapableStage {
        stage: Stage::Renderer,
        requested: "render_toc".to_string(),
        found: format!("renderer '{}' does not expose a markdown renderer", renderer.kind()),
    })
}

fn toc_target_mut(
    renderer: &mut RendererConfig,
    target: TocTarget,
) -> Option<&mut dyn TocConfigurable> {
    match target {
        TocTarget::SubField(n) => renderer
            .markdown_fields_mut()
            .into_iter()
            .nth(n)
            .map(|m| m as &mut dyn TocConfigurable),
        TocTarget::Renderer => renderer
            .as_markdown_mut()
            .map(|m| m as &mut dyn TocConfigurable),
    }
}

fn dedup_in_order<T: Clone + PartialEq>(items: &[T]) -> Vec<T> {
    let mut out: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(item) {
            out.push(item.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{
        ListingRenderer, LoaderConfig, MarkdownRenderer, MkdocsRenderer, PagesLoader,
        PythonLoader,
    };

    fn toc_only(enabled: bool) -> OverrideSet {
        OverrideSet {
            render_toc: Some(enabled),
            ..OverrideSet::default()
        }
    }

    #[test]
    fn toc_on_bare_markdown_renderer() {
        let mut cfg = PipelineConfig::default();
        toc_only(true).apply(&mut cfg).unwrap();
        assert!(cfg.renderer.as_markdown().unwrap().render_toc);
    }

    #[test]
    fn toc_on_composite_finds_markdown_field() {
        let mut cfg = PipelineConfig {
            renderer: RendererConfig::Mkdocs(MkdocsRenderer::default()),
            ..PipelineConfig::default()
        };
        toc_only(true).apply(&mut cfg).unwrap();
        assert!(cfg.renderer.markdown_fields()[0].render_toc);

        toc_only(false).apply(&mut cfg).unwrap();
        assert!(!cfg.renderer.markdown_fields()[0].render_toc);
    }

    #[test]
    fn toc_without_markdown_names_renderer_kind() {
        let mut cfg = PipelineConfig {
            renderer: RendererConfig::Listing(ListingRenderer::default()),
            ..PipelineConfig::default()
        };
        let err = toc_only(true).apply(&mut cfg).unwrap_err();
        match err {
            DocpipeError::MissingCapableStage { stage, found, .. } => {
                assert_eq!(stage, Stage::Renderer);
                assert!(found.contains("listing"));
            }
            other => panic!("expected MissingCapableStage, got {other:?}"),
        }
    }

    #[test]
    fn loader_overrides_need_a_module_loader() {
        let mut cfg = PipelineConfig {
            loaders: Vec::new(),
            ..PipelineConfig::default()
        };
        let before = cfg.clone();
        let overrides = OverrideSet {
            target_modules: vec!["pkg".into()],
            render_toc: Some(true),
            ..OverrideSet::default()
        };
        let err = overrides.apply(&mut cfg).unwrap_err();
        assert!(matches!(
            err,
            DocpipeError::MissingCapableStage { stage: Stage::Loader, .. }
        ));
        // render_toc was resolvable but must not have been applied either.
        assert_eq!(cfg, before);
    }

    #[test]
    fn loader_overrides_skip_non_module_loaders() {
        let mut cfg = PipelineConfig {
            loaders: vec![
                LoaderConfig::Pages(PagesLoader {
                    files: vec!["README.md".into()],
                }),
                LoaderConfig::Python(PythonLoader::default()),
            ],
            ..PipelineConfig::default()
        };
        OverrideSet {
            target_modules: vec!["a".into(), "b".into(), "a".into()],
            search_paths: vec!["src".into()],
            legacy_syntax: Some(true),
            render_toc: None,
        }
        .apply(&mut cfg)
        .unwrap();

        let LoaderConfig::Python(python) = &cfg.loaders[1] else {
            panic!("python loader moved");
        };
        assert_eq!(python.modules, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(python.search_path, vec![PathBuf::from("src")]);
        assert!(python.legacy_syntax);
    }

    #[test]
    fn empty_set_changes_nothing() {
        let mut cfg = PipelineConfig {
            loaders: Vec::new(),
            renderer: RendererConfig::Markdown(MarkdownRenderer::default()),
            ..PipelineConfig::default()
        };
        let before = cfg.clone();
        assert!(OverrideSet::default().is_empty());
        OverrideSet::default().apply(&mut cfg).unwrap();
        assert_eq!(cfg, before);
    }
}
