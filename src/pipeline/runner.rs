// src/pipeline/runner.rs

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::config::LoadedConfig;
use crate::errors::{DocpipeError, Result, Stage};
use crate::fs::{absolutize, FileSystem, RealFileSystem};
use crate::pipeline::graph::ModuleGraph;
use crate::pipeline::{Loader, Processor, Renderer};
use crate::watch::WatchSet;

/// Outcome of one successful pipeline run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub graph: ModuleGraph,
    pub watch_set: WatchSet,
}

/// Sequences load → process → render against a configuration.
///
/// Stages are not retried here; the serve loop decides what a failure
/// means.
#[derive(Debug, Clone)]
pub struct PipelineRunner {
    fs: Arc<dyn FileSystem>,
}

impl Default for PipelineRunner {
    fn default() -> Self {
        Self::new(Arc::new(RealFileSystem))
    }
}

impl PipelineRunner {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Run the pipeline and return the files to watch.
    pub fn run(&self, config: &LoadedConfig) -> Result<WatchSet> {
        Ok(self.execute(config)?.watch_set)
    }

    #[instrument(skip_all, fields(renderer = config.pipeline.renderer.kind()))]
    pub fn execute(&self, config: &LoadedConfig) -> Result<RunReport> {
        let fs = self.fs.as_ref();
        let pipeline = &config.pipeline;
        let mut graph = ModuleGraph::new();

        for (index, loader) in pipeline.loaders.iter().enumerate() {
            loader
                .load(fs, &mut graph)
                .map_err(|source| stage_failure(Stage::Loader, index, loader.kind(), source))?;
        }
        debug!(modules = graph.len(), "load phase done");

        for (index, processor) in pipeline.processors.iter().enumerate() {
            processor.process(&mut graph).map_err(|source| {
                stage_failure(Stage::Processor, index, processor.kind(), source)
            })?;
        }
        debug!(modules = graph.len(), "process phase done");

        pipeline
            .renderer
            .render(fs, &graph)
            .map_err(|source| stage_failure(Stage::Renderer, 0, pipeline.renderer.kind(), source))?;

        let watch_set = self.watch_set_for(&graph, config);
        info!(modules = graph.len(), watched = watch_set.len(), "pipeline run complete");
        Ok(RunReport { graph, watch_set })
    }

    /// Module locations plus the originating config file.
    fn watch_set_for(&self, graph: &ModuleGraph, config: &LoadedConfig) -> WatchSet {
        let fs = self.fs.as_ref();
        let mut set: WatchSet = graph
            .modules
            .iter()
            .map(|m| absolutize(fs, &m.location.filename))
            .collect();
        if let Some(origin) = &config.origin {
            set.insert(absolutize(fs, origin));
        }
        set
    }

    /// What to watch when no run has succeeded yet: only the config file.
    pub fn fallback_watch_set(&self, config: &LoadedConfig) -> WatchSet {
        config
            .origin
            .iter()
            .map(|origin| absolutize(self.fs.as_ref(), origin))
            .collect()
    }
}

fn stage_failure(stage: Stage, index: usize, kind: &str, source: anyhow::Error) -> DocpipeError {
    DocpipeError::StageExecutionFailure {
        stage,
        index,
        kind: kind.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::fs::mock::MockFileSystem;
    use crate::pipeline::{LoaderConfig, MarkdownRenderer, PythonLoader, RendererConfig};
    use std::path::{Path, PathBuf};

    fn config(modules: &[&str]) -> LoadedConfig {
        LoadedConfig::new(PipelineConfig {
            loaders: vec![LoaderConfig::Python(PythonLoader {
                modules: modules.iter().map(|s| s.to_string()).collect(),
                search_path: vec![PathBuf::from("/p")],
                legacy_syntax: false,
            })],
            processors: Vec::new(),
            renderer: RendererConfig::Markdown(MarkdownRenderer {
                filename: PathBuf::from("/out/api.md"),
                ..MarkdownRenderer::default()
            }),
        })
    }

    #[test]
    fn watch_set_contains_module_files_and_origin() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/a.py", "\"\"\"A\"\"\"");
        fs.add_file("/p/docpipe.toml", "");
        let runner = PipelineRunner::new(Arc::new(fs.clone()));

        let cfg = config(&["a"]).with_origin("/p/docpipe.toml");
        let set = runner.run(&cfg).unwrap();

        assert_eq!(set.len(), 2);
        assert!(set.contains(Path::new("/p/a.py")));
        assert!(set.contains(Path::new("/p/docpipe.toml")));
        assert!(fs.contents("/out/api.md").unwrap().contains("# a"));
    }

    #[test]
    fn loader_failure_is_reported_with_stage() {
        let fs = MockFileSystem::new();
        let runner = PipelineRunner::new(Arc::new(fs));
        let err = runner.run(&config(&["missing"])).unwrap_err();
        match err {
            DocpipeError::StageExecutionFailure { stage, index, kind, .. } => {
                assert_eq!(stage, Stage::Loader);
                assert_eq!(index, 0);
                assert_eq!(kind, "python");
            }
            other => panic!("expected StageExecutionFailure, got {other:?}"),
        }
    }

    #[test]
    fn fallback_watch_set_is_origin_only() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/docpipe.toml", "");
        let runner = PipelineRunner::new(Arc::new(fs));

        assert!(runner.fallback_watch_set(&config(&[])).is_empty());
        let set = runner.fallback_watch_set(&config(&[]).with_origin("/p/docpipe.toml"));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![Path::new("/p/docpipe.toml")]);
    }
}
