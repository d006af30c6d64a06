#![allow(dead_code)]

use std::path::PathBuf;

use docpipe::config::{LoadedConfig, PipelineConfig};
use docpipe::pipeline::{
    CrossrefProcessor, FilterProcessor, HugoRenderer, ListingRenderer, LoaderConfig,
    MarkdownRenderer, MkdocsRenderer, NormalizeProcessor, PagesLoader, ProcessorConfig,
    PythonLoader, RendererConfig,
};

/// Builder for `PipelineConfig` to simplify test setup.
///
/// Starts from an empty pipeline (no loaders, no processors, a `markdown`
/// renderer), unlike [`PipelineConfig::default`].
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: PipelineConfig {
                loaders: Vec::new(),
                processors: Vec::new(),
                renderer: RendererConfig::default(),
            },
        }
    }

    pub fn with_loader(mut self, loader: LoaderConfig) -> Self {
        self.config.loaders.push(loader);
        self
    }

    pub fn with_python_loader(self, modules: &[&str], search_path: &[&str]) -> Self {
        self.with_loader(LoaderConfig::Python(PythonLoader {
            modules: modules.iter().map(|m| m.to_string()).collect(),
            search_path: search_path.iter().map(PathBuf::from).collect(),
            legacy_syntax: false,
        }))
    }

    pub fn with_pages_loader(self, files: &[&str]) -> Self {
        self.with_loader(LoaderConfig::Pages(PagesLoader {
            files: files.iter().map(PathBuf::from).collect(),
        }))
    }

    pub fn with_processor(mut self, processor: ProcessorConfig) -> Self {
        self.config.processors.push(processor);
        self
    }

    /// The usual `filter`, `normalize`, `crossref` chain.
    pub fn with_default_processors(self) -> Self {
        self.with_processor(ProcessorConfig::Filter(FilterProcessor::default()))
            .with_processor(ProcessorConfig::Normalize(NormalizeProcessor::default()))
            .with_processor(ProcessorConfig::Crossref(CrossrefProcessor::default()))
    }

    pub fn with_renderer(mut self, renderer: RendererConfig) -> Self {
        self.config.renderer = renderer;
        self
    }

    pub fn markdown_to(self, filename: &str) -> Self {
        self.with_renderer(RendererConfig::Markdown(MarkdownRenderer {
            filename: PathBuf::from(filename),
            ..MarkdownRenderer::default()
        }))
    }

    pub fn mkdocs(self) -> Self {
        self.with_renderer(RendererConfig::Mkdocs(MkdocsRenderer::default()))
    }

    pub fn hugo(self) -> Self {
        self.with_renderer(RendererConfig::Hugo(HugoRenderer::default()))
    }

    pub fn listing(self) -> Self {
        self.with_renderer(RendererConfig::Listing(ListingRenderer::default()))
    }

    pub fn build(self) -> PipelineConfig {
        self.config
            .validate()
            .expect("Failed to build valid config from builder");
        self.config
    }

    pub fn loaded(self) -> LoadedConfig {
        LoadedConfig::new(self.build())
    }
}

impl Default for PipelineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
