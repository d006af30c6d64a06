// src/pipeline/mod.rs

//! The load → process → render pipeline.
//!
//! - [`graph`] is the in-memory model passed between stages.
//! - [`loaders`], [`processors`], [`renderers`] hold the built-in stages and
//!   their capability traits.
//! - [`runner`] sequences one pipeline run and computes the watch set.

use anyhow::Result;

use crate::fs::FileSystem;

pub mod graph;
pub mod loaders;
pub mod processors;
pub mod renderers;
pub mod runner;

pub use graph::{Location, Module, ModuleGraph};
pub use loaders::{LoaderConfig, ModuleLoader, PagesLoader, PythonLoader};
pub use processors::{
    CrossrefProcessor, FilterProcessor, NormalizeProcessor, ProcessorConfig,
};
pub use renderers::{
    HugoRenderer, ListingRenderer, MarkdownRenderer, MkdocsRenderer, PreviewServer,
    RendererConfig, TocConfigurable,
};
pub use runner::{PipelineRunner, RunReport};

/// Adds modules to the graph.
pub trait Loader {
    fn load(&self, fs: &dyn FileSystem, graph: &mut ModuleGraph) -> Result<()>;
}

/// Transforms the graph in place.
pub trait Processor {
    fn process(&self, graph: &mut ModuleGraph) -> Result<()>;
}

/// Turns the graph into output artifacts.
pub trait Renderer {
    fn render(&self, fs: &dyn FileSystem, graph: &ModuleGraph) -> Result<()>;
}
