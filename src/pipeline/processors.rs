// src/pipeline/processors.rs

//! Built-in processors. Each one mutates the graph in place; they run in
//! the order they are configured.

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::pipeline::graph::{anchor_for, ModuleGraph};
use crate::pipeline::Processor;

/// `[[processors]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProcessorConfig {
    Filter(FilterProcessor),
    Normalize(NormalizeProcessor),
    Crossref(CrossrefProcessor),
}

impl ProcessorConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            ProcessorConfig::Filter(_) => "filter",
            ProcessorConfig::Normalize(_) => "normalize",
            ProcessorConfig::Crossref(_) => "crossref",
        }
    }
}

impl Processor for ProcessorConfig {
    fn process(&self, graph: &mut ModuleGraph) -> Result<()> {
        match self {
            ProcessorConfig::Filter(p) => p.process(graph),
            ProcessorConfig::Normalize(p) => p.process(graph),
            ProcessorConfig::Crossref(p) => p.process(graph),
        }
    }
}

/// Drops modules by name pattern and, optionally, modules without docs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FilterProcessor {
    /// Glob patterns matched against dotted module names.
    #[serde(default)]
    pub exclude: Vec<String>,

    #[serde(default)]
    pub skip_empty_modules: bool,
}

impl FilterProcessor {
    pub fn compile(&self) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.exclude {
            let glob = Glob::new(pattern)
                .with_context(|| format!("invalid exclude pattern '{pattern}'"))?;
            builder.add(glob);
        }
        Ok(builder.build()?)
    }
}

impl Processor for FilterProcessor {
    fn process(&self, graph: &mut ModuleGraph) -> Result<()> {
        let excluded = self.compile()?;
        let before = graph.len();
        graph.modules.retain(|m| {
            if excluded.is_match(&m.name) {
                return false;
            }
            !(self.skip_empty_modules && m.docstring.is_none())
        });
        debug!(removed = before - graph.len(), "filter processor done");
        Ok(())
    }
}

/// Whitespace normalization of docstrings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NormalizeProcessor {}

impl Processor for NormalizeProcessor {
    fn process(&self, graph: &mut ModuleGraph) -> Result<()> {
        for module in &mut graph.modules {
            module.docstring = module.docstring.take().and_then(|d| normalize_text(&d));
        }
        Ok(())
    }
}

/// Strip trailing whitespace and collapse blank-line runs; empty text
/// becomes `None`.
fn normalize_text(text: &str) -> Option<String> {
    let mut out: Vec<&str> = Vec::new();
    for line in text.lines().map(str::trim_end) {
        if line.is_empty() && out.last().is_none_or(|l| l.is_empty()) {
            continue;
        }
        out.push(line);
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    (!out.is_empty()).then(|| out.join("\n"))
}

/// Turns `#pkg.mod` references into in-page links for modules present in
/// the graph. Unknown names are left as written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CrossrefProcessor {}

impl Processor for CrossrefProcessor {
    fn process(&self, graph: &mut ModuleGraph) -> Result<()> {
        let re = Regex::new(r"(^|[^\w\[(#])#([A-Za-z_][\w.]*\w)")?;
        let known: Vec<String> = graph.names().map(str::to_string).collect();

        for module in &mut graph.modules {
            let Some(doc) = module.docstring.as_ref() else {
                continue;
            };
            let replaced = re.replace_all(doc, |caps: &Captures| {
                let name = &caps[2];
                if known.iter().any(|k| k == name) {
                    format!("{}[{}](#{})", &caps[1], name, anchor_for(name))
                } else {
                    debug!(module = %module.name, reference = %name, "unresolved cross-reference");
                    caps[0].to_string()
                }
            });
            module.docstring = Some(replaced.into_owned());
        }
        Ok(())
    }
}
