// src/pipeline/renderers.rs

//! Built-in renderers.
//!
//! The renderer tree is a tagged union. Capabilities are explicit traits
//! instead of runtime type checks:
//!
//! - [`TocConfigurable`]: the Markdown renderer, reachable directly or as a
//!   declared `markdown` sub-field of a composite.
//! - [`PreviewServer`]: composites that can run a live preview
//!   (`mkdocs serve`, `hugo server`).

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::exec::{spawn_preview, PreviewCommand, PreviewProcess};
use crate::fs::FileSystem;
use crate::pipeline::graph::ModuleGraph;
use crate::pipeline::Renderer;

/// Capability of renderers whose table of contents can be toggled.
pub trait TocConfigurable {
    fn render_toc(&self) -> bool;
    fn set_render_toc(&mut self, enabled: bool);
}

/// Capability of renderers that can serve their output while it is being
/// rebuilt.
pub trait PreviewServer {
    fn kind(&self) -> &'static str;

    /// How to launch the preview process.
    fn preview_command(&self) -> PreviewCommand;

    fn start_preview(&self) -> Result<Box<dyn PreviewProcess>> {
        let command = self.preview_command();
        info!(server = self.kind(), url = %command.url, "starting preview server");
        Ok(Box::new(spawn_preview(&command)?))
    }
}

/// `[renderer]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RendererConfig {
    Markdown(MarkdownRenderer),
    Mkdocs(MkdocsRenderer),
    Hugo(HugoRenderer),
    Listing(ListingRenderer),
}

impl Default for RendererConfig {
    fn default() -> Self {
        RendererConfig::Markdown(MarkdownRenderer::default())
    }
}

impl RendererConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            RendererConfig::Markdown(_) => "markdown",
            RendererConfig::Mkdocs(_) => "mkdocs",
            RendererConfig::Hugo(_) => "hugo",
            RendererConfig::Listing(_) => "listing",
        }
    }

    /// Sub-fields declared as Markdown renderers, in declaration order.
    pub fn markdown_fields(&self) -> Vec<&MarkdownRenderer> {
        match self {
            RendererConfig::Mkdocs(r) => vec![&r.markdown],
            RendererConfig::Hugo(r) => vec![&r.markdown],
            RendererConfig::Markdown(_) | RendererConfig::Listing(_) => Vec::new(),
        }
    }

    pub fn markdown_fields_mut(&mut self) -> Vec<&mut MarkdownRenderer> {
        match self {
            RendererConfig::Mkdocs(r) => vec![&mut r.markdown],
            RendererConfig::Hugo(r) => vec![&mut r.markdown],
            RendererConfig::Markdown(_) | RendererConfig::Listing(_) => Vec::new(),
        }
    }

    /// The renderer itself, if it is a Markdown renderer.
    pub fn as_markdown(&self) -> Option<&MarkdownRenderer> {
        match self {
            RendererConfig::Markdown(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_markdown_mut(&mut self) -> Option<&mut MarkdownRenderer> {
        match self {
            RendererConfig::Markdown(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_preview_server(&self) -> Option<&dyn PreviewServer> {
        match self {
            RendererConfig::Mkdocs(r) => Some(r),
            RendererConfig::Hugo(r) => Some(r),
            RendererConfig::Markdown(_) | RendererConfig::Listing(_) => None,
        }
    }
}

impl Renderer for RendererConfig {
    fn render(&self, fs: &dyn FileSystem, graph: &ModuleGraph) -> Result<()> {
        match self {
            RendererConfig::Markdown(r) => r.render(fs, graph),
            RendererConfig::Mkdocs(r) => r.render(fs, graph),
            RendererConfig::Hugo(r) => r.render(fs, graph),
            RendererConfig::Listing(r) => r.render(fs, graph),
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkdownRenderer {
    /// Output file. Inside a composite renderer it is relative to the
    /// composite's content directory.
    #[serde(default = "default_markdown_filename")]
    pub filename: PathBuf,

    #[serde(default)]
    pub render_toc: bool,

    #[serde(default = "default_toc_title")]
    pub render_toc_title: String,

    /// Emit a `# module` heading per module.
    #[serde(default = "default_true")]
    pub render_module_header: bool,
}

fn default_markdown_filename() -> PathBuf {
    PathBuf::from("api.md")
}

fn default_toc_title() -> String {
    "Table of Contents".to_string()
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self {
            filename: default_markdown_filename(),
            render_toc: false,
            render_toc_title: default_toc_title(),
            render_module_header: true,
        }
    }
}

impl TocConfigurable for MarkdownRenderer {
    fn render_toc(&self) -> bool {
        self.render_toc
    }

    fn set_render_toc(&mut self, enabled: bool) {
        self.render_toc = enabled;
    }
}

impl MarkdownRenderer {
    pub fn render_to_string(&self, graph: &ModuleGraph) -> String {
        let mut out = String::new();

        if self.render_toc {
            let _ = writeln!(out, "**{}**\n", self.render_toc_title);
            for module in &graph.modules {
                let depth = module.name.matches('.').count();
                let _ = writeln!(
                    out,
                    "{}* [{}](#{})",
                    "  ".repeat(depth),
                    module.name,
                    module.anchor()
                );
            }
            out.push('\n');
        }

        for module in &graph.modules {
            if self.render_module_header {
                let _ = writeln!(out, "<a id=\"{}\"></a>\n", module.anchor());
                let _ = writeln!(out, "# {}\n", module.name);
            }
            if let Some(doc) = &module.docstring {
                let _ = writeln!(out, "{}\n", doc.trim_end());
            }
        }
        out
    }

    /// Render into an explicit target path (used by composites).
    pub fn render_into(&self, fs: &dyn FileSystem, graph: &ModuleGraph, target: &Path) -> Result<()> {
        let text = self.render_to_string(graph);
        fs.write(target, text.as_bytes())
            .with_context(|| format!("writing markdown to {:?}", target))?;
        debug!(path = ?target, modules = graph.len(), "markdown written");
        Ok(())
    }
}

impl Renderer for MarkdownRenderer {
    fn render(&self, fs: &dyn FileSystem, graph: &ModuleGraph) -> Result<()> {
        self.render_into(fs, graph, &self.filename)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MkdocsRenderer {
    #[serde(default = "default_mkdocs_build_directory")]
    pub build_directory: PathBuf,

    #[serde(default = "default_site_name")]
    pub site_name: String,

    #[serde(default = "default_mkdocs_theme")]
    pub theme: String,

    #[serde(default = "default_mkdocs_port")]
    pub port: u16,

    #[serde(default)]
    pub markdown: MarkdownRenderer,
}

fn default_mkdocs_build_directory() -> PathBuf {
    PathBuf::from("build/docs")
}

fn default_site_name() -> String {
    "API Documentation".to_string()
}

fn default_mkdocs_theme() -> String {
    "readthedocs".to_string()
}

fn default_mkdocs_port() -> u16 {
    8000
}

impl Default for MkdocsRenderer {
    fn default() -> Self {
        Self {
            build_directory: default_mkdocs_build_directory(),
            site_name: default_site_name(),
            theme: default_mkdocs_theme(),
            port: default_mkdocs_port(),
            markdown: MarkdownRenderer::default(),
        }
    }
}

#[derive(Debug, Serialize)]
struct MkdocsYml<'a> {
    site_name: &'a str,
    docs_dir: &'a str,
    dev_addr: String,
    theme: MkdocsTheme<'a>,
    nav: Vec<std::collections::BTreeMap<&'a str, String>>,
}

#[derive(Debug, Serialize)]
struct MkdocsTheme<'a> {
    name: &'a str,
}

impl MkdocsRenderer {
    pub fn docs_directory(&self) -> PathBuf {
        self.build_directory.join("docs")
    }

    pub fn mkdocs_yml(&self) -> Result<String> {
        let page = self.markdown.filename.to_string_lossy().replace('\\', "/");
        let yml = MkdocsYml {
            site_name: &self.site_name,
            docs_dir: "docs",
            dev_addr: format!("127.0.0.1:{}", self.port),
            theme: MkdocsTheme { name: &self.theme },
            nav: vec![[("API Documentation", page)].into_iter().collect()],
        };
        Ok(serde_yaml::to_string(&yml)?)
    }
}

impl Renderer for MkdocsRenderer {
    fn render(&self, fs: &dyn FileSystem, graph: &ModuleGraph) -> Result<()> {
        let target = self.docs_directory().join(&self.markdown.filename);
        self.markdown.render_into(fs, graph, &target)?;
        fs.write(&self.build_directory.join("mkdocs.yml"), self.mkdocs_yml()?.as_bytes())?;
        Ok(())
    }
}

impl PreviewServer for MkdocsRenderer {
    fn kind(&self) -> &'static str {
        "mkdocs"
    }

    fn preview_command(&self) -> PreviewCommand {
        PreviewCommand {
            program: "mkdocs".to_string(),
            args: vec!["serve".to_string()],
            cwd: self.build_directory.clone(),
            url: format!("http://localhost:{}", self.port),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HugoRenderer {
    #[serde(default = "default_hugo_build_directory")]
    pub build_directory: PathBuf,

    #[serde(default = "default_site_name")]
    pub title: String,

    #[serde(default = "default_hugo_base_url")]
    pub base_url: String,

    #[serde(default = "default_hugo_port")]
    pub port: u16,

    #[serde(default)]
    pub markdown: MarkdownRenderer,
}

fn default_hugo_build_directory() -> PathBuf {
    PathBuf::from("build/hugo")
}

fn default_hugo_base_url() -> String {
    "/".to_string()
}

fn default_hugo_port() -> u16 {
    1313
}

impl Default for HugoRenderer {
    fn default() -> Self {
        Self {
            build_directory: default_hugo_build_directory(),
            title: default_site_name(),
            base_url: default_hugo_base_url(),
            port: default_hugo_port(),
            markdown: MarkdownRenderer::default(),
        }
    }
}

#[derive(Debug, Serialize)]
struct HugoSiteConfig<'a> {
    #[serde(rename = "baseURL")]
    base_url: &'a str,
    title: &'a str,
}

#[derive(Debug, Serialize)]
struct HugoFrontMatter<'a> {
    title: &'a str,
}

impl HugoRenderer {
    pub fn content_directory(&self) -> PathBuf {
        self.build_directory.join("content")
    }
}

impl Renderer for HugoRenderer {
    fn render(&self, fs: &dyn FileSystem, graph: &ModuleGraph) -> Result<()> {
        let front = toml::to_string(&HugoFrontMatter { title: &self.title })?;
        let body = self.markdown.render_to_string(graph);
        let target = self.content_directory().join(&self.markdown.filename);
        fs.write(&target, format!("+++\n{front}+++\n\n{body}").as_bytes())?;

        let site = toml::to_string(&HugoSiteConfig {
            base_url: &self.base_url,
            title: &self.title,
        })?;
        fs.write(&self.build_directory.join("hugo.toml"), site.as_bytes())?;
        Ok(())
    }
}

impl PreviewServer for HugoRenderer {
    fn kind(&self) -> &'static str {
        "hugo"
    }

    fn preview_command(&self) -> PreviewCommand {
        PreviewCommand {
            program: "hugo".to_string(),
            args: vec![
                "server".to_string(),
                "--port".to_string(),
                self.port.to_string(),
            ],
            cwd: self.build_directory.clone(),
            url: format!("http://localhost:{}", self.port),
        }
    }
}

/// Plain `name<TAB>file:line` index of the documented modules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRenderer {
    #[serde(default = "default_listing_filename")]
    pub filename: PathBuf,
}

fn default_listing_filename() -> PathBuf {
    PathBuf::from("modules.txt")
}

impl Default for ListingRenderer {
    fn default() -> Self {
        Self {
            filename: default_listing_filename(),
        }
    }
}

impl Renderer for ListingRenderer {
    fn render(&self, fs: &dyn FileSystem, graph: &ModuleGraph) -> Result<()> {
        let mut out = String::new();
        for m in &graph.modules {
            let _ = writeln!(
                out,
                "{}\t{}:{}",
                m.name,
                m.location.filename.display(),
                m.location.lineno
            );
        }
        fs.write(&self.filename, out.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::pipeline::graph::Module;

    fn graph() -> ModuleGraph {
        let mut g = ModuleGraph::new();
        g.insert(Module::new("pkg", "/s/pkg/__init__.py").with_docstring("Package."));
        g.insert(Module::new("pkg.a", "/s/pkg/a.py"));
        g
    }

    #[test]
    fn markdown_toc_is_optional() {
        let mut r = MarkdownRenderer::default();
        let plain = r.render_to_string(&graph());
        assert!(!plain.contains("Table of Contents"));
        assert!(plain.contains("# pkg.a"));

        r.set_render_toc(true);
        let toc = r.render_to_string(&graph());
        assert!(toc.starts_with("**Table of Contents**"));
        assert!(toc.contains("  * [pkg.a](#pkg-a)"));
    }

    #[test]
    fn mkdocs_writes_into_build_directory() {
        let fs = MockFileSystem::new();
        let r = MkdocsRenderer {
            build_directory: PathBuf::from("/out"),
            ..MkdocsRenderer::default()
        };
        r.render(&fs, &graph()).unwrap();

        assert!(fs.contents("/out/docs/api.md").unwrap().contains("Package."));
        let yml = fs.contents("/out/mkdocs.yml").unwrap();
        assert!(yml.contains("site_name: API Documentation"));
        assert!(yml.contains("127.0.0.1:8000"));
    }

    #[test]
    fn hugo_page_has_front_matter() {
        let fs = MockFileSystem::new();
        let r = HugoRenderer {
            build_directory: PathBuf::from("/site"),
            ..HugoRenderer::default()
        };
        r.render(&fs, &graph()).unwrap();

        let page = fs.contents("/site/content/api.md").unwrap();
        assert!(page.starts_with("+++\ntitle = \"API Documentation\"\n+++"));
        assert!(fs.contents("/site/hugo.toml").unwrap().contains("baseURL = \"/\""));
    }

    #[test]
    fn capabilities_follow_renderer_kind() {
        let md = RendererConfig::default();
        assert!(md.as_markdown().is_some());
        assert!(md.markdown_fields().is_empty());
        assert!(md.as_preview_server().is_none());

        let mk = RendererConfig::Mkdocs(MkdocsRenderer::default());
        assert!(mk.as_markdown().is_none());
        assert_eq!(mk.markdown_fields().len(), 1);
        let cmd = mk.as_preview_server().unwrap().preview_command();
        assert_eq!(cmd.program, "mkdocs");
        assert_eq!(cmd.url, "http://localhost:8000");

        let listing = RendererConfig::Listing(ListingRenderer::default());
        assert!(listing.as_markdown().is_none());
        assert!(listing.markdown_fields().is_empty());
    }
}
