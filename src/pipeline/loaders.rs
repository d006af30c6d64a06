// src/pipeline/loaders.rs

//! Built-in loaders.
//!
//! - `python`: resolves dotted module names against a search path and
//!   records each module's leading docstring. Exposes [`ModuleLoader`], so
//!   `--module`, `--search-path` and the legacy-syntax toggle apply to it.
//! - `pages`: adds standalone Markdown files verbatim. It has no notion of
//!   modules and is skipped by loader overrides.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::fs::{absolutize, FileSystem};
use crate::pipeline::graph::{Module, ModuleGraph};
use crate::pipeline::Loader;

/// Capability of loaders that document named modules from a search path.
pub trait ModuleLoader {
    fn modules(&self) -> &[String];
    fn modules_mut(&mut self) -> &mut Vec<String>;
    fn search_path(&self) -> &[PathBuf];
    fn search_path_mut(&mut self) -> &mut Vec<PathBuf>;
    fn legacy_syntax(&self) -> bool;
    fn set_legacy_syntax(&mut self, enabled: bool);
}

/// `[[loaders]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LoaderConfig {
    Python(PythonLoader),
    Pages(PagesLoader),
}

impl LoaderConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            LoaderConfig::Python(_) => "python",
            LoaderConfig::Pages(_) => "pages",
        }
    }

    pub fn as_module_loader(&self) -> Option<&dyn ModuleLoader> {
        match self {
            LoaderConfig::Python(l) => Some(l),
            LoaderConfig::Pages(_) => None,
        }
    }

    pub fn as_module_loader_mut(&mut self) -> Option<&mut dyn ModuleLoader> {
        match self {
            LoaderConfig::Python(l) => Some(l),
            LoaderConfig::Pages(_) => None,
        }
    }
}

impl Loader for LoaderConfig {
    fn load(&self, fs: &dyn FileSystem, graph: &mut ModuleGraph) -> Result<()> {
        match self {
            LoaderConfig::Python(l) => l.load(fs, graph),
            LoaderConfig::Pages(l) => l.load(fs, graph),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PythonLoader {
    /// Modules or packages to document. Empty means every top-level module
    /// and package found in the search path.
    #[serde(default)]
    pub modules: Vec<String>,

    #[serde(default = "default_search_path")]
    pub search_path: Vec<PathBuf>,

    /// Accept sources written for the legacy interpreter: files are decoded
    /// lossily instead of requiring UTF-8.
    #[serde(default)]
    pub legacy_syntax: bool,
}

fn default_search_path() -> Vec<PathBuf> {
    vec![PathBuf::from(".")]
}

impl Default for PythonLoader {
    fn default() -> Self {
        Self {
            modules: Vec::new(),
            search_path: default_search_path(),
            legacy_syntax: false,
        }
    }
}

impl ModuleLoader for PythonLoader {
    fn modules(&self) -> &[String] {
        &self.modules
    }

    fn modules_mut(&mut self) -> &mut Vec<String> {
        &mut self.modules
    }

    fn search_path(&self) -> &[PathBuf] {
        &self.search_path
    }

    fn search_path_mut(&mut self) -> &mut Vec<PathBuf> {
        &mut self.search_path
    }

    fn legacy_syntax(&self) -> bool {
        self.legacy_syntax
    }

    fn set_legacy_syntax(&mut self, enabled: bool) {
        self.legacy_syntax = enabled;
    }
}

impl Loader for PythonLoader {
    fn load(&self, fs: &dyn FileSystem, graph: &mut ModuleGraph) -> Result<()> {
        let names = if self.modules.is_empty() {
            self.discover_top_level(fs)?
        } else {
            self.modules.clone()
        };

        for name in names {
            let (path, is_package) = self
                .resolve(fs, &name)
                .with_context(|| format!("resolving module '{name}'"))?;
            self.load_file(fs, &name, &path, graph)?;
            if is_package {
                let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
                self.load_package_children(fs, &name, &dir, graph)?;
            }
        }
        Ok(())
    }
}

impl PythonLoader {
    /// Find the file backing `name`. Returns the path and whether it is a
    /// package (`__init__.py`).
    fn resolve(&self, fs: &dyn FileSystem, name: &str) -> Result<(PathBuf, bool)> {
        let rel: PathBuf = name.split('.').collect();
        for dir in &self.search_path {
            let file = dir.join(&rel).with_extension("py");
            if fs.is_file(&file) {
                return Ok((file, false));
            }
            let init = dir.join(&rel).join("__init__.py");
            if fs.is_file(&init) {
                return Ok((init, true));
            }
        }
        bail!(
            "module '{}' not found in search path {:?}",
            name,
            self.search_path
        )
    }

    fn discover_top_level(&self, fs: &dyn FileSystem) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for dir in &self.search_path {
            if !fs.is_dir(dir) {
                debug!(dir = ?dir, "search path entry is not a directory; skipping");
                continue;
            }
            for entry in fs.read_dir(dir)? {
                if let Some(name) = module_name_of(fs, &entry) {
                    if !names.contains(&name) {
                        names.push(name);
                    }
                }
            }
        }
        Ok(names)
    }

    fn load_package_children(
        &self,
        fs: &dyn FileSystem,
        package: &str,
        dir: &Path,
        graph: &mut ModuleGraph,
    ) -> Result<()> {
        for entry in fs.read_dir(dir)? {
            let Some(child) = module_name_of(fs, &entry) else {
                continue;
            };
            let name = format!("{package}.{child}");
            if fs.is_dir(&entry) {
                let init = entry.join("__init__.py");
                self.load_file(fs, &name, &init, graph)?;
                self.load_package_children(fs, &name, &entry, graph)?;
            } else {
                self.load_file(fs, &name, &entry, graph)?;
            }
        }
        Ok(())
    }

    fn load_file(
        &self,
        fs: &dyn FileSystem,
        name: &str,
        path: &Path,
        graph: &mut ModuleGraph,
    ) -> Result<()> {
        let source = if self.legacy_syntax {
            String::from_utf8_lossy(&fs.read(path)?).into_owned()
        } else {
            fs.read_to_string(path)?
        };

        let mut module = Module::new(name, absolutize(fs, path));
        if let Some((lineno, doc)) = leading_docstring(&source) {
            module.location.lineno = lineno;
            module.docstring = Some(doc);
        }
        debug!(module = %name, path = ?path, "loaded module");
        graph.insert(module);
        Ok(())
    }
}

/// Module name for a directory entry: `foo.py` -> `foo`, `foo/` with an
/// `__init__.py` -> `foo`. Private (`_x`) and dunder files are skipped.
fn module_name_of(fs: &dyn FileSystem, entry: &Path) -> Option<String> {
    let file_name = entry.file_name()?.to_str()?;
    if file_name.starts_with('_') || file_name.starts_with('.') {
        return None;
    }
    if fs.is_dir(entry) {
        return fs
            .is_file(&entry.join("__init__.py"))
            .then(|| file_name.to_string());
    }
    file_name.strip_suffix(".py").map(str::to_string)
}

/// Extract the module docstring: the first triple-quoted string, allowing
/// only blank lines and `#` comments before it. Returns the 1-based line
/// where it starts.
pub fn leading_docstring(source: &str) -> Option<(usize, String)> {
    let mut lines = source.lines().enumerate();
    let (start, first) = loop {
        let (idx, line) = lines.next()?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        break (idx, trimmed);
    };

    let body = first.trim_start_matches(['r', 'R', 'u', 'U']);
    let quote = ["\"\"\"", "'''"].into_iter().find(|q| body.starts_with(q))?;
    let rest = &body[quote.len()..];

    if let Some(end) = rest.find(quote) {
        return Some((start + 1, rest[..end].trim().to_string()));
    }

    let mut doc = vec![rest.to_string()];
    for (_, line) in lines {
        if let Some(end) = line.find(quote) {
            doc.push(line[..end].to_string());
            return Some((start + 1, dedent(&doc.join("\n"))));
        }
        doc.push(line.to_string());
    }
    // Unterminated: not a docstring we can trust.
    None
}

fn dedent(text: &str) -> String {
    let indent = text
        .lines()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .map(leading_blanks)
        .min()
        .unwrap_or(0);
    let mut out: Vec<&str> = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if i == 0 {
            out.push(line.trim());
        } else {
            // Only ASCII blanks are cut, so the slice stays on a char boundary.
            out.push(&line[leading_blanks(line).min(indent)..]);
        }
    }
    out.join("\n").trim().to_string()
}

/// Number of leading spaces and tabs.
fn leading_blanks(line: &str) -> usize {
    line.bytes().take_while(|b| matches!(b, b' ' | b'\t')).count()
}

/// Standalone Markdown pages added to the graph as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PagesLoader {
    pub files: Vec<PathBuf>,
}

impl Loader for PagesLoader {
    fn load(&self, fs: &dyn FileSystem, graph: &mut ModuleGraph) -> Result<()> {
        for file in &self.files {
            let content = fs.read_to_string(file)?;
            let name = file
                .file_stem()
                .and_then(|s| s.to_str())
                .with_context(|| format!("page {:?} has no usable file name", file))?;
            graph.insert(Module::new(name, absolutize(fs, file)).with_docstring(content));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn project() -> MockFileSystem {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/pkg/__init__.py", "\"\"\"The package.\"\"\"\n");
        fs.add_file("/p/src/pkg/a.py", "# header\n\n\"\"\"\nModule A.\n\n    indented\n\"\"\"\nx = 1\n");
        fs.add_file("/p/src/pkg/_private.py", "");
        fs.add_file("/p/src/tool.py", "print('no doc')\n");
        fs
    }

    fn loader(modules: &[&str]) -> PythonLoader {
        PythonLoader {
            modules: modules.iter().map(|s| s.to_string()).collect(),
            search_path: vec![PathBuf::from("/p/src")],
            legacy_syntax: false,
        }
    }

    #[test]
    fn loads_single_module_with_docstring() {
        let fs = project();
        let mut graph = ModuleGraph::new();
        loader(&["pkg.a"]).load(&fs, &mut graph).unwrap();

        assert_eq!(graph.len(), 1);
        let a = graph.get("pkg.a").unwrap();
        assert_eq!(a.location.filename, PathBuf::from("/p/src/pkg/a.py"));
        assert_eq!(a.location.lineno, 3);
        assert_eq!(a.docstring.as_deref(), Some("Module A.\n\n    indented"));
    }

    #[test]
    fn package_pulls_in_public_submodules() {
        let fs = project();
        let mut graph = ModuleGraph::new();
        loader(&["pkg"]).load(&fs, &mut graph).unwrap();

        assert_eq!(graph.names().collect::<Vec<_>>(), vec!["pkg", "pkg.a"]);
        assert_eq!(graph.get("pkg").unwrap().docstring.as_deref(), Some("The package."));
    }

    #[test]
    fn empty_module_list_discovers_top_level() {
        let fs = project();
        let mut graph = ModuleGraph::new();
        loader(&[]).load(&fs, &mut graph).unwrap();

        let mut names: Vec<_> = graph.names().collect();
        names.sort();
        assert_eq!(names, vec!["pkg", "pkg.a", "tool"]);
        assert!(graph.get("tool").unwrap().docstring.is_none());
    }

    #[test]
    fn unknown_module_is_an_error() {
        let fs = project();
        let err = loader(&["nope"]).load(&fs, &mut ModuleGraph::new()).unwrap_err();
        assert!(format!("{err:#}").contains("module 'nope' not found"));
    }

    #[test]
    fn legacy_syntax_tolerates_non_utf8() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/old.py", b"\"\"\"caf\xe9\"\"\"\n".to_vec());

        let mut strict = loader(&["old"]);
        strict.search_path = vec![PathBuf::from("/p")];
        assert!(strict.load(&fs, &mut ModuleGraph::new()).is_err());

        strict.set_legacy_syntax(true);
        let mut graph = ModuleGraph::new();
        strict.load(&fs, &mut graph).unwrap();
        assert!(graph.get("old").unwrap().docstring.as_deref().unwrap().starts_with("caf"));
    }

    #[test]
    fn docstring_with_unicode_indentation_is_kept_intact() {
        let (_, doc) =
            leading_docstring("\"\"\"Title\n    body\n  \u{3000}x\n\"\"\"\n").unwrap();
        assert_eq!(doc, "Title\n  body\n\u{3000}x");
    }

    #[test]
    fn module_with_unicode_indented_docstring_loads() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/wide.py", "\"\"\"\n\u{3000}\u{3000}全角\n    ascii\n\"\"\"\n");
        let mut graph = ModuleGraph::new();
        let mut l = loader(&["wide"]);
        l.search_path = vec![PathBuf::from("/p")];
        l.load(&fs, &mut graph).unwrap();
        assert!(graph.get("wide").unwrap().docstring.as_deref().unwrap().contains("全角"));
    }

    #[test]
    fn pages_loader_keeps_content() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/README.md", "# Hello\n");
        let pages = PagesLoader {
            files: vec![PathBuf::from("/p/README.md")],
        };
        let mut graph = ModuleGraph::new();
        pages.load(&fs, &mut graph).unwrap();
        assert_eq!(graph.get("README").unwrap().docstring.as_deref(), Some("# Hello\n"));
    }
}
