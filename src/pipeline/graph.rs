// src/pipeline/graph.rs

//! In-memory symbol graph passed between pipeline stages.

use std::path::PathBuf;

/// Where a module's documentation came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub filename: PathBuf,
    pub lineno: usize,
}

/// A documented unit: a source module or a standalone page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    /// Dotted name (`pkg.sub.mod`) or page name.
    pub name: String,
    pub location: Location,
    /// Documentation text; `None` when the source carries none.
    pub docstring: Option<String>,
}

impl Module {
    pub fn new(name: impl Into<String>, filename: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            location: Location {
                filename: filename.into(),
                lineno: 1,
            },
            docstring: None,
        }
    }

    pub fn with_docstring(mut self, doc: impl Into<String>) -> Self {
        self.docstring = Some(doc.into());
        self
    }

    /// Anchor used for in-page links (`pkg.sub` -> `pkg-sub`).
    pub fn anchor(&self) -> String {
        anchor_for(&self.name)
    }
}

pub fn anchor_for(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c.to_ascii_lowercase() } else { '-' })
        .collect()
}

/// Ordered collection of modules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleGraph {
    pub modules: Vec<Module>,
}

impl ModuleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module; a module with the same name replaces the earlier entry
    /// in place so ordering stays stable.
    pub fn insert(&mut self, module: Module) {
        match self.modules.iter_mut().find(|m| m.name == module.name) {
            Some(existing) => *existing = module,
            None => self.modules.push(module),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(|m| m.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_shadows_same_name_in_place() {
        let mut g = ModuleGraph::new();
        g.insert(Module::new("a", "/a.py"));
        g.insert(Module::new("b", "/b.py"));
        g.insert(Module::new("a", "/other/a.py").with_docstring("new"));

        assert_eq!(g.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(g.get("a").unwrap().location.filename, PathBuf::from("/other/a.py"));
    }

    #[test]
    fn anchors_are_link_safe() {
        assert_eq!(anchor_for("pkg.Sub_mod"), "pkg-sub_mod");
    }
}
