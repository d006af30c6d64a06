// src/watch/watch_set.rs

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Absolute paths whose modification should trigger a rebuild.
///
/// Recomputed from scratch after every successful pipeline run; never
/// merged with a previous set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchSet {
    paths: BTreeSet<PathBuf>,
}

impl WatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>) -> bool {
        self.paths.insert(path.into())
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }

    /// Distinct parent directories, which is what the watcher registers.
    pub fn directories(&self) -> BTreeSet<PathBuf> {
        self.paths
            .iter()
            .filter_map(|p| p.parent().map(Path::to_path_buf))
            .collect()
    }
}

impl<P: Into<PathBuf>> FromIterator<P> for WatchSet {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deduplicates_and_lists_directories() {
        let set: WatchSet = ["/p/a.py", "/p/a.py", "/p/sub/b.py"].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains(Path::new("/p/sub/b.py")));
        let dirs: Vec<_> = set.directories().into_iter().collect();
        assert_eq!(dirs, vec![PathBuf::from("/p"), PathBuf::from("/p/sub")]);
    }
}
