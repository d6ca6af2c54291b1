//! Per-run accumulation of structural summaries.

use std::path::{Path, PathBuf};

/// Summaries of already-generated files, in the order they were written.
///
/// Owned by a single materialization run. Each path can be recorded once;
/// later generation calls only ever see summaries of files produced before
/// them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactContext {
    entries: Vec<(PathBuf, String)>,
}

impl ArtifactContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the summary for `path`. Returns `false` (and keeps the first
    /// summary) if the path was already recorded.
    pub fn insert(&mut self, path: impl Into<PathBuf>, summary: impl Into<String>) -> bool {
        let path = path.into();
        if self.contains(&path) {
            return false;
        }
        self.entries.push((path, summary.into()));
        true
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.iter().any(|(p, _)| p == path)
    }

    pub fn get(&self, path: &Path) -> Option<&str> {
        self.entries
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, s)| s.as_str())
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(|(p, _)| p.as_path())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render as `--- File: <path> ---` blocks for inclusion in prompts.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|(path, summary)| format!("--- File: {} ---\n{}", path.display(), summary))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
