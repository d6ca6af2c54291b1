//! Writes a plan's file tree to disk, one generated artifact per leaf.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::collaborators::ArtifactGenerator;
use crate::context::ArtifactContext;
use crate::domain::plan::{self, FileTree};
use crate::metrics::METRICS;
use crate::prompts;
use crate::summary;

/// Where and why a traversal stopped early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializeHalt {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct MaterializeReport {
    /// Relative paths written, in traversal order.
    pub written: Vec<PathBuf>,
    pub context: ArtifactContext,
    pub halted: Option<MaterializeHalt>,
}

impl MaterializeReport {
    pub fn succeeded(&self) -> bool {
        self.halted.is_none()
    }
}

pub struct Materializer {
    generator: Arc<dyn ArtifactGenerator>,
}

impl Materializer {
    pub fn new(generator: Arc<dyn ArtifactGenerator>) -> Self {
        Self { generator }
    }

    /// Depth-first traversal of `tree` under `root`.
    ///
    /// Each source file's summary enters the context before the next leaf is
    /// generated. The first failed or empty generation (or write error) halts
    /// the traversal; files already written stay on disk.
    #[instrument(skip(self, tree), fields(root = %root.display()))]
    pub async fn materialize(&self, root: &Path, tree: &FileTree) -> MaterializeReport {
        let mut report = MaterializeReport::default();

        for leaf in plan::leaves(tree) {
            METRICS.inc_generation_calls();
            let generated = self
                .generator
                .generate(&leaf.path, leaf.description, &report.context)
                .await;

            let content = match generated {
                Ok(raw) => prompts::extract_code(&raw),
                Err(e) => {
                    warn!(path = %leaf.path.display(), error = %e, "generation failed");
                    report.halted = Some(MaterializeHalt {
                        path: leaf.path,
                        reason: e.to_string(),
                    });
                    return report;
                }
            };
            if content.is_empty() {
                warn!(path = %leaf.path.display(), "generator returned empty content");
                report.halted = Some(MaterializeHalt {
                    path: leaf.path,
                    reason: "generator returned empty content".to_string(),
                });
                return report;
            }

            if let Err(e) = write_artifact(&root.join(&leaf.path), &content).await {
                report.halted = Some(MaterializeHalt {
                    path: leaf.path,
                    reason: format!("write failed: {e}"),
                });
                return report;
            }
            debug!(path = %leaf.path.display(), bytes = content.len(), "artifact written");

            if let Some(summary) = summary::summarize_path(&leaf.path, &content) {
                report.context.insert(leaf.path.clone(), summary);
            }
            report.written.push(leaf.path);
        }
        report
    }
}

/// Write `content` to `path`, creating parent directories on demand.
async fn write_artifact(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, content).await
}
