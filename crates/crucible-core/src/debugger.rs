//! DEBUG phase: a lint-detect/fix loop per generated unit, style gate only.
//!
//! Unresolved units are reported, never fatal. A tool fault (e.g. the linter
//! is missing) stops the unit's loop at once since retrying cannot help.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::collaborators::{CompletionService, StyleAnalyzer};
use crate::domain::{DebugReport, StyleReport, ToolError, UnitDebugOutcome};
use crate::metrics::METRICS;
use crate::prompts;

pub struct Debugger {
    completion: Arc<dyn CompletionService>,
    style: Arc<dyn StyleAnalyzer>,
    min_style_score: f32,
    max_attempts: u32,
}

enum Check {
    Clean,
    Dirty(StyleReport),
    ToolFault(ToolError),
}

impl Debugger {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        style: Arc<dyn StyleAnalyzer>,
        min_style_score: f32,
        max_attempts: u32,
    ) -> Self {
        Self {
            completion,
            style,
            min_style_score,
            max_attempts,
        }
    }

    async fn check(&self, content: &str) -> Check {
        match self.style.analyze(content).await {
            Ok(report) if report.score >= self.min_style_score => Check::Clean,
            Ok(report) => Check::Dirty(report),
            Err(e) => Check::ToolFault(e),
        }
    }

    /// Debug every unit in `paths` (relative to `root`) that the analyzer supports.
    pub async fn debug_all(&self, root: &Path, paths: &[PathBuf]) -> DebugReport {
        let mut report = DebugReport::default();
        for path in paths.iter().filter(|p| self.style.supports(p)) {
            report.units.push(self.debug_unit(root, path).await);
        }
        report
    }

    #[instrument(skip(self, root, path), fields(path = %path.display()))]
    pub async fn debug_unit(&self, root: &Path, path: &Path) -> UnitDebugOutcome {
        let outcome = self.fix_loop(&root.join(path), path).await;
        info!(
            resolved = outcome.resolved,
            fixes = outcome.fix_attempts,
            detail = outcome.last_detail.as_deref().unwrap_or(""),
            "unit debugged"
        );
        outcome
    }

    async fn fix_loop(&self, full: &Path, path: &Path) -> UnitDebugOutcome {
        let mut outcome = UnitDebugOutcome {
            path: path.to_path_buf(),
            resolved: false,
            fix_attempts: 0,
            last_detail: None,
        };
        let mut content = match tokio::fs::read_to_string(full).await {
            Ok(content) => content,
            Err(e) => {
                outcome.last_detail = Some(format!("cannot read unit: {e}"));
                return outcome;
            }
        };

        while outcome.fix_attempts < self.max_attempts {
            let report = match self.check(&content).await {
                Check::Clean => {
                    outcome.resolved = true;
                    return outcome;
                }
                Check::Dirty(report) => report,
                Check::ToolFault(e) => {
                    warn!(error = %e, "linter unavailable, skipping unit");
                    outcome.last_detail = Some(e.to_string());
                    return outcome;
                }
            };
            outcome.last_detail = Some(format!("score {:.2}: {}", report.score, report.report));

            METRICS.inc_generation_calls();
            let prompt = prompts::lint_fix_prompt(path, &content, &report.report);
            let fixed = match self.completion.complete(&prompt, false).await {
                Ok(raw) => prompts::extract_code(&raw),
                Err(e) => {
                    outcome.last_detail = Some(format!("fix request failed: {e}"));
                    return outcome;
                }
            };
            outcome.fix_attempts += 1;
            if fixed.is_empty() {
                continue;
            }
            if let Err(e) = tokio::fs::write(full, &fixed).await {
                outcome.last_detail = Some(format!("cannot write fix: {e}"));
                return outcome;
            }
            content = fixed;
        }

        match self.check(&content).await {
            Check::Clean => {
                outcome.resolved = true;
                outcome.last_detail = None;
            }
            Check::Dirty(report) => {
                outcome.last_detail = Some(format!("score {:.2}: {}", report.score, report.report));
            }
            Check::ToolFault(e) => outcome.last_detail = Some(e.to_string()),
        }
        outcome
    }
}
