//! Style scoring with pylint.

use std::path::Path;

use async_trait::async_trait;
use crucible_core::{StyleAnalyzer, StyleReport, ToolError};
use regex::Regex;

use crate::runner::ToolRunner;
use crate::tool::{BuiltinTool, ToolCommand};
use crate::toolchain::write_scratch;

const CANDIDATE_FILE: &str = "candidate.py";

/// Runs pylint on a scratch copy of the content and reads back the
/// "rated at X/10" score.
#[derive(Debug, Clone)]
pub struct PylintAnalyzer {
    timeout_secs: u64,
}

impl PylintAnalyzer {
    pub fn new(timeout_secs: u64) -> Self {
        Self { timeout_secs }
    }
}

/// Extract the score from pylint's text report.
pub fn parse_score(report: &str) -> Option<f32> {
    let re = Regex::new(r"rated at (-?\d+(?:\.\d+)?)/10").ok()?;
    re.captures_iter(report)
        .last()
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

#[async_trait]
impl StyleAnalyzer for PylintAnalyzer {
    async fn analyze(&self, content: &str) -> Result<StyleReport, ToolError> {
        let tool = BuiltinTool::Pylint;
        let (dir, _file) = write_scratch(tool, CANDIDATE_FILE, content).await?;
        let cmd = ToolCommand::new(tool, self.timeout_secs)
            .arg(CANDIDATE_FILE)
            .current_dir(dir.path());
        let output = ToolRunner::execute(&cmd).await?;

        // pylint signals findings through its exit code; only the score matters.
        let report = output.combined();
        match parse_score(&report) {
            Some(score) => Ok(StyleReport { score, report }),
            None if content.trim().is_empty() => Ok(StyleReport {
                score: 10.0,
                report,
            }),
            None => Err(ToolError::Unparseable {
                tool: tool.name().to_string(),
                reason: format!("no score in output (exit {})", output.exit_code),
            }),
        }
    }

    fn supports(&self, path: &Path) -> bool {
        path.extension().and_then(|e| e.to_str()) == Some("py")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = "************* Module candidate\n\
        candidate.py:3:0: W0611: Unused import os (unused-import)\n\
        \n\
        ------------------------------------------------------------------\n\
        Your code has been rated at 6.67/10 (previous run: 5.00/10, +1.67)\n";

    #[test]
    fn test_parse_score() {
        assert_eq!(parse_score(REPORT), Some(6.67));
        assert_eq!(parse_score("Your code has been rated at 10.00/10"), Some(10.0));
        assert_eq!(parse_score("Your code has been rated at -2.50/10"), Some(-2.5));
    }

    #[test]
    fn test_parse_score_missing() {
        assert_eq!(parse_score("No module named pylint"), None);
    }

    #[test]
    fn test_supports_python_only() {
        let pylint = PylintAnalyzer::new(90);
        assert!(pylint.supports(Path::new("pkg/main.py")));
        assert!(!pylint.supports(Path::new("README.md")));
        assert!(!pylint.supports(Path::new("Makefile")));
    }
}
