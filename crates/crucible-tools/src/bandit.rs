//! Security scanning with bandit.

use std::path::Path;

use async_trait::async_trait;
use crucible_core::{SecurityFinding, SecurityReport, SecurityScanner, ToolError};
use serde::Deserialize;
use tracing::warn;

use crate::runner::ToolRunner;
use crate::tool::{BuiltinTool, ToolCommand};
use crate::toolchain::write_scratch;

const CANDIDATE_FILE: &str = "candidate.py";

#[derive(Debug, Deserialize)]
struct BanditOutput {
    #[serde(default)]
    results: Vec<BanditIssue>,
    #[serde(default)]
    errors: Vec<BanditScanError>,
}

#[derive(Debug, Deserialize)]
struct BanditScanError {
    #[serde(default)]
    filename: String,
    #[serde(default)]
    reason: String,
}

#[derive(Debug, Deserialize)]
struct BanditIssue {
    #[serde(default)]
    filename: String,
    #[serde(default)]
    issue_text: String,
    #[serde(default)]
    issue_severity: String,
    #[serde(default)]
    line_number: Option<u32>,
}

/// Parse bandit's JSON report. Empty output means nothing was found.
pub fn parse_report(stdout: &str) -> Result<SecurityReport, ToolError> {
    let body = stdout.trim();
    if body.is_empty() {
        return Ok(SecurityReport::default());
    }
    // bandit may print progress lines before the JSON document.
    let start = body.find('{').unwrap_or(0);
    let parsed: BanditOutput =
        serde_json::from_str(&body[start..]).map_err(|e| ToolError::Unparseable {
            tool: BuiltinTool::Bandit.name().to_string(),
            reason: e.to_string(),
        })?;

    // A file bandit could not scan is not a clean file.
    if !parsed.errors.is_empty() {
        let reason = parsed
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.filename, e.reason))
            .collect::<Vec<_>>()
            .join("; ");
        return Err(ToolError::Unparseable {
            tool: BuiltinTool::Bandit.name().to_string(),
            reason,
        });
    }

    let findings = parsed
        .results
        .into_iter()
        .map(|issue| SecurityFinding {
            file: issue.filename,
            description: issue.issue_text,
            severity: issue.issue_severity.to_uppercase(),
            line: issue.line_number,
        })
        .collect();
    Ok(SecurityReport { findings })
}

#[derive(Debug, Clone)]
pub struct BanditScanner {
    timeout_secs: u64,
}

impl BanditScanner {
    pub fn new(timeout_secs: u64) -> Self {
        Self { timeout_secs }
    }

    async fn run(&self, cmd: ToolCommand) -> Result<SecurityReport, ToolError> {
        let output = ToolRunner::execute(&cmd).await?;
        // Exit 1 means issues were found; anything above is a bandit fault.
        if output.exit_code > 1 && output.stdout.trim().is_empty() {
            warn!(exit_code = output.exit_code, stderr = %output.stderr.trim(), "bandit failed");
            return Err(ToolError::Unavailable {
                tool: BuiltinTool::Bandit.name().to_string(),
                reason: output.stderr.trim().to_string(),
            });
        }
        parse_report(&output.stdout)
    }
}

#[async_trait]
impl SecurityScanner for BanditScanner {
    async fn scan_content(&self, content: &str) -> Result<SecurityReport, ToolError> {
        let tool = BuiltinTool::Bandit;
        let (dir, _file) = write_scratch(tool, CANDIDATE_FILE, content).await?;
        let cmd = ToolCommand::new(tool, self.timeout_secs)
            .arg(CANDIDATE_FILE)
            .current_dir(dir.path());
        self.run(cmd).await
    }

    async fn scan_path(&self, path: &Path) -> Result<SecurityReport, ToolError> {
        let mut cmd = ToolCommand::new(BuiltinTool::Bandit, self.timeout_secs);
        if path.is_dir() {
            cmd = cmd.arg("-r");
        }
        self.run(cmd.arg(path.display().to_string())).await
    }
}
