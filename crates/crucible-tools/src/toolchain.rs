//! Assembles the Python tools into a core `Toolchain` and probes availability.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crucible_core::{Toolchain, ToolError};
use serde::Serialize;
use tempfile::TempDir;

use crate::bandit::BanditScanner;
use crate::pylint::PylintAnalyzer;
use crate::pytest::PytestRunner;
use crate::radon::RadonAnalyzer;
use crate::runner::ToolRunner;
use crate::tool::{BuiltinTool, ToolCommand};

/// Build a toolchain where every tool invocation is bounded by `timeout_secs`.
pub fn python_toolchain(timeout_secs: u64) -> Toolchain {
    Toolchain {
        style: Arc::new(PylintAnalyzer::new(timeout_secs)),
        security: Arc::new(BanditScanner::new(timeout_secs)),
        complexity: Arc::new(RadonAnalyzer::new(timeout_secs)),
        tests: Arc::new(PytestRunner::new(timeout_secs)),
    }
}

/// Availability of one tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolProbe {
    pub tool: BuiltinTool,
    pub available: bool,
    pub detail: String,
}

/// Run every tool's version command.
pub async fn probe_tools(timeout_secs: u64) -> Vec<ToolProbe> {
    let mut probes = Vec::new();
    for tool in BuiltinTool::ALL {
        let probe = match ToolRunner::execute(&ToolCommand::version(tool, timeout_secs)).await {
            Ok(out) if out.success() => ToolProbe {
                tool,
                available: true,
                detail: out.combined().lines().next().unwrap_or_default().to_string(),
            },
            Ok(out) => ToolProbe {
                tool,
                available: false,
                detail: format!("exit {}: {}", out.exit_code, out.combined()),
            },
            Err(e) => ToolProbe {
                tool,
                available: false,
                detail: e.to_string(),
            },
        };
        probes.push(probe);
    }
    probes
}

pub(crate) fn scratch_dir(tool: BuiltinTool) -> Result<TempDir, ToolError> {
    tempfile::Builder::new()
        .prefix("crucible-")
        .tempdir()
        .map_err(|e| ToolError::Unavailable {
            tool: tool.name().to_string(),
            reason: format!("cannot create scratch directory: {e}"),
        })
}

pub(crate) async fn write_file(tool: BuiltinTool, path: &Path, content: &str) -> Result<(), ToolError> {
    tokio::fs::write(path, content)
        .await
        .map_err(|e| ToolError::Unavailable {
            tool: tool.name().to_string(),
            reason: format!("cannot write {}: {e}", path.display()),
        })
}

/// Write `content` to `file_name` in a fresh scratch directory. The directory
/// is removed when the returned guard drops.
pub(crate) async fn write_scratch(
    tool: BuiltinTool,
    file_name: &str,
    content: &str,
) -> Result<(TempDir, PathBuf), ToolError> {
    let dir = scratch_dir(tool)?;
    let path = dir.path().join(file_name);
    write_file(tool, &path, content).await?;
    Ok((dir, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_scratch_round_trip() {
        let (dir, path) = write_scratch(BuiltinTool::Pylint, "candidate.py", "x = 1\n")
            .await
            .unwrap();
        assert!(path.starts_with(dir.path()));
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "x = 1\n");
    }

    #[tokio::test]
    async fn test_probe_reports_every_tool() {
        let probes = probe_tools(10).await;
        assert_eq!(probes.len(), BuiltinTool::ALL.len());
    }
}
