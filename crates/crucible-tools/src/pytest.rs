//! Executes generated tests with pytest in an isolated scratch package.

use async_trait::async_trait;
use crucible_core::{TestRunReport, TestRunner, ToolError};
use tracing::debug;

use crate::runner::ToolRunner;
use crate::tool::{BuiltinTool, ToolCommand};
use crate::toolchain::{scratch_dir, write_file};

/// Exit code pytest uses for a broken invocation rather than test results.
const USAGE_ERROR: i32 = 4;

#[derive(Debug, Clone)]
pub struct PytestRunner {
    timeout_secs: u64,
}

impl PytestRunner {
    pub fn new(timeout_secs: u64) -> Self {
        Self { timeout_secs }
    }
}

/// `true` when the interpreter could not import pytest at all.
fn pytest_missing(stderr: &str) -> bool {
    stderr.contains("No module named pytest")
}

#[async_trait]
impl TestRunner for PytestRunner {
    async fn run(
        &self,
        source: &str,
        tests: &str,
        module_name: &str,
    ) -> Result<TestRunReport, ToolError> {
        let tool = BuiltinTool::Pytest;
        let dir = scratch_dir(tool)?;
        let test_file = format!("test_{module_name}.py");
        write_file(tool, &dir.path().join("__init__.py"), "").await?;
        write_file(tool, &dir.path().join(format!("{module_name}.py")), source).await?;
        write_file(tool, &dir.path().join(&test_file), tests).await?;

        let cmd = ToolCommand::new(tool, self.timeout_secs)
            .arg(test_file)
            .current_dir(dir.path());
        let output = ToolRunner::execute(&cmd).await?;

        if pytest_missing(&output.stderr) || output.exit_code == USAGE_ERROR {
            return Err(ToolError::Unavailable {
                tool: tool.name().to_string(),
                reason: output.combined(),
            });
        }
        debug!(module = module_name, exit_code = output.exit_code, "pytest finished");
        Ok(TestRunReport {
            passed: output.success(),
            output: output.combined(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pytest_missing_detection() {
        assert!(pytest_missing("/usr/bin/python3: No module named pytest\n"));
        assert!(!pytest_missing("1 failed in 0.02s"));
    }
}
