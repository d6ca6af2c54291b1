//! Subprocess execution with per-invocation timeouts.

use std::process::Stdio;
use std::time::{Duration, Instant};

use crucible_core::ToolError;
use tokio::process::Command;
use tracing::debug;

use crate::tool::ToolCommand;

/// Captured output of one tool invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Exit code (-1 when killed by a signal).
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// stdout and stderr joined, for human-readable reports.
    pub fn combined(&self) -> String {
        match (self.stdout.trim().is_empty(), self.stderr.trim().is_empty()) {
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr.trim_end()),
            (false, true) => self.stdout.trim_end().to_string(),
            (true, _) => self.stderr.trim_end().to_string(),
        }
    }
}

pub struct ToolRunner;

impl ToolRunner {
    /// Run `cmd` to completion.
    ///
    /// A non-zero exit is not an error here; most analysis tools use exit
    /// codes to signal findings. Spawn failures and timeouts are.
    pub async fn execute(cmd: &ToolCommand) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        let tool = cmd.tool.name().to_string();

        let Some((exe, args)) = cmd.command.split_first() else {
            return Err(ToolError::Unavailable {
                tool,
                reason: "empty command".to_string(),
            });
        };

        let mut command = Command::new(exe);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &cmd.current_dir {
            command.current_dir(dir);
        }

        let child = command.spawn().map_err(|e| ToolError::Unavailable {
            tool: tool.clone(),
            reason: e.to_string(),
        })?;

        let waited = if cmd.timeout_secs > 0 {
            tokio::time::timeout(
                Duration::from_secs(cmd.timeout_secs),
                child.wait_with_output(),
            )
            .await
            .map_err(|_| ToolError::Timeout {
                tool: tool.clone(),
                secs: cmd.timeout_secs,
            })?
        } else {
            child.wait_with_output().await
        };
        let output = waited.map_err(|e| ToolError::Unavailable {
            tool: tool.clone(),
            reason: e.to_string(),
        })?;

        let result = ToolOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration_ms: start.elapsed().as_millis() as u64,
        };
        debug!(tool = %tool, exit_code = result.exit_code, duration_ms = result.duration_ms, "tool finished");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::BuiltinTool;

    fn custom(command: &[&str], timeout_secs: u64) -> ToolCommand {
        ToolCommand {
            tool: BuiltinTool::Pylint,
            command: command.iter().map(|s| s.to_string()).collect(),
            current_dir: None,
            timeout_secs,
        }
    }

    #[tokio::test]
    async fn test_execute_simple_command() {
        let out = ToolRunner::execute(&custom(&["echo", "hello"], 60)).await.unwrap();
        assert!(out.success());
        assert!(out.stdout.contains("hello"));
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_not_an_error() {
        let out = ToolRunner::execute(&custom(&["false"], 60)).await.unwrap();
        assert!(!out.success());
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let err = ToolRunner::execute(&custom(&["definitely-not-a-real-tool-xyz"], 60))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn test_timeout_is_tool_error() {
        let err = ToolRunner::execute(&custom(&["sleep", "5"], 1)).await.unwrap_err();
        assert_eq!(
            err,
            ToolError::Timeout {
                tool: "pylint".to_string(),
                secs: 1
            }
        );
    }

    #[test]
    fn test_combined_output() {
        let out = ToolOutput {
            exit_code: 1,
            stdout: "a\n".to_string(),
            stderr: "b\n".to_string(),
            duration_ms: 1,
        };
        assert_eq!(out.combined(), "a\nb");
    }
}
