//! Tool definitions and command construction.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Builtin analysis tools.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinTool {
    /// pylint <file> --disable=C0114,C0115,C0116
    Pylint,

    /// bandit -f json -q [-r] <path>
    Bandit,

    /// radon cc -s -j <file>
    Radon,

    /// python3 -m pytest -q <test file>
    Pytest,
}

impl BuiltinTool {
    pub const ALL: [BuiltinTool; 4] = [
        BuiltinTool::Pylint,
        BuiltinTool::Bandit,
        BuiltinTool::Radon,
        BuiltinTool::Pytest,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BuiltinTool::Pylint => "pylint",
            BuiltinTool::Bandit => "bandit",
            BuiltinTool::Radon => "radon",
            BuiltinTool::Pytest => "pytest",
        }
    }

    /// Executable plus the leading arguments every invocation shares.
    pub fn base_command(&self) -> Vec<String> {
        let parts: &[&str] = match self {
            BuiltinTool::Pylint => &["pylint", "--disable=C0114,C0115,C0116"],
            BuiltinTool::Bandit => &["bandit", "-f", "json", "-q"],
            BuiltinTool::Radon => &["radon", "cc", "-s", "-j"],
            BuiltinTool::Pytest => &["python3", "-m", "pytest", "-q"],
        };
        parts.iter().map(|s| s.to_string()).collect()
    }

    /// Command that prints the tool version, used for availability probes.
    pub fn version_command(&self) -> Vec<String> {
        let parts: &[&str] = match self {
            BuiltinTool::Pylint => &["pylint", "--version"],
            BuiltinTool::Bandit => &["bandit", "--version"],
            BuiltinTool::Radon => &["radon", "--version"],
            BuiltinTool::Pytest => &["python3", "-m", "pytest", "--version"],
        };
        parts.iter().map(|s| s.to_string()).collect()
    }
}

impl std::fmt::Display for BuiltinTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A fully specified tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCommand {
    pub tool: BuiltinTool,

    /// Command to execute (first element is the executable).
    pub command: Vec<String>,

    pub current_dir: Option<PathBuf>,

    /// Timeout in seconds. Zero disables the timeout.
    pub timeout_secs: u64,
}

impl ToolCommand {
    pub fn new(tool: BuiltinTool, timeout_secs: u64) -> Self {
        Self {
            tool,
            command: tool.base_command(),
            current_dir: None,
            timeout_secs,
        }
    }

    pub fn version(tool: BuiltinTool, timeout_secs: u64) -> Self {
        Self {
            command: tool.version_command(),
            ..Self::new(tool, timeout_secs)
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.command.push(arg.into());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }
}
