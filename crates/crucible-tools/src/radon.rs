//! Cyclomatic complexity with radon.

use async_trait::async_trait;
use crucible_core::{ComplexityAnalyzer, ComplexityReport, ComplexityUnit, ToolError};
use serde_json::Value;

use crate::runner::ToolRunner;
use crate::tool::{BuiltinTool, ToolCommand};
use crate::toolchain::write_scratch;

const CANDIDATE_FILE: &str = "candidate.py";

fn unparseable(reason: impl Into<String>) -> ToolError {
    ToolError::Unparseable {
        tool: BuiltinTool::Radon.name().to_string(),
        reason: reason.into(),
    }
}

fn push_block(block: &Value, units: &mut Vec<ComplexityUnit>) {
    let Some(name) = block.get("name").and_then(Value::as_str) else {
        return;
    };
    let complexity = block.get("complexity").and_then(Value::as_u64).unwrap_or(0) as u32;
    let name = match block.get("classname").and_then(Value::as_str) {
        Some(class) if !class.is_empty() => format!("{class}.{name}"),
        _ => name.to_string(),
    };
    if !units.iter().any(|u| u.name == name) {
        units.push(ComplexityUnit { name, complexity });
    }
    if let Some(methods) = block.get("methods").and_then(Value::as_array) {
        for method in methods {
            push_block(method, units);
        }
    }
}

/// Parse `radon cc -j` output: a map from file name to a list of blocks, or
/// to `{"error": ...}` when radon could not parse the file.
pub fn parse_report(stdout: &str) -> Result<ComplexityReport, ToolError> {
    let body = stdout.trim();
    if body.is_empty() {
        return Ok(ComplexityReport::default());
    }
    let files: serde_json::Map<String, Value> =
        serde_json::from_str(body).map_err(|e| unparseable(e.to_string()))?;

    let mut units = Vec::new();
    for (file, blocks) in files {
        match blocks {
            Value::Array(blocks) => blocks.iter().for_each(|b| push_block(b, &mut units)),
            Value::Object(obj) => {
                let reason = obj
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("unexpected report shape");
                return Err(unparseable(format!("{file}: {reason}")));
            }
            _ => return Err(unparseable(format!("{file}: unexpected report shape"))),
        }
    }
    Ok(ComplexityReport { units })
}

#[derive(Debug, Clone)]
pub struct RadonAnalyzer {
    timeout_secs: u64,
}

impl RadonAnalyzer {
    pub fn new(timeout_secs: u64) -> Self {
        Self { timeout_secs }
    }
}

#[async_trait]
impl ComplexityAnalyzer for RadonAnalyzer {
    async fn analyze(&self, content: &str) -> Result<ComplexityReport, ToolError> {
        let tool = BuiltinTool::Radon;
        let (dir, _file) = write_scratch(tool, CANDIDATE_FILE, content).await?;
        let cmd = ToolCommand::new(tool, self.timeout_secs)
            .arg(CANDIDATE_FILE)
            .current_dir(dir.path());
        let output = ToolRunner::execute(&cmd).await?;
        if !output.success() {
            return Err(ToolError::Unavailable {
                tool: tool.name().to_string(),
                reason: output.combined(),
            });
        }
        parse_report(&output.stdout)
    }
}
