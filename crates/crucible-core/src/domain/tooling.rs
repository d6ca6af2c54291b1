//! Report payloads returned by the analysis tools.

use serde::{Deserialize, Serialize};

/// Style/lint tool output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleReport {
    /// Quality score on a 0-10 scale.
    pub score: f32,
    pub report: String,
}

/// One security finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityFinding {
    pub file: String,
    pub description: String,
    pub severity: String,
    #[serde(default)]
    pub line: Option<u32>,
}

/// Security scan output. Secure iff `findings` is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityReport {
    pub findings: Vec<SecurityFinding>,
}

impl SecurityReport {
    pub fn is_secure(&self) -> bool {
        self.findings.is_empty()
    }

    /// One line per finding, suitable for corrective feedback.
    pub fn render(&self) -> String {
        self.findings
            .iter()
            .map(|f| match f.line {
                Some(line) => format!("[{}] {}:{}: {}", f.severity, f.file, line, f.description),
                None => format!("[{}] {}: {}", f.severity, f.file, f.description),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Cyclomatic complexity of one code unit (function, method, class).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexityUnit {
    pub name: String,
    pub complexity: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexityReport {
    pub units: Vec<ComplexityUnit>,
}

impl ComplexityReport {
    pub fn exceeding(&self, ceiling: u32) -> Vec<&ComplexityUnit> {
        self.units.iter().filter(|u| u.complexity > ceiling).collect()
    }
}

/// Outcome of running generated tests against generated source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRunReport {
    pub passed: bool,
    pub output: String,
}
