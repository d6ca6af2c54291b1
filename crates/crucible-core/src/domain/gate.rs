//! Gate results produced by the validation battery.

use serde::{Deserialize, Serialize};

use crate::domain::error::{CollaboratorError, ToolError};

/// The kind of check that produced a [`GateResult`].
///
/// `Generation` is not part of the battery; the retry loop uses it to record
/// an attempt whose content could not be generated at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateKind {
    Style,
    Security,
    Complexity,
    Test,
    Generation,
}

impl GateKind {
    /// Battery gates in evaluation order.
    pub const BATTERY: [GateKind; 4] = [
        GateKind::Style,
        GateKind::Security,
        GateKind::Complexity,
        GateKind::Test,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            GateKind::Style => "style",
            GateKind::Security => "security",
            GateKind::Complexity => "complexity",
            GateKind::Test => "test",
            GateKind::Generation => "generation",
        }
    }
}

impl std::fmt::Display for GateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Structured pass/fail outcome of one gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateResult {
    pub kind: GateKind,
    pub passed: bool,
    /// Human-readable detail. Fed back verbatim as corrective input on failure.
    pub detail: String,
    /// Machine-readable report from the underlying tool, when one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<serde_json::Value>,
    /// The failure came from the tool itself rather than from the content.
    #[serde(default)]
    pub tool_failure: bool,
}

impl GateResult {
    pub fn pass(kind: GateKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            passed: true,
            detail: detail.into(),
            report: None,
            tool_failure: false,
        }
    }

    pub fn fail(kind: GateKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            passed: false,
            detail: detail.into(),
            report: None,
            tool_failure: false,
        }
    }

    /// A failing result describing a tool fault.
    pub fn tool_failure(kind: GateKind, err: &ToolError) -> Self {
        Self {
            kind,
            passed: false,
            detail: format!("{kind} gate could not run: {err}"),
            report: None,
            tool_failure: true,
        }
    }

    /// A failing result describing a generative-service fault.
    pub fn collaborator_failure(kind: GateKind, err: &CollaboratorError) -> Self {
        Self {
            kind,
            passed: false,
            detail: format!("{kind} failed: {err}"),
            report: None,
            tool_failure: true,
        }
    }

    pub fn with_report(mut self, report: serde_json::Value) -> Self {
        self.report = Some(report);
        self
    }
}
