//! Terminal pipeline records and the monotonic downgrade tracker.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::gate::GateResult;
use crate::domain::risk::RiskVerdict;
use crate::domain::tooling::{SecurityReport, TestRunReport};

/// Pipeline phases in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelinePhase {
    Plan,
    Simulate,
    GenerateAll,
    Contest,
    Debug,
    Secure,
    Done,
}

impl PipelinePhase {
    pub fn name(&self) -> &'static str {
        match self {
            PipelinePhase::Plan => "plan",
            PipelinePhase::Simulate => "simulate",
            PipelinePhase::GenerateAll => "generate_all",
            PipelinePhase::Contest => "contest",
            PipelinePhase::Debug => "debug",
            PipelinePhase::Secure => "secure",
            PipelinePhase::Done => "done",
        }
    }
}

/// Terminal status, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStatus {
    Success,
    SuccessWithWarnings,
    SuccessWithSecurityWarnings,
    Fail,
}

impl std::fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PipelineStatus::Success => "SUCCESS",
            PipelineStatus::SuccessWithWarnings => "SUCCESS_WITH_WARNINGS",
            PipelineStatus::SuccessWithSecurityWarnings => "SUCCESS_WITH_SECURITY_WARNINGS",
            PipelineStatus::Fail => "FAIL",
        };
        f.write_str(s)
    }
}

/// Lint/fix outcome for one generated unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDebugOutcome {
    pub path: PathBuf,
    pub resolved: bool,
    pub fix_attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_detail: Option<String>,
}

/// Aggregate of the DEBUG phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DebugReport {
    pub units: Vec<UnitDebugOutcome>,
}

impl DebugReport {
    pub fn unresolved(&self) -> impl Iterator<Item = &UnitDebugOutcome> {
        self.units.iter().filter(|u| !u.resolved)
    }

    pub fn all_resolved(&self) -> bool {
        self.units.iter().all(|u| u.resolved)
    }
}

/// Retry-loop outcome for one contested artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContestReport {
    pub path: PathBuf,
    pub passed: bool,
    pub attempts: u32,
    pub gate_reports: Vec<GateResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_report: Option<TestRunReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_failure: Option<GateResult>,
}

/// Structured reports attached to a pipeline result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineReports {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulation: Option<RiskVerdict>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<SecurityReport>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tests: Vec<ContestReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugReport>,
}

/// Terminal record of one pipeline run. Produced once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub run_id: String,
    pub status: PipelineStatus,
    pub reason: String,
    /// Phase the run ended in (`Done` unless it failed early).
    pub phase: PipelinePhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_location: Option<PathBuf>,
    pub reports: PipelineReports,
}

impl PipelineResult {
    pub fn is_success(&self) -> bool {
        self.status != PipelineStatus::Fail
    }
}

/// Accumulates downgrades during a run. Status only ever gets worse.
#[derive(Debug, Clone)]
pub struct Outcome {
    status: PipelineStatus,
    warnings: Vec<String>,
}

impl Default for Outcome {
    fn default() -> Self {
        Self::new()
    }
}

impl Outcome {
    pub fn new() -> Self {
        Self {
            status: PipelineStatus::Success,
            warnings: Vec::new(),
        }
    }

    pub fn status(&self) -> PipelineStatus {
        self.status
    }

    pub fn downgrade(&mut self, to: PipelineStatus, note: impl Into<String>) {
        self.status = self.status.max(to);
        self.warnings.push(note.into());
    }

    /// Human-readable reason for the current status.
    pub fn reason(&self) -> String {
        if self.warnings.is_empty() {
            "pipeline completed".to_string()
        } else {
            format!("pipeline completed with warnings: {}", self.warnings.join("; "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_ordering() {
        assert!(PipelineStatus::Success < PipelineStatus::SuccessWithWarnings);
        assert!(PipelineStatus::SuccessWithWarnings < PipelineStatus::SuccessWithSecurityWarnings);
        assert!(PipelineStatus::SuccessWithSecurityWarnings < PipelineStatus::Fail);
    }

    #[test]
    fn test_downgrade_is_monotonic() {
        let mut outcome = Outcome::new();
        outcome.downgrade(PipelineStatus::SuccessWithSecurityWarnings, "insecure");
        outcome.downgrade(PipelineStatus::SuccessWithWarnings, "lint");
        assert_eq!(outcome.status(), PipelineStatus::SuccessWithSecurityWarnings);
        assert!(outcome.reason().contains("insecure"));
        assert!(outcome.reason().contains("lint"));
    }

    #[test]
    fn test_status_serde_screaming_case() {
        let json = serde_json::to_string(&PipelineStatus::SuccessWithWarnings).unwrap();
        assert_eq!(json, "\"SUCCESS_WITH_WARNINGS\"");
        assert_eq!(
            PipelineStatus::SuccessWithSecurityWarnings.to_string(),
            "SUCCESS_WITH_SECURITY_WARNINGS"
        );
    }
}
