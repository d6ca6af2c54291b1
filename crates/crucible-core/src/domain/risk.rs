//! Risk verdicts returned by the simulator.

use serde::{Deserialize, Serialize};

/// Overall verdict status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerdictStatus {
    #[serde(alias = "pass", alias = "Pass")]
    Pass,
    #[serde(alias = "warning", alias = "Warning")]
    Warning,
    #[serde(alias = "fail", alias = "Fail")]
    Fail,
}

/// Risk severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskSeverity {
    #[serde(alias = "low", alias = "Low")]
    Low,
    #[serde(alias = "medium", alias = "Medium")]
    Medium,
    #[serde(alias = "high", alias = "High")]
    High,
    #[serde(alias = "critical", alias = "Critical")]
    Critical,
}

impl RiskSeverity {
    /// Severities that force a FAIL verdict.
    pub fn is_blocking(&self) -> bool {
        *self >= RiskSeverity::High
    }
}

/// A single typed risk finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskItem {
    #[serde(default)]
    pub id: String,
    pub description: String,
    pub severity: RiskSeverity,
    #[serde(default)]
    pub suggestion: String,
}

impl RiskItem {
    pub fn new(id: impl Into<String>, description: impl Into<String>, severity: RiskSeverity) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            severity,
            suggestion: String::new(),
        }
    }
}

/// Result of simulating a plan.
///
/// `status` is always derived from the risk severities; construct verdicts
/// through [`RiskVerdict::from_risks`] so the invariant holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskVerdict {
    pub status: VerdictStatus,
    pub confidence: f32,
    pub risks: Vec<RiskItem>,
}

impl RiskVerdict {
    pub fn from_risks(confidence: f32, risks: Vec<RiskItem>) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            status: status_for(&risks),
            confidence,
            risks,
        }
    }

    pub fn pass(confidence: f32) -> Self {
        Self::from_risks(confidence, Vec::new())
    }

    /// Terminal FAIL verdict describing a simulator fault.
    pub fn collaborator_failure(reason: impl Into<String>) -> Self {
        let mut risk = RiskItem::new(
            "SIM-FAULT",
            format!("risk simulation could not complete: {}", reason.into()),
            RiskSeverity::Critical,
        );
        risk.suggestion = "retry the simulation or inspect the generative service".to_string();
        Self {
            status: VerdictStatus::Fail,
            confidence: 0.0,
            risks: vec![risk],
        }
    }

    pub fn is_fail(&self) -> bool {
        self.status == VerdictStatus::Fail
    }

    pub fn blocking_risks(&self) -> impl Iterator<Item = &RiskItem> {
        self.risks.iter().filter(|r| r.severity.is_blocking())
    }
}

/// Severity-to-status mapping: any HIGH or CRITICAL fails, any other risk warns.
pub fn status_for(risks: &[RiskItem]) -> VerdictStatus {
    match risks.iter().map(|r| r.severity).max() {
        None => VerdictStatus::Pass,
        Some(s) if s.is_blocking() => VerdictStatus::Fail,
        Some(_) => VerdictStatus::Warning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn risk(severity: RiskSeverity) -> RiskItem {
        RiskItem::new("R1", "something", severity)
    }

    #[test]
    fn test_empty_risks_pass() {
        assert_eq!(status_for(&[]), VerdictStatus::Pass);
    }

    #[test]
    fn test_low_and_medium_warn() {
        assert_eq!(
            status_for(&[risk(RiskSeverity::Low), risk(RiskSeverity::Medium)]),
            VerdictStatus::Warning
        );
    }

    #[test]
    fn test_any_high_or_critical_fails() {
        for blocking in [RiskSeverity::High, RiskSeverity::Critical] {
            for other in [
                RiskSeverity::Low,
                RiskSeverity::Medium,
                RiskSeverity::High,
                RiskSeverity::Critical,
            ] {
                let verdict = RiskVerdict::from_risks(0.9, vec![risk(other), risk(blocking)]);
                assert_eq!(verdict.status, VerdictStatus::Fail);
            }
        }
    }

    #[test]
    fn test_collaborator_failure_shape() {
        let verdict = RiskVerdict::collaborator_failure("connection refused");
        assert_eq!(verdict.status, VerdictStatus::Fail);
        assert_eq!(verdict.confidence, 0.0);
        assert_eq!(verdict.risks.len(), 1);
        assert_eq!(verdict.risks[0].severity, RiskSeverity::Critical);
    }

    #[test]
    fn test_confidence_clamped() {
        assert_eq!(RiskVerdict::from_risks(4.2, vec![]).confidence, 1.0);
        assert_eq!(RiskVerdict::from_risks(f32::NAN, vec![]).confidence, 0.0);
    }

    #[test]
    fn test_severity_accepts_lowercase() {
        let sev: RiskSeverity = serde_json::from_str("\"high\"").unwrap();
        assert_eq!(sev, RiskSeverity::High);
        let sev: RiskSeverity = serde_json::from_str("\"CRITICAL\"").unwrap();
        assert_eq!(sev, RiskSeverity::Critical);
    }
}
