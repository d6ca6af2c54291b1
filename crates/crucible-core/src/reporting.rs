//! Persisted run reports and their markdown rendering.
//!
//! Layout: `<dir>/<run_id>/report.json` plus `<dir>/<run_id>/report.digest`
//! holding the SHA-256 hex digest of the JSON bytes.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::{CrucibleError, PipelineResult, PipelineStatus, Result};

pub const REPORT_SCHEMA_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub objective: String,
    pub duration_ms: u64,
    pub result: PipelineResult,
}

impl RunReport {
    pub fn new(objective: impl Into<String>, duration_ms: u64, result: PipelineResult) -> Self {
        Self {
            schema_version: REPORT_SCHEMA_VERSION.to_string(),
            generated_at: Utc::now(),
            objective: objective.into(),
            duration_ms,
            result,
        }
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Persist a run report and its digest. Returns the run directory.
pub fn write_run_report(report: &RunReport, dir: &Path) -> Result<PathBuf> {
    let run_dir = dir.join(&report.result.run_id);
    std::fs::create_dir_all(&run_dir)?;

    let json = serde_json::to_vec_pretty(report)?;
    std::fs::write(run_dir.join("report.json"), &json)?;
    std::fs::write(run_dir.join("report.digest"), sha256_hex(&json).as_bytes())?;
    Ok(run_dir)
}

/// Read a run report back, verifying its digest.
pub fn read_run_report(run_id: &str, dir: &Path) -> Result<RunReport> {
    let run_dir = dir.join(run_id);
    let json = std::fs::read(run_dir.join("report.json"))?;
    let expected = std::fs::read_to_string(run_dir.join("report.digest"))?;

    let actual = sha256_hex(&json);
    if expected.trim() != actual {
        return Err(CrucibleError::DigestMismatch {
            expected: expected.trim().to_string(),
            actual,
        });
    }
    Ok(serde_json::from_slice(&json)?)
}

/// Render a markdown summary of a pipeline result.
pub fn render_run_summary_md(result: &PipelineResult) -> String {
    let mut out = String::new();
    let mark = match result.status {
        PipelineStatus::Success => "✓",
        PipelineStatus::Fail => "✗",
        _ => "!",
    };
    out.push_str(&format!("# Run {}\n\n", result.run_id));
    out.push_str(&format!("- status: {} {}\n", mark, result.status));
    out.push_str(&format!("- phase: {}\n", result.phase.name()));
    out.push_str(&format!("- reason: {}\n", result.reason));
    if let Some(location) = &result.output_location {
        out.push_str(&format!("- output: `{}`\n", location.display()));
    }
    out.push('\n');

    if let Some(sim) = &result.reports.simulation {
        out.push_str("## Simulation\n");
        out.push_str(&format!(
            "- verdict: {:?} (confidence {:.2})\n",
            sim.status, sim.confidence
        ));
        for risk in &sim.risks {
            out.push_str(&format!(
                "- [{:?}] {}: {}\n",
                risk.severity, risk.id, risk.description
            ));
        }
        out.push('\n');
    }

    if !result.reports.tests.is_empty() {
        out.push_str("## Contested Artifacts\n");
        for contest in &result.reports.tests {
            out.push_str(&format!(
                "- `{}`: {} after {} attempt(s)\n",
                contest.path.display(),
                if contest.passed { "passed" } else { "exhausted" },
                contest.attempts
            ));
        }
        out.push('\n');
    }

    if let Some(debug) = &result.reports.debug {
        out.push_str("## Debug\n");
        out.push_str(&format!(
            "- units: {}\n- unresolved: {}\n",
            debug.units.len(),
            debug.unresolved().count()
        ));
        for unit in debug.unresolved() {
            out.push_str(&format!("  - `{}`\n", unit.path.display()));
        }
        out.push('\n');
    }

    if let Some(security) = &result.reports.security {
        out.push_str("## Security\n");
        if security.is_secure() {
            out.push_str("- no findings\n");
        } else {
            for line in security.render().lines() {
                out.push_str(&format!("- {line}\n"));
            }
        }
    }
    out
}

/// Write the markdown summary next to a run report.
pub fn write_run_summary_md(path: &Path, result: &PipelineResult) -> anyhow::Result<()> {
    std::fs::write(path, render_run_summary_md(result))
        .with_context(|| format!("write {:?}", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        PipelinePhase, PipelineReports, RiskItem, RiskSeverity, RiskVerdict, SecurityReport,
    };

    fn result() -> PipelineResult {
        PipelineResult {
            run_id: "run-1".to_string(),
            status: PipelineStatus::Fail,
            reason: "Simulation failed: 1 blocking risk(s)".to_string(),
            phase: PipelinePhase::Simulate,
            output_location: None,
            reports: PipelineReports {
                simulation: Some(RiskVerdict::from_risks(
                    0.4,
                    vec![RiskItem::new("SEC-1", "hardcoded key", RiskSeverity::Critical)],
                )),
                security: Some(SecurityReport::default()),
                ..PipelineReports::default()
            },
        }
    }

    #[test]
    fn test_report_round_trip_verifies_digest() {
        let dir = tempfile::tempdir().unwrap();
        let report = RunReport::new("calc", 12, result());
        let run_dir = write_run_report(&report, dir.path()).unwrap();
        assert!(run_dir.join("report.digest").exists());

        let back = read_run_report("run-1", dir.path()).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn test_tampered_report_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_run_report(&RunReport::new("calc", 12, result()), dir.path()).unwrap();
        std::fs::write(dir.path().join("run-1/report.json"), b"{}").unwrap();

        let err = read_run_report("run-1", dir.path()).unwrap_err();
        assert!(matches!(err, CrucibleError::DigestMismatch { .. }));
    }

    #[test]
    fn test_markdown_summary_mentions_risks() {
        let md = render_run_summary_md(&result());
        assert!(md.contains("# Run run-1"));
        assert!(md.contains("✗ FAIL"));
        assert!(md.contains("[Critical] SEC-1: hardcoded key"));
        assert!(md.contains("- no findings"));
    }
}
