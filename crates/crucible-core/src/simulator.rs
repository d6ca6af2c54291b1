//! Risk Simulator backed by the generative service.
//!
//! The returned status is always recomputed from risk severities. Every
//! communication or parsing fault becomes a FAIL verdict with one CRITICAL
//! risk; nothing escapes as an error.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{instrument, warn};

use crate::collaborators::{CompletionService, RiskAssessor};
use crate::domain::{Plan, RiskItem, RiskSeverity, RiskVerdict, VerdictStatus};
use crate::prompts;

/// Risks may arrive as structured items or as bare strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawRisk {
    Item(RiskItem),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct RawVerdict {
    status: VerdictStatus,
    #[serde(default, alias = "confidence_score")]
    confidence: Option<f32>,
    #[serde(default)]
    risks: Vec<RawRisk>,
}

/// Parse a simulator response into a verdict whose status respects the
/// severity invariant.
pub fn parse_verdict(text: &str) -> Result<RiskVerdict, String> {
    let body = prompts::extract_code(text);
    let raw: RawVerdict = serde_json::from_str(&body).map_err(|e| e.to_string())?;

    let mut risks: Vec<RiskItem> = raw
        .risks
        .into_iter()
        .enumerate()
        .map(|(i, r)| match r {
            RawRisk::Item(mut item) => {
                if item.id.trim().is_empty() {
                    item.id = format!("R{}", i + 1);
                }
                item
            }
            RawRisk::Text(description) => {
                RiskItem::new(format!("R{}", i + 1), description, RiskSeverity::Medium)
            }
        })
        .collect();

    // A reported status with no matching risk gets a synthetic one so the
    // recomputed status does not silently upgrade it.
    let implied = match raw.status {
        VerdictStatus::Fail if !risks.iter().any(|r| r.severity.is_blocking()) => {
            Some(("FAIL", RiskSeverity::High))
        }
        VerdictStatus::Warning if risks.is_empty() => Some(("WARNING", RiskSeverity::Medium)),
        _ => None,
    };
    if let Some((status, severity)) = implied {
        risks.push(RiskItem::new(
            format!("R{}", risks.len() + 1),
            format!("simulator reported {status} without itemised risks"),
            severity,
        ));
    }

    Ok(RiskVerdict::from_risks(raw.confidence.unwrap_or(0.0), risks))
}

pub struct RiskSimulator {
    completion: Arc<dyn CompletionService>,
}

impl RiskSimulator {
    pub fn new(completion: Arc<dyn CompletionService>) -> Self {
        Self { completion }
    }
}

#[async_trait]
impl RiskAssessor for RiskSimulator {
    #[instrument(skip_all, fields(project = %plan.project_name))]
    async fn simulate(&self, plan: &Plan) -> RiskVerdict {
        let prompt = prompts::risk_prompt(plan);
        let text = match self.completion.complete(&prompt, true).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "risk simulation unavailable");
                return RiskVerdict::collaborator_failure(e.to_string());
            }
        };
        parse_verdict(&text).unwrap_or_else(|e| {
            warn!(error = %e, "unusable risk simulation response");
            RiskVerdict::collaborator_failure(format!("unusable response: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::ScriptedCompletion;

    #[test]
    fn test_status_recomputed_from_severities() {
        let verdict = parse_verdict(
            r#"{"status": "PASS", "confidence": 0.8, "risks": [
                {"id": "SEC-1", "description": "hardcoded key", "severity": "CRITICAL", "suggestion": "use env"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(verdict.status, VerdictStatus::Fail);
        assert_eq!(verdict.confidence, 0.8);
    }

    #[test]
    fn test_legacy_string_risks_and_confidence_alias() {
        let verdict = parse_verdict(
            r#"{"status": "WARNING", "confidence_score": 0.6, "risks": ["no tests planned"]}"#,
        )
        .unwrap();
        assert_eq!(verdict.status, VerdictStatus::Warning);
        assert_eq!(verdict.confidence, 0.6);
        assert_eq!(verdict.risks[0].severity, RiskSeverity::Medium);
        assert_eq!(verdict.risks[0].id, "R1");
    }

    #[test]
    fn test_reported_fail_without_risks_stays_fail() {
        let verdict = parse_verdict(r#"{"status": "FAIL", "confidence": 0.9, "risks": []}"#).unwrap();
        assert_eq!(verdict.status, VerdictStatus::Fail);
        assert_eq!(verdict.risks.len(), 1);
    }

    #[test]
    fn test_clean_pass() {
        let verdict = parse_verdict(r#"{"status": "PASS", "confidence": 0.95, "risks": []}"#).unwrap();
        assert_eq!(verdict.status, VerdictStatus::Pass);
        assert!(verdict.risks.is_empty());
    }

    #[test]
    fn test_missing_status_is_unusable() {
        assert!(parse_verdict(r#"{"risks": []}"#).is_err());
    }

    fn plan() -> Plan {
        serde_json::from_str(r#"{"project_name": "p", "file_structure": {"a.py": "x"}}"#).unwrap()
    }

    #[tokio::test]
    async fn test_unreachable_service_yields_fail_verdict() {
        let sim = RiskSimulator::new(Arc::new(ScriptedCompletion::unreachable()));
        let verdict = sim.simulate(&plan()).await;
        assert_eq!(verdict.status, VerdictStatus::Fail);
        assert_eq!(verdict.confidence, 0.0);
        assert_eq!(verdict.risks.len(), 1);
        assert_eq!(verdict.risks[0].severity, RiskSeverity::Critical);
    }

    #[tokio::test]
    async fn test_prose_response_yields_fail_verdict() {
        let sim = RiskSimulator::new(Arc::new(ScriptedCompletion::new(["Looks fine to me."])));
        let verdict = sim.simulate(&plan()).await;
        assert!(verdict.is_fail());
        assert!(verdict.risks[0].description.contains("unusable"));
    }
}
