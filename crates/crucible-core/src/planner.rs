//! Plan Generator: objective to validated Plan, with optional parallel drafts.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, info, instrument, warn};

use crate::collaborators::{CompletionService, PlanAuthor, PlanScorer};
use crate::domain::{Plan, PlanError};
use crate::prompts;

pub struct PlanGenerator {
    completion: Arc<dyn CompletionService>,
    scorer: Arc<dyn PlanScorer>,
    drafts: u32,
    max_attempts: u32,
}

impl PlanGenerator {
    pub fn new(completion: Arc<dyn CompletionService>, scorer: Arc<dyn PlanScorer>) -> Self {
        Self {
            completion,
            scorer,
            drafts: 1,
            max_attempts: 2,
        }
    }

    /// Candidate plans requested per attempt (minimum 1).
    pub fn with_drafts(mut self, drafts: u32) -> Self {
        self.drafts = drafts.max(1);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Request `drafts` candidates concurrently and keep the valid ones.
    async fn draft(&self, prompt: &str) -> (Vec<Plan>, Option<String>) {
        let responses = join_all(
            (0..self.drafts).map(|_| self.completion.complete(prompt, true)),
        )
        .await;

        let mut valid = Vec::new();
        let mut last_error = None;
        for response in responses {
            match response.map_err(|e| e.to_string()).and_then(|t| parse_plan(&t)) {
                Ok(plan) => valid.push(plan),
                Err(e) => {
                    debug!(error = %e, "discarding plan candidate");
                    last_error = Some(e);
                }
            }
        }
        (valid, last_error)
    }
}

#[async_trait]
impl PlanAuthor for PlanGenerator {
    #[instrument(skip(self))]
    async fn create_plan(&self, objective: &str) -> Result<Plan, PlanError> {
        let prompt = prompts::planning_prompt(objective);
        let mut last_error = String::from("no attempts were made");

        for attempt in 1..=self.max_attempts {
            let (mut candidates, error) = self.draft(&prompt).await;
            if let Some(e) = error {
                last_error = e;
            }
            if candidates.is_empty() {
                warn!(attempt, "no valid plan candidate");
                continue;
            }
            if candidates.len() == 1 {
                if let Some(only) = candidates.pop() {
                    return Ok(only);
                }
            }
            let scores = join_all(candidates.iter().map(|p| self.scorer.score(p))).await;
            info!(attempt, ?scores, "scored plan candidates");
            if let Some(best) = select_best(candidates, &scores) {
                return Ok(best);
            }
        }

        Err(PlanError::GenerationFailed {
            attempts: self.max_attempts,
            last_error,
        })
    }
}

/// Parse and validate one candidate.
pub fn parse_plan(text: &str) -> Result<Plan, String> {
    let body = prompts::extract_code(text);
    let plan: Plan = serde_json::from_str(&body).map_err(|e| format!("not a plan: {e}"))?;
    plan.validate().map_err(|e| e.to_string())?;
    Ok(plan)
}

/// Highest score wins; ties go to the earliest candidate.
pub fn select_best(candidates: Vec<Plan>, scores: &[f64]) -> Option<Plan> {
    let mut best: Option<(usize, f64)> = None;
    for (i, score) in scores.iter().copied().enumerate().take(candidates.len()) {
        match best {
            Some((_, top)) if score <= top || score.is_nan() => {}
            _ => best = Some((i, score)),
        }
    }
    let (index, _) = best?;
    candidates.into_iter().nth(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(name: &str) -> Plan {
        serde_json::from_value(serde_json::json!({
            "project_name": name,
            "file_structure": { "main.py": "entry point" }
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_plan_rejects_non_plans() {
        assert!(parse_plan("not json").is_err());
        assert!(parse_plan(r#"{"file_structure": {"a.py": 3}}"#).is_err());
        assert!(parse_plan(r#"{"file_structure": {}}"#).is_err());
        assert!(parse_plan(r#"{"file_structure": {"a.py": "adds"}}"#).is_ok());
    }

    #[test]
    fn test_select_best_takes_maximum() {
        let best = select_best(vec![plan("a"), plan("b"), plan("c")], &[40.0, 90.0, 70.0]).unwrap();
        assert_eq!(best.project_name, "b");
    }

    #[test]
    fn test_select_best_ties_go_to_first_seen() {
        let best = select_best(vec![plan("a"), plan("b"), plan("c")], &[50.0, 80.0, 80.0]).unwrap();
        assert_eq!(best.project_name, "b");
    }

    #[test]
    fn test_select_best_all_zero_keeps_first() {
        let best = select_best(vec![plan("a"), plan("b")], &[0.0, 0.0]).unwrap();
        assert_eq!(best.project_name, "a");
        assert!(select_best(vec![], &[]).is_none());
    }

    #[test]
    fn test_parse_plan_rejects_empty_structure() {
        assert!(parse_plan(r#"{"project_name": "x", "file_structure": {}}"#).is_err());
        assert!(parse_plan("```json\n{\"file_structure\": {\"a.py\": \"adds\"}}\n```").is_ok());
    }
}
