//! Plan Scorer backed by the generative service.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::collaborators::{complete_json, CompletionService, PlanScorer};
use crate::domain::Plan;
use crate::prompts;

#[derive(Debug, Deserialize)]
struct ScoreResponse {
    overall_score: f64,
    #[serde(default)]
    justification: String,
}

pub struct LlmPlanScorer {
    completion: Arc<dyn CompletionService>,
}

impl LlmPlanScorer {
    pub fn new(completion: Arc<dyn CompletionService>) -> Self {
        Self { completion }
    }
}

#[async_trait]
impl PlanScorer for LlmPlanScorer {
    /// Score in `0..=100`. Any fault scores 0.
    async fn score(&self, plan: &Plan) -> f64 {
        let prompt = prompts::scoring_prompt(plan);
        match complete_json::<ScoreResponse>(self.completion.as_ref(), &prompt).await {
            Ok(r) if r.overall_score.is_finite() => {
                tracing::debug!(score = r.overall_score, justification = %r.justification, "plan scored");
                r.overall_score.clamp(0.0, 100.0)
            }
            Ok(_) => 0.0,
            Err(e) => {
                warn!(error = %e, "plan scoring failed");
                0.0
            }
        }
    }
}
