//! Traits for every external collaborator the orchestrator consumes.
//!
//! Concrete implementations live in `crucible-llm` (generative service) and
//! `crucible-tools` (analysis tools); in-memory versions are in [`crate::fakes`].

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::context::ArtifactContext;
use crate::domain::{
    CollaboratorError, ComplexityReport, Plan, PlanError, RiskVerdict, SecurityReport,
    StyleReport, TestRunReport, ToolError,
};

/// Generative text service.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Complete `prompt`. With `structured_output` the service is asked to
    /// return a single JSON object.
    async fn complete(&self, prompt: &str, structured_output: bool)
        -> Result<String, CollaboratorError>;
}

/// Request structured output and deserialize it.
///
/// A response that does not parse is a service error, not a content error.
pub async fn complete_json<T: DeserializeOwned>(
    service: &dyn CompletionService,
    prompt: &str,
) -> Result<T, CollaboratorError> {
    let text = service.complete(prompt, true).await?;
    let body = crate::prompts::extract_code(&text);
    serde_json::from_str(&body).map_err(|e| CollaboratorError::UnusableOutput(e.to_string()))
}

#[async_trait]
pub trait StyleAnalyzer: Send + Sync {
    async fn analyze(&self, content: &str) -> Result<StyleReport, ToolError>;

    /// Whether this analyzer understands files at `path`.
    fn supports(&self, _path: &Path) -> bool {
        true
    }
}

#[async_trait]
pub trait SecurityScanner: Send + Sync {
    async fn scan_content(&self, content: &str) -> Result<SecurityReport, ToolError>;

    /// Scan a file or a whole directory tree.
    async fn scan_path(&self, path: &Path) -> Result<SecurityReport, ToolError>;
}

#[async_trait]
pub trait ComplexityAnalyzer: Send + Sync {
    async fn analyze(&self, content: &str) -> Result<ComplexityReport, ToolError>;
}

#[async_trait]
pub trait TestRunner: Send + Sync {
    /// Run `tests` against `source`, where `module_name` is the importable
    /// name the tests use for the source.
    async fn run(&self, source: &str, tests: &str, module_name: &str)
        -> Result<TestRunReport, ToolError>;
}

/// Produces a Plan from an objective.
#[async_trait]
pub trait PlanAuthor: Send + Sync {
    async fn create_plan(&self, objective: &str) -> Result<Plan, PlanError>;
}

/// Assesses a Plan. Never fails: faults degrade to a FAIL verdict.
#[async_trait]
pub trait RiskAssessor: Send + Sync {
    async fn simulate(&self, plan: &Plan) -> RiskVerdict;
}

/// Scores a Plan. Never fails: faults score 0.
#[async_trait]
pub trait PlanScorer: Send + Sync {
    async fn score(&self, plan: &Plan) -> f64;
}

/// Generates the content of one planned file.
#[async_trait]
pub trait ArtifactGenerator: Send + Sync {
    async fn generate(
        &self,
        path: &Path,
        description: &str,
        context: &ArtifactContext,
    ) -> Result<String, CollaboratorError>;
}

/// Writes test code for a candidate source file.
#[async_trait]
pub trait TestAuthor: Send + Sync {
    async fn write_tests(&self, source: &str, module_name: &str)
        -> Result<String, CollaboratorError>;
}

/// The analysis tools behind the gate battery.
#[derive(Clone)]
pub struct Toolchain {
    pub style: Arc<dyn StyleAnalyzer>,
    pub security: Arc<dyn SecurityScanner>,
    pub complexity: Arc<dyn ComplexityAnalyzer>,
    pub tests: Arc<dyn TestRunner>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::ScriptedCompletion;

    #[derive(Debug, serde::Deserialize)]
    struct Score {
        overall_score: f64,
    }

    #[tokio::test]
    async fn test_complete_json_parses_fenced_object() {
        let svc = ScriptedCompletion::new(["```json\n{\"overall_score\": 88}\n```"]);
        let score: Score = complete_json(&svc, "score it").await.unwrap();
        assert_eq!(score.overall_score, 88.0);
        assert_eq!(svc.structured_flags(), vec![true]);
    }

    #[tokio::test]
    async fn test_complete_json_rejects_prose() {
        let svc = ScriptedCompletion::new(["I think it is great"]);
        let err = complete_json::<Score>(&svc, "score it").await.unwrap_err();
        assert!(matches!(err, CollaboratorError::UnusableOutput(_)));
    }
}
