//! Artifact and test generation backed by the generative service.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::collaborators::{ArtifactGenerator, CompletionService, TestAuthor};
use crate::context::ArtifactContext;
use crate::domain::CollaboratorError;
use crate::prompts;

async fn complete_code(
    completion: &dyn CompletionService,
    prompt: &str,
) -> Result<String, CollaboratorError> {
    let raw = completion.complete(prompt, false).await?;
    let code = prompts::extract_code(&raw);
    if code.is_empty() {
        return Err(CollaboratorError::UnusableOutput("empty response".to_string()));
    }
    Ok(code)
}

pub struct LlmArtifactGenerator {
    completion: Arc<dyn CompletionService>,
}

impl LlmArtifactGenerator {
    pub fn new(completion: Arc<dyn CompletionService>) -> Self {
        Self { completion }
    }
}

#[async_trait]
impl ArtifactGenerator for LlmArtifactGenerator {
    async fn generate(
        &self,
        path: &Path,
        description: &str,
        context: &ArtifactContext,
    ) -> Result<String, CollaboratorError> {
        let prompt = prompts::generation_prompt(path, description, &context.render());
        complete_code(self.completion.as_ref(), &prompt).await
    }
}

pub struct LlmTestAuthor {
    completion: Arc<dyn CompletionService>,
}

impl LlmTestAuthor {
    pub fn new(completion: Arc<dyn CompletionService>) -> Self {
        Self { completion }
    }
}

#[async_trait]
impl TestAuthor for LlmTestAuthor {
    async fn write_tests(
        &self,
        source: &str,
        module_name: &str,
    ) -> Result<String, CollaboratorError> {
        complete_code(self.completion.as_ref(), &prompts::test_prompt(source, module_name)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::ScriptedCompletion;

    #[tokio::test]
    async fn test_generator_strips_fences_and_passes_context() {
        let svc = Arc::new(ScriptedCompletion::new(["```python\ndef add(a, b):\n    return a + b\n```"]));
        let generator = LlmArtifactGenerator::new(svc.clone());
        let mut ctx = ArtifactContext::new();
        ctx.insert("util.py", "FUNCTIONS:\n  - def helper()");

        let code = generator
            .generate(Path::new("calc/main.py"), "adds numbers", &ctx)
            .await
            .unwrap();
        assert_eq!(code, "def add(a, b):\n    return a + b");
        assert!(svc.prompts()[0].contains("--- File: util.py ---"));
        assert_eq!(svc.structured_flags(), vec![false]);
    }

    #[tokio::test]
    async fn test_empty_output_is_collaborator_error() {
        let generator = LlmArtifactGenerator::new(Arc::new(ScriptedCompletion::new(["```\n```"])));
        let err = generator
            .generate(Path::new("a.py"), "x", &ArtifactContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CollaboratorError::UnusableOutput(_)));
    }

    #[tokio::test]
    async fn test_test_author_names_module() {
        let svc = Arc::new(ScriptedCompletion::new(["def test_add():\n    assert add(1, 2) == 3"]));
        let author = LlmTestAuthor::new(svc.clone());
        let tests = author.write_tests("def add(a, b): ...", "calc").await.unwrap();
        assert!(tests.starts_with("def test_add"));
        assert!(svc.prompts()[0].contains("from calc import *"));
    }
}
