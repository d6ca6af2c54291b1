//! In-memory fakes for every collaborator trait (testing only).
//!
//! Scripted fakes replay a fixed sequence of responses; once the script is
//! used up the last entry repeats, so a one-element script is a constant.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::collaborators::{
    ArtifactGenerator, ComplexityAnalyzer, CompletionService, PlanAuthor, PlanScorer,
    RiskAssessor, SecurityScanner, StyleAnalyzer, TestAuthor, TestRunner, Toolchain,
};
use crate::context::ArtifactContext;
use crate::domain::{
    CollaboratorError, ComplexityReport, ComplexityUnit, Plan, PlanError, RiskVerdict,
    SecurityFinding, SecurityReport, StyleReport, TestRunReport, ToolError,
};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Replays `items` in order, repeating the last one.
#[derive(Debug)]
struct Script<T> {
    items: Vec<T>,
    cursor: AtomicUsize,
}

impl<T: Clone> Script<T> {
    fn new(items: Vec<T>) -> Self {
        Self {
            items,
            cursor: AtomicUsize::new(0),
        }
    }

    fn next(&self) -> Option<T> {
        let i = self.cursor.fetch_add(1, Ordering::SeqCst);
        self.items.get(i).or_else(|| self.items.last()).cloned()
    }

    fn calls(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// ScriptedCompletion
// ---------------------------------------------------------------------------

/// Completion service that replays canned responses and records every prompt.
#[derive(Debug)]
pub struct ScriptedCompletion {
    script: Script<Result<String, CollaboratorError>>,
    prompts: Mutex<Vec<(String, bool)>>,
}

impl ScriptedCompletion {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_results(responses.into_iter().map(|s| Ok(s.into())).collect())
    }

    pub fn with_results(results: Vec<Result<String, CollaboratorError>>) -> Self {
        Self {
            script: Script::new(results),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// A service that is never reachable.
    pub fn unreachable() -> Self {
        Self::with_results(vec![Err(CollaboratorError::Unreachable(
            "connection refused".to_string(),
        ))])
    }

    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).iter().map(|(p, _)| p.clone()).collect()
    }

    pub fn structured_flags(&self) -> Vec<bool> {
        lock(&self.prompts).iter().map(|(_, s)| *s).collect()
    }

    pub fn calls(&self) -> usize {
        self.script.calls()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(
        &self,
        prompt: &str,
        structured_output: bool,
    ) -> Result<String, CollaboratorError> {
        lock(&self.prompts).push((prompt.to_string(), structured_output));
        self.script
            .next()
            .unwrap_or_else(|| Err(CollaboratorError::Unreachable("empty script".to_string())))
    }
}

// ---------------------------------------------------------------------------
// Tool fakes
// ---------------------------------------------------------------------------

/// Style analyzer replaying scripted reports.
#[derive(Debug)]
pub struct FakeStyle {
    script: Script<Result<StyleReport, ToolError>>,
    extensions: Option<Vec<String>>,
}

impl FakeStyle {
    pub fn scoring(score: f32) -> Self {
        Self::sequence(vec![Ok(StyleReport {
            score,
            report: format!("Your code has been rated at {score:.2}/10"),
        })])
    }

    pub fn sequence(results: Vec<Result<StyleReport, ToolError>>) -> Self {
        Self {
            script: Script::new(results),
            extensions: None,
        }
    }

    pub fn failing(err: ToolError) -> Self {
        Self::sequence(vec![Err(err)])
    }

    /// Only claim support for files with these extensions.
    pub fn for_extensions(mut self, extensions: &[&str]) -> Self {
        self.extensions = Some(extensions.iter().map(|e| e.to_string()).collect());
        self
    }

    pub fn calls(&self) -> usize {
        self.script.calls()
    }
}

#[async_trait]
impl StyleAnalyzer for FakeStyle {
    async fn analyze(&self, _content: &str) -> Result<StyleReport, ToolError> {
        self.script.next().unwrap_or_else(|| {
            Ok(StyleReport {
                score: 10.0,
                report: String::new(),
            })
        })
    }

    fn supports(&self, path: &Path) -> bool {
        match (&self.extensions, path.extension().and_then(|e| e.to_str())) {
            (None, _) => true,
            (Some(exts), Some(ext)) => exts.iter().any(|e| e == ext),
            (Some(_), None) => false,
        }
    }
}

/// Security scanner with separate scripts for content and path scans.
#[derive(Debug)]
pub struct FakeSecurity {
    content: Script<Result<SecurityReport, ToolError>>,
    path: Script<Result<SecurityReport, ToolError>>,
    scanned_paths: Mutex<Vec<PathBuf>>,
}

impl FakeSecurity {
    pub fn clean() -> Self {
        Self::sequence(vec![Ok(SecurityReport::default())])
    }

    pub fn sequence(results: Vec<Result<SecurityReport, ToolError>>) -> Self {
        Self {
            content: Script::new(results),
            path: Script::new(vec![Ok(SecurityReport::default())]),
            scanned_paths: Mutex::new(Vec::new()),
        }
    }

    pub fn with_path_result(mut self, result: Result<SecurityReport, ToolError>) -> Self {
        self.path = Script::new(vec![result]);
        self
    }

    /// One finding of the given severity.
    pub fn finding(severity: &str) -> SecurityReport {
        SecurityReport {
            findings: vec![SecurityFinding {
                file: "candidate.py".to_string(),
                description: "Use of exec detected.".to_string(),
                severity: severity.to_string(),
                line: Some(1),
            }],
        }
    }

    pub fn content_calls(&self) -> usize {
        self.content.calls()
    }

    pub fn scanned_paths(&self) -> Vec<PathBuf> {
        lock(&self.scanned_paths).clone()
    }
}

#[async_trait]
impl SecurityScanner for FakeSecurity {
    async fn scan_content(&self, _content: &str) -> Result<SecurityReport, ToolError> {
        self.content.next().unwrap_or_else(|| Ok(SecurityReport::default()))
    }

    async fn scan_path(&self, path: &Path) -> Result<SecurityReport, ToolError> {
        lock(&self.scanned_paths).push(path.to_path_buf());
        self.path.next().unwrap_or_else(|| Ok(SecurityReport::default()))
    }
}

#[derive(Debug)]
pub struct FakeComplexity {
    script: Script<Result<ComplexityReport, ToolError>>,
}

impl FakeComplexity {
    /// A single unit with the given complexity.
    pub fn single(complexity: u32) -> Self {
        Self::sequence(vec![Ok(ComplexityReport {
            units: vec![ComplexityUnit {
                name: "main".to_string(),
                complexity,
            }],
        })])
    }

    pub fn sequence(results: Vec<Result<ComplexityReport, ToolError>>) -> Self {
        Self {
            script: Script::new(results),
        }
    }

    pub fn calls(&self) -> usize {
        self.script.calls()
    }
}

#[async_trait]
impl ComplexityAnalyzer for FakeComplexity {
    async fn analyze(&self, _content: &str) -> Result<ComplexityReport, ToolError> {
        self.script.next().unwrap_or_else(|| Ok(ComplexityReport::default()))
    }
}

#[derive(Debug)]
pub struct FakeTestRunner {
    script: Script<Result<TestRunReport, ToolError>>,
}

impl FakeTestRunner {
    pub fn passing() -> Self {
        Self::sequence(vec![Ok(TestRunReport {
            passed: true,
            output: "1 passed".to_string(),
        })])
    }

    pub fn sequence(results: Vec<Result<TestRunReport, ToolError>>) -> Self {
        Self {
            script: Script::new(results),
        }
    }

    pub fn calls(&self) -> usize {
        self.script.calls()
    }
}

#[async_trait]
impl TestRunner for FakeTestRunner {
    async fn run(
        &self,
        _source: &str,
        _tests: &str,
        _module_name: &str,
    ) -> Result<TestRunReport, ToolError> {
        self.script.next().unwrap_or_else(|| {
            Ok(TestRunReport {
                passed: true,
                output: String::new(),
            })
        })
    }
}

/// A toolchain where every gate passes.
pub fn passing_toolchain() -> Toolchain {
    Toolchain {
        style: Arc::new(FakeStyle::scoring(9.5)),
        security: Arc::new(FakeSecurity::clean()),
        complexity: Arc::new(FakeComplexity::single(2)),
        tests: Arc::new(FakeTestRunner::passing()),
    }
}

// ---------------------------------------------------------------------------
// Agent fakes
// ---------------------------------------------------------------------------

/// Deterministic artifact generator that counts calls and records the
/// context each call saw.
#[derive(Debug, Default)]
pub struct CountingGenerator {
    calls: AtomicUsize,
    seen: Mutex<Vec<(PathBuf, String)>>,
    fail_on: Option<PathBuf>,
}

impl CountingGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail generation for `path` (relative to the output root).
    pub fn failing_on(path: impl Into<PathBuf>) -> Self {
        Self {
            fail_on: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `(path, rendered context)` for every call, in call order.
    pub fn seen(&self) -> Vec<(PathBuf, String)> {
        lock(&self.seen).clone()
    }

    fn content_for(path: &Path, description: &str) -> String {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("artifact")
            .replace(|c: char| !c.is_ascii_alphanumeric(), "_");
        match path.extension().and_then(|e| e.to_str()) {
            Some("py") => format!(
                "import os\n\n\ndef {stem}_main():\n    \"\"\"{description}\"\"\"\n    return os.getcwd()\n"
            ),
            _ => format!("# {}\n\n{description}\n", path.display()),
        }
    }
}

#[async_trait]
impl ArtifactGenerator for CountingGenerator {
    async fn generate(
        &self,
        path: &Path,
        description: &str,
        context: &ArtifactContext,
    ) -> Result<String, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.seen).push((path.to_path_buf(), context.render()));
        if self.fail_on.as_deref() == Some(path) {
            return Err(CollaboratorError::Unreachable("scripted failure".to_string()));
        }
        Ok(Self::content_for(path, description))
    }
}

/// Plan author returning a fixed result.
#[derive(Debug)]
pub struct StaticPlanAuthor {
    result: Result<Plan, PlanError>,
    calls: AtomicUsize,
}

impl StaticPlanAuthor {
    pub fn new(plan: Plan) -> Self {
        Self::with_result(Ok(plan))
    }

    pub fn with_result(result: Result<Plan, PlanError>) -> Self {
        Self {
            result,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json).map(Self::new)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlanAuthor for StaticPlanAuthor {
    async fn create_plan(&self, _objective: &str) -> Result<Plan, PlanError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

#[derive(Debug)]
pub struct StaticRiskAssessor {
    verdict: RiskVerdict,
    calls: AtomicUsize,
}

impl StaticRiskAssessor {
    pub fn new(verdict: RiskVerdict) -> Self {
        Self {
            verdict,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn passing() -> Self {
        Self::new(RiskVerdict::pass(0.9))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RiskAssessor for StaticRiskAssessor {
    async fn simulate(&self, _plan: &Plan) -> RiskVerdict {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.verdict.clone()
    }
}

/// Scores plans by project name; unknown names score 0.
#[derive(Debug, Default)]
pub struct ScoreByName {
    scores: HashMap<String, f64>,
}

impl ScoreByName {
    pub fn new<I, S>(scores: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            scores: scores.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[async_trait]
impl PlanScorer for ScoreByName {
    async fn score(&self, plan: &Plan) -> f64 {
        self.scores.get(&plan.project_name).copied().unwrap_or(0.0)
    }
}

/// Test author returning fixed test code, or a fixed error.
#[derive(Debug)]
pub struct StaticTestAuthor {
    result: Result<String, CollaboratorError>,
}

impl StaticTestAuthor {
    pub fn passing() -> Self {
        Self {
            result: Ok("def test_smoke():\n    assert True\n".to_string()),
        }
    }

    pub fn failing(err: CollaboratorError) -> Self {
        Self { result: Err(err) }
    }
}

#[async_trait]
impl TestAuthor for StaticTestAuthor {
    async fn write_tests(
        &self,
        _source: &str,
        _module_name: &str,
    ) -> Result<String, CollaboratorError> {
        self.result.clone()
    }
}
