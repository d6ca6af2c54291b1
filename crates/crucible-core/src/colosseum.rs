//! Corrective retry loop around generation and the validation battery.
//!
//! States: `Generate -> Validate -> (Pass | Retry | Exhausted)`, with
//! `Retry -> Generate`. Each failed validation consumes one attempt and its
//! failing gate's detail becomes the corrective input for the next prompt.
//! The loop makes at most `max_attempts` generation calls.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::collaborators::CompletionService;
use crate::domain::{
    CollaboratorError, CrucibleError, GateKind, GateResult, RetryExhausted, TestRunReport,
};
use crate::gauntlet::{BatteryOutcome, Gauntlet};
use crate::metrics::METRICS;
use crate::obs;
use crate::prompts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    Generate,
    Validate,
    Pass,
    Retry,
    Exhausted,
}

impl CycleState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CycleState::Pass | CycleState::Exhausted)
    }

    pub fn name(&self) -> &'static str {
        match self {
            CycleState::Generate => "generate",
            CycleState::Validate => "validate",
            CycleState::Pass => "pass",
            CycleState::Retry => "retry",
            CycleState::Exhausted => "exhausted",
        }
    }
}

/// Mutable state of one loop invocation. Never shared across loops.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryState {
    pub attempt: u32,
    pub max_attempts: u32,
    pub last_failure: Option<GateResult>,
    pub candidate_content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleTransition {
    pub attempt: u32,
    pub from: CycleState,
    pub to: CycleState,
}

/// Everything a passing loop produced.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub final_content: String,
    pub gate_reports: Vec<GateResult>,
    pub tests: String,
    pub test_report: TestRunReport,
    /// Generation calls made, including the passing one.
    pub attempts_used: u32,
    /// The failure preceding the passing attempt, if any.
    pub last_failure: Option<GateResult>,
    pub history: Vec<CycleTransition>,
}

struct Passed {
    results: Vec<GateResult>,
    tests: String,
    test_report: TestRunReport,
}

/// A single retry loop, advanced one transition at a time.
pub struct RetryCycle<'a> {
    colosseum: &'a Colosseum,
    challenge: &'a str,
    file_name: &'a str,
    state: RetryState,
    current: CycleState,
    generated: Option<Result<String, CollaboratorError>>,
    passed: Option<Passed>,
    history: Vec<CycleTransition>,
}

impl<'a> RetryCycle<'a> {
    pub fn state(&self) -> &RetryState {
        &self.state
    }

    pub fn current(&self) -> CycleState {
        self.current
    }

    pub fn history(&self) -> &[CycleTransition] {
        &self.history
    }

    fn transition(&mut self, to: CycleState) {
        obs::emit_cycle_transition(
            self.file_name,
            self.state.attempt,
            self.current.name(),
            to.name(),
        );
        self.history.push(CycleTransition {
            attempt: self.state.attempt,
            from: self.current,
            to,
        });
        self.current = to;
    }

    /// Advance by one transition. Terminal states do not move.
    pub async fn step(&mut self) -> CycleState {
        match self.current {
            CycleState::Generate => {
                if self.state.attempt >= self.state.max_attempts {
                    self.transition(CycleState::Exhausted);
                } else {
                    self.generated = Some(self.generate().await);
                    self.transition(CycleState::Validate);
                }
            }
            CycleState::Validate => {
                let failure = match self.generated.take() {
                    Some(Ok(content)) => {
                        self.state.candidate_content = content;
                        let outcome = self
                            .colosseum
                            .gauntlet
                            .run_battery(&self.state.candidate_content, self.file_name)
                            .await;
                        match outcome {
                            BatteryOutcome::Passed {
                                results,
                                tests,
                                test_report,
                            } => {
                                self.passed = Some(Passed {
                                    results,
                                    tests,
                                    test_report,
                                });
                                self.state.attempt += 1;
                                self.transition(CycleState::Pass);
                                return self.current;
                            }
                            BatteryOutcome::Failed { failure, .. } => failure,
                        }
                    }
                    Some(Err(e)) => GateResult::collaborator_failure(GateKind::Generation, &e),
                    None => GateResult::fail(GateKind::Generation, "no content was generated"),
                };
                self.state.attempt += 1;
                self.state.last_failure = Some(failure);
                if self.state.attempt >= self.state.max_attempts {
                    self.transition(CycleState::Exhausted);
                } else {
                    METRICS.inc_retries();
                    self.transition(CycleState::Retry);
                }
            }
            CycleState::Retry => self.transition(CycleState::Generate),
            CycleState::Pass | CycleState::Exhausted => {}
        }
        self.current
    }

    async fn generate(&self) -> Result<String, CollaboratorError> {
        METRICS.inc_generation_calls();
        let prompt = match &self.state.last_failure {
            None => prompts::challenge_prompt(self.challenge, &self.state.candidate_content),
            Some(failure) => prompts::corrective_prompt(
                self.challenge,
                &self.state.candidate_content,
                &failure.detail,
            ),
        };
        let raw = self.colosseum.completion.complete(&prompt, false).await?;
        let code = prompts::extract_code(&raw);
        if code.is_empty() {
            return Err(CollaboratorError::UnusableOutput("empty code".to_string()));
        }
        Ok(code)
    }

    /// Step until a terminal state and return the outcome.
    pub async fn run(mut self) -> Result<CycleReport, RetryExhausted> {
        while !self.current.is_terminal() {
            self.step().await;
        }
        self.finish()
    }

    fn finish(self) -> Result<CycleReport, RetryExhausted> {
        match self.passed {
            Some(passed) if self.current == CycleState::Pass => Ok(CycleReport {
                final_content: self.state.candidate_content,
                gate_reports: passed.results,
                tests: passed.tests,
                test_report: passed.test_report,
                attempts_used: self.state.attempt,
                last_failure: self.state.last_failure,
                history: self.history,
            }),
            _ => Err(RetryExhausted {
                attempts: self.state.attempt,
                last_failure: self.state.last_failure,
            }),
        }
    }
}

pub struct Colosseum {
    completion: Arc<dyn CompletionService>,
    gauntlet: Arc<Gauntlet>,
}

impl Colosseum {
    pub fn new(completion: Arc<dyn CompletionService>, gauntlet: Arc<Gauntlet>) -> Self {
        Self {
            completion,
            gauntlet,
        }
    }

    /// Start a loop without advancing it.
    pub fn start<'a>(
        &'a self,
        challenge: &'a str,
        seed: impl Into<String>,
        file_name: &'a str,
        max_attempts: u32,
    ) -> RetryCycle<'a> {
        RetryCycle {
            colosseum: self,
            challenge,
            file_name,
            state: RetryState {
                attempt: 0,
                max_attempts,
                last_failure: None,
                candidate_content: seed.into(),
            },
            current: CycleState::Generate,
            generated: None,
            passed: None,
            history: Vec::new(),
        }
    }

    pub async fn run_cycle(
        &self,
        challenge: &str,
        seed: impl Into<String>,
        file_name: &str,
        max_attempts: u32,
    ) -> Result<CycleReport, RetryExhausted> {
        self.start(challenge, seed, file_name, max_attempts).run().await
    }

    /// Improve the file at `target_path` until it passes the battery.
    ///
    /// Existing content seeds the loop. On PASS the validated content is
    /// written back to `target_path`; on exhaustion the file is untouched.
    pub async fn run_validation_cycle(
        &self,
        challenge: &str,
        target_path: &Path,
        max_attempts: u32,
    ) -> Result<CycleReport, CrucibleError> {
        let seed = match tokio::fs::read_to_string(target_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };
        let file_name = target_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("candidate.py")
            .to_string();

        let report = self
            .run_cycle(challenge, seed, &file_name, max_attempts)
            .await?;

        if let Some(parent) = target_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(target_path, &report.final_content).await?;
        Ok(report)
    }
}
