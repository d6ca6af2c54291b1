//! The validation battery: style, security, complexity, then executable tests.
//!
//! Gates are independent and share no mutable state. The battery evaluates
//! them in [`GateKind::BATTERY`] order and stops at the first failure, so
//! only the first failing gate's detail is ever fed back to a generator.
//! Tool faults become failing results with `tool_failure = true`.

use std::path::Path;
use std::sync::Arc;

use serde_json::json;
use tracing::instrument;

use crate::collaborators::{TestAuthor, Toolchain};
use crate::config::GauntletConfig;
use crate::domain::{GateKind, GateResult, TestRunReport};
use crate::metrics::METRICS;
use crate::obs;

/// Result of one battery run.
#[derive(Debug, Clone, PartialEq)]
pub enum BatteryOutcome {
    /// Every gate passed; all results are kept for reporting.
    Passed {
        results: Vec<GateResult>,
        tests: String,
        test_report: TestRunReport,
    },
    /// The first failing gate, plus the results of the gates before it.
    Failed {
        failure: GateResult,
        results: Vec<GateResult>,
    },
}

impl BatteryOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, BatteryOutcome::Passed { .. })
    }

    /// Every result produced, in evaluation order.
    pub fn results(&self) -> Vec<GateResult> {
        match self {
            BatteryOutcome::Passed { results, .. } => results.clone(),
            BatteryOutcome::Failed { failure, results } => {
                let mut all = results.clone();
                all.push(failure.clone());
                all
            }
        }
    }
}

pub struct Gauntlet {
    tools: Toolchain,
    test_author: Arc<dyn TestAuthor>,
    config: GauntletConfig,
}

impl Gauntlet {
    pub fn new(tools: Toolchain, test_author: Arc<dyn TestAuthor>, config: GauntletConfig) -> Self {
        Self {
            tools,
            test_author,
            config,
        }
    }

    pub fn config(&self) -> &GauntletConfig {
        &self.config
    }

    pub async fn style_gate(&self, content: &str) -> GateResult {
        let report = match self.tools.style.analyze(content).await {
            Ok(report) => report,
            Err(e) => return GateResult::tool_failure(GateKind::Style, &e),
        };
        let min = self.config.min_style_score;
        let payload = json!({ "score": report.score, "report": report.report });
        let result = if report.score >= min {
            GateResult::pass(
                GateKind::Style,
                format!("style score {:.2}/10 meets the minimum {:.2}", report.score, min),
            )
        } else {
            GateResult::fail(
                GateKind::Style,
                format!(
                    "style score {:.2}/10 is below the minimum {:.2}\n{}",
                    report.score, min, report.report
                ),
            )
        };
        result.with_report(payload)
    }

    pub async fn security_gate(&self, content: &str) -> GateResult {
        let report = match self.tools.security.scan_content(content).await {
            Ok(report) => report,
            Err(e) => return GateResult::tool_failure(GateKind::Security, &e),
        };
        let payload = serde_json::to_value(&report).unwrap_or_default();
        let result = if report.is_secure() {
            GateResult::pass(GateKind::Security, "no security findings")
        } else {
            GateResult::fail(
                GateKind::Security,
                format!(
                    "{} security finding(s):\n{}",
                    report.findings.len(),
                    report.render()
                ),
            )
        };
        result.with_report(payload)
    }

    pub async fn complexity_gate(&self, content: &str) -> GateResult {
        let report = match self.tools.complexity.analyze(content).await {
            Ok(report) => report,
            Err(e) => return GateResult::tool_failure(GateKind::Complexity, &e),
        };
        let max = self.config.max_complexity;
        let payload = serde_json::to_value(&report).unwrap_or_default();
        let over = report.exceeding(max);
        let result = if over.is_empty() {
            GateResult::pass(
                GateKind::Complexity,
                format!("all {} unit(s) within complexity {max}", report.units.len()),
            )
        } else {
            let listed = over
                .iter()
                .map(|u| format!("{} ({})", u.name, u.complexity))
                .collect::<Vec<_>>()
                .join(", ");
            GateResult::fail(
                GateKind::Complexity,
                format!("cyclomatic complexity above {max}: {listed}"),
            )
        };
        result.with_report(payload)
    }

    /// Author tests for `content` and run them. Returns the gate result plus
    /// the test code and run report when they exist.
    pub async fn test_gate(
        &self,
        content: &str,
        module_name: &str,
    ) -> (GateResult, Option<String>, Option<TestRunReport>) {
        let tests = match self.test_author.write_tests(content, module_name).await {
            Ok(tests) => tests,
            Err(e) => return (GateResult::collaborator_failure(GateKind::Test, &e), None, None),
        };
        let report = match self.tools.tests.run(content, &tests, module_name).await {
            Ok(report) => report,
            Err(e) => return (GateResult::tool_failure(GateKind::Test, &e), Some(tests), None),
        };
        let result = if report.passed {
            GateResult::pass(GateKind::Test, "generated tests passed")
        } else {
            GateResult::fail(
                GateKind::Test,
                format!("generated tests failed:\n{}", report.output),
            )
        };
        (result, Some(tests), Some(report))
    }

    /// Run the full battery over `content`, stopping at the first failure.
    #[instrument(skip(self, content))]
    pub async fn run_battery(&self, content: &str, file_name: &str) -> BatteryOutcome {
        METRICS.inc_battery_runs();
        let mut results = Vec::with_capacity(GateKind::BATTERY.len());

        for kind in [GateKind::Style, GateKind::Security, GateKind::Complexity] {
            let result = match kind {
                GateKind::Style => self.style_gate(content).await,
                GateKind::Security => self.security_gate(content).await,
                _ => self.complexity_gate(content).await,
            };
            obs::emit_gate_evaluated(file_name, &result);
            if !result.passed {
                return BatteryOutcome::Failed {
                    failure: result,
                    results,
                };
            }
            results.push(result);
        }

        let (result, tests, test_report) = self.test_gate(content, &module_name(file_name)).await;
        obs::emit_gate_evaluated(file_name, &result);
        match (result.passed, tests, test_report) {
            (true, Some(tests), Some(test_report)) => {
                results.push(result);
                BatteryOutcome::Passed {
                    results,
                    tests,
                    test_report,
                }
            }
            _ => BatteryOutcome::Failed {
                failure: result,
                results,
            },
        }
    }
}

/// Importable module name for a file: its stem, or `candidate`.
pub fn module_name(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("candidate")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ToolError;
    use crate::fakes::{
        passing_toolchain, FakeComplexity, FakeSecurity, FakeStyle, FakeTestRunner,
        StaticTestAuthor,
    };

    fn gauntlet(tools: Toolchain) -> Gauntlet {
        Gauntlet::new(
            tools,
            Arc::new(StaticTestAuthor::passing()),
            GauntletConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_style_threshold_is_inclusive() {
        let mut tools = passing_toolchain();
        tools.style = Arc::new(FakeStyle::scoring(7.0));
        let result = gauntlet(tools).style_gate("x = 1").await;
        assert!(result.passed);
        assert_eq!(result.report.unwrap()["score"], json!(7.0));
    }

    #[tokio::test]
    async fn test_complexity_ceiling_is_inclusive() {
        let mut tools = passing_toolchain();
        tools.complexity = Arc::new(FakeComplexity::single(10));
        assert!(gauntlet(tools.clone()).complexity_gate("").await.passed);

        tools.complexity = Arc::new(FakeComplexity::single(11));
        let result = gauntlet(tools).complexity_gate("").await;
        assert!(!result.passed);
        assert!(result.detail.contains("main (11)"));
    }

    #[tokio::test]
    async fn test_all_pass_keeps_every_result() {
        let outcome = gauntlet(passing_toolchain()).run_battery("x = 1", "calc.py").await;
        match outcome {
            BatteryOutcome::Passed {
                results,
                test_report,
                ..
            } => {
                let kinds: Vec<_> = results.iter().map(|r| r.kind).collect();
                assert_eq!(kinds, GateKind::BATTERY.to_vec());
                assert!(test_report.passed);
            }
            other => panic!("expected pass, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_security_failure_short_circuits() {
        let complexity = Arc::new(FakeComplexity::single(1));
        let runner = Arc::new(FakeTestRunner::passing());
        let tools = Toolchain {
            style: Arc::new(FakeStyle::scoring(9.0)),
            security: Arc::new(FakeSecurity::sequence(vec![Ok(FakeSecurity::finding("HIGH"))])),
            complexity: complexity.clone(),
            tests: runner.clone(),
        };
        let outcome = gauntlet(tools).run_battery("exec(x)", "calc.py").await;
        match outcome {
            BatteryOutcome::Failed { failure, results } => {
                assert_eq!(failure.kind, GateKind::Security);
                assert!(failure.detail.contains("[HIGH]"));
                assert_eq!(results.len(), 1);
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(complexity.calls(), 0);
        assert_eq!(runner.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_tool_is_failing_result_not_panic() {
        let mut tools = passing_toolchain();
        tools.style = Arc::new(FakeStyle::failing(ToolError::Unavailable {
            tool: "pylint".to_string(),
            reason: "No such file or directory".to_string(),
        }));
        let outcome = gauntlet(tools).run_battery("x = 1", "calc.py").await;
        let BatteryOutcome::Failed { failure, .. } = outcome else {
            panic!("expected failure");
        };
        assert!(failure.tool_failure);
        assert!(failure.detail.contains("pylint"));
    }

    #[tokio::test]
    async fn test_unwritable_tests_fail_test_gate() {
        let g = Gauntlet::new(
            passing_toolchain(),
            Arc::new(StaticTestAuthor::failing(crate::domain::CollaboratorError::Timeout(120))),
            GauntletConfig::default(),
        );
        let outcome = g.run_battery("x = 1", "calc.py").await;
        let BatteryOutcome::Failed { failure, results } = outcome else {
            panic!("expected failure");
        };
        assert_eq!(failure.kind, GateKind::Test);
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn test_module_name() {
        assert_eq!(module_name("calc_project/main.py"), "main");
        assert_eq!(module_name(""), "candidate");
    }
}
