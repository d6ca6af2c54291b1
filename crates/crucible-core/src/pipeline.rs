//! Pipeline Orchestrator: PLAN -> SIMULATE -> GENERATE_ALL -> (CONTEST) ->
//! DEBUG -> SECURE -> DONE, with a FAIL exit from every phase.
//!
//! Phases run strictly in order. Warnings only ever downgrade the outcome;
//! nothing upgrades it back.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn, Instrument};
use uuid::Uuid;

use crate::collaborators::{
    ArtifactGenerator, CompletionService, PlanAuthor, RiskAssessor, TestAuthor, Toolchain,
};
use crate::colosseum::Colosseum;
use crate::config::CrucibleConfig;
use crate::debugger::Debugger;
use crate::domain::plan;
use crate::domain::{
    ContestReport, Outcome, Plan, PipelinePhase, PipelineReports, PipelineResult,
    PipelineStatus, RiskItem, VerdictStatus,
};
use crate::gauntlet::Gauntlet;
use crate::generation::{LlmArtifactGenerator, LlmTestAuthor};
use crate::materializer::Materializer;
use crate::metrics::METRICS;
use crate::obs;
use crate::planner::PlanGenerator;
use crate::reporting::{write_run_report, RunReport};
use crate::scorer::LlmPlanScorer;
use crate::simulator::RiskSimulator;

pub struct Pipeline {
    config: CrucibleConfig,
    completion: Arc<dyn CompletionService>,
    tools: Toolchain,
    planner: Arc<dyn PlanAuthor>,
    simulator: Arc<dyn RiskAssessor>,
    generator: Arc<dyn ArtifactGenerator>,
    test_author: Arc<dyn TestAuthor>,
}

/// Mutable state of one run. Never shared between runs.
struct RunState<'a> {
    run_id: &'a str,
    phase: PipelinePhase,
    outcome: Outcome,
    reports: PipelineReports,
    output_location: Option<PathBuf>,
}

impl RunState<'_> {
    fn enter(&mut self, phase: PipelinePhase) {
        self.phase = phase;
        obs::emit_phase_entered(self.run_id, phase);
    }

    fn fail(self, reason: String) -> PipelineResult {
        warn!(phase = self.phase.name(), %reason, "pipeline failed");
        PipelineResult {
            run_id: self.run_id.to_string(),
            status: PipelineStatus::Fail,
            reason,
            phase: self.phase,
            output_location: self.output_location,
            reports: self.reports,
        }
    }

    fn finish(mut self) -> PipelineResult {
        self.enter(PipelinePhase::Done);
        PipelineResult {
            run_id: self.run_id.to_string(),
            status: self.outcome.status(),
            reason: self.outcome.reason(),
            phase: self.phase,
            output_location: self.output_location,
            reports: self.reports,
        }
    }
}

impl Pipeline {
    /// Wire the default collaborators around one completion service and toolchain.
    pub fn new(
        completion: Arc<dyn CompletionService>,
        tools: Toolchain,
        config: CrucibleConfig,
    ) -> Self {
        let scorer = Arc::new(LlmPlanScorer::new(completion.clone()));
        let planner = PlanGenerator::new(completion.clone(), scorer)
            .with_drafts(config.planner.drafts)
            .with_max_attempts(config.planner.max_attempts);
        Self {
            planner: Arc::new(planner),
            simulator: Arc::new(RiskSimulator::new(completion.clone())),
            generator: Arc::new(LlmArtifactGenerator::new(completion.clone())),
            test_author: Arc::new(LlmTestAuthor::new(completion.clone())),
            completion,
            tools,
            config,
        }
    }

    pub fn with_planner(mut self, planner: Arc<dyn PlanAuthor>) -> Self {
        self.planner = planner;
        self
    }

    pub fn with_simulator(mut self, simulator: Arc<dyn RiskAssessor>) -> Self {
        self.simulator = simulator;
        self
    }

    pub fn with_generator(mut self, generator: Arc<dyn ArtifactGenerator>) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_test_author(mut self, test_author: Arc<dyn TestAuthor>) -> Self {
        self.test_author = test_author;
        self
    }

    pub fn config(&self) -> &CrucibleConfig {
        &self.config
    }

    pub fn gauntlet(&self) -> Gauntlet {
        Gauntlet::new(
            self.tools.clone(),
            self.test_author.clone(),
            self.config.gauntlet,
        )
    }

    pub fn colosseum(&self) -> Colosseum {
        Colosseum::new(self.completion.clone(), Arc::new(self.gauntlet()))
    }

    /// Run the whole pipeline for `objective`.
    ///
    /// Output goes to `<output_root>/<slug>`, where the slug comes from
    /// `project_name_hint` or else the plan's project name. Concurrent runs
    /// must use distinct hints.
    pub async fn run_pipeline(
        &self,
        objective: &str,
        project_name_hint: Option<&str>,
    ) -> PipelineResult {
        let run_id = Uuid::new_v4().to_string();
        let started = Instant::now();
        obs::emit_pipeline_started(&run_id, objective);

        let result = self
            .run_phases(&run_id, objective, project_name_hint)
            .instrument(obs::run_span(&run_id))
            .await;

        let duration_ms = started.elapsed().as_millis() as u64;
        METRICS.inc_pipelines_finished();
        obs::emit_pipeline_finished(&run_id, result.status, duration_ms);

        if let Some(dir) = &self.config.report_dir {
            let report = RunReport::new(objective, duration_ms, result.clone());
            if let Err(e) = write_run_report(&report, dir) {
                obs::emit_report_error(&run_id, &e);
            }
        }
        result
    }

    async fn run_phases(
        &self,
        run_id: &str,
        objective: &str,
        project_name_hint: Option<&str>,
    ) -> PipelineResult {
        let mut run = RunState {
            run_id,
            phase: PipelinePhase::Plan,
            outcome: Outcome::new(),
            reports: PipelineReports::default(),
            output_location: None,
        };

        // PLAN
        run.enter(PipelinePhase::Plan);
        let plan = match self.planner.create_plan(objective).await {
            Ok(plan) => plan,
            Err(e) => return run.fail(format!("planning failed: {e}")),
        };
        if let Err(e) = plan.validate() {
            return run.fail(format!("planning failed: invalid plan: {e}"));
        }
        info!(project = %plan.project_name, files = plan.leaves().len(), "plan ready");

        // SIMULATE
        run.enter(PipelinePhase::Simulate);
        let verdict = self.simulator.simulate(&plan).await;
        let status = verdict.status;
        let summary = risk_summary(verdict.risks.iter());
        let blocking = risk_summary(verdict.blocking_risks());
        run.reports.simulation = Some(verdict);
        match status {
            VerdictStatus::Fail => return run.fail(format!("Simulation failed: {blocking}")),
            VerdictStatus::Warning => {
                warn!(risks = %summary, "simulation raised warnings, continuing");
                run.outcome.downgrade(
                    PipelineStatus::SuccessWithWarnings,
                    format!("simulation warnings: {summary}"),
                );
            }
            VerdictStatus::Pass => {}
        }

        // GENERATE_ALL
        run.enter(PipelinePhase::GenerateAll);
        let root = self
            .config
            .output_root
            .join(slug(project_name_hint.unwrap_or(&plan.project_name)));
        run.output_location = Some(root.clone());
        let materialized = Materializer::new(self.generator.clone())
            .materialize(&root, &plan.file_structure)
            .await;
        if let Some(halt) = &materialized.halted {
            return run.fail(format!(
                "generation failed at {}: {}",
                halt.path.display(),
                halt.reason
            ));
        }

        // CONTEST
        if !self.config.contested_paths.is_empty() {
            run.enter(PipelinePhase::Contest);
            if let Err(reason) = self.contest(&plan, &root, &mut run.reports.tests).await {
                return run.fail(reason);
            }
        }

        // DEBUG
        if self.config.debug.enabled {
            run.enter(PipelinePhase::Debug);
            let debugger = Debugger::new(
                self.completion.clone(),
                self.tools.style.clone(),
                self.config.gauntlet.min_style_score,
                self.config.debug.max_attempts,
            );
            let report = debugger.debug_all(&root, &materialized.written).await;
            let unresolved = report.unresolved().count();
            if unresolved > 0 {
                run.outcome.downgrade(
                    PipelineStatus::SuccessWithWarnings,
                    format!("{unresolved} unit(s) still have lint problems"),
                );
            }
            run.reports.debug = Some(report);
        }

        // SECURE
        run.enter(PipelinePhase::Secure);
        match self.tools.security.scan_path(&root).await {
            Ok(report) => {
                if !report.is_secure() {
                    run.outcome.downgrade(
                        PipelineStatus::SuccessWithSecurityWarnings,
                        format!("{} security finding(s)", report.findings.len()),
                    );
                }
                run.reports.security = Some(report);
            }
            Err(e) => return run.fail(format!("security scan failed: {e}")),
        }

        run.finish()
    }

    /// Send every contested path through the retry loop. The first
    /// exhausted path ends the run.
    async fn contest(
        &self,
        plan: &Plan,
        root: &Path,
        reports: &mut Vec<ContestReport>,
    ) -> Result<(), String> {
        let leaves = plan::leaves(&plan.file_structure);
        let colosseum = self.colosseum();

        for contested in &self.config.contested_paths {
            let Some(leaf) = leaves.iter().find(|l| &l.path == contested) else {
                warn!(path = %contested.display(), "contested path is not part of the plan");
                continue;
            };
            let target = root.join(&leaf.path);
            let seed = tokio::fs::read_to_string(&target).await.unwrap_or_default();
            let file_name = leaf
                .path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("candidate.py");

            match colosseum
                .run_cycle(leaf.description, seed, file_name, self.config.retry.max_attempts)
                .await
            {
                Ok(cycle) => {
                    if let Err(e) = tokio::fs::write(&target, &cycle.final_content).await {
                        return Err(format!("cannot write {}: {e}", target.display()));
                    }
                    reports.push(ContestReport {
                        path: leaf.path.clone(),
                        passed: true,
                        attempts: cycle.attempts_used,
                        gate_reports: cycle.gate_reports,
                        test_report: Some(cycle.test_report),
                        last_failure: cycle.last_failure,
                    });
                }
                Err(exhausted) => {
                    let detail = exhausted
                        .last_failure
                        .as_ref()
                        .map(|f| format!("{}: {}", f.kind, f.detail))
                        .unwrap_or_else(|| "no attempts allowed".to_string());
                    reports.push(ContestReport {
                        path: leaf.path.clone(),
                        passed: false,
                        attempts: exhausted.attempts,
                        gate_reports: Vec::new(),
                        test_report: None,
                        last_failure: exhausted.last_failure.clone(),
                    });
                    return Err(format!(
                        "validation exhausted for {} after {} attempt(s): {detail}",
                        leaf.path.display(),
                        exhausted.attempts
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Filesystem-safe directory name: lowercase alphanumerics joined by `_`.
fn risk_summary<'a>(risks: impl Iterator<Item = &'a RiskItem>) -> String {
    risks
        .map(|r| format!("[{:?}] {}", r.severity, r.description))
        .collect::<Vec<_>>()
        .join("; ")
}

pub fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('_') && !out.is_empty() {
            out.push('_');
        }
    }
    let out = out.trim_end_matches('_').to_string();
    if out.is_empty() {
        "project".to_string()
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug() {
        assert_eq!(slug("Calc Project!"), "calc_project");
        assert_eq!(slug("  ../../etc  "), "etc");
        assert_eq!(slug("***"), "project");
        assert_eq!(slug("todo_app"), "todo_app");
    }
}
