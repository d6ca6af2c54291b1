//! Crucible CLI
//!
//! The `crucible` command plans an objective, materializes it and runs the
//! generated artifacts through the validation gates.
//!
//! ## Commands
//!
//! - `run`: full pipeline for an objective
//! - `plan`: produce (and optionally simulate) a plan without generating files
//! - `challenge`: corrective retry loop for a single file
//! - `gauntlet`: run the gate battery over an existing file
//! - `compare`: proving ground between two registered planners
//! - `doctor`: check tool and model endpoint availability

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crucible_core::collaborators::{PlanAuthor, RiskAssessor};
use crucible_core::metrics::METRICS;
use crucible_core::obs::RunSpan;
use crucible_core::reporting::{read_run_report, render_run_summary_md, write_run_summary_md};
use crucible_core::scorer::LlmPlanScorer;
use crucible_core::{
    run_proving_ground, AgentRegistry, BatteryOutcome, CompletionService, CrucibleConfig,
    Pipeline, PipelineResult, PlanGenerator, RiskSimulator, Toolchain, VerdictStatus,
};
use crucible_llm::{is_ollama_available, OllamaClient, OllamaConfig};
use crucible_tools::{probe_tools, python_toolchain};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "crucible")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Plan, generate and gate code artifacts with corrective retries", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Path to a crucible.toml configuration file
    #[arg(short, long, global = true, env = "CRUCIBLE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline for an objective
    Run {
        /// High-level objective, in natural language
        objective: String,

        /// Project name hint (names the output directory)
        #[arg(short, long)]
        name: Option<String>,

        /// Override the output root directory
        #[arg(long)]
        output_root: Option<PathBuf>,

        /// Directory for run reports
        #[arg(long)]
        report_dir: Option<PathBuf>,

        /// Paths (relative to the project) to send through the retry loop
        #[arg(long = "contest", value_name = "PATH")]
        contested: Vec<PathBuf>,

        /// Write a markdown summary of the run to this file
        #[arg(long)]
        summary: Option<PathBuf>,
    },

    /// Produce a plan for an objective without generating any files
    Plan {
        objective: String,

        /// Number of parallel drafts to score
        #[arg(short, long)]
        drafts: Option<u32>,

        /// Also run the risk simulation on the plan
        #[arg(long)]
        simulate: bool,
    },

    /// Run the corrective retry loop for a single file
    Challenge {
        /// What the file must do
        challenge: String,

        /// File whose current content seeds the loop
        #[arg(short, long)]
        target: PathBuf,

        /// Maximum generation attempts
        #[arg(short, long)]
        max_attempts: Option<u32>,

        /// Write the validated content back to the target
        #[arg(long)]
        promote: bool,
    },

    /// Run the gate battery over an existing file
    Gauntlet {
        file: PathBuf,
    },

    /// Compare two registered planners over a curriculum of objectives
    Compare {
        /// Objectives, one per line
        #[arg(long)]
        curriculum: PathBuf,

        #[arg(long, default_value = "planner")]
        expert: String,

        #[arg(long, default_value = "ensemble-planner")]
        student: String,
    },

    /// Check analysis tools and the model endpoint
    Doctor,

    /// Print the summary of a stored run report
    Report {
        run_id: String,

        #[arg(long)]
        report_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    crucible_core::telemetry::init_tracing(cli.json, level);

    let config =
        CrucibleConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Run {
            objective,
            name,
            output_root,
            report_dir,
            contested,
            summary,
        } => {
            let mut config = config;
            if let Some(root) = output_root {
                config.output_root = root;
            }
            if report_dir.is_some() {
                config.report_dir = report_dir;
            }
            if !contested.is_empty() {
                config.contested_paths = contested;
            }
            let pipeline = default_pipeline(config)?;
            cmd_run(&pipeline, &objective, name.as_deref(), summary.as_deref()).await
        }
        Commands::Plan {
            objective,
            drafts,
            simulate,
        } => {
            let completion = completion_service()?;
            cmd_plan(
                completion,
                &objective,
                drafts.unwrap_or(config.planner.drafts),
                config.planner.max_attempts,
                simulate,
            )
            .await
        }
        Commands::Challenge {
            challenge,
            target,
            max_attempts,
            promote,
        } => {
            let max_attempts = max_attempts.unwrap_or(config.retry.max_attempts);
            let pipeline = default_pipeline(config)?;
            cmd_challenge(&pipeline, &challenge, &target, max_attempts, promote).await
        }
        Commands::Gauntlet { file } => {
            let pipeline = default_pipeline(config)?;
            cmd_gauntlet(&pipeline, &file).await
        }
        Commands::Compare {
            curriculum,
            expert,
            student,
        } => {
            let registry = build_registry(completion_service()?, &config)?;
            cmd_compare(&registry, &curriculum, &expert, &student).await
        }
        Commands::Doctor => cmd_doctor(&config).await,
        Commands::Report { run_id, report_dir } => {
            let dir = report_dir
                .or(config.report_dir)
                .context("No report directory given (use --report-dir or report_dir in config)")?;
            cmd_report(&run_id, &dir)
        }
    }
}

fn completion_service() -> Result<Arc<dyn CompletionService>> {
    let client = OllamaClient::from_env().context("Failed to configure model endpoint")?;
    Ok(Arc::new(client))
}

fn default_pipeline(config: CrucibleConfig) -> Result<Pipeline> {
    let tools = python_toolchain(config.tool_timeout_secs);
    Ok(build_pipeline(completion_service()?, tools, config))
}

fn build_pipeline(
    completion: Arc<dyn CompletionService>,
    tools: Toolchain,
    config: CrucibleConfig,
) -> Pipeline {
    Pipeline::new(completion, tools, config)
}

/// Planners available to `compare`, keyed by capability tag.
fn build_registry(
    completion: Arc<dyn CompletionService>,
    config: &CrucibleConfig,
) -> Result<AgentRegistry> {
    let mut registry = AgentRegistry::new();
    let max_attempts = config.planner.max_attempts;

    let single = completion.clone();
    registry.register("planner", move || {
        let scorer = Arc::new(LlmPlanScorer::new(single.clone()));
        Arc::new(PlanGenerator::new(single.clone(), scorer).with_max_attempts(max_attempts))
            as Arc<dyn PlanAuthor>
    })?;

    let ensemble = completion;
    registry.register("ensemble-planner", move || {
        let scorer = Arc::new(LlmPlanScorer::new(ensemble.clone()));
        Arc::new(
            PlanGenerator::new(ensemble.clone(), scorer)
                .with_drafts(3)
                .with_max_attempts(max_attempts),
        ) as Arc<dyn PlanAuthor>
    })?;

    Ok(registry)
}

fn print_result(result: &PipelineResult) {
    let mark = if result.is_success() { "✓" } else { "✗" };
    println!("Run ID: {}", result.run_id);
    println!("Status: {} {}", mark, result.status);
    println!("Phase: {}", result.phase.name());
    println!("Reason: {}", result.reason);
    if let Some(location) = &result.output_location {
        println!("Output: {}", location.display());
    }
    if let Some(debug) = &result.reports.debug {
        println!(
            "Debug: {}/{} unit(s) clean",
            debug.units.len() - debug.unresolved().count(),
            debug.units.len()
        );
    }
    for contest in &result.reports.tests {
        let status = if contest.passed { "✓" } else { "✗" };
        println!(
            "  {} {} ({} attempt(s))",
            status,
            contest.path.display(),
            contest.attempts
        );
    }
    if let Some(security) = &result.reports.security {
        if !security.is_secure() {
            println!("Security findings:");
            for line in security.render().lines() {
                println!("  - {}", line);
            }
        }
    }
}

/// Run the full pipeline
async fn cmd_run(
    pipeline: &Pipeline,
    objective: &str,
    name: Option<&str>,
    summary: Option<&Path>,
) -> Result<()> {
    info!("Running pipeline for objective: {}", objective);
    let result = pipeline.run_pipeline(objective, name).await;
    METRICS.flush();
    print_result(&result);

    if let Some(path) = summary {
        write_run_summary_md(path, &result)?;
        println!("Summary written to {}", path.display());
    }

    if result.is_success() {
        Ok(())
    } else {
        anyhow::bail!("Pipeline failed: {}", result.reason)
    }
}

/// Produce a plan and print it as JSON
async fn cmd_plan(
    completion: Arc<dyn CompletionService>,
    objective: &str,
    drafts: u32,
    max_attempts: u32,
    simulate: bool,
) -> Result<()> {
    let scorer = Arc::new(LlmPlanScorer::new(completion.clone()));
    let planner = PlanGenerator::new(completion.clone(), scorer)
        .with_drafts(drafts)
        .with_max_attempts(max_attempts);

    let plan = planner
        .create_plan(objective)
        .await
        .context("Failed to produce a plan")?;
    println!("{}", serde_json::to_string_pretty(&plan)?);

    if simulate {
        let verdict = RiskSimulator::new(completion).simulate(&plan).await;
        let mark = match verdict.status {
            VerdictStatus::Pass => "✓",
            VerdictStatus::Warning => "!",
            VerdictStatus::Fail => "✗",
        };
        println!();
        println!(
            "Simulation: {} {:?} (confidence {:.2})",
            mark, verdict.status, verdict.confidence
        );
        for risk in &verdict.risks {
            println!("  - [{:?}] {}: {}", risk.severity, risk.id, risk.description);
        }
        if verdict.is_fail() {
            anyhow::bail!("Plan failed simulation");
        }
    }
    Ok(())
}

/// Run the retry loop for one file
async fn cmd_challenge(
    pipeline: &Pipeline,
    challenge: &str,
    target: &Path,
    max_attempts: u32,
    promote: bool,
) -> Result<()> {
    let colosseum = pipeline.colosseum();

    let report = if promote {
        colosseum
            .run_validation_cycle(challenge, target, max_attempts)
            .await?
    } else {
        let seed = std::fs::read_to_string(target).unwrap_or_default();
        let file_name = target
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("candidate.py");
        colosseum
            .run_cycle(challenge, seed, file_name, max_attempts)
            .await?
    };

    println!("✓ Passed after {} attempt(s)", report.attempts_used);
    for gate in &report.gate_reports {
        println!("  ✓ {}: {}", gate.kind, gate.detail.lines().next().unwrap_or_default());
    }
    if promote {
        println!("Promoted validated content to {}", target.display());
    } else {
        println!();
        println!("{}", report.final_content);
    }
    Ok(())
}

/// Run the battery over an existing file
async fn cmd_gauntlet(pipeline: &Pipeline, file: &Path) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {:?}", file))?;
    let file_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("candidate.py");

    let outcome = pipeline.gauntlet().run_battery(&content, file_name).await;
    for gate in outcome.results() {
        let status = if gate.passed { "✓" } else { "✗" };
        println!("  {} {}", status, gate.kind);
        if !gate.passed {
            for line in gate.detail.lines() {
                println!("      {}", line);
            }
        }
    }

    match outcome {
        BatteryOutcome::Passed { .. } => {
            println!("\n✓ All gates passed!");
            Ok(())
        }
        BatteryOutcome::Failed { failure, .. } => {
            anyhow::bail!("Gate '{}' failed", failure.kind)
        }
    }
}

fn read_curriculum(path: &Path) -> Result<Vec<String>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read curriculum {:?}", path))?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Proving ground between two registered planners
async fn cmd_compare(
    registry: &AgentRegistry,
    curriculum: &Path,
    expert: &str,
    student: &str,
) -> Result<()> {
    let objectives = read_curriculum(curriculum)?;
    if objectives.is_empty() {
        anyhow::bail!("Curriculum {:?} has no objectives", curriculum);
    }

    let report = run_proving_ground(registry, expert, student, &objectives).await?;
    for task in &report.tasks {
        println!(
            "  {} / {}  {}",
            if task.expert_passed { "✓" } else { "✗" },
            if task.student_passed { "✓" } else { "✗" },
            task.objective
        );
    }
    println!();
    println!("{}: {}/{}", report.expert, report.expert_score, report.tasks.len());
    println!("{}: {}/{}", report.student, report.student_score, report.tasks.len());
    println!("Verdict: {:?}", report.verdict);
    Ok(())
}

/// Check the environment
async fn cmd_doctor(config: &CrucibleConfig) -> Result<()> {
    println!("Crucible {}", crucible_core::VERSION);
    println!("======================");
    println!();

    println!("Analysis tools:");
    let probes = probe_tools(config.tool_timeout_secs.min(20)).await;
    for probe in &probes {
        let status = if probe.available { "✓" } else { "✗" };
        println!("  {} {}: {}", status, probe.tool, probe.detail);
    }
    println!();

    let llm = OllamaConfig::from_env().context("Failed to read model endpoint configuration")?;
    let reachable = is_ollama_available(&llm).await;
    println!("Model endpoint:");
    println!(
        "  {} {} (model: {})",
        if reachable { "✓" } else { "✗" },
        llm.host,
        llm.model
    );
    println!();

    println!("Configuration:");
    println!("  output_root: {}", config.output_root.display());
    match &config.report_dir {
        Some(dir) => println!("  report_dir: {}", dir.display()),
        None => println!("  report_dir: (not set)"),
    }
    println!("  max_attempts: {}", config.retry.max_attempts);
    println!("  min_style_score: {}", config.gauntlet.min_style_score);
    println!("  max_complexity: {}", config.gauntlet.max_complexity);

    if probes.iter().all(|p| p.available) && reachable {
        println!("\n✓ Ready");
        Ok(())
    } else {
        anyhow::bail!("Some dependencies are unavailable")
    }
}

/// Print a stored run report
fn cmd_report(run_id: &str, dir: &Path) -> Result<()> {
    let _span = RunSpan::enter(run_id);
    let report = read_run_report(run_id, dir).context("Failed to read run report")?;
    println!("Objective: {}", report.objective);
    println!("Generated: {}", report.generated_at);
    println!("Duration: {}ms", report.duration_ms);
    println!();
    print!("{}", render_run_summary_md(&report.result));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crucible_core::fakes::{
        passing_toolchain, CountingGenerator, ScriptedCompletion, StaticPlanAuthor,
        StaticRiskAssessor, StaticTestAuthor,
    };
    use crucible_core::reporting::{write_run_report, RunReport};
    use crucible_core::PipelineStatus;

    const PLAN: &str = r#"{
        "project_name": "calc",
        "technologies": ["Python"],
        "file_structure": { "calc": { "main.py": "define add(a, b)" } },
        "execution_steps": []
    }"#;

    fn fake_pipeline(root: &Path) -> Pipeline {
        let config = CrucibleConfig {
            output_root: root.to_path_buf(),
            ..CrucibleConfig::default()
        };
        build_pipeline(
            Arc::new(ScriptedCompletion::new(["def add(a, b):\n    return a + b\n"])),
            passing_toolchain(),
            config,
        )
        .with_planner(Arc::new(StaticPlanAuthor::from_json(PLAN).unwrap()))
        .with_simulator(Arc::new(StaticRiskAssessor::passing()))
        .with_generator(Arc::new(CountingGenerator::new()))
        .with_test_author(Arc::new(StaticTestAuthor::passing()))
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from([
            "crucible",
            "--verbose",
            "run",
            "build a calculator",
            "--name",
            "calc",
            "--contest",
            "calc/main.py",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Run {
                objective,
                name,
                contested,
                ..
            } => {
                assert_eq!(objective, "build a calculator");
                assert_eq!(name.as_deref(), Some("calc"));
                assert_eq!(contested, vec![PathBuf::from("calc/main.py")]);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_cli_parses_challenge_promote() {
        let cli = Cli::try_parse_from([
            "crucible",
            "challenge",
            "add two numbers",
            "--target",
            "math.py",
            "--promote",
        ])
        .unwrap();
        match cli.command {
            Commands::Challenge {
                promote,
                max_attempts,
                ..
            } => {
                assert!(promote);
                assert_eq!(max_attempts, None);
            }
            _ => panic!("expected challenge"),
        }
    }

    #[test]
    fn test_registry_has_both_planners() {
        let registry = build_registry(
            Arc::new(ScriptedCompletion::unreachable()),
            &CrucibleConfig::default(),
        )
        .unwrap();
        let tags: Vec<_> = registry.tags().collect();
        assert_eq!(tags, vec!["ensemble-planner", "planner"]);
    }

    #[test]
    fn test_read_curriculum_skips_blank_and_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("curriculum.txt");
        std::fs::write(&path, "# warmup\nbuild a calculator\n\n  write a todo app \n").unwrap();
        assert_eq!(
            read_curriculum(&path).unwrap(),
            vec!["build a calculator", "write a todo app"]
        );
    }

    #[tokio::test]
    async fn test_cmd_run_writes_summary() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = fake_pipeline(dir.path());
        let summary = dir.path().join("summary.md");

        cmd_run(&pipeline, "build a calculator", Some("calc"), Some(&summary))
            .await
            .unwrap();

        assert!(dir.path().join("calc/calc/main.py").exists());
        let md = std::fs::read_to_string(&summary).unwrap();
        assert!(md.contains("SUCCESS"));
    }

    #[tokio::test]
    async fn test_cmd_gauntlet_passes_clean_file() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = fake_pipeline(dir.path());
        let file = dir.path().join("calc.py");
        std::fs::write(&file, "def add(a, b):\n    return a + b\n").unwrap();

        cmd_gauntlet(&pipeline, &file).await.unwrap();
    }

    #[tokio::test]
    async fn test_cmd_challenge_promote_writes_target() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = fake_pipeline(dir.path());
        let target = dir.path().join("calc.py");

        cmd_challenge(&pipeline, "define add(a, b)", &target, 2, true)
            .await
            .unwrap();

        let written = std::fs::read_to_string(&target).unwrap();
        assert!(written.contains("def add"));
    }

    #[test]
    fn test_cmd_report_reads_stored_run() {
        let dir = tempfile::tempdir().unwrap();
        let result = PipelineResult {
            run_id: "run-42".to_string(),
            status: PipelineStatus::Success,
            reason: "pipeline completed".to_string(),
            phase: crucible_core::PipelinePhase::Done,
            output_location: None,
            reports: Default::default(),
        };
        write_run_report(&RunReport::new("build it", 12, result), dir.path()).unwrap();
        cmd_report("run-42", dir.path()).unwrap();
    }
}
