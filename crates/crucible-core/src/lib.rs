//! Crucible Core Library
//!
//! Plans an objective, simulates its risks, materializes the planned files
//! and runs generated artifacts through a bounded, self-correcting gate
//! battery.

pub mod collaborators;
pub mod colosseum;
pub mod config;
pub mod context;
pub mod debugger;
pub mod domain;
pub mod fakes;
pub mod gauntlet;
pub mod generation;
pub mod materializer;
pub mod metrics;
pub mod obs;
pub mod pipeline;
pub mod planner;
pub mod prompts;
pub mod proving_ground;
pub mod registry;
pub mod reporting;
pub mod scorer;
pub mod simulator;
pub mod summary;
pub mod telemetry;

pub use domain::{
    CollaboratorError, ContestReport, CrucibleError, DebugReport, GateKind, GateResult, Plan,
    PlanError, PlanNode, PlanValidationError, PipelinePhase, PipelineResult, PipelineStatus,
    Result, RetryExhausted, RiskItem, RiskSeverity, RiskVerdict, ToolError, VerdictStatus,
};
pub use domain::{
    ComplexityReport, ComplexityUnit, SecurityFinding, SecurityReport, StyleReport, TestRunReport,
};

pub use collaborators::{
    complete_json, ArtifactGenerator, ComplexityAnalyzer, CompletionService, PlanAuthor,
    PlanScorer, RiskAssessor, SecurityScanner, StyleAnalyzer, TestAuthor, TestRunner, Toolchain,
};

pub use colosseum::{Colosseum, CycleReport, CycleState, RetryCycle, RetryState};
pub use config::CrucibleConfig;
pub use context::ArtifactContext;
pub use gauntlet::{BatteryOutcome, Gauntlet};
pub use materializer::{MaterializeReport, Materializer};
pub use pipeline::Pipeline;
pub use planner::PlanGenerator;
pub use proving_ground::{run_proving_ground, ProvingReport, ProvingVerdict};
pub use registry::{AgentRegistry, RegistryError};
pub use simulator::RiskSimulator;

/// Crate version, as reported by `crucible --version` and `doctor`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
