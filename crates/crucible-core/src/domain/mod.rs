//! Domain models for Crucible.
//!
//! Canonical definitions for the core entities:
//! - `Plan`: project metadata plus a nested file/description tree
//! - `RiskVerdict`: simulator output with typed risk findings
//! - `GateResult`: one pass/fail check result
//! - `PipelineResult`: terminal record of a pipeline run

pub mod error;
pub mod gate;
pub mod outcome;
pub mod plan;
pub mod risk;
pub mod tooling;

// Re-export main types and errors
pub use error::{
    CollaboratorError, CrucibleError, PlanError, PlanValidationError, Result, RetryExhausted,
    ToolError,
};
pub use gate::{GateKind, GateResult};
pub use outcome::{
    ContestReport, DebugReport, Outcome, PipelinePhase, PipelineReports, PipelineResult,
    PipelineStatus, UnitDebugOutcome,
};
pub use plan::{ExecutionStep, FileTree, Plan, PlanLeaf, PlanNode};
pub use risk::{RiskItem, RiskSeverity, RiskVerdict, VerdictStatus};
pub use tooling::{
    ComplexityReport, ComplexityUnit, SecurityFinding, SecurityReport, StyleReport, TestRunReport,
};
