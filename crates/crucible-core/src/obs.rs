//! Structured observability hooks for pipeline lifecycle events.
//!
//! - Run-scoped spans via [`RunSpan`] (sync code) or [`run_span`] (futures)
//! - Emission functions for pipeline, phase, gate and retry-cycle events

use tracing::info;

use crate::domain::{GateResult, PipelinePhase, PipelineStatus};

/// RAII guard that enters a run-scoped tracing span.
///
/// ```ignore
/// let _span = RunSpan::enter("run-12345");
/// ```
pub struct RunSpan {
    _span: tracing::span::EnteredSpan,
}

impl RunSpan {
    pub fn enter(run_id: &str) -> Self {
        Self {
            _span: run_span(run_id).entered(),
        }
    }
}

/// Span tagged with the run id, for `Instrument::instrument` on futures.
pub fn run_span(run_id: &str) -> tracing::Span {
    tracing::info_span!("crucible.run", run_id = %run_id)
}

pub fn emit_pipeline_started(run_id: &str, objective: &str) {
    info!(event = "pipeline.started", run_id = %run_id, objective = %objective);
}

pub fn emit_phase_entered(run_id: &str, phase: PipelinePhase) {
    info!(event = "phase.entered", run_id = %run_id, phase = phase.name());
}

pub fn emit_gate_evaluated(target: &str, result: &GateResult) {
    info!(
        event = "gate.evaluated",
        target = %target,
        gate = result.kind.name(),
        passed = result.passed,
        tool_failure = result.tool_failure,
    );
}

/// Emit event: a retry-cycle state transition.
pub fn emit_cycle_transition(target: &str, attempt: u32, from: &str, to: &str) {
    info!(
        event = "cycle.transition",
        target = %target,
        attempt = attempt,
        from = from,
        to = to,
    );
}

pub fn emit_pipeline_finished(run_id: &str, status: PipelineStatus, duration_ms: u64) {
    info!(
        event = "pipeline.finished",
        run_id = %run_id,
        status = %status,
        duration_ms = duration_ms,
    );
}

/// Emit event: a run report could not be written (warning level).
pub fn emit_report_error(run_id: &str, error: &dyn std::fmt::Display) {
    tracing::warn!(event = "report.write_error", run_id = %run_id, error = %error);
}
