//! Domain-level error taxonomy for Crucible.

use crate::domain::gate::GateResult;

/// The generative text service was unreachable or returned unusable output.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CollaboratorError {
    #[error("completion service unreachable: {0}")]
    Unreachable(String),

    #[error("completion service returned unusable output: {0}")]
    UnusableOutput(String),

    #[error("completion service timed out after {0}s")]
    Timeout(u64),
}

/// A static-analysis or test tool could not produce a usable result.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToolError {
    #[error("tool '{tool}' is unavailable: {reason}")]
    Unavailable { tool: String, reason: String },

    #[error("tool '{tool}' timed out after {secs}s")]
    Timeout { tool: String, secs: u64 },

    #[error("tool '{tool}' produced unparseable output: {reason}")]
    Unparseable { tool: String, reason: String },
}

/// Structural problems with a Plan.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanValidationError {
    #[error("plan has an empty or missing file_structure")]
    EmptyFileStructure,

    #[error("plan leaf '{path}' has an empty description")]
    EmptyLeaf { path: String },

    #[error("plan entry under '{parent}' has an empty name")]
    EmptyName { parent: String },

    #[error("plan path '{path}' escapes the output root")]
    UnsafePath { path: String },
}

/// Plan Generator failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlanError {
    #[error("generation_failed: no valid plan after {attempts} attempt(s): {last_error}")]
    GenerationFailed { attempts: u32, last_error: String },

    #[error("invalid plan: {0}")]
    Invalid(#[from] PlanValidationError),
}

impl PlanError {
    /// Stable machine-readable reason code.
    pub fn reason(&self) -> &'static str {
        match self {
            PlanError::GenerationFailed { .. } => "generation_failed",
            PlanError::Invalid(_) => "invalid_plan",
        }
    }
}

/// The Corrective Retry Loop used every attempt without a PASS.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("challenger failed the gauntlet after {attempts} attempt(s)")]
pub struct RetryExhausted {
    pub attempts: u32,
    pub last_failure: Option<GateResult>,
}

/// Crucible domain errors.
#[derive(Debug, thiserror::Error)]
pub enum CrucibleError {
    #[error("planning failed: {0}")]
    Plan(#[from] PlanError),

    #[error(transparent)]
    RetryExhausted(#[from] RetryExhausted),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for Crucible domain operations.
pub type Result<T> = std::result::Result<T, CrucibleError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::gate::GateKind;

    #[test]
    fn test_plan_error_reason_codes() {
        let err = PlanError::GenerationFailed {
            attempts: 2,
            last_error: "bad json".to_string(),
        };
        assert_eq!(err.reason(), "generation_failed");
        assert!(err.to_string().contains("generation_failed"));

        let err = PlanError::from(PlanValidationError::EmptyFileStructure);
        assert_eq!(err.reason(), "invalid_plan");
    }

    #[test]
    fn test_retry_exhausted_display() {
        let err = RetryExhausted {
            attempts: 3,
            last_failure: Some(GateResult::fail(GateKind::Style, "score 4.0 < 7.0")),
        };
        assert!(err.to_string().contains("3 attempt"));
    }

    #[test]
    fn test_tool_error_display() {
        let err = ToolError::Timeout {
            tool: "pylint".to_string(),
            secs: 90,
        };
        assert!(err.to_string().contains("pylint"));
        assert!(err.to_string().contains("90"));
    }

    #[test]
    fn test_digest_mismatch_error() {
        let err = CrucibleError::DigestMismatch {
            expected: "abc123".to_string(),
            actual: "def456".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("abc123"));
        assert!(msg.contains("def456"));
    }
}
