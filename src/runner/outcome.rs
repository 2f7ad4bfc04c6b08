//! Classified step outcomes.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::steps::{Artifact, StepId};

/// The classified result of executing a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum Outcome {
    /// The handler finished and produced an artifact.
    Success(Artifact),
    /// The user declined an external approval.
    UserCancelled,
    /// A recognised recoverable fault, still failing after the automatic retry.
    Transient(String),
    /// The identity/session was unusable; the handler was not invoked.
    PreconditionFailed(String),
    /// The handler did not finish within the step timeout.
    TimedOut,
    /// Anything unrecognised.
    Fatal(String),
}

/// How a notification should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Warning,
    Error,
}

impl Outcome {
    /// Check if the step succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// Check if the orchestrator may re-invoke the step on its own.
    pub fn is_retry_eligible(&self) -> bool {
        matches!(self, Outcome::Transient(_) | Outcome::TimedOut)
    }

    /// Short name of the outcome.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success(_) => "success",
            Outcome::UserCancelled => "user_cancelled",
            Outcome::Transient(_) => "transient",
            Outcome::PreconditionFailed(_) => "precondition_failed",
            Outcome::TimedOut => "timed_out",
            Outcome::Fatal(_) => "fatal",
        }
    }

    /// The user-facing notification for this outcome.
    pub fn notification(&self, step: StepId, timeout: Duration) -> (Severity, String) {
        match self {
            Outcome::Success(_) => (Severity::Success, step.success_message().to_string()),
            Outcome::UserCancelled => (
                Severity::Warning,
                format!("{} was cancelled; retry when ready", step.label()),
            ),
            Outcome::Transient(reason) => (
                Severity::Error,
                format!("{} failed after retrying: {}", step.label(), reason),
            ),
            Outcome::PreconditionFailed(reason) => (
                Severity::Error,
                format!("{} could not start: {}", step.label(), reason),
            ),
            Outcome::TimedOut => (
                Severity::Error,
                format!(
                    "{} timed out after {}s",
                    step.label(),
                    timeout.as_secs_f64()
                ),
            ),
            Outcome::Fatal(reason) => (
                Severity::Error,
                format!("{} failed: {}", step.label(), reason),
            ),
        }
    }
}
