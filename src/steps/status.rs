//! Step status tracking.

use serde::{Deserialize, Serialize};

use super::StepId;

/// Status of a step in a workflow instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Step has not run yet.
    #[default]
    Idle,

    /// Step is currently executing.
    Loading,

    /// Step completed successfully.
    Success,

    /// Step failed and may be retried.
    Error,
}

impl StepStatus {
    /// Check if a step in this status may be started (given readiness).
    pub fn is_startable(&self) -> bool {
        matches!(self, StepStatus::Idle | StepStatus::Error)
    }

    /// Get a display character for this status.
    pub fn display_char(&self) -> char {
        match self {
            StepStatus::Idle => '○',
            StepStatus::Loading => '◉',
            StepStatus::Success => '✓',
            StepStatus::Error => '✗',
        }
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StepStatus::Idle => "idle",
            StepStatus::Loading => "loading",
            StepStatus::Success => "success",
            StepStatus::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// A step of a workflow instance with its current state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Step identifier.
    pub id: StepId,

    /// Current status.
    pub status: StepStatus,

    /// Whether the step may be started.
    pub enabled: bool,

    /// Steps that must succeed first. Absent steps count as satisfied.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prerequisites: Vec<StepId>,
}

impl Step {
    /// Create an idle step.
    pub fn new(id: StepId, prerequisites: Vec<StepId>, enabled: bool) -> Self {
        Self {
            id,
            status: StepStatus::Idle,
            enabled,
            prerequisites,
        }
    }

    /// Generate a summary line for display.
    pub fn summary_line(&self) -> String {
        let state = if self.enabled { "enabled" } else { "disabled" };
        format!(
            "{} {} ({}/{})",
            self.status.display_char(),
            self.id,
            self.status,
            state
        )
    }
}
