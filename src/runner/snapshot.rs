//! Read-only views of a workflow's state.

use serde::{Deserialize, Serialize};

use crate::steps::{StepId, StepStatus, WorkflowKind};

use super::controller::AutoController;
use super::dependency;
use super::outcome::Outcome;
use super::store::StepStore;

/// Workflow lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Built but not started.
    #[default]
    Created,
    /// Start requested; waiting for a prerequisite workflow.
    AwaitingGate,
    /// Steps may run.
    Running,
    /// Every step succeeded.
    Complete,
    /// Cancelled; no further steps start.
    Cancelled,
}

/// One step as seen by presentation code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSnapshot {
    pub id: StepId,
    pub status: StepStatus,
    pub enabled: bool,
    /// Whether the step could be started right now.
    pub ready: bool,
}

/// The most recent classified outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastOutcome {
    pub step: StepId,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// A point-in-time copy of a workflow's state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSnapshot {
    pub kind: WorkflowKind,
    pub phase: Phase,
    pub steps: Vec<StepSnapshot>,
    pub completed_count: usize,
    pub total_steps: usize,
    pub auto_progress: bool,
    pub auto_progress_suspended: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_outcome: Option<LastOutcome>,
}

impl WorkflowSnapshot {
    pub(crate) fn capture(
        kind: WorkflowKind,
        phase: Phase,
        store: &StepStore,
        controller: &AutoController,
        last_outcome: Option<&LastOutcome>,
    ) -> Self {
        let steps = store
            .all()
            .iter()
            .map(|step| StepSnapshot {
                id: step.id,
                status: step.status,
                enabled: step.enabled,
                ready: dependency::is_ready(store, step),
            })
            .collect();

        Self {
            kind,
            phase,
            steps,
            completed_count: store.completed_count(),
            total_steps: store.len(),
            auto_progress: controller.is_auto(),
            auto_progress_suspended: controller.is_suspended(),
            last_outcome: last_outcome.cloned(),
        }
    }

    /// Check if every step succeeded.
    pub fn is_complete(&self) -> bool {
        self.completed_count == self.total_steps
    }

    /// Look up a step.
    pub fn step(&self, id: StepId) -> Option<&StepSnapshot> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// The step currently executing, if any.
    pub fn running_step(&self) -> Option<StepId> {
        self.steps
            .iter()
            .find(|s| s.status == StepStatus::Loading)
            .map(|s| s.id)
    }

    /// Check if a step is executing.
    pub fn has_loading(&self) -> bool {
        self.running_step().is_some()
    }

    /// First failed step.
    pub fn first_failed(&self) -> Option<StepId> {
        self.steps
            .iter()
            .find(|s| s.status == StepStatus::Error && s.enabled)
            .map(|s| s.id)
    }

    /// First step that could start now.
    pub fn next_ready(&self) -> Option<StepId> {
        self.steps.iter().find(|s| s.ready).map(|s| s.id)
    }
}
