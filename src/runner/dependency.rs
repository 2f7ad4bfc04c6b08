//! Readiness resolution over the step state store.
//!
//! Readiness is recomputed from step statuses on every call and never
//! cached. [`refresh_enablement`] re-derives each step's `enabled` flag
//! after a mutation, so enablement cannot drift from prerequisite status.

use crate::steps::{Step, StepId, StepStatus};

use super::store::StepStore;

/// Check if every prerequisite of a step is absent or succeeded.
pub fn prerequisites_met(store: &StepStore, step: &Step) -> bool {
    step.prerequisites.iter().all(|dep| match store.get(*dep) {
        None => true,
        Some(prerequisite) => prerequisite.status == StepStatus::Success,
    })
}

/// Check if a step may be started now.
pub fn is_ready(store: &StepStore, step: &Step) -> bool {
    step.status == StepStatus::Idle && step.enabled && prerequisites_met(store, step)
}

/// First ready step in declared order.
pub fn next_ready(store: &StepStore) -> Option<StepId> {
    store
        .all()
        .iter()
        .find(|s| is_ready(store, s))
        .map(|s| s.id)
}

/// First failed step that can be retried.
pub fn first_failed(store: &StepStore) -> Option<StepId> {
    store
        .all()
        .iter()
        .find(|s| s.status == StepStatus::Error && s.enabled)
        .map(|s| s.id)
}

/// Check if every step succeeded.
pub fn is_workflow_complete(store: &StepStore) -> bool {
    store.completed_count() == store.len()
}

/// Enablement a step should have given the rest of the store.
fn derived_enablement(store: &StepStore, step: &Step) -> bool {
    match step.status {
        StepStatus::Idle => prerequisites_met(store, step),
        StepStatus::Error => true,
        StepStatus::Loading | StepStatus::Success => false,
    }
}

/// Re-derive every step's `enabled` flag from current statuses.
pub fn refresh_enablement(store: &mut StepStore) {
    let updates: Vec<(StepId, StepStatus, bool)> = store
        .all()
        .iter()
        .map(|s| (s.id, s.status, derived_enablement(store, s)))
        .collect();

    for (id, status, enabled) in updates {
        store.set(id, status, enabled);
    }
}
