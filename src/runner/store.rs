//! Step state store.

use std::collections::HashMap;

use crate::steps::{Step, StepId, StepStatus};

/// Mutable mapping from step identifier to its current status and
/// enablement, in declared order.
///
/// A step that is absent from the store is not part of the workflow
/// instance, which is different from an `Idle` step.
#[derive(Debug, Clone, Default)]
pub struct StepStore {
    steps: Vec<Step>,
    index: HashMap<StepId, usize>,
}

impl StepStore {
    /// Create a store from steps in execution order.
    pub fn new(steps: Vec<Step>) -> Self {
        let index = steps.iter().enumerate().map(|(i, s)| (s.id, i)).collect();
        Self { steps, index }
    }

    /// Get a step, or `None` if it is not part of this instance.
    pub fn get(&self, id: StepId) -> Option<&Step> {
        self.index.get(&id).map(|&i| &self.steps[i])
    }

    /// Check if a step is part of this instance.
    pub fn contains(&self, id: StepId) -> bool {
        self.index.contains_key(&id)
    }

    /// Set a step's status and enablement.
    ///
    /// Returns `false` if the step is not part of this instance.
    pub fn set(&mut self, id: StepId, status: StepStatus, enabled: bool) -> bool {
        match self.index.get(&id) {
            Some(&i) => {
                let step = &mut self.steps[i];
                step.status = status;
                step.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// All steps in execution order.
    pub fn all(&self) -> &[Step] {
        &self.steps
    }

    /// Get the number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of steps that succeeded.
    pub fn completed_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Success)
            .count()
    }

    /// The step currently executing, if any.
    pub fn loading(&self) -> Option<StepId> {
        self.steps
            .iter()
            .find(|s| s.status == StepStatus::Loading)
            .map(|s| s.id)
    }
}
