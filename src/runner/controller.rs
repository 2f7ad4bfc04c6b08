//! Auto-progression controller.

use serde::{Deserialize, Serialize};

use crate::error::{Result, StepwiseError};
use crate::identity::Identity;
use crate::steps::StepId;

use super::dependency;
use super::outcome::Outcome;
use super::store::StepStore;

/// Whether ready steps are started automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressMode {
    /// Steps start only when the user asks.
    #[default]
    Manual,
    /// The next ready step starts after a settle delay.
    Auto,
}

/// What an auto tick should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextAction {
    /// Start this step.
    Run(StepId),
    /// Every step succeeded.
    Finished,
    /// Nothing is ready (a step failed, or one is still loading).
    Idle,
}

/// Explicit mode state read by delayed ticks.
///
/// Every mode change bumps `generation`; a tick scheduled under an older
/// generation is stale and does nothing.
#[derive(Debug, Clone, Default)]
pub struct AutoController {
    mode: ProgressMode,
    suspended: bool,
    generation: u64,
}

impl AutoController {
    /// Create a controller in manual mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current mode.
    pub fn mode(&self) -> ProgressMode {
        self.mode
    }

    /// Check if auto-progress is on.
    pub fn is_auto(&self) -> bool {
        self.mode == ProgressMode::Auto
    }

    /// Check if a failure suspended auto-progress.
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Current generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Switch to auto mode, returning the new generation.
    pub fn enable(&mut self, identity: Option<&Identity>) -> Result<u64> {
        require_identity(identity)?;
        if self.suspended {
            return Err(StepwiseError::AutoProgressSuspended);
        }
        self.mode = ProgressMode::Auto;
        self.generation += 1;
        Ok(self.generation)
    }

    /// Switch to manual mode.
    pub fn disable(&mut self) {
        self.mode = ProgressMode::Manual;
        self.generation += 1;
    }

    /// Leave auto mode because a step did not succeed.
    pub fn suspend(&mut self) {
        self.disable();
        self.suspended = true;
    }

    /// Clear suspension and re-enter auto mode, returning the new generation.
    pub fn resume(&mut self, identity: Option<&Identity>) -> Result<u64> {
        require_identity(identity)?;
        self.suspended = false;
        self.mode = ProgressMode::Auto;
        self.generation += 1;
        Ok(self.generation)
    }

    /// React to a step outcome.
    ///
    /// Returns the generation to schedule the next tick under, if any.
    pub fn on_outcome(&mut self, outcome: &Outcome) -> Option<u64> {
        if outcome.is_success() {
            self.is_auto().then_some(self.generation)
        } else {
            self.suspend();
            None
        }
    }

    /// Check if a tick scheduled under `generation` should still act.
    pub fn is_current(&self, generation: u64) -> bool {
        self.is_auto() && self.generation == generation
    }

    /// Decide the next action from the store.
    pub fn next_action(&self, store: &StepStore) -> NextAction {
        if dependency::is_workflow_complete(store) {
            return NextAction::Finished;
        }
        match dependency::next_ready(store) {
            Some(step) => NextAction::Run(step),
            None => NextAction::Idle,
        }
    }
}

fn require_identity(identity: Option<&Identity>) -> Result<()> {
    match identity {
        Some(_) => Ok(()),
        None => Err(StepwiseError::IdentityUnavailable {
            message: "connect an account before enabling auto-progress".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::{Artifact, Step, StepStatus};

    fn identity() -> Identity {
        Identity::new("0.0.42")
    }

    #[test]
    fn starts_in_manual_mode() {
        let controller = AutoController::new();
        assert_eq!(controller.mode(), ProgressMode::Manual);
        assert!(!controller.is_suspended());
    }

    #[test]
    fn enable_requires_identity() {
        let mut controller = AutoController::new();
        let err = controller.enable(None).unwrap_err();
        assert!(matches!(err, StepwiseError::IdentityUnavailable { .. }));
        assert!(!controller.is_auto());
    }

    #[test]
    fn failure_suspends_and_leaves_auto() {
        let mut controller = AutoController::new();
        controller.enable(Some(&identity())).unwrap();
        assert_eq!(controller.on_outcome(&Outcome::Fatal("boom".into())), None);
        assert!(!controller.is_auto());
        assert!(controller.is_suspended());
    }

    #[test]
    fn suspended_controller_rejects_plain_enable() {
        let mut controller = AutoController::new();
        controller.on_outcome(&Outcome::UserCancelled);
        assert!(matches!(
            controller.enable(Some(&identity())),
            Err(StepwiseError::AutoProgressSuspended)
        ));
    }

    #[test]
    fn resume_clears_suspension() {
        let mut controller = AutoController::new();
        controller.on_outcome(&Outcome::TimedOut);
        assert!(controller.resume(None).is_err());
        assert!(controller.is_suspended());

        controller.resume(Some(&identity())).unwrap();
        assert!(controller.is_auto());
        assert!(!controller.is_suspended());
    }

    #[test]
    fn success_schedules_only_in_auto() {
        let mut controller = AutoController::new();
        let success = Outcome::Success(Artifact::empty());
        assert_eq!(controller.on_outcome(&success), None);

        let generation = controller.enable(Some(&identity())).unwrap();
        assert_eq!(controller.on_outcome(&success), Some(generation));
    }

    #[test]
    fn mode_change_makes_old_ticks_stale() {
        let mut controller = AutoController::new();
        let generation = controller.enable(Some(&identity())).unwrap();
        assert!(controller.is_current(generation));

        controller.disable();
        assert!(!controller.is_current(generation));

        let next = controller.enable(Some(&identity())).unwrap();
        assert!(!controller.is_current(generation));
        assert!(controller.is_current(next));
    }

    #[test]
    fn next_action_follows_store() {
        let controller = AutoController::new();
        let mut store = StepStore::new(vec![Step::new(StepId::UpdateRecord, vec![], true)]);
        assert_eq!(
            controller.next_action(&store),
            NextAction::Run(StepId::UpdateRecord)
        );

        store.set(StepId::UpdateRecord, StepStatus::Error, true);
        assert_eq!(controller.next_action(&store), NextAction::Idle);

        store.set(StepId::UpdateRecord, StepStatus::Success, false);
        assert_eq!(controller.next_action(&store), NextAction::Finished);
    }
}
