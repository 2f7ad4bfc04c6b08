//! Recovery choices offered after a step failure.

use std::collections::VecDeque;

use console::{style, Term};
use dialoguer::theme::ColorfulTheme;
use dialoguer::Select;

use crate::error::{Result, StepwiseError};
use crate::steps::StepId;

/// Recovery action chosen by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Re-execute the failed step once, staying in manual mode.
    Retry,
    /// Clear the suspension and continue in auto mode.
    ResumeAuto,
    /// Stop the workflow.
    Abort,
}

/// Asks how to proceed after a failed step.
pub trait RecoveryPrompter: Send {
    /// Choose a recovery action for `step`, which failed with `message`.
    fn choose(&mut self, step: StepId, message: &str) -> Result<RecoveryAction>;
}

/// Always aborts; used when no terminal is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct NonInteractivePrompter;

impl RecoveryPrompter for NonInteractivePrompter {
    fn choose(&mut self, step: StepId, _message: &str) -> Result<RecoveryAction> {
        tracing::debug!(step = %step, "non-interactive; aborting after failure");
        Ok(RecoveryAction::Abort)
    }
}

/// Replays preset answers, then aborts.
#[derive(Debug, Default, Clone)]
pub struct ScriptedPrompter {
    answers: VecDeque<RecoveryAction>,
    asked: Vec<StepId>,
}

impl ScriptedPrompter {
    /// Create a prompter with preset answers.
    pub fn new(answers: impl IntoIterator<Item = RecoveryAction>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            asked: Vec::new(),
        }
    }

    /// Steps the prompter was asked about, in order.
    pub fn asked(&self) -> &[StepId] {
        &self.asked
    }
}

impl RecoveryPrompter for ScriptedPrompter {
    fn choose(&mut self, step: StepId, _message: &str) -> Result<RecoveryAction> {
        self.asked.push(step);
        Ok(self.answers.pop_front().unwrap_or(RecoveryAction::Abort))
    }
}

/// Terminal menu backed by dialoguer.
#[derive(Debug)]
pub struct DialoguerPrompter {
    term: Term,
}

impl Default for DialoguerPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl DialoguerPrompter {
    /// Prompt on stderr.
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }
}

fn map_dialoguer_err(e: dialoguer::Error) -> StepwiseError {
    StepwiseError::Io(e.into())
}

fn prompt_theme() -> ColorfulTheme {
    ColorfulTheme {
        prompt_prefix: style("".to_string()),
        ..ColorfulTheme::default()
    }
}

const CHOICES: [(&str, RecoveryAction); 3] = [
    ("Retry", RecoveryAction::Retry),
    ("Resume auto-progress", RecoveryAction::ResumeAuto),
    ("Abort", RecoveryAction::Abort),
];

impl RecoveryPrompter for DialoguerPrompter {
    fn choose(&mut self, step: StepId, _message: &str) -> Result<RecoveryAction> {
        let labels: Vec<_> = CHOICES.iter().map(|(label, _)| *label).collect();
        let selection = Select::with_theme(&prompt_theme())
            .with_prompt(format!("{} failed. How do you want to proceed?", step.label()))
            .items(&labels)
            .default(0)
            .interact_on(&self.term)
            .map_err(map_dialoguer_err)?;

        Ok(CHOICES
            .get(selection)
            .map(|(_, action)| *action)
            .unwrap_or(RecoveryAction::Abort))
    }
}
