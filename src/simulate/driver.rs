//! Drives a scenario to completion through the workflow control surface.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::config::OrchestratorConfig;
use crate::error::{Result, StepwiseError};
use crate::identity::{IdentitySource, SessionIdentity};
use crate::notify::Notifier;
use crate::runner::{Phase, StartDisposition, StepRegistry, Workflow, WorkflowSnapshot};
use crate::steps::{StepId, WorkflowKind};

use super::recovery::{RecoveryAction, RecoveryPrompter};
use super::scenario::Scenario;
use super::script::{ScriptedAttempt, ScriptedHandler};

/// Upper bound on recovery prompts per scenario run.
pub const MAX_PROMPTS: usize = 20;

/// Summary of a simulated run.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    /// Whether the requested workflow completed.
    pub completed: bool,
    /// Recovery prompts shown across both workflows.
    pub prompts: usize,
    /// Final state of the requested workflow.
    pub workflow: WorkflowSnapshot,
    /// Handler invocations per step.
    pub attempts: BTreeMap<StepId, u32>,
    /// Final state of the migration a legacy record triggered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migration: Option<WorkflowSnapshot>,
    /// Handler invocations per migration step.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub migration_attempts: BTreeMap<StepId, u32>,
}

/// A workflow plus the scripted handlers bound to it.
struct Simulated {
    workflow: Workflow,
    handlers: HashMap<StepId, Arc<ScriptedHandler>>,
}

impl Simulated {
    fn build(
        registry: StepRegistry,
        script: impl Fn(StepId) -> Vec<ScriptedAttempt>,
        scenario: &Scenario,
        identity: Arc<dyn IdentitySource>,
        config: &OrchestratorConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let mut builder = Workflow::builder(registry.clone(), identity)
            .record(scenario.profile_record())
            .config(config.clone())
            .notifier(notifier);
        let mut handlers = HashMap::new();

        for step in registry.ids() {
            let handler = Arc::new(ScriptedHandler::new(script(step)));
            builder = builder.shared_handler(step, handler.clone());
            handlers.insert(step, handler);
        }

        Ok(Self {
            workflow: builder.build()?,
            handlers,
        })
    }

    fn attempts(&self) -> BTreeMap<StepId, u32> {
        self.handlers
            .iter()
            .map(|(step, handler)| (*step, handler.calls()))
            .filter(|(_, calls)| *calls > 0)
            .collect()
    }
}

/// Run a scenario.
///
/// A legacy record blocks the update at the pre-flight gate; the migration
/// workflow then runs first and releases the update when it completes.
pub async fn run_scenario(
    scenario: &Scenario,
    config: &OrchestratorConfig,
    notifier: Arc<dyn Notifier>,
    prompter: &mut dyn RecoveryPrompter,
) -> Result<ScenarioReport> {
    let identity: Arc<dyn IdentitySource> = Arc::new(match &scenario.identity {
        Some(account) => SessionIdentity::connected(account.clone()),
        None => SessionIdentity::disconnected(),
    });

    let registry = match scenario.workflow {
        WorkflowKind::Update => StepRegistry::for_update(&scenario.profile)?,
        WorkflowKind::Migration => StepRegistry::for_migration(&scenario.legacy)?,
    };
    let main = Simulated::build(
        registry,
        |step| scenario.script(step),
        scenario,
        identity.clone(),
        config,
        notifier.clone(),
    )?;

    let mut prompts = 0;
    let mut migration = None;

    if let StartDisposition::Deferred { reason } = main.workflow.start_workflow()? {
        debug!("update deferred: {}", reason);
        let prerequisite = Simulated::build(
            StepRegistry::for_migration(&scenario.legacy)?,
            |step| scenario.migration_script(step),
            scenario,
            identity.clone(),
            config,
            notifier.clone(),
        )?;
        main.workflow.run_after(&prerequisite.workflow);
        prerequisite.workflow.start_workflow()?;

        let migrated = drive(
            &prerequisite.workflow,
            scenario.auto,
            config,
            notifier.as_ref(),
            prompter,
            &mut prompts,
        )
        .await?;
        if !migrated {
            main.workflow.cancel();
        }
        migration = Some(prerequisite);
    }

    let completed = if main.workflow.snapshot().phase == Phase::Cancelled {
        false
    } else {
        drive(
            &main.workflow,
            scenario.auto,
            config,
            notifier.as_ref(),
            prompter,
            &mut prompts,
        )
        .await?
    };

    info!(completed, prompts, "scenario finished");
    Ok(ScenarioReport {
        completed,
        prompts,
        workflow: main.workflow.snapshot(),
        attempts: main.attempts(),
        migration: migration.as_ref().map(|m| m.workflow.snapshot()),
        migration_attempts: migration
            .as_ref()
            .map(Simulated::attempts)
            .unwrap_or_default(),
    })
}

/// Walk a started workflow until it completes or is aborted.
async fn drive(
    workflow: &Workflow,
    auto: bool,
    config: &OrchestratorConfig,
    notifier: &dyn Notifier,
    prompter: &mut dyn RecoveryPrompter,
    prompts: &mut usize,
) -> Result<bool> {
    let mut updates = workflow.subscribe();

    if auto {
        if let Err(e) = workflow.toggle_auto(true) {
            notifier.on_warning(&format!("Continuing manually: {}", e));
        }
    }

    loop {
        let snapshot = workflow.snapshot();
        if snapshot.is_complete() {
            return Ok(true);
        }
        if snapshot.phase == Phase::Cancelled {
            return Ok(false);
        }

        if snapshot.auto_progress || snapshot.has_loading() {
            wait_until_settled(&mut updates).await?;
            continue;
        }

        if let Some(failed) = snapshot.first_failed() {
            if *prompts >= MAX_PROMPTS {
                notifier.on_error("Too many recovery attempts; aborting");
                workflow.cancel();
                return Ok(false);
            }
            *prompts += 1;

            let message = snapshot
                .last_outcome
                .as_ref()
                .map(|last| last.outcome.notification(last.step, config.step_timeout()).1)
                .unwrap_or_default();

            match prompter.choose(failed, &message)? {
                RecoveryAction::Retry => {
                    workflow.run_step(failed).await?;
                }
                RecoveryAction::ResumeAuto => {
                    if let Err(e) = workflow.resume_after_error() {
                        notifier.on_error(&format!("Cannot resume: {}", e));
                    }
                }
                RecoveryAction::Abort => {
                    workflow.cancel();
                    return Ok(false);
                }
            }
            continue;
        }

        match snapshot.next_ready() {
            Some(step) => {
                workflow.run_step(step).await?;
            }
            None => wait_until_settled(&mut updates).await?,
        }
    }
}

/// Wait for auto-progress to stop, the workflow to finish, or no step to be
/// executing.
async fn wait_until_settled(updates: &mut watch::Receiver<WorkflowSnapshot>) -> Result<()> {
    tokio::task::yield_now().await;
    updates
        .wait_for(|s| {
            s.is_complete()
                || s.phase == Phase::Cancelled
                || (!s.auto_progress && !s.has_loading())
        })
        .await
        .map_err(|e| {
            StepwiseError::Other(anyhow::anyhow!("workflow state channel closed: {}", e))
        })?;
    Ok(())
}
