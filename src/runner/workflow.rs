//! Workflow orchestration.
//!
//! A [`Workflow`] owns one instance's step store and controller and exposes
//! the control surface: `start_workflow`, `start_step`/`run_step`,
//! `toggle_auto`, `resume_after_error` and `cancel`. Every transition goes
//! through `apply_outcome`, which updates the store, re-derives readiness,
//! notifies, and schedules the next auto tick.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::config::{self, OrchestratorConfig};
use crate::error::{Result, StepwiseError};
use crate::identity::IdentitySource;
use crate::notify::{Notifier, TracingNotifier};
use crate::profile::ProfileRecord;
use crate::steps::{Artifact, StepHandler, StepId, StepStatus, WorkflowKind};

use super::controller::{AutoController, NextAction, ProgressMode};
use super::dependency;
use super::executor::{self, SafeExecutor};
use super::gate::{
    DeferredStart, GateDecision, OpenGate, PreflightGate, RecordFormatGate, StartDisposition,
};
use super::outcome::{Outcome, Severity};
use super::registry::StepRegistry;
use super::snapshot::{LastOutcome, Phase, WorkflowSnapshot};
use super::store::StepStore;

type CompletionCallback = Box<dyn FnOnce() + Send>;

/// Handle to a running workflow instance. Cheap to clone.
#[derive(Clone)]
pub struct Workflow {
    inner: Arc<Inner>,
}

struct Inner {
    kind: WorkflowKind,
    handlers: HashMap<StepId, Arc<dyn StepHandler>>,
    identity: Arc<dyn IdentitySource>,
    record: ProfileRecord,
    gate: Box<dyn PreflightGate>,
    notifier: Arc<dyn Notifier>,
    executor: SafeExecutor,
    settle_delay: Duration,
    deferred: DeferredStart,
    runtime: Handle,
    snapshots: watch::Sender<WorkflowSnapshot>,
    state: Mutex<WorkflowState>,
}

struct WorkflowState {
    phase: Phase,
    store: StepStore,
    controller: AutoController,
    artifacts: HashMap<StepId, Artifact>,
    last_outcome: Option<LastOutcome>,
    on_complete: Vec<CompletionCallback>,
    completion_fired: bool,
}

/// A step claimed for execution, with everything its handler needs.
struct Claimed {
    step: StepId,
    handler: Arc<dyn StepHandler>,
    artifacts: HashMap<StepId, Artifact>,
}

impl fmt::Debug for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workflow")
            .field("kind", &self.inner.kind)
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

impl Workflow {
    /// Start building a workflow for `registry`.
    pub fn builder(registry: StepRegistry, identity: Arc<dyn IdentitySource>) -> WorkflowBuilder {
        WorkflowBuilder::new(registry, identity)
    }

    /// The workflow kind.
    pub fn kind(&self) -> WorkflowKind {
        self.inner.kind
    }

    /// Current state.
    pub fn snapshot(&self) -> WorkflowSnapshot {
        let state = self.inner.lock();
        self.inner.capture(&state)
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<WorkflowSnapshot> {
        self.inner.snapshots.subscribe()
    }

    /// Artifacts produced so far.
    pub fn artifacts(&self) -> HashMap<StepId, Artifact> {
        self.inner.lock().artifacts.clone()
    }

    /// Artifact produced by `step`, if it succeeded.
    pub fn artifact(&self, step: StepId) -> Option<Artifact> {
        self.inner.lock().artifacts.get(&step).cloned()
    }

    /// Check if every step succeeded.
    pub fn is_complete(&self) -> bool {
        dependency::is_workflow_complete(&self.inner.lock().store)
    }

    /// Check if a gated start is waiting on a prerequisite workflow.
    pub fn is_start_deferred(&self) -> bool {
        self.inner.deferred.is_pending()
    }

    /// Start the workflow, running the pre-flight gate first.
    ///
    /// When the gate blocks, the start is stored and runs once
    /// [`release_deferred`](Self::release_deferred) is called, typically by
    /// a prerequisite workflow registered with [`run_after`](Self::run_after).
    pub fn start_workflow(&self) -> Result<StartDisposition> {
        {
            let state = self.inner.lock();
            match state.phase {
                Phase::Created => {}
                Phase::Cancelled => return Err(StepwiseError::WorkflowCancelled),
                _ => return Err(StepwiseError::AlreadyStarted),
            }
        }

        match self.inner.gate.check(&self.inner.record) {
            GateDecision::Pass => {
                Inner::begin(&self.inner);
                Ok(StartDisposition::Started)
            }
            GateDecision::Blocked { reason } => {
                info!(kind = %self.inner.kind, "start deferred: {}", reason);
                let snapshot = {
                    let mut state = self.inner.lock();
                    state.phase = Phase::AwaitingGate;
                    self.inner.capture(&state)
                };

                let weak = Arc::downgrade(&self.inner);
                self.inner.deferred.store(Box::new(move || {
                    if let Some(inner) = weak.upgrade() {
                        Inner::begin(&inner);
                    }
                }));

                self.inner.notifier.on_info(&reason);
                self.inner.publish(snapshot);
                Ok(StartDisposition::Deferred { reason })
            }
        }
    }

    /// Run a deferred start now. Returns whether one was pending.
    pub fn release_deferred(&self) -> bool {
        self.inner.deferred.run()
    }

    /// Release this workflow's deferred start when `prerequisite` completes.
    pub fn run_after(&self, prerequisite: &Workflow) {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        prerequisite.on_complete(move || {
            if let Some(inner) = weak.upgrade() {
                debug!(kind = %inner.kind, "prerequisite workflow complete");
                inner.deferred.run();
            }
        });
    }

    /// Register a callback invoked exactly once when every step succeeded.
    ///
    /// Runs immediately if the workflow is already complete.
    pub fn on_complete(&self, callback: impl FnOnce() + Send + 'static) {
        {
            let mut state = self.inner.lock();
            if !state.completion_fired {
                state.on_complete.push(Box::new(callback));
                return;
            }
        }
        callback();
    }

    /// Claim a step and execute it in the background.
    ///
    /// Rejections are returned immediately and leave the state untouched.
    pub fn start_step(&self, step: StepId) -> Result<()> {
        let claimed = {
            let mut state = self.inner.lock();
            self.inner.claim(&mut state, step)?
        };
        self.spawn_execution(claimed);
        Ok(())
    }

    /// Claim a step and execute it to completion.
    pub async fn run_step(&self, step: StepId) -> Result<Outcome> {
        let claimed = {
            let mut state = self.inner.lock();
            self.inner.claim(&mut state, step)?
        };
        Inner::execute_claimed(&self.inner, claimed).await
    }

    /// Switch auto-progress on or off.
    ///
    /// Turning it on requires an active identity and is rejected while a
    /// failure has suspended auto-progress; use
    /// [`resume_after_error`](Self::resume_after_error) then.
    pub fn toggle_auto(&self, enabled: bool) -> Result<()> {
        let (snapshot, tick) = {
            let mut state = self.inner.lock();
            if state.phase == Phase::Cancelled {
                return Err(StepwiseError::WorkflowCancelled);
            }

            let tick = if enabled {
                let identity = self.inner.identity.current();
                let generation = state.controller.enable(identity.as_ref())?;
                (state.phase == Phase::Running).then_some(generation)
            } else {
                state.controller.disable();
                None
            };
            info!(kind = %self.inner.kind, mode = ?state.controller.mode(), "progress mode changed");
            (self.inner.capture(&state), tick)
        };

        self.inner.publish(snapshot);
        if let Some(generation) = tick {
            Inner::schedule_tick(&self.inner, self.inner.settle_delay, generation);
        }
        Ok(())
    }

    /// Clear a failure suspension and continue in auto mode.
    ///
    /// The first failed step is retried immediately, else the first ready
    /// step starts. Returns the step that was started.
    pub fn resume_after_error(&self) -> Result<Option<StepId>> {
        let (snapshot, claimed) = {
            let mut state = self.inner.lock();
            match state.phase {
                Phase::Running | Phase::Complete => {}
                Phase::Cancelled => return Err(StepwiseError::WorkflowCancelled),
                Phase::Created | Phase::AwaitingGate => return Err(StepwiseError::NotStarted),
            }
            if let Some(running) = state.store.loading() {
                return Err(StepwiseError::WorkflowBusy { running });
            }

            let identity = self.inner.identity.current();
            state.controller.resume(identity.as_ref())?;

            let target = dependency::first_failed(&state.store)
                .or_else(|| dependency::next_ready(&state.store));
            let claimed = match target {
                Some(step) => Some(self.inner.claim(&mut state, step)?),
                None => None,
            };
            info!(kind = %self.inner.kind, target = ?target, "auto-progress resumed");
            (self.inner.capture(&state), claimed)
        };

        self.inner.publish(snapshot);
        Ok(claimed.map(|claimed| {
            let step = claimed.step;
            self.spawn_execution(claimed);
            step
        }))
    }

    /// Stop issuing executions. An in-flight handler finishes but its
    /// result is discarded.
    pub fn cancel(&self) {
        let snapshot = {
            let mut state = self.inner.lock();
            if state.phase == Phase::Cancelled {
                return;
            }
            state.phase = Phase::Cancelled;
            state.controller.disable();
            state.on_complete.clear();
            self.inner.capture(&state)
        };
        self.inner.deferred.take();
        info!(kind = %self.inner.kind, "workflow cancelled");
        self.inner.publish(snapshot);
    }

    fn spawn_execution(&self, claimed: Claimed) {
        let inner = self.inner.clone();
        self.inner.runtime.spawn(async move {
            let step = claimed.step;
            if let Err(e) = Inner::execute_claimed(&inner, claimed).await {
                debug!(step = %step, "execution result dropped: {}", e);
            }
        });
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, WorkflowState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn capture(&self, state: &WorkflowState) -> WorkflowSnapshot {
        WorkflowSnapshot::capture(
            self.kind,
            state.phase,
            &state.store,
            &state.controller,
            state.last_outcome.as_ref(),
        )
    }

    fn publish(&self, snapshot: WorkflowSnapshot) {
        self.notifier.on_progress(&snapshot);
        self.snapshots.send_replace(snapshot);
    }

    /// Enter the running phase.
    fn begin(inner: &Arc<Inner>) {
        let (snapshot, tick) = {
            let mut state = inner.lock();
            if state.phase == Phase::Cancelled {
                return;
            }
            state.phase = Phase::Running;
            let tick = state
                .controller
                .is_auto()
                .then_some(state.controller.generation());
            (inner.capture(&state), tick)
        };

        info!(kind = %inner.kind, steps = snapshot.total_steps, "workflow started");
        inner.publish(snapshot);
        if let Some(generation) = tick {
            Inner::schedule_tick(inner, inner.settle_delay, generation);
        }
    }

    fn claim(&self, state: &mut WorkflowState, step: StepId) -> Result<Claimed> {
        match state.phase {
            Phase::Running | Phase::Complete => {}
            Phase::Cancelled => return Err(StepwiseError::WorkflowCancelled),
            Phase::Created | Phase::AwaitingGate => return Err(StepwiseError::NotStarted),
        }

        let handler = self
            .handlers
            .get(&step)
            .cloned()
            .ok_or(StepwiseError::UnknownStep { step })?;
        executor::claim(&mut state.store, step)?;

        Ok(Claimed {
            step,
            handler,
            artifacts: state.artifacts.clone(),
        })
    }

    async fn execute_claimed(inner: &Arc<Inner>, claimed: Claimed) -> Result<Outcome> {
        inner.publish({
            let state = inner.lock();
            inner.capture(&state)
        });

        let cancelled = || inner.lock().phase == Phase::Cancelled;
        let outcome = inner
            .executor
            .execute(
                claimed.step,
                claimed.handler.as_ref(),
                inner.identity.as_ref(),
                &claimed.artifacts,
                inner.notifier.as_ref(),
                &cancelled,
            )
            .await;

        Inner::apply_outcome(inner, claimed.step, outcome)
    }

    /// The single transition point for finished executions.
    fn apply_outcome(inner: &Arc<Inner>, step: StepId, outcome: Outcome) -> Result<Outcome> {
        let (snapshot, tick, callbacks, completed, was_auto) = {
            let mut state = inner.lock();
            if state.phase == Phase::Cancelled {
                debug!(step = %step, outcome = outcome.label(), "discarding result of cancelled workflow");
                return Err(StepwiseError::WorkflowCancelled);
            }

            let success = outcome.is_success();
            if let Outcome::Success(artifact) = &outcome {
                state.artifacts.insert(step, artifact.clone());
                state.store.set(step, StepStatus::Success, false);
            } else {
                state.store.set(step, StepStatus::Error, true);
            }
            dependency::refresh_enablement(&mut state.store);

            let was_auto = state.controller.mode() == ProgressMode::Auto;
            let mut tick = state.controller.on_outcome(&outcome);
            state.last_outcome = Some(LastOutcome {
                step,
                outcome: outcome.clone(),
            });

            let completed = success
                && !state.completion_fired
                && dependency::is_workflow_complete(&state.store);
            let callbacks = if completed {
                state.phase = Phase::Complete;
                state.completion_fired = true;
                tick = None;
                std::mem::take(&mut state.on_complete)
            } else {
                Vec::new()
            };

            (inner.capture(&state), tick, callbacks, completed, was_auto)
        };

        let (severity, message) = outcome.notification(step, inner.executor.timeout());
        match severity {
            Severity::Success => inner.notifier.on_success(&message),
            Severity::Warning => inner.notifier.on_warning(&message),
            Severity::Error => inner.notifier.on_error(&message),
        }
        if !outcome.is_success() && was_auto {
            inner
                .notifier
                .on_info("Auto-progress paused; resume when ready");
        }
        if completed {
            info!(kind = %inner.kind, "workflow complete");
            inner.notifier.on_success(inner.kind.completion_message());
        }

        inner.publish(snapshot);
        for callback in callbacks {
            callback();
        }
        if let Some(generation) = tick {
            Inner::schedule_tick(inner, inner.settle_delay, generation);
        }

        Ok(outcome)
    }

    fn schedule_tick(inner: &Arc<Inner>, delay: Duration, generation: u64) {
        debug!(kind = %inner.kind, generation, delay_ms = delay.as_millis() as u64, "scheduling auto tick");
        let weak = Arc::downgrade(inner);
        inner.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                Inner::auto_tick(&inner, generation).await;
            }
        });
    }

    async fn auto_tick(inner: &Arc<Inner>, generation: u64) {
        let claimed = {
            let mut state = inner.lock();
            if state.phase != Phase::Running || !state.controller.is_current(generation) {
                debug!(kind = %inner.kind, generation, "stale auto tick");
                return;
            }
            match state.controller.next_action(&state.store) {
                NextAction::Run(step) => inner.claim(&mut state, step),
                NextAction::Finished => {
                    debug!(kind = %inner.kind, "auto tick: nothing left to run");
                    return;
                }
                NextAction::Idle => {
                    debug!(kind = %inner.kind, "auto tick: no step ready");
                    return;
                }
            }
        };

        match claimed {
            Ok(claimed) => {
                debug!(step = %claimed.step, "auto tick starting step");
                if let Err(e) = Inner::execute_claimed(inner, claimed).await {
                    debug!("auto step result dropped: {}", e);
                }
            }
            Err(e) => debug!("auto tick could not claim step: {}", e),
        }
    }
}

/// Builder for [`Workflow`].
pub struct WorkflowBuilder {
    registry: StepRegistry,
    identity: Arc<dyn IdentitySource>,
    handlers: HashMap<StepId, Arc<dyn StepHandler>>,
    record: ProfileRecord,
    notifier: Arc<dyn Notifier>,
    config: OrchestratorConfig,
    gate: Option<Box<dyn PreflightGate>>,
    runtime: Option<Handle>,
}

impl WorkflowBuilder {
    fn new(registry: StepRegistry, identity: Arc<dyn IdentitySource>) -> Self {
        Self {
            registry,
            identity,
            handlers: HashMap::new(),
            record: ProfileRecord::default(),
            notifier: Arc::new(TracingNotifier),
            config: OrchestratorConfig::default(),
            gate: None,
            runtime: None,
        }
    }

    /// Bind a handler to a step.
    pub fn handler(self, step: StepId, handler: impl StepHandler + 'static) -> Self {
        self.shared_handler(step, Arc::new(handler))
    }

    /// Bind an already shared handler to a step.
    pub fn shared_handler(mut self, step: StepId, handler: Arc<dyn StepHandler>) -> Self {
        self.handlers.insert(step, handler);
        self
    }

    /// The record the workflow edits.
    pub fn record(mut self, record: ProfileRecord) -> Self {
        self.record = record;
        self
    }

    /// Where notifications go.
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Timing and fault classification.
    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the pre-flight gate.
    ///
    /// Update workflows default to [`RecordFormatGate`]; migrations to
    /// [`OpenGate`].
    pub fn gate(mut self, gate: impl PreflightGate + 'static) -> Self {
        self.gate = Some(Box::new(gate));
        self
    }

    /// Runtime that step executions and auto ticks are spawned on.
    ///
    /// Defaults to the runtime `build` is called from. Set it when the
    /// workflow is built and driven from a thread outside any runtime.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Build the workflow.
    ///
    /// Fails with [`StepwiseError::RuntimeUnavailable`] when no runtime was
    /// given and `build` is not called from within one.
    pub fn build(self) -> Result<Workflow> {
        config::validate(&self.config)?;

        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|e| StepwiseError::RuntimeUnavailable {
                message: e.to_string(),
            })?,
        };

        for step in self.registry.ids() {
            if !self.handlers.contains_key(&step) {
                return Err(StepwiseError::MissingHandler { step });
            }
        }

        let kind = self.registry.kind();
        let gate: Box<dyn PreflightGate> = match self.gate {
            Some(gate) => gate,
            None => match kind {
                WorkflowKind::Update => Box::new(RecordFormatGate),
                WorkflowKind::Migration => Box::new(OpenGate),
            },
        };

        let state = WorkflowState {
            phase: Phase::Created,
            store: self.registry.seed_store(),
            controller: AutoController::new(),
            artifacts: HashMap::new(),
            last_outcome: None,
            on_complete: Vec::new(),
            completion_fired: false,
        };
        let initial = WorkflowSnapshot::capture(
            kind,
            state.phase,
            &state.store,
            &state.controller,
            None,
        );
        let (snapshots, _) = watch::channel(initial);

        Ok(Workflow {
            inner: Arc::new(Inner {
                kind,
                handlers: self.handlers,
                identity: self.identity,
                record: self.record,
                gate,
                notifier: self.notifier,
                executor: SafeExecutor::from_config(&self.config)?,
                settle_delay: self.config.settle_delay(),
                deferred: DeferredStart::default(),
                runtime,
                snapshots,
                state: Mutex::new(state),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::SessionIdentity;
    use crate::notify::MockNotifier;
    use crate::profile::{LegacyLists, ProfileDraft, RecordFormat};
    use crate::steps::{handler_fn, HandlerOutput, StepContext};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn ok_handler(value: &'static str) -> impl StepHandler {
        handler_fn(move |_| async move { Ok(HandlerOutput::done(value)) })
    }

    fn update_workflow(draft: &ProfileDraft, notifier: Arc<MockNotifier>) -> Workflow {
        let registry = StepRegistry::for_update(draft).unwrap();
        Workflow::builder(registry, Arc::new(SessionIdentity::connected("0.0.5")))
            .handler(StepId::UploadPicture, ok_handler("ipfs://pic"))
            .handler(StepId::UploadBanner, ok_handler("ipfs://banner"))
            .handler(StepId::UpdateRecord, ok_handler("0xrecord"))
            .notifier(notifier)
            .build()
            .unwrap()
    }

    fn status(workflow: &Workflow, step: StepId) -> (StepStatus, bool) {
        let snapshot = workflow.snapshot();
        let step = snapshot.step(step).unwrap();
        (step.status, step.enabled)
    }

    #[tokio::test]
    async fn name_only_edit_completes_in_one_step() {
        let notifier = Arc::new(MockNotifier::new());
        let workflow = update_workflow(&ProfileDraft::named("Ana"), notifier.clone());
        assert_eq!(workflow.start_workflow().unwrap(), StartDisposition::Started);

        let outcome = workflow.run_step(StepId::UpdateRecord).await.unwrap();
        assert!(outcome.is_success());

        let snapshot = workflow.snapshot();
        assert_eq!(snapshot.completed_count, 1);
        assert_eq!(snapshot.total_steps, 1);
        assert!(snapshot.is_complete());
        assert_eq!(snapshot.phase, Phase::Complete);
        assert!(notifier.has_success("Profile updated"));
    }

    #[tokio::test]
    async fn uploads_enable_record_update() {
        let draft = ProfileDraft::named("Ana")
            .with_picture("me.png")
            .with_banner("sky.jpg");
        let workflow = update_workflow(&draft, Arc::new(MockNotifier::new()));
        workflow.start_workflow().unwrap();
        assert_eq!(status(&workflow, StepId::UpdateRecord), (StepStatus::Idle, false));

        workflow.run_step(StepId::UploadPicture).await.unwrap();
        assert_eq!(status(&workflow, StepId::UpdateRecord), (StepStatus::Idle, false));

        workflow.run_step(StepId::UploadBanner).await.unwrap();
        assert_eq!(status(&workflow, StepId::UpdateRecord), (StepStatus::Idle, true));
    }

    #[tokio::test]
    async fn record_update_receives_upload_artifacts() {
        let seen = Arc::new(Mutex::new(None));
        let captured = seen.clone();
        let registry =
            StepRegistry::for_update(&ProfileDraft::named("Ana").with_picture("me.png")).unwrap();
        let workflow = Workflow::builder(registry, Arc::new(SessionIdentity::connected("0.0.5")))
            .handler(StepId::UploadPicture, ok_handler("ipfs://pic"))
            .handler(
                StepId::UpdateRecord,
                handler_fn(move |ctx: StepContext| {
                    let captured = captured.clone();
                    async move {
                        *captured.lock().unwrap() = ctx
                            .artifact(StepId::UploadPicture)
                            .and_then(Artifact::as_str)
                            .map(str::to_string);
                        Ok(HandlerOutput::done("0xrecord"))
                    }
                }),
            )
            .build()
            .unwrap();
        workflow.start_workflow().unwrap();
        workflow.run_step(StepId::UploadPicture).await.unwrap();
        workflow.run_step(StepId::UpdateRecord).await.unwrap();

        assert_eq!(seen.lock().unwrap().as_deref(), Some("ipfs://pic"));
        assert_eq!(
            workflow.artifact(StepId::UpdateRecord),
            Some(Artifact::from("0xrecord"))
        );
    }

    #[tokio::test]
    async fn steps_require_started_workflow() {
        let workflow = update_workflow(&ProfileDraft::named("Ana"), Arc::new(MockNotifier::new()));
        assert!(matches!(
            workflow.run_step(StepId::UpdateRecord).await,
            Err(StepwiseError::NotStarted)
        ));
        workflow.start_workflow().unwrap();
        assert!(matches!(
            workflow.start_workflow(),
            Err(StepwiseError::AlreadyStarted)
        ));
    }

    #[tokio::test]
    async fn succeeded_step_cannot_rerun() {
        let workflow = update_workflow(&ProfileDraft::named("Ana"), Arc::new(MockNotifier::new()));
        workflow.start_workflow().unwrap();
        workflow.run_step(StepId::UpdateRecord).await.unwrap();
        let before = workflow.snapshot();
        assert!(matches!(
            workflow.run_step(StepId::UpdateRecord).await,
            Err(StepwiseError::StepAlreadySucceeded { .. })
        ));
        assert_eq!(workflow.snapshot(), before);
    }

    #[tokio::test]
    async fn missing_handler_is_rejected_at_build() {
        let registry = StepRegistry::for_update(&ProfileDraft::named("Ana")).unwrap();
        let result = Workflow::builder(registry, Arc::new(SessionIdentity::connected("0.0.5"))).build();
        assert!(matches!(
            result,
            Err(StepwiseError::MissingHandler {
                step: StepId::UpdateRecord
            })
        ));
    }

    #[tokio::test]
    async fn failure_suspends_auto_even_in_manual_mode() {
        let registry = StepRegistry::for_update(&ProfileDraft::named("Ana")).unwrap();
        let notifier = Arc::new(MockNotifier::new());
        let workflow = Workflow::builder(registry, Arc::new(SessionIdentity::connected("0.0.5")))
            .handler(
                StepId::UpdateRecord,
                handler_fn(|_| async { anyhow::bail!("record rejected by ledger") }),
            )
            .notifier(notifier.clone())
            .build()
            .unwrap();
        workflow.start_workflow().unwrap();

        let outcome = workflow.run_step(StepId::UpdateRecord).await.unwrap();
        assert!(matches!(outcome, Outcome::Fatal(_)));

        let snapshot = workflow.snapshot();
        assert_eq!(status(&workflow, StepId::UpdateRecord), (StepStatus::Error, true));
        assert!(!snapshot.auto_progress);
        assert!(snapshot.auto_progress_suspended);
        assert!(notifier.has_error("record rejected by ledger"));
        assert!(matches!(
            workflow.toggle_auto(true),
            Err(StepwiseError::AutoProgressSuspended)
        ));
    }

    #[tokio::test]
    async fn user_cancel_is_a_warning() {
        let registry = StepRegistry::for_update(&ProfileDraft::named("Ana")).unwrap();
        let notifier = Arc::new(MockNotifier::new());
        let workflow = Workflow::builder(registry, Arc::new(SessionIdentity::connected("0.0.5")))
            .handler(
                StepId::UpdateRecord,
                handler_fn(|_| async { Ok(HandlerOutput::Cancelled) }),
            )
            .notifier(notifier.clone())
            .build()
            .unwrap();
        workflow.start_workflow().unwrap();
        workflow.run_step(StepId::UpdateRecord).await.unwrap();

        assert!(notifier.has_warning("cancelled"));
        assert!(notifier.errors().is_empty());
        assert!(workflow.snapshot().auto_progress_suspended);
    }

    #[tokio::test]
    async fn toggle_auto_requires_identity() {
        let registry = StepRegistry::for_update(&ProfileDraft::named("Ana")).unwrap();
        let workflow = Workflow::builder(registry, Arc::new(SessionIdentity::disconnected()))
            .handler(StepId::UpdateRecord, ok_handler("x"))
            .build()
            .unwrap();
        workflow.start_workflow().unwrap();
        assert!(matches!(
            workflow.toggle_auto(true),
            Err(StepwiseError::IdentityUnavailable { .. })
        ));
        assert!(!workflow.snapshot().auto_progress);
        assert!(matches!(
            workflow.resume_after_error(),
            Err(StepwiseError::IdentityUnavailable { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn auto_mode_runs_every_step() {
        let draft = ProfileDraft::named("Ana")
            .with_picture("me.png")
            .with_banner("sky.jpg");
        let notifier = Arc::new(MockNotifier::new());
        let workflow = update_workflow(&draft, notifier.clone());
        let mut updates = workflow.subscribe();

        workflow.start_workflow().unwrap();
        workflow.toggle_auto(true).unwrap();
        updates.wait_for(|s| s.is_complete()).await.unwrap();

        assert!(notifier.has_success("picture uploaded"));
        assert!(notifier.has_success("Banner uploaded"));
        assert!(notifier.has_success("Profile updated"));
        assert!(workflow.snapshot().auto_progress);
    }

    #[tokio::test(start_paused = true)]
    async fn auto_waits_for_settle_delay() {
        let workflow = update_workflow(&ProfileDraft::named("Ana"), Arc::new(MockNotifier::new()));
        workflow.start_workflow().unwrap();
        workflow.toggle_auto(true).unwrap();

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(status(&workflow, StepId::UpdateRecord).0, StepStatus::Idle);

        let mut updates = workflow.subscribe();
        updates.wait_for(|s| s.is_complete()).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn disabling_auto_cancels_pending_tick() {
        let workflow = update_workflow(&ProfileDraft::named("Ana"), Arc::new(MockNotifier::new()));
        workflow.start_workflow().unwrap();
        workflow.toggle_auto(true).unwrap();
        workflow.toggle_auto(false).unwrap();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(status(&workflow, StepId::UpdateRecord).0, StepStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_then_fatal_suspends_and_resume_retries_failed_step() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let draft = ProfileDraft::named("Ana").with_picture("me.png");
        let registry = StepRegistry::for_update(&draft).unwrap();
        let notifier = Arc::new(MockNotifier::new());
        let workflow = Workflow::builder(registry, Arc::new(SessionIdentity::connected("0.0.5")))
            .handler(
                StepId::UploadPicture,
                handler_fn(move |_| {
                    let call = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    async move {
                        match call {
                            1 => anyhow::bail!("stale synchronization"),
                            2 => anyhow::bail!("image rejected"),
                            _ => Ok(HandlerOutput::done("ipfs://pic")),
                        }
                    }
                }),
            )
            .handler(StepId::UpdateRecord, ok_handler("0xrecord"))
            .notifier(notifier.clone())
            .build()
            .unwrap();
        let mut updates = workflow.subscribe();

        workflow.start_workflow().unwrap();
        workflow.toggle_auto(true).unwrap();
        updates
            .wait_for(|s| s.auto_progress_suspended)
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(notifier.has_info("retrying"));
        assert_eq!(status(&workflow, StepId::UploadPicture), (StepStatus::Error, true));
        assert!(!workflow.snapshot().auto_progress);

        assert_eq!(
            workflow.resume_after_error().unwrap(),
            Some(StepId::UploadPicture)
        );
        updates.wait_for(|s| s.is_complete()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(!workflow.snapshot().auto_progress_suspended);
    }

    #[tokio::test(start_paused = true)]
    async fn start_step_rejects_second_step_while_loading() {
        let draft = ProfileDraft::named("Ana")
            .with_picture("me.png")
            .with_banner("sky.jpg");
        let registry = StepRegistry::for_update(&draft).unwrap();
        let workflow = Workflow::builder(registry, Arc::new(SessionIdentity::connected("0.0.5")))
            .handler(
                StepId::UploadPicture,
                handler_fn(|_| async {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    Ok(HandlerOutput::done("ipfs://pic"))
                }),
            )
            .handler(StepId::UploadBanner, ok_handler("ipfs://banner"))
            .handler(StepId::UpdateRecord, ok_handler("0xrecord"))
            .build()
            .unwrap();
        workflow.start_workflow().unwrap();

        workflow.start_step(StepId::UploadPicture).unwrap();
        assert!(matches!(
            workflow.start_step(StepId::UploadBanner),
            Err(StepwiseError::WorkflowBusy {
                running: StepId::UploadPicture
            })
        ));
        assert!(matches!(
            workflow.start_step(StepId::UploadPicture),
            Err(StepwiseError::StepAlreadyRunning { .. })
        ));

        let mut updates = workflow.subscribe();
        updates
            .wait_for(|s| {
                s.step(StepId::UploadPicture).map(|p| p.status) == Some(StepStatus::Success)
            })
            .await
            .unwrap();
        workflow.start_step(StepId::UploadBanner).unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_discards_in_flight_result() {
        let notifier = Arc::new(MockNotifier::new());
        let registry = StepRegistry::for_update(&ProfileDraft::named("Ana")).unwrap();
        let workflow = Workflow::builder(registry, Arc::new(SessionIdentity::connected("0.0.5")))
            .handler(
                StepId::UpdateRecord,
                handler_fn(|_| async {
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    Ok(HandlerOutput::done("0xrecord"))
                }),
            )
            .notifier(notifier.clone())
            .build()
            .unwrap();
        workflow.start_workflow().unwrap();

        let running = workflow.clone();
        let handle = tokio::spawn(async move { running.run_step(StepId::UpdateRecord).await });
        tokio::task::yield_now().await;
        workflow.cancel();

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(StepwiseError::WorkflowCancelled)));
        assert!(notifier.successes().is_empty());
        assert_eq!(workflow.snapshot().phase, Phase::Cancelled);
        assert!(workflow.artifact(StepId::UpdateRecord).is_none());
    }

    #[tokio::test]
    async fn completion_callback_fires_once() {
        let workflow = update_workflow(&ProfileDraft::named("Ana"), Arc::new(MockNotifier::new()));
        let fired = Arc::new(AtomicU32::new(0));
        let counter = fired.clone();
        workflow.on_complete(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        workflow.start_workflow().unwrap();
        workflow.run_step(StepId::UpdateRecord).await.unwrap();
        let _ = workflow.run_step(StepId::UpdateRecord).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        let late = Arc::new(AtomicU32::new(0));
        let late_counter = late.clone();
        workflow.on_complete(move || {
            late_counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(late.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn legacy_record_defers_until_migration_completes() {
        let identity: Arc<dyn IdentitySource> = Arc::new(SessionIdentity::connected("0.0.5"));
        let update = Workflow::builder(
            StepRegistry::for_update(&ProfileDraft::named("Ana")).unwrap(),
            identity.clone(),
        )
        .handler(StepId::UpdateRecord, ok_handler("0xrecord"))
        .record(ProfileRecord {
            format: RecordFormat::Legacy,
            name: "Ana".into(),
        })
        .build()
        .unwrap();

        let lists = LegacyLists {
            groups: vec!["g1".into()],
            ..Default::default()
        };
        let migration = Workflow::builder(StepRegistry::for_migration(&lists).unwrap(), identity)
            .handler(StepId::CreateGroupsTopic, ok_handler("0.0.900"))
            .handler(StepId::UpdateRecord, ok_handler("0xmigrated"))
            .build()
            .unwrap();
        update.run_after(&migration);

        assert!(matches!(
            update.start_workflow().unwrap(),
            StartDisposition::Deferred { .. }
        ));
        assert!(update.is_start_deferred());
        assert_eq!(update.snapshot().phase, Phase::AwaitingGate);
        assert!(matches!(
            update.run_step(StepId::UpdateRecord).await,
            Err(StepwiseError::NotStarted)
        ));

        migration.start_workflow().unwrap();
        migration.run_step(StepId::CreateGroupsTopic).await.unwrap();
        assert_eq!(update.snapshot().phase, Phase::AwaitingGate);
        migration.run_step(StepId::UpdateRecord).await.unwrap();

        assert_eq!(update.snapshot().phase, Phase::Running);
        assert!(!update.is_start_deferred());
        update.run_step(StepId::UpdateRecord).await.unwrap();
        assert!(update.is_complete());
    }

    #[tokio::test]
    async fn readiness_holds_after_every_transition() {
        let draft = ProfileDraft::named("Ana")
            .with_picture("me.png")
            .with_banner("sky.jpg");
        let workflow = update_workflow(&draft, Arc::new(MockNotifier::new()));
        workflow.start_workflow().unwrap();

        let check = |snapshot: &WorkflowSnapshot| {
            for step in &snapshot.steps {
                if step.id == StepId::UpdateRecord && step.status == StepStatus::Idle {
                    let uploads_done = [StepId::UploadPicture, StepId::UploadBanner]
                        .iter()
                        .all(|id| snapshot.step(*id).map(|s| s.status) == Some(StepStatus::Success));
                    assert_eq!(step.ready, uploads_done);
                }
            }
            assert!(snapshot.steps.iter().filter(|s| s.status == StepStatus::Loading).count() <= 1);
        };

        check(&workflow.snapshot());
        for step in [StepId::UploadBanner, StepId::UploadPicture, StepId::UpdateRecord] {
            workflow.run_step(step).await.unwrap();
            check(&workflow.snapshot());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_retry_delay_stops_further_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let notifier = Arc::new(MockNotifier::new());
        let registry = StepRegistry::for_update(&ProfileDraft::named("Ana")).unwrap();
        let workflow = Workflow::builder(registry, Arc::new(SessionIdentity::connected("0.0.5")))
            .handler(
                StepId::UpdateRecord,
                handler_fn(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async { anyhow::bail!("stale synchronization") }
                }),
            )
            .notifier(notifier.clone())
            .build()
            .unwrap();
        workflow.start_workflow().unwrap();

        workflow.start_step(StepId::UpdateRecord).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(notifier.has_info("retrying"));

        workflow.cancel();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(workflow.snapshot().phase, Phase::Cancelled);
        assert!(notifier.errors().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_in_auto_mode_suspends_with_distinct_message() {
        let notifier = Arc::new(MockNotifier::new());
        let registry = StepRegistry::for_update(&ProfileDraft::named("Ana")).unwrap();
        let workflow = Workflow::builder(registry, Arc::new(SessionIdentity::connected("0.0.5")))
            .handler(
                StepId::UpdateRecord,
                handler_fn(|_| async {
                    std::future::pending::<()>().await;
                    Ok(HandlerOutput::done("never"))
                }),
            )
            .config(OrchestratorConfig {
                step_timeout_ms: 2_000,
                transient_retries: 0,
                ..Default::default()
            })
            .notifier(notifier.clone())
            .build()
            .unwrap();
        let mut updates = workflow.subscribe();

        workflow.start_workflow().unwrap();
        workflow.toggle_auto(true).unwrap();
        assert!(workflow.snapshot().auto_progress);

        updates
            .wait_for(|s| s.auto_progress_suspended)
            .await
            .unwrap();

        let snapshot = workflow.snapshot();
        assert!(!snapshot.auto_progress);
        assert_eq!(status(&workflow, StepId::UpdateRecord), (StepStatus::Error, true));
        assert_eq!(
            snapshot.last_outcome.map(|last| last.outcome),
            Some(Outcome::TimedOut)
        );
        assert!(notifier.has_error("timed out after 2s"));
        assert!(notifier.has_info("Auto-progress paused"));
    }

    #[tokio::test(start_paused = true)]
    async fn user_cancel_in_auto_mode_suspends() {
        let notifier = Arc::new(MockNotifier::new());
        let registry = StepRegistry::for_update(&ProfileDraft::named("Ana")).unwrap();
        let workflow = Workflow::builder(registry, Arc::new(SessionIdentity::connected("0.0.5")))
            .handler(
                StepId::UpdateRecord,
                handler_fn(|_| async { Ok(HandlerOutput::Cancelled) }),
            )
            .notifier(notifier.clone())
            .build()
            .unwrap();
        let mut updates = workflow.subscribe();

        workflow.start_workflow().unwrap();
        workflow.toggle_auto(true).unwrap();
        assert!(workflow.snapshot().auto_progress);

        updates
            .wait_for(|s| s.auto_progress_suspended)
            .await
            .unwrap();

        let snapshot = workflow.snapshot();
        assert!(!snapshot.auto_progress);
        assert_eq!(status(&workflow, StepId::UpdateRecord), (StepStatus::Error, true));
        assert!(notifier.has_warning("cancelled"));
        assert!(notifier.errors().is_empty());
    }

    #[test]
    fn build_outside_runtime_is_rejected() {
        let registry = StepRegistry::for_update(&ProfileDraft::named("Ana")).unwrap();
        let result = Workflow::builder(registry, Arc::new(SessionIdentity::connected("0.0.5")))
            .handler(StepId::UpdateRecord, ok_handler("0xrecord"))
            .build();
        assert!(matches!(
            result,
            Err(StepwiseError::RuntimeUnavailable { .. })
        ));
    }

    #[test]
    fn explicit_runtime_drives_workflow_from_plain_thread() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let registry = StepRegistry::for_update(&ProfileDraft::named("Ana")).unwrap();
        let workflow = Workflow::builder(registry, Arc::new(SessionIdentity::connected("0.0.5")))
            .handler(StepId::UpdateRecord, ok_handler("0xrecord"))
            .config(OrchestratorConfig {
                settle_delay_ms: 0,
                ..Default::default()
            })
            .runtime(runtime.handle().clone())
            .build()
            .unwrap();
        let mut updates = workflow.subscribe();

        workflow.start_workflow().unwrap();
        workflow.toggle_auto(true).unwrap();
        runtime.block_on(async {
            updates.wait_for(|s| s.is_complete()).await.unwrap();
        });

        assert!(workflow.is_complete());
    }
}
