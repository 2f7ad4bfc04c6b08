//! Safe execution wrapper.
//!
//! Every step runs through [`SafeExecutor`]: it checks the identity
//! precondition, races the handler against the step timeout, classifies the
//! result into an [`Outcome`], and re-invokes the handler once more on
//! transient faults before giving up.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::OrchestratorConfig;
use crate::error::{Result, StepwiseError};
use crate::identity::IdentitySource;
use crate::notify::Notifier;
use crate::steps::{Artifact, HandlerOutput, StepContext, StepHandler, StepId, StepStatus};

use super::dependency;
use super::outcome::Outcome;
use super::patterns::{FaultClass, FaultClassifier};
use super::store::StepStore;

/// Mark a step `Loading/disabled`, rejecting it if it may not start.
///
/// Nothing is mutated when the claim is rejected.
pub fn claim(store: &mut StepStore, step: StepId) -> Result<()> {
    let current = store
        .get(step)
        .ok_or(StepwiseError::UnknownStep { step })?;

    match current.status {
        StepStatus::Loading => return Err(StepwiseError::StepAlreadyRunning { step }),
        StepStatus::Success => return Err(StepwiseError::StepAlreadySucceeded { step }),
        StepStatus::Idle | StepStatus::Error => {}
    }

    if let Some(running) = store.loading() {
        return Err(StepwiseError::WorkflowBusy { running });
    }

    if !current.enabled || !dependency::prerequisites_met(store, current) {
        return Err(StepwiseError::StepNotReady { step });
    }

    store.set(step, StepStatus::Loading, false);
    dependency::refresh_enablement(store);
    debug!(step = %step, "claimed step");
    Ok(())
}

/// Runs step handlers and classifies their results.
#[derive(Debug, Clone)]
pub struct SafeExecutor {
    classifier: FaultClassifier,
    timeout: Duration,
    retry_delay: Duration,
    retries: u32,
}

impl SafeExecutor {
    /// Create an executor with explicit settings.
    pub fn new(classifier: FaultClassifier, timeout: Duration) -> Self {
        Self {
            classifier,
            timeout,
            retry_delay: Duration::from_millis(1000),
            retries: 1,
        }
    }

    /// Create an executor from configuration.
    pub fn from_config(config: &OrchestratorConfig) -> Result<Self> {
        Ok(Self {
            classifier: FaultClassifier::from_config(config)?,
            timeout: config.step_timeout(),
            retry_delay: config.transient_retry_delay(),
            retries: config.transient_retries,
        })
    }

    /// Set the automatic retry policy for transient faults.
    pub fn with_retries(mut self, retries: u32, delay: Duration) -> Self {
        self.retries = retries;
        self.retry_delay = delay;
        self
    }

    /// The per-attempt timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Execute a claimed step until it produces a final outcome.
    ///
    /// Transient faults and timeouts are re-invoked up to the configured
    /// number of times; the step stays `Loading` in between. No further
    /// attempt is made once `cancelled` reports true; the last outcome is
    /// returned instead.
    pub async fn execute(
        &self,
        step: StepId,
        handler: &dyn StepHandler,
        identity: &dyn IdentitySource,
        artifacts: &HashMap<StepId, Artifact>,
        notifier: &dyn Notifier,
        cancelled: &(dyn Fn() -> bool + Sync),
    ) -> Outcome {
        let mut attempt = 1;

        loop {
            let outcome = self
                .attempt(step, attempt, handler, identity, artifacts)
                .await;

            if !outcome.is_retry_eligible() || attempt > self.retries {
                info!(step = %step, attempt, outcome = outcome.label(), "step finished");
                return outcome;
            }

            warn!(
                step = %step,
                attempt,
                outcome = outcome.label(),
                delay_ms = self.retry_delay.as_millis() as u64,
                "retrying step"
            );
            notifier.on_info(&format!(
                "{} hit a temporary problem; retrying in {}s",
                step.label(),
                self.retry_delay.as_secs_f64()
            ));
            tokio::time::sleep(self.retry_delay).await;
            if cancelled() {
                info!(step = %step, attempt, "cancelled before retry; handler not invoked");
                return outcome;
            }
            attempt += 1;
        }
    }

    /// Run the handler once and classify the result.
    async fn attempt(
        &self,
        step: StepId,
        attempt: u32,
        handler: &dyn StepHandler,
        identity: &dyn IdentitySource,
        artifacts: &HashMap<StepId, Artifact>,
    ) -> Outcome {
        let Some(identity) = identity.current() else {
            debug!(step = %step, "no active identity; handler not invoked");
            return Outcome::PreconditionFailed("no active identity".to_string());
        };

        let ctx = StepContext {
            step,
            attempt,
            identity,
            artifacts: artifacts.clone(),
        };

        debug!(step = %step, attempt, "invoking handler");
        match tokio::time::timeout(self.timeout, handler.run(ctx)).await {
            Err(_) => Outcome::TimedOut,
            Ok(Ok(HandlerOutput::Done(artifact))) => Outcome::Success(artifact),
            Ok(Ok(HandlerOutput::Cancelled)) => Outcome::UserCancelled,
            Ok(Err(err)) => self.classify(step, &err),
        }
    }

    /// Map a handler error onto an outcome using the fault signatures.
    pub fn classify(&self, step: StepId, err: &anyhow::Error) -> Outcome {
        let message = format!("{:#}", err);
        match self.classifier.classify(step, &message) {
            Some(found) => {
                debug!(step = %step, pattern = found.pattern, "matched fault signature");
                match found.class {
                    FaultClass::Transient => Outcome::Transient(message),
                    FaultClass::UserDeclined => Outcome::UserCancelled,
                }
            }
            None => Outcome::Fatal(message),
        }
    }
}
