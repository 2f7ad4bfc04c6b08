//! Step handler contract.
//!
//! Handlers perform the actual remote work of a step (media upload, topic
//! creation, record update). They are supplied by the caller and must be
//! safe to invoke again on retry: the orchestrator does not deduplicate
//! side effects across attempts.

use std::collections::HashMap;
use std::future::Future;

use async_trait::async_trait;

use crate::identity::Identity;

use super::{Artifact, StepId};

/// What a handler hands back when it does not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerOutput {
    /// The step's work is done.
    Done(Artifact),
    /// The user declined an external approval (e.g. a wallet signature).
    Cancelled,
}

impl HandlerOutput {
    /// Done with an artifact.
    pub fn done(artifact: impl Into<Artifact>) -> Self {
        HandlerOutput::Done(artifact.into())
    }
}

/// Inputs available to a handler invocation.
#[derive(Debug, Clone)]
pub struct StepContext {
    /// The step being executed.
    pub step: StepId,
    /// 1-based attempt number within one execution (transient retries count).
    pub attempt: u32,
    /// Identity the workflow runs as.
    pub identity: Identity,
    /// Artifacts produced by steps that already succeeded.
    pub artifacts: HashMap<StepId, Artifact>,
}

impl StepContext {
    /// Artifact produced by an earlier step, if it ran.
    pub fn artifact(&self, step: StepId) -> Option<&Artifact> {
        self.artifacts.get(&step)
    }
}

/// Performs the work of one step.
#[async_trait]
pub trait StepHandler: Send + Sync {
    /// Run the step once.
    async fn run(&self, ctx: StepContext) -> anyhow::Result<HandlerOutput>;
}

/// Adapter turning an async closure into a [`StepHandler`].
pub struct FnHandler<F>(F);

/// Build a handler from an async closure.
///
/// ```
/// use stepwise::steps::{handler_fn, HandlerOutput};
///
/// let handler = handler_fn(|ctx| async move {
///     Ok(HandlerOutput::done(format!("ipfs://{}", ctx.step)))
/// });
/// # let _ = handler;
/// ```
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(StepContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<HandlerOutput>> + Send,
{
    FnHandler(f)
}

#[async_trait]
impl<F, Fut> StepHandler for FnHandler<F>
where
    F: Fn(StepContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<HandlerOutput>> + Send,
{
    async fn run(&self, ctx: StepContext) -> anyhow::Result<HandlerOutput> {
        (self.0)(ctx).await
    }
}
