//! Error types for Stepwise operations.
//!
//! This module defines [`StepwiseError`], the primary error type used
//! throughout the crate, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Control-surface rejections (starting a step that is not ready, toggling
//!   auto mode without an identity) are returned as `StepwiseError` and
//!   leave the workflow untouched
//! - Step handler failures never surface here: they are classified into an
//!   [`Outcome`](crate::runner::Outcome) by the execution wrapper
//! - Use `anyhow::Error` (via `StepwiseError::Other`) for unexpected errors

use std::path::PathBuf;
use thiserror::Error;

use crate::steps::{StepId, WorkflowKind};

/// Core error type for Stepwise operations.
#[derive(Debug, Error)]
pub enum StepwiseError {
    /// Configuration file not found at expected location.
    #[error("Configuration not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Failed to parse configuration file.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    /// Invalid configuration structure or values.
    #[error("Invalid configuration: {message}")]
    ConfigValidationError { message: String },

    /// A registry declares a step from another workflow kind's catalogue.
    #[error("Step '{step}' is not part of the {kind} workflow")]
    ForeignStep { step: StepId, kind: WorkflowKind },

    /// A step declares a prerequisite that does not belong to its workflow.
    #[error("Step '{step}' depends on unknown step '{prerequisite}'")]
    UnknownPrerequisite { step: StepId, prerequisite: StepId },

    /// Step prerequisite cycle detected.
    #[error("Circular dependency detected: {cycle}")]
    CircularDependency { cycle: String },

    /// A step in the registry has no handler bound to it.
    #[error("No handler registered for step '{step}'")]
    MissingHandler { step: StepId },

    /// The step is not part of this workflow instance.
    #[error("Step '{step}' is not part of this workflow")]
    UnknownStep { step: StepId },

    /// The step is disabled or its prerequisites have not succeeded.
    #[error("Step '{step}' is not ready to run")]
    StepNotReady { step: StepId },

    /// The step is already executing.
    #[error("Step '{step}' is already running")]
    StepAlreadyRunning { step: StepId },

    /// The step already succeeded and will not run again.
    #[error("Step '{step}' already succeeded")]
    StepAlreadySucceeded { step: StepId },

    /// Another step is executing; only one step may run at a time.
    #[error("Step '{running}' is still running")]
    WorkflowBusy { running: StepId },

    /// The workflow has not been started (or is waiting on its gate).
    #[error("Workflow has not been started")]
    NotStarted,

    /// The workflow was already started.
    #[error("Workflow was already started")]
    AlreadyStarted,

    /// The workflow was cancelled and accepts no further intents.
    #[error("Workflow was cancelled")]
    WorkflowCancelled,

    /// No active identity/session is available.
    #[error("No active identity: {message}")]
    IdentityUnavailable { message: String },

    /// Auto-progress was suspended by a failure and needs an explicit resume.
    #[error("Auto-progress is suspended; resume after the failed step is addressed")]
    AutoProgressSuspended,

    /// No Tokio runtime to run step executions and auto ticks on.
    #[error("No async runtime available: {message}")]
    RuntimeUnavailable { message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for Stepwise operations.
pub type Result<T> = std::result::Result<T, StepwiseError>;
