//! Step orchestration.
//!
//! - [`StepRegistry`] - Which steps an instance contains
//! - [`StepStore`] - Per-step status and enablement
//! - [`dependency`] - Readiness resolution
//! - [`SafeExecutor`] - Precondition, timeout, classification, retry
//! - [`AutoController`] - Manual/auto progression
//! - [`Workflow`] - The control surface tying them together

pub mod controller;
pub mod dependency;
pub mod executor;
pub mod gate;
pub mod outcome;
pub mod patterns;
pub mod registry;
pub mod snapshot;
pub mod store;
pub mod workflow;

pub use controller::{AutoController, NextAction, ProgressMode};
pub use executor::{claim, SafeExecutor};
pub use gate::{GateDecision, OpenGate, PreflightGate, RecordFormatGate, StartDisposition};
pub use outcome::{Outcome, Severity};
pub use patterns::{FaultClass, FaultClassifier, FaultMatch, FaultPattern, PatternScope};
pub use registry::{StepDecl, StepRegistry, StepRegistryBuilder};
pub use snapshot::{LastOutcome, Phase, StepSnapshot, WorkflowSnapshot};
pub use store::StepStore;
pub use workflow::{Workflow, WorkflowBuilder};
