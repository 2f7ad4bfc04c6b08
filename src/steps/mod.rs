//! Step identity, state and handler contract.
//!
//! - [`StepId`] / [`WorkflowKind`] - The fixed step catalogue
//! - [`Step`] / [`StepStatus`] - Per-instance step state
//! - [`StepHandler`] - The async operation performing a step's work
//! - [`Artifact`] - Values carried from one step into later ones
//!
//! # Example
//!
//! ```
//! use stepwise::steps::{Step, StepId, StepStatus};
//!
//! let step = Step::new(StepId::UpdateRecord, vec![StepId::UploadPicture], false);
//! assert_eq!(step.status, StepStatus::Idle);
//! assert!(!step.enabled);
//! ```

pub mod artifact;
pub mod handler;
pub mod id;
pub mod status;

pub use artifact::Artifact;
pub use handler::{handler_fn, FnHandler, HandlerOutput, StepContext, StepHandler};
pub use id::{StepId, WorkflowKind};
pub use status::{Step, StepStatus};
