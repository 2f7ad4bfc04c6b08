//! Stepwise - Multi-step asynchronous workflow orchestration.
//!
//! Stepwise drives profile edits that need several independent signed
//! operations (uploading a picture, uploading a banner, writing the record)
//! through a single workflow: steps run when their prerequisites succeed,
//! failures are classified and reported, and the workflow can advance on
//! its own once the user opts in.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Orchestrator settings loading and validation
//! - [`error`] - Error types and result aliases
//! - [`identity`] - Active account lookup
//! - [`notify`] - Notification port and its renderers
//! - [`profile`] - Profile inputs that decide a workflow's steps
//! - [`runner`] - Registry, state store, executor and workflow handle
//! - [`simulate`] - Scripted handlers and scenario runs
//! - [`steps`] - Step identifiers, statuses and the handler trait
//!
//! # Example
//!
//! ```
//! use stepwise::profile::ProfileDraft;
//! use stepwise::runner::StepRegistry;
//! use stepwise::steps::StepId;
//!
//! let draft = ProfileDraft::named("Ana").with_picture("me.png");
//! let registry = StepRegistry::for_update(&draft).unwrap();
//! let steps = registry.build_steps();
//!
//! assert_eq!(steps[0].id, StepId::UploadPicture);
//! assert!(steps[0].enabled);
//! assert!(!steps[1].enabled);
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod identity;
pub mod notify;
pub mod profile;
pub mod runner;
pub mod simulate;
pub mod steps;

pub use error::{Result, StepwiseError};
