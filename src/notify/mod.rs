//! Notification port.
//!
//! The orchestrator reports progress through a [`Notifier`]; presentation
//! code decides how to render it. Notifications are fire-and-forget.
//!
//! - [`TracingNotifier`] logs through `tracing`
//! - [`TerminalNotifier`] renders styled lines and a progress bar
//! - [`MockNotifier`] captures everything for assertions
//!
//! # Example
//!
//! ```
//! use stepwise::notify::{MockNotifier, Notifier};
//!
//! let notifier = MockNotifier::new();
//! notifier.on_success("Banner uploaded");
//! assert!(notifier.has_success("Banner"));
//! ```

pub mod mock;
pub mod terminal;

pub use mock::MockNotifier;
pub use terminal::TerminalNotifier;

use crate::runner::WorkflowSnapshot;

/// Receives workflow notifications.
pub trait Notifier: Send + Sync {
    /// A step or the whole workflow succeeded.
    fn on_success(&self, msg: &str);

    /// A step failed.
    fn on_error(&self, msg: &str);

    /// Neutral information (retry scheduled, mode changed).
    fn on_info(&self, msg: &str);

    /// Something the user should notice but that is not an error,
    /// such as a declined approval.
    fn on_warning(&self, msg: &str) {
        self.on_info(msg);
    }

    /// Workflow state changed.
    fn on_progress(&self, _snapshot: &WorkflowSnapshot) {}
}

/// Notifier that writes every message to the `tracing` log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn on_success(&self, msg: &str) {
        tracing::info!(kind = "success", "{}", msg);
    }

    fn on_error(&self, msg: &str) {
        tracing::error!("{}", msg);
    }

    fn on_info(&self, msg: &str) {
        tracing::info!("{}", msg);
    }

    fn on_warning(&self, msg: &str) {
        tracing::warn!("{}", msg);
    }

    fn on_progress(&self, snapshot: &WorkflowSnapshot) {
        tracing::debug!(
            completed = snapshot.completed_count,
            total = snapshot.total_steps,
            auto = snapshot.auto_progress,
            "workflow progress"
        );
    }
}
