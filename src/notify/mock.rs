//! Mock notifier for testing.
//!
//! `MockNotifier` implements the `Notifier` trait and captures all
//! notifications for later assertion.

use std::sync::Mutex;

use crate::runner::WorkflowSnapshot;

use super::Notifier;

#[derive(Debug, Default)]
struct Captured {
    successes: Vec<String>,
    errors: Vec<String>,
    infos: Vec<String>,
    warnings: Vec<String>,
    snapshots: Vec<WorkflowSnapshot>,
}

/// Mock notifier implementation for testing.
///
/// Interior mutability lets it be shared with a running workflow while the
/// test keeps a handle for assertions.
#[derive(Debug, Default)]
pub struct MockNotifier {
    captured: Mutex<Captured>,
}

impl MockNotifier {
    /// Create an empty MockNotifier.
    pub fn new() -> Self {
        Self::default()
    }

    fn captured(&self) -> std::sync::MutexGuard<'_, Captured> {
        self.captured.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Get all captured success messages.
    pub fn successes(&self) -> Vec<String> {
        self.captured().successes.clone()
    }

    /// Get all captured error messages.
    pub fn errors(&self) -> Vec<String> {
        self.captured().errors.clone()
    }

    /// Get all captured info messages.
    pub fn infos(&self) -> Vec<String> {
        self.captured().infos.clone()
    }

    /// Get all captured warning messages.
    pub fn warnings(&self) -> Vec<String> {
        self.captured().warnings.clone()
    }

    /// Get all captured progress snapshots.
    pub fn snapshots(&self) -> Vec<WorkflowSnapshot> {
        self.captured().snapshots.clone()
    }

    /// Check if a specific success was shown.
    pub fn has_success(&self, msg: &str) -> bool {
        self.captured().successes.iter().any(|m| m.contains(msg))
    }

    /// Check if a specific error was shown.
    pub fn has_error(&self, msg: &str) -> bool {
        self.captured().errors.iter().any(|m| m.contains(msg))
    }

    /// Check if a specific info message was shown.
    pub fn has_info(&self, msg: &str) -> bool {
        self.captured().infos.iter().any(|m| m.contains(msg))
    }

    /// Check if a specific warning was shown.
    pub fn has_warning(&self, msg: &str) -> bool {
        self.captured().warnings.iter().any(|m| m.contains(msg))
    }
}

impl Notifier for MockNotifier {
    fn on_success(&self, msg: &str) {
        self.captured().successes.push(msg.to_string());
    }

    fn on_error(&self, msg: &str) {
        self.captured().errors.push(msg.to_string());
    }

    fn on_info(&self, msg: &str) {
        self.captured().infos.push(msg.to_string());
    }

    fn on_warning(&self, msg: &str) {
        self.captured().warnings.push(msg.to_string());
    }

    fn on_progress(&self, snapshot: &WorkflowSnapshot) {
        self.captured().snapshots.push(snapshot.clone());
    }
}
