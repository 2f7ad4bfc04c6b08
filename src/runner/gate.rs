//! Pre-flight gate run before a workflow starts.

use std::fmt;
use std::sync::Mutex;

use crate::profile::ProfileRecord;

/// Result of a pre-flight check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// The workflow may start now.
    Pass,
    /// The workflow must wait for a prerequisite workflow.
    Blocked { reason: String },
}

/// Decides whether a workflow may start against the current record.
pub trait PreflightGate: Send + Sync {
    /// Check the record.
    fn check(&self, record: &ProfileRecord) -> GateDecision;
}

/// Gate that always passes.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenGate;

impl PreflightGate for OpenGate {
    fn check(&self, _record: &ProfileRecord) -> GateDecision {
        GateDecision::Pass
    }
}

/// Blocks edits to records still in the legacy format.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordFormatGate;

impl PreflightGate for RecordFormatGate {
    fn check(&self, record: &ProfileRecord) -> GateDecision {
        if record.needs_migration() {
            GateDecision::Blocked {
                reason: "Profile record uses the legacy format and must be migrated first"
                    .to_string(),
            }
        } else {
            GateDecision::Pass
        }
    }
}

/// How `start_workflow` proceeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartDisposition {
    /// Steps may now run.
    Started,
    /// The gate blocked; the start runs when the prerequisite completes.
    Deferred { reason: String },
}

type Continuation = Box<dyn FnOnce() + Send>;

/// Holds at most one pending workflow start.
#[derive(Default)]
pub(crate) struct DeferredStart {
    slot: Mutex<Option<Continuation>>,
}

impl fmt::Debug for DeferredStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredStart")
            .field("pending", &self.is_pending())
            .finish()
    }
}

impl DeferredStart {
    pub(crate) fn store(&self, continuation: Continuation) {
        *self.lock() = Some(continuation);
    }

    pub(crate) fn take(&self) -> Option<Continuation> {
        self.lock().take()
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.lock().is_some()
    }

    /// Run the pending continuation, if any. Returns whether one ran.
    pub(crate) fn run(&self) -> bool {
        // Taken out first so the continuation runs without the lock held.
        match self.take() {
            Some(continuation) => {
                continuation();
                true
            }
            None => false,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Continuation>> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::RecordFormat;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn legacy_record_is_blocked() {
        let record = ProfileRecord {
            format: RecordFormat::Legacy,
            name: "Ana".into(),
        };
        assert!(matches!(
            RecordFormatGate.check(&record),
            GateDecision::Blocked { .. }
        ));
        assert_eq!(OpenGate.check(&record), GateDecision::Pass);
    }

    #[test]
    fn current_record_passes() {
        assert_eq!(
            RecordFormatGate.check(&ProfileRecord::default()),
            GateDecision::Pass
        );
    }

    #[test]
    fn deferred_start_runs_once() {
        let deferred = DeferredStart::default();
        let runs = Arc::new(AtomicU32::new(0));
        let counter = runs.clone();
        deferred.store(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        assert!(deferred.is_pending());
        assert!(deferred.run());
        assert!(!deferred.run());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}
