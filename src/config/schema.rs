//! Configuration schema definitions for Stepwise.
//!
//! This module contains the struct definitions that map to the
//! `.stepwise.yml` configuration file format.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::runner::FaultClass;
use crate::steps::StepId;

/// Orchestrator timing and fault-classification settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// How long a single handler attempt may run.
    #[serde(default = "default_step_timeout_ms")]
    pub step_timeout_ms: u64,

    /// Delay before auto-progress starts the next ready step.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Delay before a transient failure is re-invoked.
    #[serde(default = "default_transient_retry_delay_ms")]
    pub transient_retry_delay_ms: u64,

    /// How many times a transient failure is re-invoked automatically.
    #[serde(default = "default_transient_retries")]
    pub transient_retries: u32,

    /// Whether the built-in fault signatures are used.
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub builtin_patterns: bool,

    /// Additional fault signatures, checked before the built-ins.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fault_patterns: Vec<FaultPatternConfig>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            step_timeout_ms: default_step_timeout_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            transient_retry_delay_ms: default_transient_retry_delay_ms(),
            transient_retries: default_transient_retries(),
            builtin_patterns: true,
            fault_patterns: Vec::new(),
        }
    }
}

impl OrchestratorConfig {
    /// Step timeout as a duration.
    pub fn step_timeout(&self) -> Duration {
        Duration::from_millis(self.step_timeout_ms)
    }

    /// Auto-progress settle delay as a duration.
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Transient retry delay as a duration.
    pub fn transient_retry_delay(&self) -> Duration {
        Duration::from_millis(self.transient_retry_delay_ms)
    }
}

fn default_step_timeout_ms() -> u64 {
    30_000
}

fn default_settle_delay_ms() -> u64 {
    1_000
}

fn default_transient_retry_delay_ms() -> u64 {
    1_000
}

fn default_transient_retries() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

fn is_true(v: &bool) -> bool {
    *v
}

/// A user-declared fault signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultPatternConfig {
    /// Pattern name (for logging).
    pub name: String,

    /// Regex matched against the handler's error chain.
    pub regex: String,

    /// Classification on match.
    pub class: FaultClass,

    /// Steps the pattern applies to; empty means every step.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<StepId>,
}
