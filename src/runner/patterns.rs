//! Fault signature registry for step failure classification.
//!
//! Matches a handler's error message against known signatures to decide
//! whether the failure is transient (worth one automatic retry), an
//! explicit user decline, or fatal. Each signature is scoped to the step
//! kinds it is trusted for: a connection reset while uploading media is
//! safe to retry, the same reset during a ledger write may already have
//! been committed.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::config::OrchestratorConfig;
use crate::error::{Result, StepwiseError};
use crate::steps::StepId;

/// What a matched signature means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultClass {
    /// Recoverable fault; the same step may be re-invoked.
    Transient,
    /// The user declined an external approval.
    UserDeclined,
}

/// Which steps a signature applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternScope {
    /// Fires for any step.
    Always,
    /// Only fires for media uploads.
    MediaUploads,
    /// Only fires for ledger writes.
    LedgerWrites,
    /// Only fires for the listed steps.
    Steps(Vec<StepId>),
}

impl PatternScope {
    fn matches(&self, step: StepId) -> bool {
        match self {
            PatternScope::Always => true,
            PatternScope::MediaUploads => !step.is_ledger_write(),
            PatternScope::LedgerWrites => step.is_ledger_write(),
            PatternScope::Steps(steps) => steps.contains(&step),
        }
    }
}

/// A registered fault signature.
#[derive(Debug, Clone)]
pub struct FaultPattern {
    /// Pattern name (for logging).
    pub name: String,
    /// Regex matched against the rendered error chain.
    pub regex: Regex,
    /// Classification on match.
    pub class: FaultClass,
    /// Steps the pattern applies to.
    pub scope: PatternScope,
}

/// A successful match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultMatch<'a> {
    /// Name of the matching pattern.
    pub pattern: &'a str,
    /// Its classification.
    pub class: FaultClass,
}

// --- Compiled regexes (one-time via LazyLock) ---

macro_rules! lazy_regex {
    ($name:ident, $pattern:expr) => {
        static $name: LazyLock<Regex> =
            LazyLock::new(|| Regex::new($pattern).expect("built-in fault regex must compile"));
    };
}

lazy_regex!(
    RE_USER_DECLINED,
    r"(?i)user (rejected|declined|denied|cancell?ed)|rejected by (the )?user"
);
lazy_regex!(
    RE_STALE_SYNC,
    r"(?i)stale (synchroni[sz]ation|sync|state)|out of sync|state is stale"
);
lazy_regex!(
    RE_CONNECTION_RESET,
    r"(?i)connection (reset|refused|closed)|ECONNRESET|socket hang up|network (error|timeout)"
);
lazy_regex!(
    RE_GATEWAY_BUSY,
    r"(?i)\b(?:HTTP(?:/\d(?:\.\d)?)?|status(?: code)?)[\s:]*50[234]\b|bad gateway|gateway time-?out|service unavailable|too many requests"
);

/// Return all built-in fault patterns, most specific first.
pub fn built_in_patterns() -> Vec<FaultPattern> {
    vec![
        FaultPattern {
            name: "user_declined".to_string(),
            regex: RE_USER_DECLINED.clone(),
            class: FaultClass::UserDeclined,
            scope: PatternScope::Always,
        },
        FaultPattern {
            name: "stale_sync".to_string(),
            regex: RE_STALE_SYNC.clone(),
            class: FaultClass::Transient,
            scope: PatternScope::Always,
        },
        FaultPattern {
            name: "connection_reset".to_string(),
            regex: RE_CONNECTION_RESET.clone(),
            class: FaultClass::Transient,
            scope: PatternScope::MediaUploads,
        },
        FaultPattern {
            name: "gateway_busy".to_string(),
            regex: RE_GATEWAY_BUSY.clone(),
            class: FaultClass::Transient,
            scope: PatternScope::MediaUploads,
        },
    ]
}

/// Classifies handler errors by signature.
#[derive(Debug, Clone, Default)]
pub struct FaultClassifier {
    patterns: Vec<FaultPattern>,
}

impl FaultClassifier {
    /// A classifier that recognises nothing (every error is fatal).
    pub fn new() -> Self {
        Self::default()
    }

    /// A classifier with the built-in signatures.
    pub fn with_builtins() -> Self {
        Self {
            patterns: built_in_patterns(),
        }
    }

    /// Build a classifier from configuration.
    ///
    /// Configured patterns are checked before the built-ins so a project can
    /// override how a message is classified.
    pub fn from_config(config: &OrchestratorConfig) -> Result<Self> {
        let mut classifier = Self::new();

        for pattern in &config.fault_patterns {
            let regex =
                Regex::new(&pattern.regex).map_err(|e| StepwiseError::ConfigValidationError {
                    message: format!("Fault pattern '{}' is not a valid regex: {}", pattern.name, e),
                })?;
            let scope = if pattern.steps.is_empty() {
                PatternScope::Always
            } else {
                PatternScope::Steps(pattern.steps.clone())
            };
            classifier.add(FaultPattern {
                name: pattern.name.clone(),
                regex,
                class: pattern.class,
                scope,
            });
        }

        if config.builtin_patterns {
            classifier.patterns.extend(built_in_patterns());
        }

        Ok(classifier)
    }

    /// Register a pattern (checked after existing ones).
    pub fn add(&mut self, pattern: FaultPattern) {
        self.patterns.push(pattern);
    }

    /// Registered patterns in match order.
    pub fn patterns(&self) -> &[FaultPattern] {
        &self.patterns
    }

    /// Find the first pattern matching `message` for `step`.
    pub fn classify(&self, step: StepId, message: &str) -> Option<FaultMatch<'_>> {
        self.patterns
            .iter()
            .filter(|p| p.scope.matches(step))
            .find(|p| p.regex.is_match(message))
            .map(|p| FaultMatch {
                pattern: &p.name,
                class: p.class,
            })
    }
}
