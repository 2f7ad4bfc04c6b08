//! Configuration validation rules.
//!
//! - Timeouts must be non-zero
//! - Fault patterns need a unique, non-empty name
//! - Fault pattern regexes must compile

use crate::config::schema::OrchestratorConfig;
use crate::error::{Result, StepwiseError};
use regex::Regex;
use std::collections::HashSet;

/// Validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Rule identifier
    pub rule: String,
    /// Human-readable error message
    pub message: String,
    /// Fault pattern name if error is pattern-specific
    pub pattern: Option<String>,
}

/// Validate a configuration and return all errors.
pub fn validate_config(config: &OrchestratorConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    errors.extend(validate_timings(config));
    errors.extend(validate_patterns(config));

    errors
}

fn validate_timings(config: &OrchestratorConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.step_timeout_ms == 0 {
        errors.push(ValidationError {
            rule: "zero-timeout".to_string(),
            message: "step_timeout_ms must be greater than zero".to_string(),
            pattern: None,
        });
    }

    errors
}

fn validate_patterns(config: &OrchestratorConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for pattern in &config.fault_patterns {
        if pattern.name.trim().is_empty() {
            errors.push(ValidationError {
                rule: "unnamed-pattern".to_string(),
                message: format!("Fault pattern '{}' has an empty name", pattern.regex),
                pattern: None,
            });
        } else if !seen.insert(pattern.name.as_str()) {
            errors.push(ValidationError {
                rule: "duplicate-pattern".to_string(),
                message: format!("Fault pattern '{}' is declared more than once", pattern.name),
                pattern: Some(pattern.name.clone()),
            });
        }

        if let Err(e) = Regex::new(&pattern.regex) {
            errors.push(ValidationError {
                rule: "invalid-regex".to_string(),
                message: format!("Fault pattern '{}' is not a valid regex: {}", pattern.name, e),
                pattern: Some(pattern.name.clone()),
            });
        }
    }

    errors
}

/// Validate and return a single error if any rules fail.
pub fn validate(config: &OrchestratorConfig) -> Result<()> {
    let errors = validate_config(config);

    if errors.is_empty() {
        Ok(())
    } else {
        let messages: Vec<_> = errors.iter().map(|e| e.message.clone()).collect();
        Err(StepwiseError::ConfigValidationError {
            message: messages.join("; "),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::FaultPatternConfig;
    use crate::runner::FaultClass;

    fn pattern(name: &str, regex: &str) -> FaultPatternConfig {
        FaultPatternConfig {
            name: name.to_string(),
            regex: regex.to_string(),
            class: FaultClass::Transient,
            steps: vec![],
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&OrchestratorConfig::default()).is_empty());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let config = OrchestratorConfig {
            step_timeout_ms: 0,
            ..Default::default()
        };
        let errors = validate_config(&config);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].rule, "zero-timeout");
    }

    #[test]
    fn zero_settle_delay_is_allowed() {
        let config = OrchestratorConfig {
            settle_delay_ms: 0,
            transient_retry_delay_ms: 0,
            ..Default::default()
        };
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn collects_every_pattern_problem() {
        let config = OrchestratorConfig {
            fault_patterns: vec![
                pattern("fee", "FEE"),
                pattern("fee", "(broken"),
                pattern(" ", "x"),
            ],
            ..Default::default()
        };
        let rules: Vec<_> = validate_config(&config)
            .into_iter()
            .map(|e| e.rule)
            .collect();
        assert_eq!(
            rules,
            vec!["duplicate-pattern", "invalid-regex", "unnamed-pattern"]
        );
    }

    #[test]
    fn validate_joins_messages() {
        let config = OrchestratorConfig {
            step_timeout_ms: 0,
            fault_patterns: vec![pattern("bad", "(")],
            ..Default::default()
        };
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("step_timeout_ms"));
        assert!(err.contains("'bad'"));
    }
}
