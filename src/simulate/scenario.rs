//! Scenario files describing a simulated workflow run.
//!
//! ```yaml
//! workflow: update
//! identity: "0.0.1001"
//! record: legacy
//! auto: true
//! profile:
//!   name: Ana
//!   picture: me.png
//! legacy:
//!   groups: [g1]
//! steps:
//!   upload_picture: [transient, "fatal: image too large", ok]
//! migration_steps:
//!   create_groups_topic: [ok]
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::config::OrchestratorConfig;
use crate::error::{Result, StepwiseError};
use crate::profile::{LegacyLists, ProfileDraft, ProfileRecord, RecordFormat};
use crate::steps::{StepId, WorkflowKind};

use super::script::ScriptedAttempt;

/// A simulated run.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Which workflow to run.
    #[serde(default = "default_workflow")]
    pub workflow: WorkflowKind,

    /// Connected account; `null` runs without an identity.
    #[serde(default = "default_identity")]
    pub identity: Option<String>,

    /// Format of the existing record.
    #[serde(default)]
    pub record: RecordFormat,

    /// Start in auto-progress mode.
    #[serde(default)]
    pub auto: bool,

    /// Inputs for an update workflow.
    #[serde(default)]
    pub profile: ProfileDraft,

    /// Lists for a migration workflow.
    #[serde(default)]
    pub legacy: LegacyLists,

    /// Orchestrator settings for this run.
    #[serde(default)]
    pub config: Option<OrchestratorConfig>,

    /// Scripted attempts for the requested workflow's steps.
    #[serde(default)]
    pub steps: HashMap<StepId, Vec<ScriptedAttempt>>,

    /// Scripted attempts for the migration run a legacy record triggers.
    #[serde(default)]
    pub migration_steps: HashMap<StepId, Vec<ScriptedAttempt>>,
}

fn default_workflow() -> WorkflowKind {
    WorkflowKind::Update
}

fn default_identity() -> Option<String> {
    Some("0.0.1001".to_string())
}

impl Scenario {
    /// The record the workflow starts from.
    pub fn profile_record(&self) -> ProfileRecord {
        ProfileRecord {
            format: self.record,
            name: self.profile.name.clone(),
        }
    }

    /// Script for a step of the requested workflow.
    pub fn script(&self, step: StepId) -> Vec<ScriptedAttempt> {
        self.steps.get(&step).cloned().unwrap_or_default()
    }

    /// Script for a step of the migration run.
    pub fn migration_script(&self, step: StepId) -> Vec<ScriptedAttempt> {
        self.migration_steps.get(&step).cloned().unwrap_or_default()
    }
}

/// Load a scenario file.
pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            StepwiseError::ConfigNotFound {
                path: path.to_path_buf(),
            }
        } else {
            StepwiseError::Io(e)
        }
    })?;

    parse_scenario(&content, path)
}

/// Parse scenario YAML.
pub fn parse_scenario(content: &str, source_path: &Path) -> Result<Scenario> {
    serde_yaml::from_str(content).map_err(|e| StepwiseError::ConfigParseError {
        path: source_path.to_path_buf(),
        message: e.to_string(),
    })
}
