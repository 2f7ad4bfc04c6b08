//! Run command implementation.
//!
//! The `run` command drives a scenario file through the orchestrator with
//! scripted step handlers, prompting for recovery when a step fails.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use console::Term;

use crate::cli::args::RunArgs;
use crate::config::{load_config_file, load_config_or_default, validate, OrchestratorConfig};
use crate::error::Result;
use crate::notify::terminal::Theme;
use crate::notify::{Notifier, TerminalNotifier, TracingNotifier};
use crate::simulate::{
    load_scenario, run_scenario, DialoguerPrompter, NonInteractivePrompter, RecoveryPrompter,
    Scenario, ScenarioReport,
};

use super::dispatcher::{Command, CommandResult, OutputOptions};

/// The run command implementation.
pub struct RunCommand {
    project_root: PathBuf,
    args: RunArgs,
}

impl RunCommand {
    /// Create a new run command.
    pub fn new(project_root: &Path, args: RunArgs) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            args,
        }
    }

    /// Get the project root.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Get the command arguments.
    pub fn args(&self) -> &RunArgs {
        &self.args
    }

    /// Orchestrator settings: `--config`, then the scenario's own block,
    /// then the nearest `.stepwise.yml`.
    pub fn resolve_config(&self, scenario: &Scenario) -> Result<OrchestratorConfig> {
        let config = match (&self.args.config, &scenario.config) {
            (Some(path), _) => load_config_file(path)?,
            (None, Some(inline)) => inline.clone(),
            (None, None) => load_config_or_default(&self.project_root)?,
        };
        validate(&config)?;
        Ok(config)
    }

    fn notifier(&self, output: OutputOptions) -> Arc<dyn Notifier> {
        if output.quiet || self.args.json {
            Arc::new(TracingNotifier)
        } else {
            Arc::new(TerminalNotifier::new(output.colors))
        }
    }

    fn prompter(&self) -> Box<dyn RecoveryPrompter> {
        if self.args.non_interactive || !Term::stderr().is_term() {
            Box::new(NonInteractivePrompter)
        } else {
            Box::new(DialoguerPrompter::new())
        }
    }
}

fn summary(report: &ScenarioReport, theme: &Theme) -> String {
    let done = format!(
        "{}/{} steps",
        report.workflow.completed_count, report.workflow.total_steps
    );
    if report.completed {
        theme.format_success(&format!("Completed {}", done))
    } else {
        theme.format_error(&format!("Stopped after {}", done))
    }
}

#[async_trait]
impl Command for RunCommand {
    async fn execute(&self, output: OutputOptions) -> Result<CommandResult> {
        let scenario = load_scenario(&self.args.scenario)?;
        let config = self.resolve_config(&scenario)?;
        tracing::debug!(
            scenario = %self.args.scenario.display(),
            workflow = %scenario.workflow,
            "running scenario"
        );

        let notifier = self.notifier(output);
        let mut prompter = self.prompter();
        let report = run_scenario(&scenario, &config, notifier, prompter.as_mut()).await?;

        if self.args.json {
            let json = serde_json::to_string_pretty(&report).map_err(anyhow::Error::from)?;
            println!("{}", json);
        } else if !output.quiet {
            let theme = if output.colors {
                Theme::new()
            } else {
                Theme::plain()
            };
            println!("{}", summary(&report, &theme));
        }

        if report.completed {
            Ok(CommandResult::success())
        } else {
            Ok(CommandResult::failure(1))
        }
    }
}
