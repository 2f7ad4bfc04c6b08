//! Plan command implementation.
//!
//! The `plan` command lists the steps a workflow would contain for the
//! given inputs, with their initial enablement and prerequisites.

use async_trait::async_trait;

use crate::cli::args::PlanArgs;
use crate::error::Result;
use crate::notify::terminal::Theme;
use crate::profile::{LegacyLists, ProfileDraft};
use crate::runner::StepRegistry;
use crate::steps::{Step, StepId};

use super::dispatcher::{Command, CommandResult, OutputOptions};

/// The plan command implementation.
pub struct PlanCommand {
    args: PlanArgs,
}

impl PlanCommand {
    /// Create a new plan command.
    pub fn new(args: PlanArgs) -> Self {
        Self { args }
    }

    /// Get the command arguments.
    pub fn args(&self) -> &PlanArgs {
        &self.args
    }

    /// Registry described by the flags.
    pub fn registry(&self) -> Result<StepRegistry> {
        if self.args.migration {
            let placeholder = |set: bool| {
                if set {
                    vec!["(present)".to_string()]
                } else {
                    Vec::new()
                }
            };
            StepRegistry::for_migration(&LegacyLists {
                channels: placeholder(self.args.channels),
                groups: placeholder(self.args.groups),
                following_channels: placeholder(self.args.following_channels),
                following_groups: placeholder(self.args.following_groups),
            })
        } else {
            let mut draft = ProfileDraft::default();
            if self.args.picture {
                draft = draft.with_picture("picture");
            }
            if self.args.banner {
                draft = draft.with_banner("banner");
            }
            StepRegistry::for_update(&draft)
        }
    }
}

/// One plan row; prerequisites absent from `present` are left out.
fn plan_line(step: &Step, present: &[StepId], theme: &Theme) -> String {
    let line = format!("  {}", step.summary_line());
    let line = if step.enabled {
        line
    } else {
        theme.dim.apply_to(line).to_string()
    };
    let after: Vec<_> = step
        .prerequisites
        .iter()
        .filter(|p| present.contains(*p))
        .map(|p| p.key())
        .collect();
    if after.is_empty() {
        line
    } else {
        format!("{} after {}", line, after.join(", "))
    }
}

#[async_trait]
impl Command for PlanCommand {
    async fn execute(&self, output: OutputOptions) -> Result<CommandResult> {
        let registry = self.registry()?;
        let steps = registry.build_steps();

        if self.args.json {
            let json = serde_json::to_string_pretty(&steps).map_err(anyhow::Error::from)?;
            println!("{}", json);
            return Ok(CommandResult::success());
        }

        let theme = if output.colors {
            Theme::new()
        } else {
            Theme::plain()
        };

        if !output.quiet {
            println!(
                "{}",
                theme.format_info(&format!(
                    "{} workflow: {} steps",
                    registry.kind(),
                    registry.len()
                ))
            );
        }
        let present = registry.ids();
        for step in &steps {
            println!("{}", plan_line(step, &present, &theme));
        }

        Ok(CommandResult::success())
    }
}
