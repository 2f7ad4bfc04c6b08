//! Command dispatching.
//!
//! This module provides the core command infrastructure:
//! - [`Command`] trait for implementing commands
//! - [`CommandResult`] for uniform result reporting
//! - [`CommandDispatcher`] for routing CLI subcommands

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::cli::args::{Cli, Commands};
use crate::error::Result;

use super::plan::PlanCommand;
use super::run::RunCommand;

/// Output settings shared by every command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputOptions {
    /// Suppress everything except the final result.
    pub quiet: bool,

    /// Render styled output.
    pub colors: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            quiet: false,
            colors: true,
        }
    }
}

impl OutputOptions {
    /// Derive output settings from the global flags.
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            quiet: cli.quiet,
            colors: !cli.no_color && console::colors_enabled(),
        }
    }
}

/// Trait for command implementations.
///
/// Each CLI subcommand implements this trait to provide its execution logic.
#[async_trait]
pub trait Command: Send + Sync {
    /// Execute the command.
    ///
    /// # Returns
    ///
    /// A [`CommandResult`] indicating success/failure and exit code.
    async fn execute(&self, output: OutputOptions) -> Result<CommandResult>;
}

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult {
    /// Whether the command succeeded.
    pub success: bool,

    /// Exit code to use (0 for success, non-zero for failure).
    pub exit_code: i32,
}

impl CommandResult {
    /// Create a successful result.
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: 0,
        }
    }

    /// Create a failure result.
    pub fn failure(exit_code: i32) -> Self {
        Self {
            success: false,
            exit_code,
        }
    }
}

/// Dispatches CLI commands to their implementations.
pub struct CommandDispatcher {
    project_root: PathBuf,
}

impl CommandDispatcher {
    /// Create a new dispatcher for the given project root.
    pub fn new(project_root: PathBuf) -> Self {
        Self { project_root }
    }

    /// Get the project root path.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Dispatch and execute a command.
    pub async fn dispatch(&self, cli: &Cli) -> Result<CommandResult> {
        let output = OutputOptions::from_cli(cli);
        match &cli.command {
            Commands::Plan(args) => PlanCommand::new(args.clone()).execute(output).await,
            Commands::Run(args) => {
                RunCommand::new(&self.project_root, args.clone())
                    .execute(output)
                    .await
            }
        }
    }
}
