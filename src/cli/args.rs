//! CLI argument definitions.
//!
//! This module defines all CLI arguments using clap's derive macros.
//! The main entry point is the [`Cli`] struct.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Stepwise - Multi-step profile workflow orchestrator.
#[derive(Debug, Parser)]
#[command(name = "stepwise")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the steps a workflow would contain
    Plan(PlanArgs),

    /// Run a scenario file against scripted step handlers
    Run(RunArgs),
}

/// Arguments for the `plan` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct PlanArgs {
    /// Plan a legacy-record migration instead of a profile update
    #[arg(long)]
    pub migration: bool,

    /// Include a profile picture upload
    #[arg(long)]
    pub picture: bool,

    /// Include a banner upload
    #[arg(long)]
    pub banner: bool,

    /// Legacy record has followed channels of its own
    #[arg(long)]
    pub channels: bool,

    /// Legacy record has groups of its own
    #[arg(long)]
    pub groups: bool,

    /// Legacy record follows channels
    #[arg(long)]
    pub following_channels: bool,

    /// Legacy record follows groups
    #[arg(long)]
    pub following_groups: bool,

    /// Print the steps as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `run` command.
#[derive(Debug, Clone, clap::Args)]
pub struct RunArgs {
    /// Scenario file to run
    pub scenario: PathBuf,

    /// Orchestrator config file (overrides the scenario and .stepwise.yml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print the final report as JSON
    #[arg(long)]
    pub json: bool,

    /// Never prompt; abort on the first unrecovered failure
    #[arg(long)]
    pub non_interactive: bool,
}
