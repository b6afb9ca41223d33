//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Janitor - keep tracked directories from growing without bound.
#[derive(Debug, Parser)]
#[command(name = "janitor")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true, default_value = "table")]
    pub format: CliFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "JANITOR_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (paths only)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the engine until interrupted
    Run(RunArgs),

    /// Preview what each enabled directory would lose right now
    Check,

    /// Write a starter configuration file
    Init(InitArgs),

    /// Print the effective configuration
    ShowConfig,
}

/// Arguments for the run command.
#[derive(Debug, Parser)]
pub struct RunArgs {
    /// Never remove anything, whatever the configuration says
    #[arg(long, conflicts_with = "live")]
    pub dry_run: bool,

    /// Remove files for real, whatever the configuration says
    #[arg(long)]
    pub live: bool,
}

impl RunArgs {
    /// Dry-run mode forced on the command line, if any
    pub fn dry_run_override(&self) -> Option<bool> {
        match (self.dry_run, self.live) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

/// Arguments for the init command.
#[derive(Debug, Parser)]
pub struct InitArgs {
    /// Overwrite an existing configuration file
    #[arg(long)]
    pub force: bool,
}
