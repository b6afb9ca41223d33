//! Janitor - keeps tracked directories from growing without bound.

use anyhow::Context;
use clap::Parser;
use janitor_cli::commands;
use janitor_cli::config;
use janitor_cli::{Cli, Command, Formatter};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Logs go to stderr; stdout carries command output
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let formatter = Formatter::new(cli.format, !cli.no_color);
    let config_path = config::resolve_path(cli.config.as_deref()).context("Could not locate configuration file")?;

    match cli.command {
        Command::Init(args) => {
            commands::execute_init(args, &config_path, &formatter)?;
        }
        Command::Run(args) => {
            commands::execute_run(args, &config_path, &formatter).await?;
        }
        Command::Check => {
            let engine_config = config::load(&config_path)
                .with_context(|| format!("Could not load {}", config_path.display()))?;
            commands::execute_check(&engine_config, &formatter).await?;
        }
        Command::ShowConfig => {
            let engine_config = config::load(&config_path)
                .with_context(|| format!("Could not load {}", config_path.display()))?;
            commands::execute_show_config(&engine_config, &config_path, &formatter)?;
        }
    }

    Ok(())
}
