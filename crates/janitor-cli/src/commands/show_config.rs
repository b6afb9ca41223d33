//! Show-config command implementation.

use crate::cli::CliFormat;
use crate::error::Result;
use crate::output::Formatter;
use janitor_engine::EngineConfig;
use std::path::Path;

/// Execute the show-config command.
pub fn execute_show_config(config: &EngineConfig, path: &Path, formatter: &Formatter) -> Result<()> {
    match formatter.format() {
        CliFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
        CliFormat::Quiet => print!("{}", config.to_toml_string()?),
        CliFormat::Table => {
            println!("{}", formatter.info(&format!("Configuration from {}", path.display())));
            println!();
            print!("{}", config.to_toml_string()?);
        }
    }
    Ok(())
}
