//! Init command implementation.

use crate::cli::InitArgs;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use janitor_engine::EngineConfig;
use std::path::Path;

/// Execute the init command.
///
/// Writes the starter configuration: Downloads and Desktop, both disabled,
/// dry run on.
pub fn execute_init(args: InitArgs, path: &Path, formatter: &Formatter) -> Result<()> {
    if path.is_dir() {
        return Err(CliError::InvalidInput(format!("{} is a directory", path.display())));
    }
    if path.exists() && !args.force {
        return Err(CliError::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }

    EngineConfig::starter().save_to(path)?;
    tracing::info!(path = %path.display(), "Wrote starter configuration");

    println!("{}", formatter.success(&format!("Configuration written to {}", path.display())));
    println!(
        "{}",
        formatter.info("Enable directories and set dry_run = false when the preview (`janitor check`) looks right")
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::CliFormat;
    use tempfile::TempDir;

    fn formatter() -> Formatter {
        Formatter::new(CliFormat::Quiet, false)
    }

    #[test]
    fn test_init_writes_starter() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("janitor").join("config.toml");

        execute_init(InitArgs { force: false }, &path, &formatter()).unwrap();

        let config = EngineConfig::from_file(&path).unwrap();
        assert_eq!(config, EngineConfig::starter());
        assert!(config.dry_run);
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "dry_run = false\n").unwrap();

        let result = execute_init(InitArgs { force: false }, &path, &formatter());
        assert!(matches!(result, Err(CliError::Config(_))));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "dry_run = false\n");
    }

    #[test]
    fn test_init_force_overwrites() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "dry_run = false\n").unwrap();

        execute_init(InitArgs { force: true }, &path, &formatter()).unwrap();
        assert!(EngineConfig::from_file(&path).unwrap().dry_run);
    }
}
