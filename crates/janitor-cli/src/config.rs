//! Locating and loading the engine configuration.

use crate::error::{CliError, Result};
use janitor_engine::EngineConfig;
use std::path::{Path, PathBuf};

/// The configuration file to use: the explicit one, or the default location.
pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(EngineConfig::default_path()?),
    }
}

/// Load the configuration at `path`.
///
/// A missing file yields the defaults, which track nothing.
pub fn load(path: &Path) -> Result<EngineConfig> {
    if path.is_dir() {
        return Err(CliError::InvalidInput(format!(
            "{} is a directory, not a configuration file",
            path.display()
        )));
    }
    if !path.exists() {
        tracing::warn!(
            path = %path.display(),
            "Configuration file not found, using defaults (run `janitor init` to create one)"
        );
        return Ok(EngineConfig::default());
    }

    let config = EngineConfig::from_file(path)?;
    tracing::debug!(
        path = %path.display(),
        directories = config.tracked_directories.len(),
        "Loaded configuration"
    );
    Ok(config)
}
