//! Error types for engine operations

use janitor_domain::{ParseMeasurementError, TrackedDirectoryId};
use thiserror::Error;

/// Errors that can occur while configuring or controlling the engine
///
/// Check cycles never produce these: a cycle always ends in a
/// [`CheckOutcome`](crate::CheckOutcome).
#[derive(Error, Debug)]
pub enum JanitorError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failed to read or write a file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// Failed to render TOML
    #[error("Failed to serialize config TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// An age or size limit could not be parsed
    #[error("Invalid measurement: {0}")]
    Measurement(#[from] ParseMeasurementError),

    /// No monitor is coordinated for this tracked directory
    #[error("No monitor for tracked directory {0}")]
    MonitorNotFound(TrackedDirectoryId),

    /// Worker error (tokio runtime issues)
    #[error("Worker error: {0}")]
    Worker(String),
}

/// Convenience alias used throughout the engine
pub type Result<T> = std::result::Result<T, JanitorError>;
