//! Janitor CLI library.
//!
//! Argument parsing, configuration loading, command execution and output
//! formatting for the `janitor` binary.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use cli::{Cli, CliFormat, Command};
pub use error::{CliError, Result};
pub use output::{DirectoryPreview, Formatter};
