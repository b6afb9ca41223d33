//! Configuration for the retention engine
//!
//! Loaded from TOML. Every field has a default, so an empty file is a valid
//! (if useless) configuration.
//!
//! ```toml
//! dry_run = true
//! which_age_to_regard = "last-modification-date"
//! removal_strategy = "trash"
//! min_check_interval_secs = 10
//! max_check_interval_secs = 300
//!
//! [[tracked_directories]]
//! path = "/home/me/Downloads"
//! oldest_allowed_age = "30d"
//! largest_allowed_total_size = "1GiB"
//! ```

use crate::fs::ListingOptions;
use crate::monitor::MonitorSettings;
use crate::removal::{default_trash_dir, RemovalStrategy};
use crate::{JanitorError, Result};
use janitor_domain::{Age, DataSize, TrackedDirectory, TrackedDirectoryId, WhichAgeToRegard};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration of the engine and its tracked directories
///
/// # Examples
///
/// ```
/// use janitor_engine::EngineConfig;
///
/// // Default configuration: dry run, 10 s to 5 min checking interval
/// let config = EngineConfig::default();
/// assert!(config.dry_run);
/// assert_eq!(config.min_check_interval_secs, 10);
///
/// // Aggressive: deletes for real, polls often
/// let config = EngineConfig::aggressive();
/// assert!(!config.dry_run);
///
/// // Lenient: polls rarely
/// let config = EngineConfig::lenient();
/// assert_eq!(config.max_check_interval_secs, 3600);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Simulate removals without touching any file
    /// Default: true
    pub dry_run: bool,

    /// Which instant file ages are measured from
    /// Default: last modification date
    pub which_age_to_regard: WhichAgeToRegardConfig,

    /// What happens to evicted files when not in dry-run mode
    /// Default: move to trash
    pub removal_strategy: RemovalStrategyConfig,

    /// Where trashed files go
    /// Default: `<data dir>/Trash/files`
    pub trash_dir: Option<PathBuf>,

    /// Lower bound of every checking interval (in seconds)
    /// Default: 10
    pub min_check_interval_secs: u64,

    /// Upper bound of every checking interval (in seconds)
    /// Default: 300 (5 minutes)
    pub max_check_interval_secs: u64,

    /// Consider files whose name starts with a dot
    /// Default: false
    pub include_hidden: bool,

    /// Consider subdirectories (sized recursively) as evictable entries
    /// Default: false
    pub include_directories: bool,

    /// Activity events buffered per subscriber
    /// Default: 1024
    pub event_capacity: usize,

    /// Directories under retention policy
    pub tracked_directories: Vec<TrackedDirectoryConfig>,
}

/// `which_age_to_regard` as written in TOML
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WhichAgeToRegardConfig {
    /// Last modification, falling back to creation
    #[default]
    LastModificationDate,
    /// Original creation
    OriginalCreationDate,
    /// Placement into the folder
    DateWhenAddedToFolder,
}

impl From<WhichAgeToRegardConfig> for WhichAgeToRegard {
    fn from(value: WhichAgeToRegardConfig) -> Self {
        match value {
            WhichAgeToRegardConfig::LastModificationDate => WhichAgeToRegard::LastModificationDate,
            WhichAgeToRegardConfig::OriginalCreationDate => WhichAgeToRegard::OriginalCreationDate,
            WhichAgeToRegardConfig::DateWhenAddedToFolder => WhichAgeToRegard::DateWhenAddedToFolder,
        }
    }
}

impl From<WhichAgeToRegard> for WhichAgeToRegardConfig {
    fn from(value: WhichAgeToRegard) -> Self {
        match value {
            WhichAgeToRegard::LastModificationDate => WhichAgeToRegardConfig::LastModificationDate,
            WhichAgeToRegard::OriginalCreationDate => WhichAgeToRegardConfig::OriginalCreationDate,
            WhichAgeToRegard::DateWhenAddedToFolder => WhichAgeToRegardConfig::DateWhenAddedToFolder,
        }
    }
}

/// `removal_strategy` as written in TOML
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemovalStrategyConfig {
    /// Move into the trash directory
    #[default]
    Trash,
    /// Delete permanently
    Delete,
}

impl From<RemovalStrategyConfig> for RemovalStrategy {
    fn from(value: RemovalStrategyConfig) -> Self {
        match value {
            RemovalStrategyConfig::Trash => RemovalStrategy::MoveToTrash,
            RemovalStrategyConfig::Delete => RemovalStrategy::PermanentDelete,
        }
    }
}

/// One `[[tracked_directories]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedDirectoryConfig {
    /// Stable id; derived from the path when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Whether the directory is monitored
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Location of the directory
    pub path: PathBuf,

    /// Files older than this are removed, e.g. `"30d"`, `"2 weeks"`, `"inf"`
    #[serde(default = "default_oldest_allowed_age")]
    pub oldest_allowed_age: String,

    /// The directory is kept at or below this size, e.g. `"1GiB"`, `"inf"`
    #[serde(default = "default_largest_allowed_total_size")]
    pub largest_allowed_total_size: String,
}

fn default_enabled() -> bool {
    true
}

fn default_oldest_allowed_age() -> String {
    "30d".to_string()
}

fn default_largest_allowed_total_size() -> String {
    "1GiB".to_string()
}

impl TrackedDirectoryConfig {
    /// An enabled entry with the default limits
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            id: None,
            enabled: true,
            path: path.into(),
            oldest_allowed_age: default_oldest_allowed_age(),
            largest_allowed_total_size: default_largest_allowed_total_size(),
        }
    }

    /// Convert to the domain entity, parsing id and limits
    pub fn to_tracked_directory(&self) -> Result<TrackedDirectory> {
        let id = match &self.id {
            Some(id) => TrackedDirectoryId::parse(id).map_err(JanitorError::Config)?,
            None => TrackedDirectoryId::for_path(&self.path),
        };
        let oldest_allowed_age: Age = self.oldest_allowed_age.parse()?;
        let largest_allowed_total_size: DataSize = self.largest_allowed_total_size.parse()?;

        let mut directory = TrackedDirectory::with_id(id, &self.path, oldest_allowed_age, largest_allowed_total_size);
        directory.enabled = self.enabled;
        Ok(directory)
    }
}

impl From<&TrackedDirectory> for TrackedDirectoryConfig {
    fn from(directory: &TrackedDirectory) -> Self {
        Self {
            id: Some(directory.id().to_string()),
            enabled: directory.enabled,
            path: directory.path.clone(),
            oldest_allowed_age: directory.oldest_allowed_age.to_string(),
            largest_allowed_total_size: directory.largest_allowed_total_size.to_string(),
        }
    }
}

impl Default for EngineConfig {
    /// Create default configuration
    ///
    /// - Dry run: on
    /// - Removal: move to trash
    /// - Checking interval: between 10 seconds and 5 minutes
    /// - No tracked directories
    fn default() -> Self {
        Self {
            dry_run: true,
            which_age_to_regard: WhichAgeToRegardConfig::default(),
            removal_strategy: RemovalStrategyConfig::default(),
            trash_dir: None,
            min_check_interval_secs: 10,
            max_check_interval_secs: 300,
            include_hidden: false,
            include_directories: false,
            event_capacity: crate::activity::DEFAULT_ACTIVITY_CAPACITY,
            tracked_directories: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Aggressive configuration (real deletion, frequent checks)
    ///
    /// - Dry run: off
    /// - Removal: permanent delete
    /// - Checking interval: between 10 seconds and 1 minute
    pub fn aggressive() -> Self {
        Self {
            dry_run: false,
            removal_strategy: RemovalStrategyConfig::Delete,
            max_check_interval_secs: 60,
            ..Self::default()
        }
    }

    /// Lenient configuration (recoverable removal, infrequent checks)
    ///
    /// - Dry run: off
    /// - Removal: move to trash
    /// - Checking interval: between 1 minute and 1 hour
    pub fn lenient() -> Self {
        Self {
            dry_run: false,
            removal_strategy: RemovalStrategyConfig::Trash,
            min_check_interval_secs: 60,
            max_check_interval_secs: 3600,
            ..Self::default()
        }
    }

    /// A starter configuration tracking the user's Downloads (30 days,
    /// 1 GiB) and Desktop (90 days, 5 GiB), both disabled until opted in
    pub fn starter() -> Self {
        let mut config = Self::default();
        if let Some(downloads) = dirs::download_dir() {
            config.tracked_directories.push(TrackedDirectoryConfig {
                enabled: false,
                ..TrackedDirectoryConfig::new(downloads)
            });
        }
        let desktop = dirs::desktop_dir().filter(|d| config.tracked_directories.iter().all(|t| &t.path != d));
        if let Some(desktop) = desktop {
            config.tracked_directories.push(TrackedDirectoryConfig {
                enabled: false,
                oldest_allowed_age: "90d".to_string(),
                largest_allowed_total_size: "5GiB".to_string(),
                ..TrackedDirectoryConfig::new(desktop)
            });
        }
        config
    }

    /// Default config file location: `<config dir>/janitor/config.toml`
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("janitor").join("config.toml"))
            .ok_or_else(|| JanitorError::Config("Could not determine config directory".to_string()))
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Write configuration as TOML, creating parent directories
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// Render configuration as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check intervals, limits and ids for consistency
    pub fn validate(&self) -> Result<()> {
        if self.min_check_interval_secs == 0 {
            return Err(JanitorError::Config(
                "min_check_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.min_check_interval_secs > self.max_check_interval_secs {
            return Err(JanitorError::Config(format!(
                "min_check_interval_secs ({}) exceeds max_check_interval_secs ({})",
                self.min_check_interval_secs, self.max_check_interval_secs
            )));
        }
        if self.event_capacity == 0 {
            return Err(JanitorError::Config("event_capacity must be greater than zero".to_string()));
        }

        let directories = self.tracked_directories()?;
        for (i, a) in directories.iter().enumerate() {
            if directories[..i].iter().any(|b| a.id() == b.id()) {
                return Err(JanitorError::Config(format!(
                    "tracked directory {} is listed more than once",
                    a.path.display()
                )));
            }
        }
        Ok(())
    }

    /// The tracked directories as domain values, in file order
    pub fn tracked_directories(&self) -> Result<Vec<TrackedDirectory>> {
        self.tracked_directories
            .iter()
            .map(TrackedDirectoryConfig::to_tracked_directory)
            .collect()
    }

    /// Strategy monitors use under the current dry-run flag
    pub fn effective_strategy(&self) -> RemovalStrategy {
        if self.dry_run {
            RemovalStrategy::DryRun
        } else {
            self.removal_strategy.into()
        }
    }

    /// Monitor settings derived from this configuration
    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            strategy: self.effective_strategy(),
            which_age: self.which_age_to_regard.into(),
            min_interval: self.min_check_interval(),
            max_interval: self.max_check_interval(),
        }
    }

    /// Listing options derived from this configuration
    pub fn listing_options(&self) -> ListingOptions {
        ListingOptions {
            include_hidden: self.include_hidden,
            include_directories: self.include_directories,
        }
    }

    /// Trash directory in use
    pub fn effective_trash_dir(&self) -> Option<PathBuf> {
        self.trash_dir.clone().or_else(default_trash_dir)
    }

    /// Get minimum checking interval as Duration
    pub fn min_check_interval(&self) -> Duration {
        Duration::from_secs(self.min_check_interval_secs)
    }

    /// Get maximum checking interval as Duration
    pub fn max_check_interval(&self) -> Duration {
        Duration::from_secs(self.max_check_interval_secs)
    }
}
