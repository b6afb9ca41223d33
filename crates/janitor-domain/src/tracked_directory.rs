//! Tracked directory module - a directory kept under a retention policy

use crate::{Age, DataSize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Unique, immutable identifier of a tracked directory
///
/// New directories get a time-ordered UUIDv7. Directories loaded from
/// configuration without an explicit id get a UUIDv5 derived from their
/// path, so the same entry keeps the same identity across reloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrackedDirectoryId(u128);

impl TrackedDirectoryId {
    /// Generate a new UUIDv7-based id
    ///
    /// # Examples
    ///
    /// ```
    /// use janitor_domain::TrackedDirectoryId;
    ///
    /// let a = TrackedDirectoryId::new();
    /// let b = TrackedDirectoryId::new();
    /// assert_ne!(a, b);
    /// ```
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Derive a stable id from a directory path
    pub fn for_path(path: &Path) -> Self {
        let name = path.to_string_lossy();
        Self(uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_URL, name.as_bytes()).as_u128())
    }

    /// Create an id from a raw u128 value
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Parse an id from a UUID string
    pub fn parse(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(|u| Self(u.as_u128()))
            .map_err(|e| format!("Invalid tracked directory id: {}", e))
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }
}

impl Default for TrackedDirectoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TrackedDirectoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

/// Which instant a file's age is measured from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WhichAgeToRegard {
    /// Recently modified files are younger. Falls back to the creation date
    /// for files that report no modification date.
    #[default]
    LastModificationDate,

    /// Recently created files are younger. Copies restored from backups or
    /// archives may keep old creation dates.
    OriginalCreationDate,

    /// Files recently added to the folder are younger
    DateWhenAddedToFolder,
}

impl WhichAgeToRegard {
    /// Get the preference name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            WhichAgeToRegard::LastModificationDate => "last-modification-date",
            WhichAgeToRegard::OriginalCreationDate => "original-creation-date",
            WhichAgeToRegard::DateWhenAddedToFolder => "date-when-added-to-folder",
        }
    }

    /// Parse a preference from a string (accepts short aliases)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "last-modification-date" | "modified" | "modification" => {
                Some(WhichAgeToRegard::LastModificationDate)
            }
            "original-creation-date" | "created" | "creation" => {
                Some(WhichAgeToRegard::OriginalCreationDate)
            }
            "date-when-added-to-folder" | "added" | "date-added" => {
                Some(WhichAgeToRegard::DateWhenAddedToFolder)
            }
            _ => None,
        }
    }
}

impl std::str::FromStr for WhichAgeToRegard {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid age preference: {}", s))
    }
}

impl fmt::Display for WhichAgeToRegard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directory under retention policy
///
/// Identity is the `id`: two values with the same id are the same tracked
/// directory even if their policies differ. Use [`TrackedDirectory::has_same_policy`]
/// to compare every field.
#[derive(Debug, Clone)]
pub struct TrackedDirectory {
    id: TrackedDirectoryId,

    /// Whether this directory should currently be monitored
    pub enabled: bool,

    /// Location of the directory
    pub path: PathBuf,

    /// Files older than this are removed
    pub oldest_allowed_age: Age,

    /// The directory's total size is kept at or below this
    pub largest_allowed_total_size: DataSize,
}

impl TrackedDirectory {
    /// Create a new, enabled tracked directory with a fresh id
    pub fn new(path: impl Into<PathBuf>, oldest_allowed_age: Age, largest_allowed_total_size: DataSize) -> Self {
        Self::with_id(
            TrackedDirectoryId::new(),
            path,
            oldest_allowed_age,
            largest_allowed_total_size,
        )
    }

    /// Create a new, enabled tracked directory with the given id
    pub fn with_id(
        id: TrackedDirectoryId,
        path: impl Into<PathBuf>,
        oldest_allowed_age: Age,
        largest_allowed_total_size: DataSize,
    ) -> Self {
        Self {
            id,
            enabled: true,
            path: path.into(),
            oldest_allowed_age,
            largest_allowed_total_size,
        }
    }

    /// A safe starting point: 30 days, 1 gigabyte
    pub fn default_for(path: impl Into<PathBuf>) -> Self {
        Self::new(path, Age::days(30.0), DataSize::gigabytes(1.0))
    }

    /// The immutable identity of this directory
    pub fn id(&self) -> TrackedDirectoryId {
        self.id
    }

    /// Whether every field, not just the id, matches `other`
    pub fn has_same_policy(&self, other: &TrackedDirectory) -> bool {
        self.id == other.id
            && self.enabled == other.enabled
            && self.path == other.path
            && self.oldest_allowed_age == other.oldest_allowed_age
            && self.largest_allowed_total_size == other.largest_allowed_total_size
    }

    /// How often this directory should be checked
    ///
    /// Tighter age limits poll more often: the interval equals the oldest
    /// allowed age, clamped to `[min, max]`.
    pub fn checking_interval(&self, min: Duration, max: Duration) -> Duration {
        let max = max.max(min);
        self.oldest_allowed_age.to_duration().clamp(min, max)
    }
}

impl PartialEq for TrackedDirectory {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TrackedDirectory {}

impl Hash for TrackedDirectory {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_by_id() {
        let a = TrackedDirectory::default_for("/tmp/a");
        let mut b = a.clone();
        b.path = PathBuf::from("/tmp/b");
        b.oldest_allowed_age = Age::days(1.0);

        assert_eq!(a, b);
        assert!(!a.has_same_policy(&b));
        assert_ne!(a, TrackedDirectory::default_for("/tmp/a"));
    }

    #[test]
    fn test_path_derived_id_is_stable() {
        let a = TrackedDirectoryId::for_path(Path::new("/home/me/Downloads"));
        let b = TrackedDirectoryId::for_path(Path::new("/home/me/Downloads"));
        let c = TrackedDirectoryId::for_path(Path::new("/home/me/Desktop"));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_id_display_and_parse() {
        let id = TrackedDirectoryId::new();
        let parsed = TrackedDirectoryId::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
        assert!(TrackedDirectoryId::parse("not-a-uuid").is_err());
    }

    #[test]
    fn test_checking_interval_clamped() {
        let min = Duration::from_secs(10);
        let max = Duration::from_secs(300);

        let tight = TrackedDirectory::new("/tmp", Age::seconds(2.0), DataSize::infinite());
        assert_eq!(tight.checking_interval(min, max), min);

        let mid = TrackedDirectory::new("/tmp", Age::minutes(2.0), DataSize::infinite());
        assert_eq!(mid.checking_interval(min, max), Duration::from_secs(120));

        let loose = TrackedDirectory::new("/tmp", Age::days(30.0), DataSize::infinite());
        assert_eq!(loose.checking_interval(min, max), max);

        let unbounded = TrackedDirectory::new("/tmp", Age::infinite(), DataSize::infinite());
        assert_eq!(unbounded.checking_interval(min, max), max);
    }

    #[test]
    fn test_which_age_parse() {
        assert_eq!(WhichAgeToRegard::parse("modified"), Some(WhichAgeToRegard::LastModificationDate));
        assert_eq!(
            WhichAgeToRegard::parse("DATE_WHEN_ADDED_TO_FOLDER"),
            Some(WhichAgeToRegard::DateWhenAddedToFolder)
        );
        assert_eq!(WhichAgeToRegard::parse("accessed"), None);
        for which in [
            WhichAgeToRegard::LastModificationDate,
            WhichAgeToRegard::OriginalCreationDate,
            WhichAgeToRegard::DateWhenAddedToFolder,
        ] {
            assert_eq!(which.as_str().parse::<WhichAgeToRegard>(), Ok(which));
        }
    }
}
