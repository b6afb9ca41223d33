//! Annotated file module - a file listing entry with its size and age

use crate::{Age, DataSize, WhichAgeToRegard};
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// The instants a file's age can be measured from
///
/// Any of them may be missing: not every platform or filesystem reports
/// every timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReferenceTimes {
    /// Last content modification
    pub modified: Option<SystemTime>,
    /// Original creation (birth time)
    pub created: Option<SystemTime>,
    /// When the file was placed in its current directory
    pub added: Option<SystemTime>,
}

impl ReferenceTimes {
    /// The instant to measure age from under the given preference
    ///
    /// Modification and added-to-folder dates fall back to the creation
    /// date when unavailable.
    pub fn reference_for(&self, which: WhichAgeToRegard) -> Option<SystemTime> {
        match which {
            WhichAgeToRegard::LastModificationDate => self.modified.or(self.created),
            WhichAgeToRegard::OriginalCreationDate => self.created,
            WhichAgeToRegard::DateWhenAddedToFolder => self.added.or(self.created),
        }
    }
}

/// A snapshot of one file at the moment its directory was listed
///
/// Equality and hashing consider only the path; size and age are
/// informational.
#[derive(Debug, Clone)]
pub struct AnnotatedFile {
    path: PathBuf,
    size: DataSize,
    age: Age,
}

impl AnnotatedFile {
    /// Create a snapshot from already-computed values
    pub fn new(path: impl Into<PathBuf>, size: DataSize, age: Age) -> Self {
        Self {
            path: path.into(),
            size,
            age,
        }
    }

    /// Create a snapshot from raw metadata
    ///
    /// Returns `None` when the preferred reference instant is unavailable;
    /// such a file cannot be aged and is left out of the analysis.
    pub fn from_metadata(
        path: impl Into<PathBuf>,
        size_in_bytes: u64,
        times: &ReferenceTimes,
        which: WhichAgeToRegard,
        now: SystemTime,
    ) -> Option<Self> {
        let reference = times.reference_for(which)?;
        Some(Self::new(
            path,
            DataSize::from_bytes(size_in_bytes),
            Age::between(reference, now),
        ))
    }

    /// Location of the file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size at listing time
    pub fn size(&self) -> DataSize {
        self.size
    }

    /// Age at listing time
    pub fn age(&self) -> Age {
        self.age
    }

    /// Consume the snapshot, keeping only its path
    pub fn into_path(self) -> PathBuf {
        self.path
    }
}

impl PartialEq for AnnotatedFile {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for AnnotatedFile {}

impl Hash for AnnotatedFile {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::time::Duration;

    #[test]
    fn test_equality_by_path_only() {
        let a = AnnotatedFile::new("/tmp/a", DataSize::from_bytes(1), Age::days(1.0));
        let b = AnnotatedFile::new("/tmp/a", DataSize::from_bytes(99), Age::days(7.0));
        let c = AnnotatedFile::new("/tmp/c", DataSize::from_bytes(1), Age::days(1.0));
        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_reference_fallbacks() {
        let created = SystemTime::UNIX_EPOCH + Duration::from_secs(100);
        let times = ReferenceTimes {
            modified: None,
            created: Some(created),
            added: None,
        };
        assert_eq!(times.reference_for(WhichAgeToRegard::LastModificationDate), Some(created));
        assert_eq!(times.reference_for(WhichAgeToRegard::DateWhenAddedToFolder), Some(created));

        let no_birth_time = ReferenceTimes {
            modified: Some(created),
            ..Default::default()
        };
        assert_eq!(no_birth_time.reference_for(WhichAgeToRegard::OriginalCreationDate), None);
    }

    #[test]
    fn test_from_metadata_computes_age() {
        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(10 * 86_400);
        let times = ReferenceTimes {
            modified: Some(SystemTime::UNIX_EPOCH + Duration::from_secs(3 * 86_400)),
            created: Some(SystemTime::UNIX_EPOCH),
            added: None,
        };

        let file = AnnotatedFile::from_metadata("/tmp/f", 2048, &times, WhichAgeToRegard::LastModificationDate, now)
            .unwrap();
        assert_eq!(file.age(), Age::days(7.0));
        assert_eq!(file.size(), DataSize::kibibytes(2.0));

        let by_creation = AnnotatedFile::from_metadata("/tmp/f", 0, &times, WhichAgeToRegard::OriginalCreationDate, now)
            .unwrap();
        assert_eq!(by_creation.age(), Age::days(10.0));

        assert!(AnnotatedFile::from_metadata("/tmp/f", 0, &ReferenceTimes::default(), WhichAgeToRegard::LastModificationDate, now).is_none());
    }
}
