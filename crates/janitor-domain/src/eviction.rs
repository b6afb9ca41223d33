//! Eviction module - deciding which files of a directory must go
//!
//! The policy is a pure function of a directory snapshot and two limits:
//!
//! 1. Every file older than the oldest allowed age is evicted.
//! 2. If the directory is still larger than the allowed total size, the
//!    oldest remaining files are evicted one by one until it is not.
//!
//! Size-driven eviction never touches a file while an older one survives,
//! so the youngest files are disturbed only as a last resort.

use crate::{Age, AnnotatedFile, DataSize, TrackedDirectory};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

/// Retention limits of one directory
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvictionPolicy {
    /// Files strictly older than this are evicted
    pub oldest_allowed_age: Age,
    /// The directory is trimmed until its total size is at or below this
    pub largest_allowed_total_size: DataSize,
}

impl EvictionPolicy {
    /// Create a policy from explicit limits
    pub fn new(oldest_allowed_age: Age, largest_allowed_total_size: DataSize) -> Self {
        Self {
            oldest_allowed_age,
            largest_allowed_total_size,
        }
    }

    /// A policy that never evicts anything
    pub fn unbounded() -> Self {
        Self::new(Age::INFINITE, DataSize::INFINITE)
    }

    /// The policy configured for a tracked directory
    pub fn for_directory(directory: &TrackedDirectory) -> Self {
        Self::new(directory.oldest_allowed_age, directory.largest_allowed_total_size)
    }

    /// Select the files to evict from a directory snapshot
    pub fn evaluate(&self, files: impl IntoIterator<Item = AnnotatedFile>) -> EvictionDecision {
        select_files_for_eviction(files, self.oldest_allowed_age, self.largest_allowed_total_size)
    }
}

/// Select the files to evict from a directory snapshot
///
/// `files` need not be sorted. Files are ordered oldest first, ties broken
/// by path, so the decision is deterministic. Duplicate paths are counted
/// once.
///
/// # Examples
///
/// ```
/// use janitor_domain::{select_files_for_eviction, Age, AnnotatedFile, DataSize};
///
/// let files = vec![
///     AnnotatedFile::new("/d/old", DataSize::gigabytes(1.0), Age::days(40.0)),
///     AnnotatedFile::new("/d/mid", DataSize::gigabytes(1.0), Age::days(20.0)),
///     AnnotatedFile::new("/d/new", DataSize::gigabytes(1.0), Age::days(5.0)),
/// ];
///
/// let decision = select_files_for_eviction(files, Age::days(30.0), DataSize::gigabytes(10.0));
/// assert_eq!(decision.len(), 1);
/// assert!(decision.contains("/d/old".as_ref()));
/// ```
pub fn select_files_for_eviction(
    files: impl IntoIterator<Item = AnnotatedFile>,
    oldest_allowed_age: Age,
    largest_allowed_total_size: DataSize,
) -> EvictionDecision {
    let mut files: Vec<AnnotatedFile> = files.into_iter().collect();
    files.sort_by(|a, b| a.path().cmp(b.path()));
    files.dedup_by(|a, b| a.path() == b.path());
    files.sort_by(|a, b| {
        b.age()
            .base_value()
            .total_cmp(&a.age().base_value())
            .then_with(|| a.path().cmp(b.path()))
    });

    let total_size: DataSize = files.iter().map(AnnotatedFile::size).sum();

    // Oldest first, so the age-expired files form a prefix
    let split = files.partition_point(|f| f.age() > oldest_allowed_age);
    let remaining = files.split_off(split);
    let age_expired = files;

    let mut cleaned_size: DataSize = age_expired.iter().map(AnnotatedFile::size).sum();
    let mut size_expired = Vec::new();
    let mut candidates = remaining.into_iter();
    while total_size - cleaned_size > largest_allowed_total_size {
        match candidates.next() {
            Some(file) => {
                cleaned_size += file.size();
                size_expired.push(file);
            }
            None => break,
        }
    }

    EvictionDecision {
        age_expired,
        size_expired,
        total_size,
        remaining_size: total_size - cleaned_size,
        largest_allowed_total_size,
    }
}

/// The files a policy selected for eviction, and why
#[derive(Debug, Clone)]
pub struct EvictionDecision {
    age_expired: Vec<AnnotatedFile>,
    size_expired: Vec<AnnotatedFile>,
    total_size: DataSize,
    remaining_size: DataSize,
    largest_allowed_total_size: DataSize,
}

impl EvictionDecision {
    /// A decision that evicts nothing from an empty directory
    pub fn empty() -> Self {
        Self {
            age_expired: Vec::new(),
            size_expired: Vec::new(),
            total_size: DataSize::ZERO,
            remaining_size: DataSize::ZERO,
            largest_allowed_total_size: DataSize::INFINITE,
        }
    }

    /// Whether nothing needs to go
    pub fn is_empty(&self) -> bool {
        self.age_expired.is_empty() && self.size_expired.is_empty()
    }

    /// Number of files selected
    pub fn len(&self) -> usize {
        self.age_expired.len() + self.size_expired.len()
    }

    /// Files evicted for exceeding the age limit, oldest first
    pub fn age_expired(&self) -> &[AnnotatedFile] {
        &self.age_expired
    }

    /// Files evicted only to satisfy the size limit, oldest first
    pub fn size_expired(&self) -> &[AnnotatedFile] {
        &self.size_expired
    }

    /// All selected files, oldest first
    pub fn files(&self) -> impl Iterator<Item = &AnnotatedFile> {
        self.age_expired.iter().chain(self.size_expired.iter())
    }

    /// Whether a path was selected
    pub fn contains(&self, path: &Path) -> bool {
        self.files().any(|f| f.path() == path)
    }

    /// Size of the whole snapshot
    pub fn total_size(&self) -> DataSize {
        self.total_size
    }

    /// Size freed if every selected file is removed
    pub fn reclaimed_size(&self) -> DataSize {
        self.total_size - self.remaining_size
    }

    /// Size left after every selected file is removed
    pub fn remaining_size(&self) -> DataSize {
        self.remaining_size
    }

    /// Whether the directory would still exceed its size limit
    pub fn remains_over_limit(&self) -> bool {
        self.remaining_size > self.largest_allowed_total_size
    }

    /// Selected paths, ordered by path
    pub fn paths(&self) -> BTreeSet<PathBuf> {
        self.files().map(|f| f.path().to_path_buf()).collect()
    }

    /// Consume the decision into a set of files
    pub fn into_set(self) -> HashSet<AnnotatedFile> {
        self.age_expired.into_iter().chain(self.size_expired).collect()
    }
}

impl Default for EvictionDecision {
    fn default() -> Self {
        Self::empty()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn snapshot() -> impl Strategy<Value = Vec<AnnotatedFile>> {
        prop::collection::vec((0u32..400, 0u64..10_000), 0..40).prop_map(|entries| {
            entries
                .into_iter()
                .enumerate()
                .map(|(i, (days, bytes))| {
                    AnnotatedFile::new(
                        format!("/d/file{i}"),
                        DataSize::from_bytes(bytes),
                        Age::days(f64::from(days)),
                    )
                })
                .collect()
        })
    }

    proptest! {
        /// Property: unbounded limits never evict anything
        #[test]
        fn test_unbounded_policy_is_noop(files in snapshot()) {
            let decision = EvictionPolicy::unbounded().evaluate(files);
            prop_assert!(decision.is_empty());
        }

        /// Property: exactly the files past the age limit are age-expired
        #[test]
        fn test_age_threshold(files in snapshot(), limit in 0u32..400) {
            let limit = Age::days(f64::from(limit));
            let expected: BTreeSet<PathBuf> = files
                .iter()
                .filter(|f| f.age() > limit)
                .map(|f| f.path().to_path_buf())
                .collect();

            let decision = select_files_for_eviction(files, limit, DataSize::INFINITE);
            prop_assert_eq!(decision.paths(), expected);
            prop_assert!(decision.size_expired().is_empty());
        }

        /// Property: the size limit is always met, and never overshot by more than one file
        #[test]
        fn test_size_limit_met_minimally(files in snapshot(), age in 0u32..400, cap in 0u64..200_000) {
            let cap = DataSize::from_bytes(cap);
            let decision = select_files_for_eviction(files, Age::days(f64::from(age)), cap);

            prop_assert!(decision.remaining_size() <= cap);
            prop_assert!(!decision.remains_over_limit());
            if let Some(last) = decision.size_expired().last() {
                prop_assert!(decision.remaining_size() + last.size() > cap);
            }
        }

        /// Property: no surviving file is older than a size-expired file
        #[test]
        fn test_size_eviction_is_oldest_first(files in snapshot(), cap in 0u64..200_000) {
            let decision = select_files_for_eviction(files.clone(), Age::INFINITE, DataSize::from_bytes(cap));
            if let Some(youngest_evicted) = decision.size_expired().last() {
                for survivor in files.iter().filter(|f| !decision.contains(f.path())) {
                    prop_assert!(survivor.age() <= youngest_evicted.age());
                }
            }
        }
    }
}
