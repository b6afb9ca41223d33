//! Batch removal of evicted files
//!
//! Every path is removed by its own task. Completions are folded by a single
//! consumer, so the final classification is computed exactly once, after the
//! last outcome arrives.

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

/// How a selected file is disposed of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemovalStrategy {
    /// Delete the file for good
    PermanentDelete,
    /// Move the file into a recoverable trash directory
    MoveToTrash,
    /// Touch nothing, report success
    DryRun,
}

impl RemovalStrategy {
    /// Get the strategy name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            RemovalStrategy::PermanentDelete => "delete",
            RemovalStrategy::MoveToTrash => "trash",
            RemovalStrategy::DryRun => "dry-run",
        }
    }
}

impl std::fmt::Display for RemovalStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why one file could not be removed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemovalError {
    /// The process lacks permission to remove the file
    #[error("permission denied")]
    PermissionDenied,

    /// The file vanished before it could be removed
    #[error("file not found")]
    NotFound,

    /// Any other failure
    #[error("{0}")]
    Other(String),
}

/// The two failure categories surfaced to users
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemovalErrorKind {
    /// Lack of permission
    PermissionDenied,
    /// Everything else
    Other,
}

impl RemovalError {
    /// The category of this failure
    pub fn kind(&self) -> RemovalErrorKind {
        match self {
            RemovalError::PermissionDenied => RemovalErrorKind::PermissionDenied,
            RemovalError::NotFound | RemovalError::Other(_) => RemovalErrorKind::Other,
        }
    }
}

impl From<io::Error> for RemovalError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::PermissionDenied => RemovalError::PermissionDenied,
            io::ErrorKind::NotFound => RemovalError::NotFound,
            _ => RemovalError::Other(e.to_string()),
        }
    }
}

/// A file that could not be removed, and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalFailure {
    /// The file that was meant to go
    pub path: PathBuf,
    /// What went wrong
    pub error: RemovalError,
}

impl RemovalFailure {
    /// Create a failure record
    pub fn new(path: impl Into<PathBuf>, error: RemovalError) -> Self {
        Self {
            path: path.into(),
            error,
        }
    }
}

impl std::fmt::Display for RemovalFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.error)
    }
}

/// Aggregated outcome of removing a batch of files
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchRemovalResult {
    /// Every file was removed
    AllSucceeded(BTreeSet<PathBuf>),

    /// Some files were removed, some were not
    Mixed {
        /// Files that were removed
        removed: BTreeSet<PathBuf>,
        /// Files that remain, ordered by path
        failures: Vec<RemovalFailure>,
    },

    /// No file could be removed
    AllFailed(Vec<RemovalFailure>),
}

impl BatchRemovalResult {
    /// Classify per-file outcomes
    ///
    /// An empty batch counts as all-succeeded.
    pub fn classify(removed: BTreeSet<PathBuf>, mut failures: Vec<RemovalFailure>) -> Self {
        failures.sort_by(|a, b| a.path.cmp(&b.path));
        if failures.is_empty() {
            BatchRemovalResult::AllSucceeded(removed)
        } else if removed.is_empty() {
            BatchRemovalResult::AllFailed(failures)
        } else {
            BatchRemovalResult::Mixed { removed, failures }
        }
    }

    /// Files that were removed
    pub fn removed(&self) -> Option<&BTreeSet<PathBuf>> {
        match self {
            BatchRemovalResult::AllSucceeded(removed) | BatchRemovalResult::Mixed { removed, .. } => {
                Some(removed)
            }
            BatchRemovalResult::AllFailed(_) => None,
        }
    }

    /// Files that could not be removed
    pub fn failures(&self) -> &[RemovalFailure] {
        match self {
            BatchRemovalResult::AllSucceeded(_) => &[],
            BatchRemovalResult::Mixed { failures, .. } | BatchRemovalResult::AllFailed(failures) => {
                failures
            }
        }
    }

    /// Whether every file was removed
    pub fn is_success(&self) -> bool {
        matches!(self, BatchRemovalResult::AllSucceeded(_))
    }
}

/// The primitive that physically removes one file
#[async_trait]
pub trait RemovalBackend: Send + Sync {
    /// Remove `path` using `strategy`
    async fn remove(&self, path: &Path, strategy: RemovalStrategy) -> Result<(), RemovalError>;
}

/// Default trash location: `<data dir>/Trash/files`
pub fn default_trash_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("Trash").join("files"))
}

/// Removes files on the local filesystem
///
/// Clones share the trash name reservation, so concurrent removals never
/// pick the same trash name.
#[derive(Debug, Clone)]
pub struct FsRemovalBackend {
    trash_dir: PathBuf,
    reservation: Arc<Mutex<()>>,
}

impl FsRemovalBackend {
    /// Create a backend that trashes into `trash_dir`
    pub fn new(trash_dir: impl Into<PathBuf>) -> Self {
        Self {
            trash_dir: trash_dir.into(),
            reservation: Arc::new(Mutex::new(())),
        }
    }

    /// Where trashed files go
    pub fn trash_dir(&self) -> &Path {
        &self.trash_dir
    }

    async fn delete(&self, path: &Path) -> io::Result<()> {
        let metadata = tokio::fs::symlink_metadata(path).await?;
        if metadata.is_dir() {
            tokio::fs::remove_dir_all(path).await
        } else {
            tokio::fs::remove_file(path).await
        }
    }

    async fn trash(&self, path: &Path) -> Result<(), RemovalError> {
        let metadata = tokio::fs::symlink_metadata(path).await?;
        tokio::fs::create_dir_all(&self.trash_dir).await?;

        // Held until the file occupies its trash name
        let _reserved = self.reservation.lock().await;
        let target = self.free_trash_name(path).await?;

        match tokio::fs::rename(path, &target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices && metadata.is_file() => {
                tokio::fs::copy(path, &target).await?;
                tokio::fs::remove_file(path).await?;
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => Err(RemovalError::Other(
                "cannot move a directory to a trash on another filesystem".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// `name`, or `name (2)`, `name (3)`... whichever is not taken yet
    async fn free_trash_name(&self, path: &Path) -> Result<PathBuf, RemovalError> {
        let file_name = path
            .file_name()
            .ok_or_else(|| RemovalError::Other(format!("{} has no file name", path.display())))?;
        let candidate = self.trash_dir.join(file_name);
        if !tokio::fs::try_exists(&candidate).await? {
            return Ok(candidate);
        }

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = path.extension().map(|e| e.to_string_lossy().into_owned());
        for n in 2.. {
            let name = match &extension {
                Some(ext) => format!("{} ({}).{}", stem, n, ext),
                None => format!("{} ({})", stem, n),
            };
            let candidate = self.trash_dir.join(name);
            if !tokio::fs::try_exists(&candidate).await? {
                return Ok(candidate);
            }
        }
        Err(RemovalError::Other("no free name in trash".to_string()))
    }
}

impl Default for FsRemovalBackend {
    fn default() -> Self {
        Self::new(default_trash_dir().unwrap_or_else(|| std::env::temp_dir().join("janitor-trash")))
    }
}

#[async_trait]
impl RemovalBackend for FsRemovalBackend {
    async fn remove(&self, path: &Path, strategy: RemovalStrategy) -> Result<(), RemovalError> {
        match strategy {
            RemovalStrategy::PermanentDelete => Ok(self.delete(path).await?),
            RemovalStrategy::MoveToTrash => self.trash(path).await,
            RemovalStrategy::DryRun => Ok(()),
        }
    }
}

/// Remove every path concurrently and aggregate the outcomes
///
/// A dry run reports every path as removed without calling the backend.
/// Removals already dispatched run to completion even if the returned
/// future is dropped.
pub async fn remove_all<B>(
    paths: impl IntoIterator<Item = PathBuf>,
    strategy: RemovalStrategy,
    backend: Arc<B>,
) -> BatchRemovalResult
where
    B: RemovalBackend + ?Sized + 'static,
{
    let paths: BTreeSet<PathBuf> = paths.into_iter().collect();
    if strategy == RemovalStrategy::DryRun {
        for path in &paths {
            tracing::info!(path = %path.display(), "Dry run: would remove");
        }
        return BatchRemovalResult::AllSucceeded(paths);
    }

    let mut pending: FuturesUnordered<_> = paths
        .into_iter()
        .map(|path| {
            let backend = Arc::clone(&backend);
            let task_path = path.clone();
            let handle = tokio::spawn(async move { backend.remove(&task_path, strategy).await });
            async move { (path, handle.await) }
        })
        .collect();

    let mut removed = BTreeSet::new();
    let mut failures = Vec::new();
    while let Some((path, joined)) = pending.next().await {
        let outcome = joined
            .unwrap_or_else(|e| Err(RemovalError::Other(format!("removal task failed: {}", e))));
        match outcome {
            Ok(()) => {
                tracing::debug!(path = %path.display(), strategy = %strategy, "Removed");
                removed.insert(path);
            }
            Err(error) => {
                tracing::warn!(path = %path.display(), error = %error, "Failed to remove");
                failures.push(RemovalFailure::new(path, error));
            }
        }
    }

    BatchRemovalResult::classify(removed, failures)
}
