//! Directory listing and file annotation

use async_trait::async_trait;
use janitor_domain::{AnnotatedFile, ReferenceTimes, WhichAgeToRegard};
use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

/// Source of directory listings and file metadata
#[async_trait]
pub trait DirectoryReader: Send + Sync {
    /// Entries of `directory` eligible for retention
    async fn list(&self, directory: &Path) -> io::Result<Vec<PathBuf>>;

    /// Size and age of one entry, or `None` if it cannot be read
    async fn annotate(
        &self,
        path: &Path,
        which: WhichAgeToRegard,
        now: SystemTime,
    ) -> Option<AnnotatedFile>;
}

/// Which directory entries take part in retention
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListingOptions {
    /// Include entries whose name starts with a dot
    pub include_hidden: bool,
    /// Include subdirectories, sized recursively
    pub include_directories: bool,
}

/// Reads the local filesystem
#[derive(Debug, Clone, Default)]
pub struct FsDirectoryReader {
    options: ListingOptions,
}

impl FsDirectoryReader {
    /// Create a reader with the given listing options
    pub fn new(options: ListingOptions) -> Self {
        Self { options }
    }

    /// The listing options in use
    pub fn options(&self) -> ListingOptions {
        self.options
    }
}

#[async_trait]
impl DirectoryReader for FsDirectoryReader {
    async fn list(&self, directory: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(directory).await?;
        let mut paths = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            if !self.options.include_hidden && is_hidden(&entry.file_name().to_string_lossy()) {
                continue;
            }
            let file_type = match entry.file_type().await {
                Ok(t) => t,
                Err(e) => {
                    tracing::debug!(path = %entry.path().display(), error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            if file_type.is_dir() && !self.options.include_directories {
                continue;
            }
            paths.push(entry.path());
        }

        Ok(paths)
    }

    async fn annotate(
        &self,
        path: &Path,
        which: WhichAgeToRegard,
        now: SystemTime,
    ) -> Option<AnnotatedFile> {
        let metadata = match tokio::fs::symlink_metadata(path).await {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Cannot read metadata");
                return None;
            }
        };

        let size = if metadata.is_dir() {
            let dir = path.to_path_buf();
            tokio::task::spawn_blocking(move || dir_size(&dir)).await.ok()?
        } else {
            metadata.len()
        };

        let times = ReferenceTimes {
            modified: metadata.modified().ok(),
            created: metadata.created().ok(),
            added: added_to_folder(&metadata),
        };
        AnnotatedFile::from_metadata(path, size, &times, which, now)
    }
}

/// Annotate every listed entry of `directory`
///
/// A directory that cannot be listed yields an empty snapshot, and entries
/// that cannot be annotated are left out.
pub async fn read_snapshot<R>(
    reader: &R,
    directory: &Path,
    which: WhichAgeToRegard,
    now: SystemTime,
) -> Vec<AnnotatedFile>
where
    R: DirectoryReader + ?Sized,
{
    let paths = match reader.list(directory).await {
        Ok(paths) => paths,
        Err(e) => {
            tracing::warn!(directory = %directory.display(), error = %e, "Cannot list directory, treating as empty");
            return Vec::new();
        }
    };

    futures::future::join_all(paths.iter().map(|path| reader.annotate(path, which, now)))
        .await
        .into_iter()
        .flatten()
        .collect()
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Total size of the regular files below `path`
fn dir_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

/// Moving or renaming a file into a folder updates its inode change time
#[cfg(unix)]
fn added_to_folder(metadata: &Metadata) -> Option<SystemTime> {
    use std::os::unix::fs::MetadataExt;
    use std::time::Duration;

    let secs = u64::try_from(metadata.ctime()).ok()?;
    let nanos = u32::try_from(metadata.ctime_nsec()).unwrap_or(0);
    SystemTime::UNIX_EPOCH.checked_add(Duration::new(secs, nanos))
}

#[cfg(not(unix))]
fn added_to_folder(_metadata: &Metadata) -> Option<SystemTime> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use janitor_domain::{Age, DataSize};
    use std::time::Duration;

    fn populated_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("visible.txt"), b"12345").unwrap();
        std::fs::write(dir.path().join(".hidden"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("folder")).unwrap();
        std::fs::write(dir.path().join("folder").join("a"), vec![0u8; 100]).unwrap();
        std::fs::write(dir.path().join("folder").join("b"), vec![0u8; 50]).unwrap();
        dir
    }

    fn names(paths: &[PathBuf]) -> Vec<String> {
        let mut names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_list_skips_hidden_and_directories_by_default() {
        let dir = populated_dir();
        let paths = FsDirectoryReader::default().list(dir.path()).await.unwrap();
        assert_eq!(names(&paths), vec!["visible.txt"]);
    }

    #[tokio::test]
    async fn test_list_with_options() {
        let dir = populated_dir();
        let reader = FsDirectoryReader::new(ListingOptions {
            include_hidden: true,
            include_directories: true,
        });
        let paths = reader.list(dir.path()).await.unwrap();
        assert_eq!(names(&paths), vec![".hidden", "folder", "visible.txt"]);
    }

    #[tokio::test]
    async fn test_annotate_directory_sums_contents() {
        let dir = populated_dir();
        let reader = FsDirectoryReader::default();
        let file = reader
            .annotate(&dir.path().join("folder"), WhichAgeToRegard::LastModificationDate, SystemTime::now())
            .await
            .unwrap();
        assert_eq!(file.size(), DataSize::from_bytes(150));
    }

    #[tokio::test]
    async fn test_annotate_uses_modification_date() {
        let dir = populated_dir();
        let path = dir.path().join("visible.txt");
        let now = SystemTime::now();
        let handle = std::fs::File::options().write(true).open(&path).unwrap();
        handle.set_modified(now - Duration::from_secs(10 * 86_400)).unwrap();
        drop(handle);

        let file = FsDirectoryReader::default()
            .annotate(&path, WhichAgeToRegard::LastModificationDate, now)
            .await
            .unwrap();
        assert_eq!(file.size(), DataSize::from_bytes(5));
        assert!((file.age().converted(janitor_domain::DurationUnit::Day).value - 10.0).abs() < 0.001);
        assert!(file.age() > Age::days(9.0));
    }

    #[tokio::test]
    async fn test_missing_directory_yields_empty_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("gone");
        let files = read_snapshot(
            &FsDirectoryReader::default(),
            &gone,
            WhichAgeToRegard::LastModificationDate,
            SystemTime::now(),
        )
        .await;
        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_annotates_every_entry() {
        let dir = populated_dir();
        let reader = FsDirectoryReader::new(ListingOptions {
            include_hidden: true,
            include_directories: false,
        });
        let files = read_snapshot(&reader, dir.path(), WhichAgeToRegard::DateWhenAddedToFolder, SystemTime::now()).await;
        assert_eq!(files.len(), 2);
        let total: DataSize = files.iter().map(|f| f.size()).sum();
        assert_eq!(total, DataSize::from_bytes(6));
    }
}
