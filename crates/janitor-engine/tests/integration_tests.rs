//! Integration tests for the retention engine

use async_trait::async_trait;
use janitor_domain::{Age, AnnotatedFile, DataSize, TrackedDirectory, TrackedDirectoryId, WhichAgeToRegard};
use janitor_engine::{
    Activity, CheckOutcome, DirectoryReader, EngineConfig, JanitorError, JanitorialEngine, RemovalBackend,
    RemovalError, RemovalErrorKind, RemovalStrategy, RemovalStrategyConfig, TrackedDirectoryConfig,
};
use std::collections::{BTreeSet, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use tokio::sync::broadcast;

/// An in-memory filesystem: path -> (size in bytes, age)
#[derive(Default)]
struct MemoryFs {
    files: Mutex<HashMap<PathBuf, (u64, Age)>>,
    removals: AtomicUsize,
    removal_delay: Duration,
}

impl MemoryFs {
    fn with_files(files: &[(&str, u64, Age)]) -> Arc<Self> {
        Self::with_slow_removals(files, Duration::ZERO)
    }

    fn with_slow_removals(files: &[(&str, u64, Age)], removal_delay: Duration) -> Arc<Self> {
        let fs = Self {
            removal_delay,
            ..Self::default()
        };
        {
            let mut map = fs.files.lock().unwrap();
            for (path, size, age) in files {
                map.insert(PathBuf::from(path), (*size, *age));
            }
        }
        Arc::new(fs)
    }

    fn contains(&self, path: &str) -> bool {
        self.files.lock().unwrap().contains_key(Path::new(path))
    }
}

#[async_trait]
impl DirectoryReader for MemoryFs {
    async fn list(&self, directory: &Path) -> io::Result<Vec<PathBuf>> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .keys()
            .filter(|p| p.parent() == Some(directory))
            .cloned()
            .collect())
    }

    async fn annotate(&self, path: &Path, _which: WhichAgeToRegard, _now: SystemTime) -> Option<AnnotatedFile> {
        let files = self.files.lock().unwrap();
        let (size, age) = files.get(path)?;
        Some(AnnotatedFile::new(path, DataSize::from_bytes(*size), *age))
    }
}

#[async_trait]
impl RemovalBackend for MemoryFs {
    async fn remove(&self, path: &Path, _strategy: RemovalStrategy) -> Result<(), RemovalError> {
        self.removals.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.removal_delay).await;
        if path.to_string_lossy().contains("locked") {
            return Err(RemovalError::PermissionDenied);
        }
        match self.files.lock().unwrap().remove(path) {
            Some(_) => Ok(()),
            None => Err(RemovalError::NotFound),
        }
    }
}

fn live_config(directories: &[TrackedDirectory]) -> EngineConfig {
    EngineConfig {
        dry_run: false,
        removal_strategy: RemovalStrategyConfig::Delete,
        tracked_directories: directories.iter().map(TrackedDirectoryConfig::from).collect(),
        ..EngineConfig::default()
    }
}

fn engine_over(fs: &Arc<MemoryFs>, config: &EngineConfig) -> JanitorialEngine {
    JanitorialEngine::new(config, fs.clone(), fs.clone()).unwrap()
}

/// Collect Started/Stopped events until `count` arrived
async fn lifecycle_events(rx: &mut broadcast::Receiver<Activity>, count: usize) -> Vec<(&'static str, TrackedDirectoryId)> {
    let mut events = Vec::new();
    while events.len() < count {
        let activity = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for lifecycle events")
            .unwrap();
        match activity {
            Activity::MonitorStarted { id } => events.push(("started", id)),
            Activity::MonitorStopped { id } => events.push(("stopped", id)),
            _ => {}
        }
    }
    events
}

#[tokio::test]
async fn test_empty_directory_is_all_good_without_removals() {
    let fs = MemoryFs::with_files(&[]);
    let dir = TrackedDirectory::new("/empty", Age::ZERO, DataSize::ZERO);
    let engine = engine_over(&fs, &live_config(&[dir.clone()]));

    let outcome = engine.check_now(dir.id()).await.unwrap();

    assert_eq!(outcome, CheckOutcome::AllGood);
    assert_eq!(fs.removals.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_age_and_size_limits_applied_per_directory() {
    let fs = MemoryFs::with_files(&[
        ("/a/forty", 1_000, Age::days(40.0)),
        ("/a/twenty", 1_000, Age::days(20.0)),
        ("/a/five", 1_000, Age::days(5.0)),
        ("/b/forty", 1_000, Age::days(40.0)),
        ("/b/twenty", 1_000, Age::days(20.0)),
        ("/b/five", 1_000, Age::days(5.0)),
    ]);
    let by_age = TrackedDirectory::new("/a", Age::days(30.0), DataSize::kilobytes(10.0));
    let by_size = TrackedDirectory::new("/b", Age::days(100.0), DataSize::kilobytes(1.5));
    let engine = engine_over(&fs, &live_config(&[by_age.clone(), by_size.clone()]));

    engine.check_now(by_age.id()).await.unwrap();
    assert!(!fs.contains("/a/forty"));
    assert!(fs.contains("/a/twenty"));
    assert!(fs.contains("/a/five"));

    match engine.check_now(by_size.id()).await.unwrap() {
        CheckOutcome::Cleaned { removed, reclaimed } => {
            assert_eq!(removed, BTreeSet::from([PathBuf::from("/b/forty"), PathBuf::from("/b/twenty")]));
            assert_eq!(reclaimed, DataSize::kilobytes(2.0));
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert!(fs.contains("/b/five"));
}

#[tokio::test]
async fn test_partial_failure_keeps_category() {
    let fs = MemoryFs::with_files(&[
        ("/d/one", 1, Age::days(40.0)),
        ("/d/two", 1, Age::days(40.0)),
        ("/d/locked", 1, Age::days(40.0)),
    ]);
    let dir = TrackedDirectory::new("/d", Age::days(30.0), DataSize::INFINITE);
    let engine = engine_over(&fs, &live_config(&[dir.clone()]));
    let mut errors = engine
        .activity()
        .subscribe_filtered(|a| matches!(a, Activity::Error(_)));

    let outcome = engine.check_now(dir.id()).await.unwrap();

    match &outcome {
        CheckOutcome::PartiallyCleaned { removed, failures, .. } => {
            assert_eq!(removed.len(), 2);
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].path, PathBuf::from("/d/locked"));
            assert_eq!(failures[0].error.kind(), RemovalErrorKind::PermissionDenied);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert!(matches!(errors.recv().await.unwrap(), Activity::Error(_)));

    let metrics = engine.metrics(dir.id()).await.unwrap();
    assert_eq!(metrics.files_removed, 2);
    assert_eq!(metrics.permission_denied, 1);
}

#[tokio::test]
async fn test_dry_run_reports_success_without_removing() {
    let fs = MemoryFs::with_files(&[("/d/old", 1, Age::days(40.0))]);
    let dir = TrackedDirectory::new("/d", Age::days(30.0), DataSize::INFINITE);
    let config = EngineConfig {
        dry_run: true,
        ..live_config(&[dir.clone()])
    };
    let engine = engine_over(&fs, &config);

    let outcome = engine.check_now(dir.id()).await.unwrap();

    assert_eq!(outcome.kind(), "cleaned");
    assert!(fs.contains("/d/old"));
    assert_eq!(fs.removals.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_dry_run_toggle_restarts_every_monitor() {
    let fs = MemoryFs::with_files(&[]);
    let first = TrackedDirectory::new("/one", Age::days(30.0), DataSize::INFINITE);
    let second = TrackedDirectory::new("/two", Age::days(30.0), DataSize::INFINITE);
    let engine = engine_over(&fs, &live_config(&[first.clone(), second.clone()]));

    engine.start().await;
    assert!(engine.is_running(first.id()).await);
    assert!(engine.is_running(second.id()).await);

    let mut rx = engine.subscribe();
    let mut dry_run_changes = engine.activity().only_dry_run_changes();
    engine.set_dry_run(true).await;

    let events = lifecycle_events(&mut rx, 4).await;
    let kinds: Vec<_> = events.iter().map(|(kind, _)| *kind).collect();
    assert_eq!(kinds, vec!["stopped", "stopped", "started", "started"]);
    let stopped: BTreeSet<_> = events[..2].iter().map(|(_, id)| *id).collect();
    let started: BTreeSet<_> = events[2..].iter().map(|(_, id)| *id).collect();
    assert_eq!(stopped, BTreeSet::from([first.id(), second.id()]));
    assert_eq!(stopped, started);

    assert!(matches!(
        dry_run_changes.recv().await.unwrap(),
        Activity::DryRunChanged { dry_run: true }
    ));
    assert!(engine.dry_run().await);

    // Setting the same value again is a no-op
    engine.set_dry_run(true).await;
    let repeated = tokio::time::timeout(Duration::from_millis(100), dry_run_changes.recv()).await;
    assert!(repeated.is_err());

    engine.shutdown().await;
}

#[tokio::test]
async fn test_no_cycles_after_stop() {
    let fs = MemoryFs::with_files(&[]);
    // Zero age clamps the interval to the one-second minimum
    let dir = TrackedDirectory::new("/busy", Age::ZERO, DataSize::INFINITE);
    let config = EngineConfig {
        min_check_interval_secs: 1,
        max_check_interval_secs: 1,
        ..live_config(&[dir.clone()])
    };
    let engine = engine_over(&fs, &config);
    let mut cycles = engine
        .activity()
        .subscribe_filtered(|a| matches!(a, Activity::CycleCompleted { .. }));

    engine.start().await;
    tokio::time::timeout(Duration::from_secs(5), cycles.recv())
        .await
        .expect("first cycle runs on start")
        .unwrap();

    engine.stop().await;
    assert!(!engine.is_running(dir.id()).await);

    let late = tokio::time::timeout(Duration::from_millis(2_500), cycles.recv()).await;
    assert!(late.is_err(), "a cycle ran after stop: {:?}", late);
}

#[tokio::test]
async fn test_reconcile_coordinates_retires_and_restarts() {
    let fs = MemoryFs::with_files(&[]);
    let kept = TrackedDirectory::new("/kept", Age::days(30.0), DataSize::INFINITE);
    let retired = TrackedDirectory::new("/retired", Age::days(30.0), DataSize::INFINITE);
    let changed = TrackedDirectory::new("/changed", Age::days(30.0), DataSize::INFINITE);
    let engine = engine_over(&fs, &live_config(&[kept.clone(), retired.clone(), changed.clone()]));
    engine.start().await;

    let mut rx = engine.subscribe();
    let mut tighter = changed.clone();
    tighter.oldest_allowed_age = Age::days(7.0);
    let added = TrackedDirectory::new("/added", Age::days(30.0), DataSize::INFINITE);

    engine
        .set_tracked_directories(vec![kept.clone(), tighter.clone(), added.clone()])
        .await;

    let events = lifecycle_events(&mut rx, 4).await;
    assert_eq!(
        events,
        vec![
            ("stopped", retired.id()),
            ("stopped", changed.id()),
            ("started", changed.id()),
            ("started", added.id()),
        ]
    );

    assert_eq!(engine.monitor_count().await, 3);
    assert!(engine.is_running(kept.id()).await);
    assert!(!engine.is_running(retired.id()).await);
    let directories = engine.tracked_directories().await;
    let current = directories.iter().find(|d| d.id() == changed.id()).unwrap();
    assert_eq!(current.oldest_allowed_age, Age::days(7.0));

    engine.shutdown().await;
}

#[tokio::test]
async fn test_disabled_directories_are_coordinated_but_idle() {
    let fs = MemoryFs::with_files(&[]);
    let mut disabled = TrackedDirectory::new("/off", Age::days(30.0), DataSize::INFINITE);
    disabled.enabled = false;
    let engine = engine_over(&fs, &live_config(&[disabled.clone()]));

    engine.start().await;
    assert_eq!(engine.monitor_count().await, 1);
    assert!(!engine.is_running(disabled.id()).await);

    let mut enabled = disabled.clone();
    enabled.enabled = true;
    engine.update_tracked_directory(enabled).await.unwrap();
    assert!(engine.is_running(disabled.id()).await);

    engine.shutdown().await;
}

#[tokio::test]
async fn test_unknown_directory_errors() {
    let fs = MemoryFs::with_files(&[]);
    let engine = engine_over(&fs, &live_config(&[]));
    let stranger = TrackedDirectory::new("/nowhere", Age::days(1.0), DataSize::INFINITE);

    assert!(matches!(
        engine.retire(stranger.id()).await,
        Err(JanitorError::MonitorNotFound(_))
    ));
    assert!(matches!(
        engine.check_now(stranger.id()).await,
        Err(JanitorError::MonitorNotFound(_))
    ));
    assert!(matches!(
        engine.update_tracked_directory(stranger).await,
        Err(JanitorError::MonitorNotFound(_))
    ));
}

#[tokio::test]
async fn test_coordinate_and_retire_publish_set_changes() {
    let fs = MemoryFs::with_files(&[]);
    let engine = engine_over(&fs, &live_config(&[]));
    let mut changes = engine
        .activity()
        .subscribe_filtered(|a| matches!(a, Activity::MonitorsChanged { .. }));
    let dir = TrackedDirectory::new("/new", Age::days(1.0), DataSize::INFINITE);

    engine.coordinate(dir.clone()).await;
    engine.retire(dir.id()).await.unwrap();

    assert!(matches!(changes.recv().await.unwrap(), Activity::MonitorsChanged { monitors: 1 }));
    assert!(matches!(changes.recv().await.unwrap(), Activity::MonitorsChanged { monitors: 0 }));
}

#[tokio::test]
async fn test_filesystem_end_to_end() {
    let root = tempfile::tempdir().unwrap();
    let watched = root.path().join("downloads");
    let trash = root.path().join("trash");
    std::fs::create_dir(&watched).unwrap();

    let old = watched.join("installer.dmg");
    let fresh = watched.join("notes.txt");
    std::fs::write(&old, vec![0u8; 64]).unwrap();
    std::fs::write(&fresh, b"keep me").unwrap();
    let handle = std::fs::File::options().write(true).open(&old).unwrap();
    handle
        .set_modified(SystemTime::now() - Duration::from_secs(40 * 86_400))
        .unwrap();
    drop(handle);

    let dir = TrackedDirectory::new(&watched, Age::days(30.0), DataSize::INFINITE);
    let config = EngineConfig {
        dry_run: false,
        removal_strategy: RemovalStrategyConfig::Trash,
        trash_dir: Some(trash.clone()),
        tracked_directories: vec![TrackedDirectoryConfig::from(&dir)],
        ..EngineConfig::default()
    };
    let engine = JanitorialEngine::with_filesystem(&config).unwrap();

    let outcome = engine.check_now(dir.id()).await.unwrap();

    assert_eq!(outcome.removed().map(|r| r.len()), Some(1));
    assert!(!old.exists());
    assert!(fresh.exists());
    assert!(trash.join("installer.dmg").exists());
}

#[tokio::test]
async fn test_missing_directory_keeps_engine_running() {
    let root = tempfile::tempdir().unwrap();
    let dir = TrackedDirectory::new(root.path().join("not-yet"), Age::ZERO, DataSize::ZERO);
    let config = EngineConfig {
        tracked_directories: vec![TrackedDirectoryConfig::from(&dir)],
        ..EngineConfig::default()
    };
    let engine = JanitorialEngine::with_filesystem(&config).unwrap();

    engine.start().await;
    assert_eq!(engine.check_now(dir.id()).await.unwrap(), CheckOutcome::AllGood);
    assert!(engine.is_running(dir.id()).await);
    engine.shutdown().await;
}

#[tokio::test]
async fn test_start_after_shutdown_does_nothing() {
    let fs = MemoryFs::with_files(&[("/a/old", 10, Age::days(40.0))]);
    let dir = TrackedDirectory::new("/a", Age::days(30.0), DataSize::INFINITE);
    let engine = engine_over(&fs, &live_config(&[dir.clone()]));

    engine.shutdown().await;
    let mut rx = engine.subscribe();
    engine.start().await;

    let quiet = tokio::time::timeout(Duration::from_millis(300), rx.recv()).await;
    assert!(quiet.is_err(), "unexpected activity {:?}", quiet);
    assert!(!engine.is_running(dir.id()).await);
    assert!(fs.contains("/a/old"));
    assert_eq!(fs.removals.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_toggles_answer_while_cycle_in_flight() {
    let fs = MemoryFs::with_slow_removals(&[("/a/old", 10, Age::days(40.0))], Duration::from_secs(2));
    let dir = TrackedDirectory::new("/a", Age::days(30.0), DataSize::INFINITE);
    let engine = engine_over(&fs, &live_config(&[dir.clone()]));

    engine.start().await;
    // Let the first cycle reach the slow removal
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(fs.removals.load(Ordering::SeqCst), 1);

    tokio::time::timeout(Duration::from_millis(500), engine.set_dry_run(true))
        .await
        .expect("set_dry_run waited for the cycle in flight");
    let metrics = tokio::time::timeout(Duration::from_millis(500), engine.metrics(dir.id()))
        .await
        .expect("metrics waited for the cycle in flight")
        .unwrap();
    assert_eq!(metrics.cycles, 0);
    assert!(engine.is_running(dir.id()).await);

    engine.shutdown().await;
    assert!(!fs.contains("/a/old"));
}
