//! Coordinating engine - owns every monitor and the global toggles

use crate::activity::{Activity, ActivityFeed};
use crate::config::EngineConfig;
use crate::fs::{DirectoryReader, FsDirectoryReader};
use crate::metrics::MonitorMetrics;
use crate::monitor::{CheckOutcome, MonitorSettings, SingleDirectoryMonitor, DRAIN_TIMEOUT};
use crate::removal::{FsRemovalBackend, RemovalBackend, RemovalStrategy};
use crate::{JanitorError, Result};
use janitor_domain::{TrackedDirectory, TrackedDirectoryId, WhichAgeToRegard};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;

/// Coordinates one [`SingleDirectoryMonitor`] per tracked directory
///
/// The monitor collection is only mutated through the engine's methods,
/// which are serialized by an internal lock. Monitors of disabled
/// directories are coordinated but never started.
///
/// # Examples
///
/// ```no_run
/// use janitor_engine::{EngineConfig, JanitorialEngine};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = EngineConfig::from_file("janitor.toml")?;
///     let engine = JanitorialEngine::with_filesystem(&config)?;
///     let mut activity = engine.subscribe();
///
///     engine.start().await;
///     while let Ok(event) = activity.recv().await {
///         println!("{:?}", event);
///     }
///     Ok(())
/// }
/// ```
pub struct JanitorialEngine {
    state: Mutex<EngineState>,
    feed: ActivityFeed,
    reader: Arc<dyn DirectoryReader>,
    backend: Arc<dyn RemovalBackend>,
    cancel: CancellationToken,
}

struct EngineState {
    /// In insertion order
    monitors: Vec<SingleDirectoryMonitor>,
    dry_run: bool,
    live_strategy: RemovalStrategy,
    settings: MonitorSettings,
    started: bool,
    shut_down: bool,
}

impl EngineState {
    fn position(&self, id: TrackedDirectoryId) -> Option<usize> {
        self.monitors.iter().position(|m| m.id() == id)
    }

    fn refresh_strategy(&mut self) {
        self.settings.strategy = if self.dry_run {
            RemovalStrategy::DryRun
        } else {
            self.live_strategy
        };
    }

    /// Stop every running monitor, then start every enabled one
    fn restart_all(&mut self) {
        let mut stopped = 0;
        for monitor in self.monitors.iter_mut() {
            if monitor.stop() {
                stopped += 1;
            }
        }
        if !self.started {
            return;
        }
        tracing::debug!(stopped, "Restarting monitors");

        let settings = self.settings;
        for monitor in self.monitors.iter_mut().filter(|m| m.directory().enabled) {
            monitor.start(settings);
        }
    }

    /// Stop, re-point and (if appropriate) restart one monitor
    fn replace_policy(&mut self, index: usize, directory: TrackedDirectory) {
        let settings = self.settings;
        let started = self.started;
        let monitor = &mut self.monitors[index];
        monitor.stop();
        monitor.set_directory(directory);
        if started && monitor.directory().enabled {
            monitor.start(settings);
        }
    }
}

impl JanitorialEngine {
    /// Create an engine with explicit filesystem collaborators
    ///
    /// Monitors are coordinated for every configured directory but nothing
    /// runs until [`start`](Self::start).
    pub fn new(
        config: &EngineConfig,
        reader: Arc<dyn DirectoryReader>,
        backend: Arc<dyn RemovalBackend>,
    ) -> Result<Self> {
        config.validate()?;
        let feed = ActivityFeed::new(config.event_capacity);
        let cancel = CancellationToken::new();
        let settings = config.monitor_settings();

        let monitors = config
            .tracked_directories()?
            .into_iter()
            .map(|directory| {
                SingleDirectoryMonitor::new(
                    directory,
                    settings,
                    Arc::clone(&reader),
                    Arc::clone(&backend),
                    feed.clone(),
                    cancel.clone(),
                )
            })
            .collect();

        Ok(Self {
            state: Mutex::new(EngineState {
                monitors,
                dry_run: config.dry_run,
                live_strategy: config.removal_strategy.into(),
                settings,
                started: false,
                shut_down: false,
            }),
            feed,
            reader,
            backend,
            cancel,
        })
    }

    /// Create an engine reading and removing on the local filesystem
    pub fn with_filesystem(config: &EngineConfig) -> Result<Self> {
        let reader = FsDirectoryReader::new(config.listing_options());
        let backend = match config.effective_trash_dir() {
            Some(trash_dir) => FsRemovalBackend::new(trash_dir),
            None => FsRemovalBackend::default(),
        };
        Self::new(config, Arc::new(reader), Arc::new(backend))
    }

    /// Subscribe to every activity event
    pub fn subscribe(&self) -> broadcast::Receiver<Activity> {
        self.feed.subscribe()
    }

    /// The activity feed, for filtered subscriptions
    pub fn activity(&self) -> &ActivityFeed {
        &self.feed
    }

    /// Announce readiness and start every enabled monitor
    ///
    /// Does nothing once the engine has been [shut down](Self::shutdown).
    pub async fn start(&self) {
        let mut state = self.state.lock().await;
        if state.shut_down {
            tracing::warn!("Janitorial engine was shut down, not starting");
            return;
        }
        state.started = true;
        let count = state.monitors.len();
        tracing::info!(monitors = count, dry_run = state.dry_run, "Janitorial engine starting");
        self.feed.publish(Activity::Ready { monitors: count });

        let settings = state.settings;
        for monitor in state.monitors.iter_mut().filter(|m| m.directory().enabled) {
            monitor.start(settings);
        }
    }

    /// Stop every monitor; in-flight cycles finish in the background
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        state.started = false;
        for monitor in state.monitors.iter_mut() {
            monitor.stop();
        }
        tracing::info!("Janitorial engine stopped");
    }

    /// Stop every monitor and wait for in-flight cycles
    ///
    /// Each monitor gets a bounded grace period before its loop is aborted.
    /// The engine cannot be started again afterwards.
    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        state.started = false;
        state.shut_down = true;
        for monitor in state.monitors.iter_mut() {
            monitor.shutdown(DRAIN_TIMEOUT).await;
        }
        self.cancel.cancel();
        tracing::info!("Janitorial engine shut down");
    }

    /// Current tracked directories, in insertion order
    pub async fn tracked_directories(&self) -> Vec<TrackedDirectory> {
        let state = self.state.lock().await;
        state.monitors.iter().map(|m| m.directory().clone()).collect()
    }

    /// Reconcile the monitor set against a new list of directories
    ///
    /// New ids are coordinated, missing ids retired, and ids whose policy
    /// changed are restarted with the new policy. Unchanged monitors keep
    /// running undisturbed.
    pub async fn set_tracked_directories(&self, directories: Vec<TrackedDirectory>) {
        let mut state = self.state.lock().await;

        let wanted: HashSet<TrackedDirectoryId> = directories.iter().map(TrackedDirectory::id).collect();
        let mut retired = Vec::new();
        state.monitors.retain_mut(|monitor| {
            if wanted.contains(&monitor.id()) {
                return true;
            }
            monitor.stop();
            retired.push(monitor.id());
            false
        });

        let mut coordinated = 0;
        let mut updated = 0;
        for directory in directories {
            match state.position(directory.id()) {
                Some(index) if state.monitors[index].directory().has_same_policy(&directory) => {}
                Some(index) => {
                    updated += 1;
                    state.replace_policy(index, directory);
                }
                None => {
                    coordinated += 1;
                    self.push_monitor(&mut state, directory);
                }
            }
        }

        tracing::info!(
            retired = retired.len(),
            coordinated,
            updated,
            monitors = state.monitors.len(),
            "Tracked directories reconciled"
        );
        if !retired.is_empty() || coordinated > 0 {
            self.feed.publish(Activity::MonitorsChanged {
                monitors: state.monitors.len(),
            });
        }
    }

    /// Start tracking one more directory
    ///
    /// A directory whose id is already coordinated is updated instead.
    pub async fn coordinate(&self, directory: TrackedDirectory) {
        let mut state = self.state.lock().await;
        match state.position(directory.id()) {
            Some(index) => {
                if !state.monitors[index].directory().has_same_policy(&directory) {
                    state.replace_policy(index, directory);
                }
            }
            None => {
                self.push_monitor(&mut state, directory);
                self.feed.publish(Activity::MonitorsChanged {
                    monitors: state.monitors.len(),
                });
            }
        }
    }

    /// Stop tracking a directory
    pub async fn retire(&self, id: TrackedDirectoryId) -> Result<()> {
        let mut state = self.state.lock().await;
        let index = state.position(id).ok_or(JanitorError::MonitorNotFound(id))?;
        let mut monitor = state.monitors.remove(index);
        monitor.stop();
        tracing::info!(%id, directory = %monitor.directory().path.display(), "Directory retired");
        self.feed.publish(Activity::MonitorsChanged {
            monitors: state.monitors.len(),
        });
        Ok(())
    }

    /// Replace the policy of a coordinated directory, restarting its monitor
    pub async fn update_tracked_directory(&self, directory: TrackedDirectory) -> Result<()> {
        let mut state = self.state.lock().await;
        let id = directory.id();
        let index = state.position(id).ok_or(JanitorError::MonitorNotFound(id))?;
        if !state.monitors[index].directory().has_same_policy(&directory) {
            state.replace_policy(index, directory);
        }
        Ok(())
    }

    /// Switch dry-run mode, restarting every monitor if it changes
    ///
    /// This restarts the whole engine; do not call it from a hot path.
    pub async fn set_dry_run(&self, dry_run: bool) {
        let mut state = self.state.lock().await;
        if state.dry_run == dry_run {
            return;
        }
        tracing::info!(dry_run, "Dry-run mode changed");
        state.dry_run = dry_run;
        state.refresh_strategy();
        state.restart_all();
        self.feed.publish(Activity::DryRunChanged { dry_run });
    }

    /// Whether removals are currently simulated
    pub async fn dry_run(&self) -> bool {
        self.state.lock().await.dry_run
    }

    /// Change which instant file ages are measured from
    ///
    /// Restarts every monitor if the preference changes.
    pub async fn set_which_age_to_regard(&self, which: WhichAgeToRegard) {
        let mut state = self.state.lock().await;
        if state.settings.which_age == which {
            return;
        }
        tracing::info!(which_age = %which, "Age preference changed");
        state.settings.which_age = which;
        state.restart_all();
    }

    /// Change the strategy used outside dry-run mode
    ///
    /// Restarts every monitor if the strategy in effect changes.
    pub async fn set_removal_strategy(&self, strategy: RemovalStrategy) {
        let mut state = self.state.lock().await;
        if strategy == RemovalStrategy::DryRun || state.live_strategy == strategy {
            return;
        }
        state.live_strategy = strategy;
        let previous = state.settings.strategy;
        state.refresh_strategy();
        if state.settings.strategy != previous {
            state.restart_all();
        }
    }

    /// Run one check cycle of a directory now and return its outcome
    ///
    /// The engine lock is released while the cycle runs.
    pub async fn check_now(&self, id: TrackedDirectoryId) -> Result<CheckOutcome> {
        let cycle = {
            let state = self.state.lock().await;
            let index = state.position(id).ok_or(JanitorError::MonitorNotFound(id))?;
            state.monitors[index].check_task()
        };
        Ok(cycle.await)
    }

    /// Counters collected by a directory's monitor
    pub async fn metrics(&self, id: TrackedDirectoryId) -> Result<MonitorMetrics> {
        let state = self.state.lock().await;
        let index = state.position(id).ok_or(JanitorError::MonitorNotFound(id))?;
        Ok(state.monitors[index].metrics().await)
    }

    /// Whether a directory's monitor is running
    pub async fn is_running(&self, id: TrackedDirectoryId) -> bool {
        let state = self.state.lock().await;
        state
            .position(id)
            .is_some_and(|index| state.monitors[index].is_running())
    }

    /// Number of coordinated monitors, running or not
    pub async fn monitor_count(&self) -> usize {
        self.state.lock().await.monitors.len()
    }

    fn push_monitor(&self, state: &mut EngineState, directory: TrackedDirectory) {
        tracing::info!(id = %directory.id(), directory = %directory.path.display(), "Directory coordinated");
        let mut monitor = SingleDirectoryMonitor::new(
            directory,
            state.settings,
            Arc::clone(&self.reader),
            Arc::clone(&self.backend),
            self.feed.clone(),
            self.cancel.clone(),
        );
        if state.started && monitor.directory().enabled {
            monitor.start(state.settings);
        }
        state.monitors.push(monitor);
    }
}

impl Drop for JanitorialEngine {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
