//! Single-directory monitor - the periodic check loop of one directory
//!
//! Each cycle lists the directory, annotates its entries, asks the eviction
//! policy what must go and hands that to batch removal. The outcome of every
//! cycle is published as one [`Activity::CycleCompleted`] event.

use crate::activity::{Activity, ActivityFeed, EngineError};
use crate::fs::{read_snapshot, DirectoryReader};
use crate::metrics::MonitorMetrics;
use crate::removal::{remove_all, BatchRemovalResult, RemovalBackend, RemovalFailure, RemovalStrategy};
use janitor_domain::{DataSize, EvictionDecision, EvictionPolicy, TrackedDirectory, TrackedDirectoryId, WhichAgeToRegard};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Default lower bound of a checking interval
pub const DEFAULT_MIN_CHECK_INTERVAL: Duration = Duration::from_secs(10);

/// Default upper bound of a checking interval
pub const DEFAULT_MAX_CHECK_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// How long to wait for an in-flight cycle of a cancelled loop
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// How a monitor's cycles run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    /// How evicted files are disposed of
    pub strategy: RemovalStrategy,
    /// Which instant file ages are measured from
    pub which_age: WhichAgeToRegard,
    /// Lower bound of the checking interval
    pub min_interval: Duration,
    /// Upper bound of the checking interval
    pub max_interval: Duration,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            strategy: RemovalStrategy::DryRun,
            which_age: WhichAgeToRegard::default(),
            min_interval: DEFAULT_MIN_CHECK_INTERVAL,
            max_interval: DEFAULT_MAX_CHECK_INTERVAL,
        }
    }
}

/// How one check cycle ended
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    /// Nothing needed to go
    AllGood,

    /// Every selected file was removed
    Cleaned {
        /// Removed files
        removed: BTreeSet<PathBuf>,
        /// Space freed
        reclaimed: DataSize,
    },

    /// Some selected files could not be removed
    PartiallyCleaned {
        /// Removed files
        removed: BTreeSet<PathBuf>,
        /// Space freed
        reclaimed: DataSize,
        /// Files left behind
        failures: Vec<RemovalFailure>,
    },

    /// No selected file could be removed
    Failed {
        /// Files left behind
        failures: Vec<RemovalFailure>,
    },
}

impl CheckOutcome {
    /// Combine an eviction decision with the result of removing it
    pub fn from_removal(decision: &EvictionDecision, result: BatchRemovalResult) -> Self {
        let reclaimed_by = |removed: &BTreeSet<PathBuf>| -> DataSize {
            decision
                .files()
                .filter(|f| removed.contains(f.path()))
                .map(|f| f.size())
                .sum()
        };

        match result {
            BatchRemovalResult::AllSucceeded(removed) if removed.is_empty() => CheckOutcome::AllGood,
            BatchRemovalResult::AllSucceeded(removed) => CheckOutcome::Cleaned {
                reclaimed: reclaimed_by(&removed),
                removed,
            },
            BatchRemovalResult::Mixed { removed, failures } => CheckOutcome::PartiallyCleaned {
                reclaimed: reclaimed_by(&removed),
                removed,
                failures,
            },
            BatchRemovalResult::AllFailed(failures) => CheckOutcome::Failed { failures },
        }
    }

    /// Short, stable name of the outcome kind
    pub fn kind(&self) -> &'static str {
        match self {
            CheckOutcome::AllGood => "all_good",
            CheckOutcome::Cleaned { .. } => "cleaned",
            CheckOutcome::PartiallyCleaned { .. } => "partially_cleaned",
            CheckOutcome::Failed { .. } => "failed",
        }
    }

    /// Removed files, if any
    pub fn removed(&self) -> Option<&BTreeSet<PathBuf>> {
        match self {
            CheckOutcome::Cleaned { removed, .. } | CheckOutcome::PartiallyCleaned { removed, .. } => {
                Some(removed)
            }
            CheckOutcome::AllGood | CheckOutcome::Failed { .. } => None,
        }
    }

    /// Files that could not be removed
    pub fn failures(&self) -> &[RemovalFailure] {
        match self {
            CheckOutcome::PartiallyCleaned { failures, .. } | CheckOutcome::Failed { failures } => failures,
            CheckOutcome::AllGood | CheckOutcome::Cleaned { .. } => &[],
        }
    }
}

/// Evaluate a tracked directory's policy against its current contents
///
/// Never removes anything. A directory that cannot be listed evaluates to
/// an empty decision.
pub async fn evaluate_directory<R>(
    reader: &R,
    directory: &TrackedDirectory,
    which: WhichAgeToRegard,
    now: SystemTime,
) -> EvictionDecision
where
    R: DirectoryReader + ?Sized,
{
    let files = read_snapshot(reader, &directory.path, which, now).await;
    EvictionPolicy::for_directory(directory).evaluate(files)
}

/// Everything a check cycle needs, cheap to clone into a task
#[derive(Clone)]
struct CycleContext {
    directory: TrackedDirectory,
    settings: MonitorSettings,
    reader: Arc<dyn DirectoryReader>,
    backend: Arc<dyn RemovalBackend>,
    feed: ActivityFeed,
    metrics: Arc<Mutex<MonitorMetrics>>,
    cycle_lock: Arc<Mutex<()>>,
}

impl CycleContext {
    async fn run_cycle(&self) -> CheckOutcome {
        // One cycle at a time per monitor, timer or on demand
        let _cycle = self.cycle_lock.lock().await;
        let id = self.directory.id();
        let path = &self.directory.path;
        tracing::debug!(%id, directory = %path.display(), "Starting check cycle");

        let decision = evaluate_directory(
            self.reader.as_ref(),
            &self.directory,
            self.settings.which_age,
            SystemTime::now(),
        )
        .await;

        let outcome = if decision.is_empty() {
            CheckOutcome::AllGood
        } else {
            tracing::info!(
                %id,
                directory = %path.display(),
                count = decision.len(),
                age_expired = decision.age_expired().len(),
                size_expired = decision.size_expired().len(),
                strategy = %self.settings.strategy,
                "Evicting files"
            );
            let result = remove_all(decision.paths(), self.settings.strategy, Arc::clone(&self.backend)).await;
            CheckOutcome::from_removal(&decision, result)
        };

        if let Some(removed) = outcome.removed() {
            for path in removed {
                self.feed.publish(Activity::ItemRemoved {
                    id,
                    path: path.clone(),
                });
            }
        }
        for failure in outcome.failures() {
            self.feed.publish(Activity::Error(EngineError::CouldNotRemoveItem {
                id,
                failure: failure.clone(),
            }));
        }

        match &outcome {
            CheckOutcome::AllGood => {
                tracing::debug!(%id, directory = %path.display(), "All files are good")
            }
            CheckOutcome::Cleaned { removed, reclaimed } => tracing::info!(
                %id,
                directory = %path.display(),
                count = removed.len(),
                reclaimed = %reclaimed.humanized(),
                "Directory cleaned"
            ),
            CheckOutcome::PartiallyCleaned { removed, failures, .. } => tracing::warn!(
                %id,
                directory = %path.display(),
                removed = removed.len(),
                failed = failures.len(),
                "Directory partially cleaned"
            ),
            CheckOutcome::Failed { failures } => tracing::error!(
                %id,
                directory = %path.display(),
                failed = failures.len(),
                "Failed to clean directory"
            ),
        }

        self.metrics.lock().await.record_cycle(&outcome);
        self.feed.publish(Activity::CycleCompleted {
            id,
            outcome: outcome.clone(),
        });
        outcome
    }

    async fn run(self, cancel: CancellationToken, period: Duration, previous: Option<JoinHandle<()>>) {
        if let Some(previous) = previous {
            settle_loop(self.directory.id(), previous, DRAIN_TIMEOUT, &self.feed).await;
        }

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                // The first tick completes immediately
                _ = ticker.tick() => {
                    self.run_cycle().await;
                }
            }
        }

        tracing::debug!(id = %self.directory.id(), "Check loop exited");
    }
}

/// Wait for a cancelled loop to exit, aborting it after `timeout`
///
/// A loop that panicked is reported on the feed.
async fn settle_loop(id: TrackedDirectoryId, mut handle: JoinHandle<()>, timeout: Duration, feed: &ActivityFeed) {
    match tokio::time::timeout(timeout, &mut handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) if e.is_panic() => {
            tracing::error!(%id, error = %e, "Check loop panicked");
            feed.publish(Activity::Error(EngineError::Unexpected(format!(
                "check loop of directory {} panicked: {}",
                id, e
            ))));
        }
        Ok(Err(e)) => tracing::debug!(%id, error = %e, "Check loop was aborted"),
        Err(_) => {
            tracing::warn!(%id, "Check cycle did not finish in time, aborting");
            handle.abort();
        }
    }
}

struct RunningLoop {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Periodically enforces the retention policy of one tracked directory
///
/// Stopped when created. [`start`](Self::start) arms the check loop, whose
/// first cycle runs right away; [`stop`](Self::stop) cancels it. A cycle in
/// flight when the monitor stops is allowed to finish: a restarted loop
/// waits for its predecessor before its first tick, and every cycle (timer
/// or [`check_now`](Self::check_now)) holds the monitor's cycle lock, so
/// cycles of one monitor never overlap.
pub struct SingleDirectoryMonitor {
    directory: TrackedDirectory,
    settings: MonitorSettings,
    reader: Arc<dyn DirectoryReader>,
    backend: Arc<dyn RemovalBackend>,
    feed: ActivityFeed,
    metrics: Arc<Mutex<MonitorMetrics>>,
    cycle_lock: Arc<Mutex<()>>,
    parent: CancellationToken,
    running: Option<RunningLoop>,
    draining: Option<JoinHandle<()>>,
}

impl SingleDirectoryMonitor {
    /// Create a stopped monitor
    ///
    /// Cancelling `parent` stops the loop as if [`stop`](Self::stop) had
    /// been called, without publishing an event.
    pub fn new(
        directory: TrackedDirectory,
        settings: MonitorSettings,
        reader: Arc<dyn DirectoryReader>,
        backend: Arc<dyn RemovalBackend>,
        feed: ActivityFeed,
        parent: CancellationToken,
    ) -> Self {
        Self {
            directory,
            settings,
            reader,
            backend,
            feed,
            metrics: Arc::new(Mutex::new(MonitorMetrics::new())),
            cycle_lock: Arc::new(Mutex::new(())),
            parent,
            running: None,
            draining: None,
        }
    }

    /// Id of the monitored directory
    pub fn id(&self) -> TrackedDirectoryId {
        self.directory.id()
    }

    /// The monitored directory
    pub fn directory(&self) -> &TrackedDirectory {
        &self.directory
    }

    /// Settings of the current (or next) run
    pub fn settings(&self) -> MonitorSettings {
        self.settings
    }

    /// Whether the check loop is armed
    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| !running.cancel.is_cancelled())
    }

    /// Interval between cycles under the current policy
    pub fn checking_interval(&self) -> Duration {
        self.directory
            .checking_interval(self.settings.min_interval, self.settings.max_interval)
    }

    /// Replace the monitored policy; takes effect on the next start
    pub fn set_directory(&mut self, directory: TrackedDirectory) {
        self.directory = directory;
    }

    /// Start (or restart) the check loop with new settings
    ///
    /// Returns without waiting for a previous loop; the new loop does that
    /// before its first cycle. `MonitorStarted` is published before any
    /// event of the new loop.
    pub fn start(&mut self, settings: MonitorSettings) {
        self.halt();
        let previous = self.draining.take();

        self.settings = settings;
        let period = self.checking_interval();
        tracing::info!(
            id = %self.id(),
            directory = %self.directory.path.display(),
            interval_secs = period.as_secs(),
            strategy = %settings.strategy,
            "Monitor started"
        );
        self.feed.publish(Activity::MonitorStarted { id: self.id() });

        let cancel = self.parent.child_token();
        let context = self.context();
        let handle = tokio::spawn(context.run(cancel.clone(), period, previous));
        self.running = Some(RunningLoop { cancel, handle });
    }

    /// Stop the check loop; no-op if already stopped
    ///
    /// Returns whether the monitor was running.
    pub fn stop(&mut self) -> bool {
        if !self.halt() {
            return false;
        }
        tracing::info!(id = %self.id(), directory = %self.directory.path.display(), "Monitor stopped");
        self.feed.publish(Activity::MonitorStopped { id: self.id() });
        true
    }

    /// Stop the loop and wait for an in-flight cycle to finish
    pub async fn shutdown(&mut self, timeout: Duration) -> bool {
        let was_running = self.stop();
        self.drain(timeout).await;
        was_running
    }

    /// Run one cycle right now, outside the timer
    pub async fn check_now(&self) -> CheckOutcome {
        self.check_task().await
    }

    /// A detached cycle, for callers that must not hold a borrow of the
    /// monitor while it runs
    pub fn check_task(&self) -> impl std::future::Future<Output = CheckOutcome> + Send + 'static {
        let context = self.context();
        async move { context.run_cycle().await }
    }

    /// Snapshot of the counters collected so far
    pub async fn metrics(&self) -> MonitorMetrics {
        self.metrics.lock().await.clone()
    }

    fn context(&self) -> CycleContext {
        CycleContext {
            directory: self.directory.clone(),
            settings: self.settings,
            reader: Arc::clone(&self.reader),
            backend: Arc::clone(&self.backend),
            feed: self.feed.clone(),
            metrics: Arc::clone(&self.metrics),
            cycle_lock: Arc::clone(&self.cycle_lock),
        }
    }

    /// Cancel the loop, keeping its handle until it has drained
    fn halt(&mut self) -> bool {
        match self.running.take() {
            Some(running) => {
                let was_running = !running.cancel.is_cancelled();
                running.cancel.cancel();
                self.draining = Some(running.handle);
                was_running
            }
            None => false,
        }
    }

    async fn drain(&mut self, timeout: Duration) {
        if let Some(handle) = self.draining.take() {
            settle_loop(self.id(), handle, timeout, &self.feed).await;
        }
    }
}

impl Drop for SingleDirectoryMonitor {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.cancel.cancel();
        }
    }
}
