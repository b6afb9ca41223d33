//! Broadcast feed of engine activity

use crate::removal::RemovalFailure;
use crate::CheckOutcome;
use janitor_domain::TrackedDirectoryId;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::broadcast;

/// Default number of events buffered per subscriber
pub const DEFAULT_ACTIVITY_CAPACITY: usize = 1024;

/// Something the engine or one of its monitors did
#[derive(Debug, Clone)]
pub enum Activity {
    /// The engine started with this many coordinated monitors
    Ready {
        /// Coordinated monitors, running or not
        monitors: usize,
    },

    /// A monitor started checking its directory
    MonitorStarted {
        /// The tracked directory
        id: TrackedDirectoryId,
    },

    /// A monitor stopped checking its directory
    MonitorStopped {
        /// The tracked directory
        id: TrackedDirectoryId,
    },

    /// Monitors were coordinated or retired
    MonitorsChanged {
        /// Coordinated monitors after the change
        monitors: usize,
    },

    /// A check cycle finished
    CycleCompleted {
        /// The tracked directory
        id: TrackedDirectoryId,
        /// How the cycle ended
        outcome: CheckOutcome,
    },

    /// A file was removed (or would have been, in a dry run)
    ItemRemoved {
        /// The tracked directory
        id: TrackedDirectoryId,
        /// The removed file
        path: PathBuf,
    },

    /// The engine switched in or out of dry-run mode
    DryRunChanged {
        /// The new mode
        dry_run: bool,
    },

    /// Something went wrong
    Error(EngineError),
}

impl Activity {
    /// Short, stable name of the event kind
    pub fn event_type(&self) -> &'static str {
        match self {
            Activity::Ready { .. } => "ready",
            Activity::MonitorStarted { .. } => "monitor_started",
            Activity::MonitorStopped { .. } => "monitor_stopped",
            Activity::MonitorsChanged { .. } => "monitors_changed",
            Activity::CycleCompleted { .. } => "cycle_completed",
            Activity::ItemRemoved { .. } => "item_removed",
            Activity::DryRunChanged { .. } => "dry_run_changed",
            Activity::Error(_) => "error",
        }
    }

    /// The tracked directory this event concerns, if any
    pub fn directory(&self) -> Option<TrackedDirectoryId> {
        match self {
            Activity::MonitorStarted { id }
            | Activity::MonitorStopped { id }
            | Activity::CycleCompleted { id, .. }
            | Activity::ItemRemoved { id, .. } => Some(*id),
            Activity::Error(EngineError::CouldNotRemoveItem { id, .. }) => Some(*id),
            _ => None,
        }
    }
}

/// Errors reported through the activity feed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A file selected for eviction could not be removed
    #[error("could not remove {failure} (directory {id})")]
    CouldNotRemoveItem {
        /// The tracked directory
        id: TrackedDirectoryId,
        /// The file and the cause
        failure: RemovalFailure,
    },

    /// Anything else
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

/// Multi-subscriber activity stream
///
/// Publishing never blocks and succeeds without subscribers. Subscribers
/// that fall behind by more than the capacity skip the oldest events.
#[derive(Debug, Clone)]
pub struct ActivityFeed {
    sender: broadcast::Sender<Activity>,
}

/// Receiver that yields only the events matching a predicate
pub struct FilteredActivity<F> {
    receiver: broadcast::Receiver<Activity>,
    predicate: F,
}

impl ActivityFeed {
    /// Create a feed buffering `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event to all subscribers (best effort)
    pub fn publish(&self, activity: Activity) {
        tracing::trace!(event = activity.event_type(), "Publishing activity");
        // No subscribers is fine
        let _ = self.sender.send(activity);
    }

    /// Subscribe to every event
    pub fn subscribe(&self) -> broadcast::Receiver<Activity> {
        self.sender.subscribe()
    }

    /// Subscribe to events matching `predicate`
    pub fn subscribe_filtered<F>(&self, predicate: F) -> FilteredActivity<F>
    where
        F: Fn(&Activity) -> bool,
    {
        FilteredActivity {
            receiver: self.sender.subscribe(),
            predicate,
        }
    }

    /// Subscribe to dry-run mode changes only
    pub fn only_dry_run_changes(&self) -> FilteredActivity<impl Fn(&Activity) -> bool> {
        self.subscribe_filtered(|activity| matches!(activity, Activity::DryRunChanged { .. }))
    }

    /// Current number of subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ActivityFeed {
    fn default() -> Self {
        Self::new(DEFAULT_ACTIVITY_CAPACITY)
    }
}

impl<F> FilteredActivity<F>
where
    F: Fn(&Activity) -> bool,
{
    /// Receive the next matching event
    ///
    /// Returns an error only once the feed is closed.
    pub async fn recv(&mut self) -> Result<Activity, broadcast::error::RecvError> {
        loop {
            match self.receiver.recv().await {
                Ok(activity) => {
                    if (self.predicate)(&activity) {
                        return Ok(activity);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Activity subscriber lagged, events dropped");
                }
                Err(err) => return Err(err),
            }
        }
    }
}
