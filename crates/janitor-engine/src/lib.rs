//! Janitor Engine
//!
//! Background retention service that keeps tracked directories from growing
//! without bound.
//!
//! # Overview
//!
//! The engine is responsible for:
//! - **Monitoring**: one periodic check loop per tracked directory
//! - **Eviction**: removing files that are too old, then the oldest files
//!   until the directory fits its size limit
//! - **Batch removal**: removing selected files concurrently and reporting
//!   partial failures precisely
//! - **Coordination**: reconciling monitors against a changing set of
//!   directories and switching dry-run mode engine-wide
//! - **Activity**: a broadcast feed of everything that happens
//!
//! # Architecture
//!
//! ```text
//! JanitorialEngine ── owns ──> SingleDirectoryMonitor (one per directory)
//!        │                            │ every interval
//!        │                            ├─ DirectoryReader: list + annotate
//!        │                            ├─ EvictionPolicy: what must go
//!        │                            └─ remove_all + RemovalBackend
//!        └── ActivityFeed <── CycleCompleted / ItemRemoved / Error
//! ```
//!
//! A monitor's checking interval equals its directory's oldest allowed age,
//! clamped between a minimum and maximum (10 seconds and 5 minutes by
//! default), so tight age limits poll more often.
//!
//! # Usage
//!
//! ## Running the engine
//!
//! ```no_run
//! use janitor_engine::{Activity, EngineConfig, JanitorialEngine};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig::from_file(EngineConfig::default_path()?)?;
//!     let engine = JanitorialEngine::with_filesystem(&config)?;
//!     let mut activity = engine.subscribe();
//!
//!     engine.start().await;
//!     while let Ok(event) = activity.recv().await {
//!         if let Activity::ItemRemoved { path, .. } = event {
//!             println!("removed {}", path.display());
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Previewing a directory
//!
//! ```no_run
//! use janitor_domain::{Age, DataSize, TrackedDirectory, WhichAgeToRegard};
//! use janitor_engine::{evaluate_directory, FsDirectoryReader};
//! use std::time::SystemTime;
//!
//! # async fn preview() {
//! let downloads = TrackedDirectory::new("/home/me/Downloads", Age::days(30.0), DataSize::gibibytes(1.0));
//! let decision = evaluate_directory(
//!     &FsDirectoryReader::default(),
//!     &downloads,
//!     WhichAgeToRegard::LastModificationDate,
//!     SystemTime::now(),
//! )
//! .await;
//!
//! for file in decision.files() {
//!     println!("{} ({})", file.path().display(), file.age());
//! }
//! # }
//! ```
//!
//! # Configuration
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
//!
//! Dry run is on by default: nothing is removed until it is switched off.

#![warn(missing_docs)]

mod activity;
mod config;
mod engine;
mod error;
mod fs;
mod metrics;
mod monitor;
mod removal;

pub use activity::{Activity, ActivityFeed, EngineError, FilteredActivity, DEFAULT_ACTIVITY_CAPACITY};
pub use config::{EngineConfig, RemovalStrategyConfig, TrackedDirectoryConfig, WhichAgeToRegardConfig};
pub use engine::JanitorialEngine;
pub use error::{JanitorError, Result};
pub use fs::{read_snapshot, DirectoryReader, FsDirectoryReader, ListingOptions};
pub use metrics::MonitorMetrics;
pub use monitor::{
    evaluate_directory, CheckOutcome, MonitorSettings, SingleDirectoryMonitor, DEFAULT_MAX_CHECK_INTERVAL,
    DEFAULT_MIN_CHECK_INTERVAL, DRAIN_TIMEOUT,
};
pub use removal::{
    default_trash_dir, remove_all, BatchRemovalResult, FsRemovalBackend, RemovalBackend, RemovalError,
    RemovalErrorKind, RemovalFailure, RemovalStrategy,
};
