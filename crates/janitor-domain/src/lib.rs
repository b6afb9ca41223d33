//! Janitor Domain Layer
//!
//! This crate contains the retention rules and value types of the janitor.
//! It performs no I/O and its only external dependency is `uuid`. Everything
//! that touches the filesystem or the clock lives in `janitor-engine`.
//!
//! ## Key Concepts
//!
//! - **Measurement**: a magnitude tagged with a linear unit ([`Age`], [`DataSize`])
//! - **Tracked Directory**: a directory under a retention policy, identified by id
//! - **Annotated File**: a file's path, size and age at listing time
//! - **Eviction**: the pure decision of which files must go
//!
//! ## Eviction in one paragraph
//!
//! Files older than the directory's oldest allowed age are evicted. If what
//! remains still exceeds the largest allowed total size, the oldest
//! remaining files follow, one at a time, until it does not.
//! See [`select_files_for_eviction`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod age;
pub mod annotated_file;
pub mod data_size;
pub mod eviction;
pub mod measurement;
pub mod tracked_directory;

// Re-exports for convenience
pub use age::{Age, DurationUnit};
pub use annotated_file::{AnnotatedFile, ReferenceTimes};
pub use data_size::{DataSize, DataUnit};
pub use eviction::{select_files_for_eviction, EvictionDecision, EvictionPolicy};
pub use measurement::{Measurement, MeasurementUnit, ParseMeasurementError};
pub use tracked_directory::{TrackedDirectory, TrackedDirectoryId, WhichAgeToRegard};
