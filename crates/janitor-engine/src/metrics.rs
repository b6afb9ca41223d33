//! Metrics collection for directory monitors

use crate::removal::RemovalErrorKind;
use crate::CheckOutcome;
use janitor_domain::DataSize;
use serde::Serialize;

/// Counters collected by one monitor across its check cycles
#[derive(Debug, Clone, Default, Serialize)]
pub struct MonitorMetrics {
    /// Check cycles completed
    pub cycles: usize,

    /// Cycles that found nothing to evict
    pub idle_cycles: usize,

    /// Files removed (or that would have been, in a dry run)
    pub files_removed: usize,

    /// Bytes reclaimed by removed files
    pub bytes_reclaimed: u64,

    /// Removals refused for lack of permission
    pub permission_denied: usize,

    /// Removals that failed for any other reason
    pub other_failures: usize,

    /// Kind of the most recent outcome, if any cycle completed
    pub last_outcome: Option<&'static str>,
}

impl MonitorMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one check cycle
    pub fn record_cycle(&mut self, outcome: &CheckOutcome) {
        self.cycles += 1;
        self.last_outcome = Some(outcome.kind());

        match outcome {
            CheckOutcome::AllGood => self.idle_cycles += 1,
            CheckOutcome::Cleaned { removed, reclaimed }
            | CheckOutcome::PartiallyCleaned {
                removed, reclaimed, ..
            } => {
                self.files_removed += removed.len();
                self.bytes_reclaimed += reclaimed_bytes(*reclaimed);
            }
            CheckOutcome::Failed { .. } => {}
        }

        for failure in outcome.failures() {
            match failure.error.kind() {
                RemovalErrorKind::PermissionDenied => self.permission_denied += 1,
                RemovalErrorKind::Other => self.other_failures += 1,
            }
        }
    }

    /// Total removal failures of any kind
    pub fn total_failures(&self) -> usize {
        self.permission_denied + self.other_failures
    }

    /// Reset all metrics
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Monitor Metrics Summary".to_string(),
            "=======================".to_string(),
            format!("Check cycles: {} ({} with nothing to do)", self.cycles, self.idle_cycles),
            format!("Files removed: {}", self.files_removed),
            format!(
                "Space reclaimed: {}",
                DataSize::from_bytes(self.bytes_reclaimed).humanized()
            ),
        ];

        if self.total_failures() > 0 {
            lines.push(format!("Failures: {}", self.total_failures()));
            lines.push(format!("  Permission denied: {}", self.permission_denied));
            lines.push(format!("  Other: {}", self.other_failures));
        }

        if let Some(last) = self.last_outcome {
            lines.push(format!("Last outcome: {}", last));
        }

        lines.join("\n")
    }
}

fn reclaimed_bytes(size: DataSize) -> u64 {
    let bytes = size.as_bytes();
    if bytes.is_finite() && bytes > 0.0 {
        bytes.round() as u64
    } else {
        0
    }
}
