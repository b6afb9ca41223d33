//! Output formatting for the CLI.

use crate::cli::CliFormat;
use crate::error::Result;
use colored::*;
use janitor_domain::{Age, AnnotatedFile, DurationUnit, EvictionDecision, TrackedDirectory, TrackedDirectoryId};
use janitor_engine::{Activity, CheckOutcome};
use serde_json::json;
use std::path::Path;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// What one enabled directory would lose right now.
#[derive(Debug, Clone)]
pub struct DirectoryPreview {
    /// The directory and its policy
    pub directory: TrackedDirectory,
    /// The files its policy selects
    pub decision: EvictionDecision,
}

/// Output formatter.
#[derive(Debug, Clone)]
pub struct Formatter {
    format: CliFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: CliFormat, color_enabled: bool) -> Self {
        Self { format, color_enabled }
    }

    /// The output format in use.
    pub fn format(&self) -> CliFormat {
        self.format
    }

    /// Format eviction previews.
    pub fn format_previews(&self, previews: &[DirectoryPreview]) -> Result<String> {
        match self.format {
            CliFormat::Json => self.format_previews_json(previews),
            CliFormat::Table => Ok(self.format_previews_table(previews)),
            CliFormat::Quiet => Ok(Self::format_previews_quiet(previews)),
        }
    }

    fn format_previews_json(&self, previews: &[DirectoryPreview]) -> Result<String> {
        let json_previews: Vec<serde_json::Value> = previews
            .iter()
            .map(|p| {
                let files: Vec<serde_json::Value> = p
                    .decision
                    .age_expired()
                    .iter()
                    .map(|f| file_json(f, "age"))
                    .chain(p.decision.size_expired().iter().map(|f| file_json(f, "size")))
                    .collect();

                json!({
                    "id": p.directory.id().to_string(),
                    "path": p.directory.path.display().to_string(),
                    "oldest_allowed_age": p.directory.oldest_allowed_age.to_string(),
                    "largest_allowed_total_size": p.directory.largest_allowed_total_size.to_string(),
                    "total_bytes": p.decision.total_size().as_bytes(),
                    "reclaimed_bytes": p.decision.reclaimed_size().as_bytes(),
                    "remaining_bytes": p.decision.remaining_size().as_bytes(),
                    "remains_over_limit": p.decision.remains_over_limit(),
                    "files": files,
                })
            })
            .collect();

        Ok(serde_json::to_string_pretty(&json_previews)?)
    }

    fn format_previews_table(&self, previews: &[DirectoryPreview]) -> String {
        if previews.is_empty() {
            return self.colorize("No enabled directories.", "yellow");
        }

        let mut lines = Vec::new();
        if previews.iter().all(|p| p.decision.is_empty()) {
            lines.push(self.success("Nothing to clean up."));
        } else {
            let mut builder = Builder::default();
            builder.push_record(["Directory", "File", "Reason", "Age", "Size"]);

            for preview in previews {
                let directory = preview.directory.path.display().to_string();
                let reasons = preview
                    .decision
                    .age_expired()
                    .iter()
                    .map(|f| (f, "too old"))
                    .chain(preview.decision.size_expired().iter().map(|f| (f, "over size")));
                for (file, reason) in reasons {
                    let name = file
                        .path()
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| file.path().display().to_string());
                    builder.push_record([
                        directory.clone(),
                        name,
                        reason.to_string(),
                        humanize_age(file.age()),
                        file.size().humanized(),
                    ]);
                }
            }

            let mut table = builder.build();
            table
                .with(Style::rounded())
                .with(Modify::new(Rows::first()).with(Alignment::center()));
            lines.push(table.to_string());
        }

        for preview in previews {
            let summary = format!(
                "{}: {} file(s) selected, reclaims {}, {} left",
                preview.directory.path.display(),
                preview.decision.len(),
                preview.decision.reclaimed_size().humanized(),
                preview.decision.remaining_size().humanized(),
            );
            if preview.decision.remains_over_limit() {
                lines.push(self.warning(&format!("{} (still over limit)", summary)));
            } else {
                lines.push(self.info(&summary));
            }
        }

        lines.join("\n")
    }

    fn format_previews_quiet(previews: &[DirectoryPreview]) -> String {
        previews
            .iter()
            .flat_map(|p| p.decision.files())
            .map(|f| f.path().display().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Format one activity event.
    ///
    /// `directory` is the event's tracked directory path, when known.
    /// Returns `None` for events this format does not show.
    pub fn format_activity(&self, activity: &Activity, directory: Option<&Path>) -> Result<Option<String>> {
        match self.format {
            CliFormat::Json => Ok(Some(serde_json::to_string(&activity_json(activity, directory))?)),
            CliFormat::Quiet => Ok(match activity {
                Activity::ItemRemoved { path, .. } => Some(path.display().to_string()),
                _ => None,
            }),
            CliFormat::Table => Ok(self.format_activity_text(activity, directory)),
        }
    }

    fn format_activity_text(&self, activity: &Activity, directory: Option<&Path>) -> Option<String> {
        let label = |id: &TrackedDirectoryId| match directory {
            Some(path) => path.display().to_string(),
            None => id.to_string(),
        };

        let line = match activity {
            Activity::Ready { monitors } => self.info(&format!("Engine ready with {} monitor(s)", monitors)),
            Activity::MonitorStarted { id } => self.info(&format!("Watching {}", label(id))),
            Activity::MonitorStopped { id } => self.info(&format!("Stopped watching {}", label(id))),
            Activity::MonitorsChanged { monitors } => {
                self.info(&format!("{} monitor(s) coordinated", monitors))
            }
            Activity::CycleCompleted { id, outcome } => match outcome {
                CheckOutcome::AllGood => return None,
                CheckOutcome::Cleaned { removed, reclaimed } => self.success(&format!(
                    "Cleaned {}: {} file(s), {} reclaimed",
                    label(id),
                    removed.len(),
                    reclaimed.humanized()
                )),
                CheckOutcome::PartiallyCleaned {
                    removed,
                    reclaimed,
                    failures,
                } => self.warning(&format!(
                    "Partially cleaned {}: {} file(s), {} reclaimed, {} failed",
                    label(id),
                    removed.len(),
                    reclaimed.humanized(),
                    failures.len()
                )),
                CheckOutcome::Failed { failures } => self.error(&format!(
                    "Could not clean {}: {} file(s) failed",
                    label(id),
                    failures.len()
                )),
            },
            Activity::ItemRemoved { path, .. } => self.colorize(&format!("  - {}", path.display()), "cyan"),
            Activity::DryRunChanged { dry_run: true } => self.warning("Dry run on: nothing will be removed"),
            Activity::DryRunChanged { dry_run: false } => self.warning("Dry run off: files will be removed"),
            Activity::Error(e) => self.error(&e.to_string()),
        };
        Some(line)
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            "cyan" => text.cyan().to_string(),
            _ => text.to_string(),
        }
    }
}

/// Render an age in the largest common unit it fills, to one decimal.
pub fn humanize_age(age: Age) -> String {
    if age.is_infinite() {
        return "unlimited".to_string();
    }
    let unit = DurationUnit::COMMON_FILE_AGE_UNITS
        .into_iter()
        .find(|unit| age.converted(*unit).value >= 1.0)
        .unwrap_or(DurationUnit::Second);
    let converted = age.converted(unit);
    Age::new((converted.value * 10.0).round() / 10.0, unit).to_string()
}

fn file_json(file: &AnnotatedFile, reason: &str) -> serde_json::Value {
    json!({
        "path": file.path().display().to_string(),
        "reason": reason,
        "age_seconds": file.age().base_value(),
        "size_bytes": file.size().as_bytes(),
    })
}

fn activity_json(activity: &Activity, directory: Option<&Path>) -> serde_json::Value {
    let mut value = json!({ "event": activity.event_type() });
    if let Some(id) = activity.directory() {
        value["id"] = json!(id.to_string());
    }
    if let Some(path) = directory {
        value["directory"] = json!(path.display().to_string());
    }

    match activity {
        Activity::Ready { monitors } | Activity::MonitorsChanged { monitors } => {
            value["monitors"] = json!(monitors);
        }
        Activity::CycleCompleted { outcome, .. } => {
            value["outcome"] = json!(outcome.kind());
            if let Some(removed) = outcome.removed() {
                value["removed"] = json!(removed.len());
            }
            if !outcome.failures().is_empty() {
                value["failures"] = json!(outcome
                    .failures()
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>());
            }
        }
        Activity::ItemRemoved { path, .. } => {
            value["path"] = json!(path.display().to_string());
        }
        Activity::DryRunChanged { dry_run } => {
            value["dry_run"] = json!(dry_run);
        }
        Activity::Error(e) => {
            value["message"] = json!(e.to_string());
        }
        Activity::MonitorStarted { .. } | Activity::MonitorStopped { .. } => {}
    }
    value
}
