//! Run command implementation.

use crate::cli::{CliFormat, RunArgs};
use crate::config;
use crate::error::Result;
use crate::output::Formatter;
use janitor_domain::TrackedDirectoryId;
use janitor_engine::{Activity, JanitorialEngine};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::RwLock;

/// Time the activity printer gets to flush the last events on exit
const PRINTER_GRACE: Duration = Duration::from_secs(1);

type DirectoryNames = Arc<RwLock<HashMap<TrackedDirectoryId, PathBuf>>>;

/// Execute the run command.
///
/// Runs until Ctrl-C (or SIGTERM). On Unix, SIGHUP reloads the tracked
/// directories, the dry-run flag, the age preference and the removal
/// strategy from the configuration file. Interval bounds, listing options
/// and the trash location only change on restart.
pub async fn execute_run(args: RunArgs, config_path: &Path, formatter: &Formatter) -> Result<()> {
    let dry_run_override = args.dry_run_override();
    let mut config = config::load(config_path)?;
    if let Some(dry_run) = dry_run_override {
        config.dry_run = dry_run;
    }
    if !config.tracked_directories.iter().any(|d| d.enabled) {
        tracing::warn!(path = %config_path.display(), "No enabled tracked directories");
    }

    let engine = JanitorialEngine::with_filesystem(&config)?;
    let names = DirectoryNames::default();
    refresh_names(&engine, &names).await;

    let printer = tokio::spawn(print_activity(engine.subscribe(), formatter.clone(), Arc::clone(&names)));

    engine.start().await;
    tracing::info!(
        config = %config_path.display(),
        dry_run = config.dry_run,
        "Janitor running, press Ctrl-C to stop"
    );

    wait_for_shutdown(&engine, config_path, dry_run_override, &names).await?;

    engine.shutdown().await;
    report_metrics(&engine, formatter).await;

    // The printer ends once the feed closes with the engine.
    drop(engine);
    if tokio::time::timeout(PRINTER_GRACE, printer).await.is_err() {
        tracing::debug!("Activity printer did not finish in time");
    }
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown(
    engine: &JanitorialEngine,
    config_path: &Path,
    dry_run_override: Option<bool>,
    names: &DirectoryNames,
) -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup())?;
    let mut terminate = signal(SignalKind::terminate())?;

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                tracing::info!("Received SIGINT (Ctrl-C), shutting down");
                return Ok(());
            }
            _ = terminate.recv() => {
                tracing::info!("Received SIGTERM, shutting down");
                return Ok(());
            }
            _ = hangup.recv() => {
                tracing::info!(path = %config_path.display(), "Received SIGHUP, reloading configuration");
                if let Err(e) = reload(engine, config_path, dry_run_override, names).await {
                    tracing::error!(error = %e, "Reload failed, keeping the current configuration");
                }
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown(
    _engine: &JanitorialEngine,
    _config_path: &Path,
    _dry_run_override: Option<bool>,
    _names: &DirectoryNames,
) -> Result<()> {
    tokio::signal::ctrl_c().await?;
    tracing::info!("Received Ctrl-C, shutting down");
    Ok(())
}

/// Apply the configuration file to a running engine.
///
/// A dry-run mode forced on the command line survives reloads.
async fn reload(
    engine: &JanitorialEngine,
    config_path: &Path,
    dry_run_override: Option<bool>,
    names: &DirectoryNames,
) -> Result<()> {
    let mut config = config::load(config_path)?;
    if let Some(dry_run) = dry_run_override {
        config.dry_run = dry_run;
    }
    let directories = config.tracked_directories()?;

    engine.set_removal_strategy(config.removal_strategy.into()).await;
    engine.set_which_age_to_regard(config.which_age_to_regard.into()).await;
    engine.set_tracked_directories(directories).await;
    engine.set_dry_run(config.dry_run).await;
    refresh_names(engine, names).await;
    Ok(())
}

async fn refresh_names(engine: &JanitorialEngine, names: &DirectoryNames) {
    let directories = engine.tracked_directories().await;
    let mut names = names.write().await;
    names.clear();
    names.extend(directories.into_iter().map(|d| (d.id(), d.path)));
}

async fn print_activity(mut activity: broadcast::Receiver<Activity>, formatter: Formatter, names: DirectoryNames) {
    loop {
        let event = match activity.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Activity output fell behind");
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        tracing::debug!(event = event.event_type(), id = ?event.directory(), "Activity");
        let known = names.read().await;
        let directory = event.directory().and_then(|id| known.get(&id)).map(PathBuf::as_path);
        match formatter.format_activity(&event, directory) {
            Ok(Some(line)) => println!("{}", line),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Could not format activity"),
        }
    }
}

async fn report_metrics(engine: &JanitorialEngine, formatter: &Formatter) {
    for directory in engine.tracked_directories().await {
        let Ok(metrics) = engine.metrics(directory.id()).await else {
            continue;
        };
        tracing::info!(
            directory = %directory.path.display(),
            cycles = metrics.cycles,
            files_removed = metrics.files_removed,
            bytes_reclaimed = metrics.bytes_reclaimed,
            failures = metrics.total_failures(),
            "Monitor totals"
        );
        if formatter.format() == CliFormat::Table && metrics.cycles > 0 {
            println!("{}", formatter.info(&directory.path.display().to_string()));
            println!("{}", metrics.summary());
        }
    }
}
