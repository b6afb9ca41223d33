//! Check command implementation.

use crate::error::Result;
use crate::output::{DirectoryPreview, Formatter};
use janitor_engine::{evaluate_directory, EngineConfig, FsDirectoryReader};
use std::time::SystemTime;

/// Execute the check command.
///
/// Evaluates every enabled directory's policy against its current contents
/// and prints what would be removed. Nothing is removed.
pub async fn execute_check(config: &EngineConfig, formatter: &Formatter) -> Result<()> {
    let previews = preview(config).await?;
    println!("{}", formatter.format_previews(&previews)?);
    Ok(())
}

/// Eviction decisions for every enabled directory, in configuration order.
pub async fn preview(config: &EngineConfig) -> Result<Vec<DirectoryPreview>> {
    let reader = FsDirectoryReader::new(config.listing_options());
    let which = config.which_age_to_regard.into();
    let now = SystemTime::now();

    let mut previews = Vec::new();
    for directory in config.tracked_directories()?.into_iter().filter(|d| d.enabled) {
        if !directory.path.is_dir() {
            tracing::warn!(directory = %directory.path.display(), "Tracked directory does not exist");
        }
        let decision = evaluate_directory(&reader, &directory, which, now).await;
        tracing::debug!(
            directory = %directory.path.display(),
            count = decision.len(),
            "Evaluated directory"
        );
        previews.push(DirectoryPreview { directory, decision });
    }
    Ok(previews)
}
