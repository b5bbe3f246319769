//! Explore command - summarizes the local datasets before import.

use std::path::Path;

use anyhow::{Context, Result};
use dataset_explorer::summarize;

/// Runs the explore command.
///
/// # Errors
///
/// Returns an error if a dataset file is missing or invalid.
pub fn run(data_dir: &Path) -> Result<()> {
    println!("Exploring datasets in: {}", data_dir.display());

    let summary = summarize(data_dir)
        .with_context(|| format!("Failed to summarize {}", data_dir.display()))?;

    for table in summary.tables() {
        println!("{table}");
        println!();
    }

    Ok(())
}
