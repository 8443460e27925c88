//! Clean command

use std::path::PathBuf;

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::ui::Output;

/// Remove every file in the working directory, including leftover partial downloads.
pub fn clean(dir: Option<PathBuf>, dry_run: bool) -> Result<()> {
    let dir = crate::working_dir(dir);
    let output = Output::new();

    if !dir.exists() {
        output.success("Nothing to clean.");
        return Ok(());
    }

    let mut removed = 0;
    for entry in WalkDir::new(&dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        if dry_run {
            output.info(&format!("Would remove {}", path.display()));
        } else {
            std::fs::remove_file(path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
            tracing::debug!("Removed {}", path.display());
        }
        removed += 1;
    }

    if dry_run {
        output.success(&format!("{removed} files would be removed."));
    } else {
        output.success(&format!("Removed {removed} files."));
    }
    Ok(())
}
