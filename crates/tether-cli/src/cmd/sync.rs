//! Sync command

use std::path::Path;

use anyhow::Result;

use crate::ui::Output;

/// Acquire every artifact a manifest declares and print the classpath.
pub async fn sync(manifest: &Path, quiet: bool) -> Result<()> {
    let acquired = super::acquire_manifest(manifest, quiet).await?;

    Output::quiet(quiet).success(&format!(
        "{} artifacts ready from {}",
        acquired.artifacts.len(),
        manifest.display()
    ));
    println!("{}", acquired.classpath()?);
    Ok(())
}
