//! Locate command

use std::path::Path;

use anyhow::Result;
use tether_core::Namespace;

use crate::ui::Output;

/// Sync `manifest`, then print the archive providing `symbol`.
///
/// Returns `false` if no registered archive provides it.
pub async fn locate(symbol: &str, manifest: &Path, quiet: bool) -> Result<bool> {
    let acquired = super::acquire_manifest(manifest, quiet).await?;

    match acquired.host.locate(symbol) {
        Some(path) => {
            println!("{}", path.display());
            Ok(true)
        }
        None => {
            Output::new().error(&format!("{symbol} is not provided by any registered archive"));
            Ok(false)
        }
    }
}
