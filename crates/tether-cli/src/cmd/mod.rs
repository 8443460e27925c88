//! Command implementations

pub mod clean;
pub mod fetch;
pub mod list;
pub mod locate;
pub mod sync;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tether_core::manifest::Manifest;
use tether_core::{Artifact, NamespaceLoader, Pipeline, PipelineBuilder, PipelineConfig};

use crate::ui::ConsoleReporter;

/// Outcome of one pipeline run driven from the command line.
#[derive(Debug)]
pub struct Acquired {
    pub artifacts: Vec<Artifact>,
    pub host: Arc<NamespaceLoader>,
}

impl Acquired {
    /// Registered archives joined with the platform path separator.
    pub fn classpath(&self) -> Result<String> {
        let joined = self
            .host
            .classpath()
            .context("Archive path contains the path separator")?;
        Ok(joined.to_string_lossy().into_owned())
    }
}

/// Run the pipeline for `artifacts` under `config`.
pub async fn acquire(
    config: PipelineConfig,
    artifacts: Vec<Artifact>,
    quiet: bool,
) -> Result<Acquired> {
    let host = Arc::new(NamespaceLoader::new());
    let pipeline: Pipeline = PipelineBuilder::from_config(config)
        .reporter(Arc::new(ConsoleReporter::new(quiet)))
        .host(host.clone())
        .build()
        .context("Failed to build HTTP client")?;

    let artifacts = pipeline.run(artifacts).await?;
    Ok(Acquired { artifacts, host })
}

/// Load a manifest and run the pipeline for its artifacts.
pub async fn acquire_manifest(path: &Path, quiet: bool) -> Result<Acquired> {
    let manifest = Manifest::load(path).await?;
    let base_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let artifacts = manifest.to_artifacts()?;
    acquire(manifest.config(base_dir), artifacts, quiet).await
}
