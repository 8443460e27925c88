//! Fetch command

use std::path::PathBuf;

use anyhow::Result;
use tether_core::{Artifact, PipelineConfig};
use tether_schema::Relocation;

use crate::ui::Output;

/// Options for `tether fetch` beyond the specs themselves.
#[derive(Debug, Default)]
pub struct FetchOptions {
    pub dir: Option<PathBuf>,
    pub repos: Vec<String>,
    pub timeout_ms: Option<u64>,
    pub keep_raw: bool,
    pub relocate: Vec<Relocation>,
    pub quiet: bool,
}

/// Acquire `specs` and print the classpath to stdout.
pub async fn fetch(specs: Vec<Artifact>, options: FetchOptions) -> Result<()> {
    let mut config = PipelineConfig::new(crate::working_dir(options.dir));
    for repo in &options.repos {
        config.add_repository(repo);
    }
    if let Some(ms) = options.timeout_ms {
        config.timeout = std::time::Duration::from_millis(ms);
    }
    config.delete_on_relocate = !options.keep_raw;

    let artifacts: Vec<Artifact> = specs
        .into_iter()
        .map(|spec| {
            options
                .relocate
                .iter()
                .cloned()
                .fold(spec, Artifact::with_rule)
        })
        .collect();

    let count = artifacts.len();
    let acquired = super::acquire(config, artifacts, options.quiet).await?;

    Output::quiet(options.quiet).success(&format!("{count} artifacts ready"));
    println!("{}", acquired.classpath()?);
    Ok(())
}
