//! The orchestrator: one run drives a batch of artifacts through every stage.

use std::sync::Arc;

use reqwest::Client;
use tether_schema::{Artifact, Status};
use tokio::task::JoinHandle;

use crate::config::{PipelineBuilder, PipelineConfig};
use crate::error::{Error, Result};
use crate::io::fetch::Fetcher;
use crate::namespace::{Namespace, NamespaceLoader};
use crate::relocate::{EngineLoader, JarRelocatorLoader, Relocator};
use crate::reporter::Reporter;
use crate::resolver::Resolver;

/// Acquires artifacts into a working directory and registers them into a host namespace.
///
/// ```no_run
/// use std::sync::Arc;
/// use tether_core::{Artifact, Pipeline};
///
/// # async fn demo() -> tether_core::Result<()> {
/// let pipeline = Arc::new(Pipeline::builder("libs").build().expect("client"));
/// let artifacts = vec![
///     Artifact::maven("com.google.code.gson", "gson", "2.10.1")
///         .with_relocation("com.google.gson", "my.app.gson")
///         .expect("valid rule"),
/// ];
/// let loaded = pipeline.spawn(artifacts).await.expect("join")?;
/// assert!(loaded[0].is_relocated());
/// # Ok(())
/// # }
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    reporter: Arc<dyn Reporter>,
    host: Arc<dyn Namespace>,
    fetcher: Fetcher,
    relocator: Relocator,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("relocator", &self.relocator)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Start a [`PipelineBuilder`] for the given working directory.
    pub fn builder(directory: impl AsRef<std::path::Path>) -> PipelineBuilder {
        PipelineBuilder::new(directory)
    }

    pub(crate) fn from_parts(
        config: PipelineConfig,
        reporter: Arc<dyn Reporter>,
        host: Option<Arc<dyn Namespace>>,
        engine_loader: Option<Arc<dyn EngineLoader>>,
        bootstrap: Option<Vec<Artifact>>,
    ) -> std::result::Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()?;

        let resolver = Resolver::new(client.clone(), config.repositories.clone());
        let fetcher = Fetcher::new(client, resolver, &config.directory, Arc::clone(&reporter));

        let loader = engine_loader.unwrap_or_else(|| Arc::new(JarRelocatorLoader));
        let mut relocator = Relocator::new(
            &config.directory,
            config.delete_on_relocate,
            loader,
            Arc::clone(&reporter),
        );
        if let Some(bootstrap) = bootstrap {
            relocator = relocator.with_bootstrap(bootstrap);
        }

        Ok(Self {
            host: host.unwrap_or_else(|| Arc::new(NamespaceLoader::new())),
            config,
            reporter,
            fetcher,
            relocator,
        })
    }

    /// Settings this pipeline was built with.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The namespace final artifacts are registered into.
    pub fn host(&self) -> &Arc<dyn Namespace> {
        &self.host
    }

    /// The fetcher shared by the run and the relocator bootstrap.
    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    /// The relocator, including its bootstrap state.
    pub fn relocator(&self) -> &Relocator {
        &self.relocator
    }

    /// Run the pipeline on a background task.
    pub fn spawn(self: &Arc<Self>, artifacts: Vec<Artifact>) -> JoinHandle<Result<Vec<Artifact>>> {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move { pipeline.run(artifacts).await })
    }

    /// Acquire, relocate and register `artifacts`.
    ///
    /// Returns the artifacts in load order with their final cache file names.
    /// Emits `STARTING` first and exactly one of `FINISHED` or `FAILED` last.
    ///
    /// # Errors
    ///
    /// Returns the first stage failure. Nothing after the failing stage runs.
    pub async fn run(&self, artifacts: Vec<Artifact>) -> Result<Vec<Artifact>> {
        self.reporter.status(Status::Starting);
        match self.execute(artifacts).await {
            Ok(artifacts) => {
                self.reporter.status(Status::Finished);
                Ok(artifacts)
            }
            Err(e) => {
                tracing::error!("{e}");
                self.reporter.status(Status::Failed);
                Err(e)
            }
        }
    }

    async fn execute(&self, mut artifacts: Vec<Artifact>) -> Result<Vec<Artifact>> {
        // Stable: equal priorities keep declaration order.
        artifacts.sort_by_key(Artifact::priority);

        if let Some(unsafe_name) = artifacts.iter().find(|a| !a.has_safe_file_name()) {
            return Err(Error::download(format!(
                "{unsafe_name} does not name a file inside {}",
                self.config.directory.display()
            )));
        }

        let directory = &self.config.directory;
        tokio::fs::create_dir_all(directory).await.map_err(|e| {
            Error::download_with(format!("Cannot create {}", directory.display()), e)
        })?;

        let mut pending = Vec::with_capacity(artifacts.len());
        for artifact in &artifacts {
            pending.push(!self.is_acquired(artifact).await);
        }

        if pending.iter().any(|p| *p) {
            self.reporter.status(Status::Downloading);
            let to_fetch: Vec<&Artifact> = artifacts
                .iter()
                .zip(&pending)
                .filter_map(|(a, p)| p.then_some(a))
                .collect();
            let fetched = self.fetcher.fetch_all(to_fetch).await?;
            tracing::debug!("Fetched {fetched} new artifacts");

            let relocating = artifacts
                .iter()
                .zip(&pending)
                .any(|(a, p)| *p && a.needs_relocation());
            if relocating {
                self.reporter.status(Status::Relocating);
                let to_relocate: Vec<&mut Artifact> = artifacts
                    .iter_mut()
                    .zip(&pending)
                    .filter_map(|(a, p)| p.then_some(a))
                    .collect();
                self.relocator
                    .relocate_all(&self.fetcher, to_relocate)
                    .await?;
            }
        }

        // Already-relocated artifacts were skipped above; point them at their shadows.
        for artifact in &mut artifacts {
            if artifact.needs_relocation() && !artifact.is_relocated() {
                artifact.mark_relocated();
            }
        }

        self.reporter.status(Status::Loading);
        for artifact in &artifacts {
            let path = self.config.path_of(artifact.cache_file_name());
            self.host.register(&path).inspect_err(|e| {
                self.reporter.failed(artifact, &e.to_string());
            })?;
            self.reporter.loaded(artifact, &path);
        }

        Ok(artifacts)
    }

    /// Whether an artifact's final file is already in the working directory.
    ///
    /// An artifact with relocation rules counts only once its shadow exists; a
    /// raw file alone is relocated again without being downloaded.
    async fn is_acquired(&self, artifact: &Artifact) -> bool {
        if artifact.needs_relocation() {
            return self.relocator.is_relocated(artifact).await;
        }
        tokio::fs::try_exists(self.config.path_of(artifact.cache_file_name()))
            .await
            .unwrap_or(false)
    }
}
