//! Relocate stage: rewrite symbol prefixes into a shadow archive.
//!
//! The rewrite engine is itself an external artifact set. On first use the
//! relocator fetches that set through the same [`Fetcher`] the run uses,
//! registers it into a private [`NamespaceLoader`] that the host never sees,
//! and asks an [`EngineLoader`] to construct the engine from it. This happens
//! at most once per [`Relocator`].
//!
//! The default [`JarRelocatorLoader`] only checks that the bootstrap set
//! provides [`ENGINE_ENTRY_POINT`]. The rewrite itself always runs in-process
//! through [`ArchiveRelocator`]; the downloaded engine classes are never
//! executed. Swap in another [`EngineLoader`] to drive a different engine.

pub mod archive;
pub mod classfile;
pub mod mapping;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tether_schema::Artifact;
use tokio::sync::OnceCell;

use crate::error::{Error, Result};
use crate::io::fetch::Fetcher;
use crate::namespace::{Namespace, NamespaceLoader};
use crate::reporter::Reporter;

pub use archive::ArchiveRelocator;

/// Symbol the default [`EngineLoader`] requires from the bootstrap namespace.
pub const ENGINE_ENTRY_POINT: &str = "me.lucko.jarrelocator.JarRelocator";

/// Rewrites one archive under a set of prefix rules.
pub trait RewriteEngine: Send + Sync {
    /// Write a relocated copy of `input` to `output`.
    ///
    /// `rules` maps dotted prefixes to their replacements.
    fn relocate(
        &self,
        input: &Path,
        output: &Path,
        rules: &BTreeMap<String, String>,
    ) -> anyhow::Result<()>;
}

/// Constructs a [`RewriteEngine`] from the bootstrap namespace.
pub trait EngineLoader: Send + Sync {
    /// Build the engine. Called at most once per successful bootstrap.
    fn load(&self, namespace: &NamespaceLoader) -> anyhow::Result<Arc<dyn RewriteEngine>>;
}

/// Default loader: requires [`ENGINE_ENTRY_POINT`] to be present in the
/// bootstrap namespace, then drives [`ArchiveRelocator`].
#[derive(Debug, Clone, Copy, Default)]
pub struct JarRelocatorLoader;

impl EngineLoader for JarRelocatorLoader {
    fn load(&self, namespace: &NamespaceLoader) -> anyhow::Result<Arc<dyn RewriteEngine>> {
        let provider = namespace
            .locate(ENGINE_ENTRY_POINT)
            .with_context(|| format!("{ENGINE_ENTRY_POINT} not found in bootstrap namespace"))?;
        tracing::debug!("Rewrite engine provided by {}", provider.display());
        Ok(Arc::new(ArchiveRelocator))
    }
}

/// The artifacts the rewrite engine is built from, in load order.
pub fn bootstrap_artifacts() -> Vec<Artifact> {
    vec![
        Artifact::maven("org.ow2.asm", "asm", "9.2").with_priority(-3),
        Artifact::maven("org.ow2.asm", "asm-commons", "9.2").with_priority(-2),
        Artifact::maven("me.lucko", "jar-relocator", "1.5").with_priority(-1),
    ]
}

/// Produces shadow archives and tracks which artifacts already have one.
pub struct Relocator {
    directory: PathBuf,
    delete_on_relocate: bool,
    bootstrap: Vec<Artifact>,
    namespace: NamespaceLoader,
    loader: Arc<dyn EngineLoader>,
    engine: OnceCell<Arc<dyn RewriteEngine>>,
    reporter: Arc<dyn Reporter>,
}

impl std::fmt::Debug for Relocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relocator")
            .field("directory", &self.directory)
            .field("delete_on_relocate", &self.delete_on_relocate)
            .field("bootstrapped", &self.engine.initialized())
            .finish_non_exhaustive()
    }
}

impl Relocator {
    pub fn new(
        directory: impl Into<PathBuf>,
        delete_on_relocate: bool,
        loader: Arc<dyn EngineLoader>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            directory: directory.into(),
            delete_on_relocate,
            bootstrap: bootstrap_artifacts(),
            namespace: NamespaceLoader::new(),
            loader,
            engine: OnceCell::new(),
            reporter,
        }
    }

    /// Replace the bootstrap artifact set.
    pub fn with_bootstrap(mut self, artifacts: Vec<Artifact>) -> Self {
        self.bootstrap = artifacts;
        self
    }

    /// The private namespace holding the engine's own artifacts.
    pub fn namespace(&self) -> &NamespaceLoader {
        &self.namespace
    }

    /// Whether the engine has been bootstrapped.
    pub fn is_bootstrapped(&self) -> bool {
        self.engine.initialized()
    }

    pub fn shadow_path(&self, artifact: &Artifact) -> PathBuf {
        self.directory.join(artifact.shadow_file_name())
    }

    /// True if relocation was requested and the shadow file is already on disk.
    pub async fn is_relocated(&self, artifact: &Artifact) -> bool {
        artifact.needs_relocation()
            && tokio::fs::try_exists(self.shadow_path(artifact))
                .await
                .unwrap_or(false)
    }

    /// Relocate every artifact that requested it.
    ///
    /// Artifacts whose shadow file already exists are only marked relocated.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Relocation`] if the engine cannot be bootstrapped or
    /// any rewrite fails. Artifacts before the failing one keep their shadows.
    pub async fn relocate_all<'a, I>(&self, fetcher: &Fetcher, artifacts: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a mut Artifact>,
    {
        let engine = self.engine(fetcher).await?;
        for artifact in artifacts {
            if artifact.needs_relocation() && !artifact.is_relocated() {
                self.relocate(&engine, artifact).await?;
            }
        }
        Ok(())
    }

    async fn engine(&self, fetcher: &Fetcher) -> Result<Arc<dyn RewriteEngine>> {
        self.engine
            .get_or_try_init(|| self.bootstrap_engine(fetcher))
            .await
            .cloned()
    }

    async fn bootstrap_engine(&self, fetcher: &Fetcher) -> Result<Arc<dyn RewriteEngine>> {
        let mut set = self.bootstrap.clone();
        set.sort_by_key(Artifact::priority);

        tracing::info!("Bootstrapping rewrite engine from {} artifacts", set.len());
        fetcher
            .fetch_all(&set)
            .await
            .map_err(|e| Error::relocation_with("Failed to fetch rewrite engine", e))?;

        for artifact in &set {
            let path = self.directory.join(artifact.cache_file_name());
            self.namespace.register(&path).map_err(|e| {
                Error::relocation_with(format!("Failed to register engine artifact {artifact}"), e)
            })?;
        }

        self.loader
            .load(&self.namespace)
            .map_err(|e| Error::relocation_with("Failed to load rewrite engine", e))
    }

    async fn relocate(&self, engine: &Arc<dyn RewriteEngine>, artifact: &mut Artifact) -> Result<()> {
        let shadow = self.shadow_path(artifact);
        if tokio::fs::try_exists(&shadow).await.unwrap_or(false) {
            tracing::debug!("{artifact} already relocated at {}", shadow.display());
            artifact.mark_relocated();
            return Ok(());
        }

        let input = self.directory.join(artifact.cache_file_name());
        self.reporter.relocating(artifact);
        tracing::info!("Relocating {artifact}");

        let rules = artifact.relocation_map();
        let task = {
            let engine = Arc::clone(engine);
            let (input, shadow) = (input.clone(), shadow.clone());
            tokio::task::spawn_blocking(move || engine.relocate(&input, &shadow, &rules))
        };

        let outcome = match task.await {
            Ok(result) => result,
            Err(e) => Err(anyhow::Error::new(e).context("Rewrite task panicked")),
        };
        if let Err(e) = outcome {
            // A failed engine must not leave a shadow that later runs would trust.
            let _ = tokio::fs::remove_file(&shadow).await;
            self.reporter.failed(artifact, &format!("{e:#}"));
            return Err(Error::relocation_with(format!("Failed to relocate {artifact}"), e));
        }

        if self.delete_on_relocate {
            tokio::fs::remove_file(&input).await.map_err(|e| {
                Error::relocation_with(format!("Cannot remove {}", input.display()), e)
            })?;
        }

        artifact.mark_relocated();
        Ok(())
    }
}
