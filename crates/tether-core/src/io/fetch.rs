//! Fetch stage: place each artifact's bytes at its cache path.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::Client;
use tether_schema::{Artifact, Source};

use crate::error::{Error, Result};
use crate::io::download::DownloadRequest;
use crate::reporter::Reporter;
use crate::resolver::Resolver;

/// Downloads artifacts into the working directory, skipping files already present.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    resolver: Resolver,
    directory: PathBuf,
    reporter: Arc<dyn Reporter>,
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("directory", &self.directory)
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

impl Fetcher {
    /// Create a fetcher writing into `directory`.
    pub fn new(
        client: Client,
        resolver: Resolver,
        directory: impl Into<PathBuf>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            client,
            resolver,
            directory: directory.into(),
            reporter,
        }
    }

    /// The working directory cache files are placed in.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Fetch artifacts in the given order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Resolve`] or [`Error::Download`] from the first artifact that fails.
    pub async fn fetch_all<'a, I>(&self, artifacts: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'a Artifact>,
    {
        let mut fetched = 0;
        for artifact in artifacts {
            if self.fetch(artifact).await? {
                fetched += 1;
            }
        }
        Ok(fetched)
    }

    /// Fetch one artifact. Returns `false` if its cache file already existed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Resolve`] if a coordinate cannot be resolved, or
    /// [`Error::Download`] if the transfer fails or the cache file name would
    /// leave the working directory.
    pub async fn fetch(&self, artifact: &Artifact) -> Result<bool> {
        if !artifact.has_safe_file_name() {
            return Err(Error::download(format!(
                "{artifact} does not name a file inside {}",
                self.directory.display()
            )));
        }
        let dest = self.directory.join(artifact.cache_file_name());
        if tokio::fs::try_exists(&dest).await.unwrap_or(false) {
            tracing::debug!("{artifact} already cached at {}", dest.display());
            return Ok(false);
        }

        let url = self.locate(artifact).await.inspect_err(|e| {
            self.reporter.failed(artifact, &e.to_string());
        })?;

        tracing::info!("Downloading {artifact} from {url}");
        let written = DownloadRequest {
            client: &self.client,
            artifact,
            url: &url,
            dest: &dest,
            reporter: self.reporter.as_ref(),
        }
        .execute()
        .await
        .map_err(|e| {
            self.reporter.failed(artifact, &e.to_string());
            Error::download_with(format!("Failed to download {artifact} from {url}"), e)
        })?;

        tracing::debug!("Wrote {written} bytes to {}", dest.display());
        Ok(true)
    }

    /// The URL an artifact's bytes come from, resolving coordinates on demand.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Resolve`] if a coordinate artifact cannot be resolved.
    pub async fn locate(&self, artifact: &Artifact) -> Result<String> {
        match artifact.source() {
            Source::Url { url, .. } => Ok(url.clone()),
            Source::Maven(coordinate) => {
                self.resolver
                    .resolve(coordinate, artifact.extension())
                    .await
            }
        }
    }
}
