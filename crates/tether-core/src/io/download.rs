//! Streaming download with atomic placement.
//!
//! Bytes are streamed into a temporary file next to the destination and only
//! renamed into place once the transfer completes, so an interrupted transfer
//! never leaves a file at the destination path.

use std::path::Path;

use futures::StreamExt;
use reqwest::Client;
use tether_schema::Artifact;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::Reporter;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Request for a download operation
pub struct DownloadRequest<'a> {
    pub client: &'a Client,
    pub artifact: &'a Artifact,
    pub url: &'a str,
    pub dest: &'a Path,
    pub reporter: &'a dyn Reporter,
}

impl std::fmt::Debug for DownloadRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadRequest")
            .field("artifact", &self.artifact.to_string())
            .field("url", &self.url)
            .field("dest", &self.dest)
            .finish_non_exhaustive()
    }
}

impl DownloadRequest<'_> {
    /// Execute the download, returning the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns a [`DownloadError`] on connection or read failures, a non-success
    /// status, or a failure writing the destination file.
    pub async fn execute(self) -> Result<u64, DownloadError> {
        let response = self
            .client
            .get(self.url)
            .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
            .send()
            .await?
            .error_for_status()?;

        let total_size = response.content_length();
        self.reporter.downloading(self.artifact, 0, total_size);

        let parent = self.dest.parent().unwrap_or_else(|| Path::new("."));
        let temp = tempfile::Builder::new()
            .prefix(".tether-")
            .suffix(".part")
            .tempfile_in(parent)?;
        // Dropping `temp_path` on any early return removes the partial file.
        let (std_file, temp_path) = temp.into_parts();
        let mut file = tokio::fs::File::from_std(std_file);

        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
            self.reporter
                .downloading(self.artifact, downloaded, total_size);
        }

        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        temp_path.persist(self.dest).map_err(|e| e.error)?;
        Ok(downloaded)
    }
}
