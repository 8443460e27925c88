//! Turns repository coordinates into concrete download URLs.
//!
//! Two strategies share one probe loop:
//!
//! - fixed versions probe `{repo}{group/path}/{artifact}/{version}/{artifact}-{version}.{ext}`
//! - floating versions read `maven-metadata.xml` from the version directory and
//!   build `{dir}/{artifact}-{base}-{timestamp}-{buildNumber}.{ext}`
//!
//! Repositories are tried in configured order and every one is attempted
//! before giving up. A transport error on a probe counts as "not found".

use std::sync::Arc;

use quick_xml::Reader;
use quick_xml::events::Event;
use reqwest::Client;
use tether_schema::Coordinate;
use thiserror::Error;

use crate::error::{Error, Result};

/// File name of the floating-version metadata document.
pub const METADATA_DOCUMENT: &str = "maven-metadata.xml";

/// Build identifiers read from a floating version's metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotVersion {
    /// `snapshot/timestamp`, e.g. `20240101.010101`.
    pub timestamp: String,
    /// `snapshot/buildNumber`.
    pub build_number: String,
}

/// Why a metadata document could not be read.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum MetadataError {
    /// The XML reader rejected the document.
    #[error("Malformed metadata document: {0}")]
    Xml(String),

    #[error("Metadata document declares a DOCTYPE")]
    DoctypeForbidden,

    #[error("Metadata document has no snapshot section")]
    MissingSnapshot,

    /// The snapshot section lacks `timestamp` or `buildNumber`.
    #[error("Metadata snapshot section is missing '{0}'")]
    MissingField(&'static str),
}

#[derive(Clone, Copy)]
enum Field {
    Timestamp,
    BuildNumber,
}

/// Extract `snapshot/timestamp` and `snapshot/buildNumber` from a metadata document.
///
/// The first `snapshot` element anywhere in the document is used. Documents
/// carrying a DOCTYPE are refused outright.
///
/// # Errors
///
/// Returns a [`MetadataError`] if the document is malformed, declares a DOCTYPE,
/// or lacks either field.
pub fn parse_snapshot(document: &str) -> Result<SnapshotVersion, MetadataError> {
    let mut reader = Reader::from_str(document);
    reader.config_mut().trim_text(true);

    let mut depth = 0usize;
    let mut snapshot_depth: Option<usize> = None;
    let mut seen_snapshot = false;
    let mut current: Option<Field> = None;
    let mut timestamp: Option<String> = None;
    let mut build_number: Option<String> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| MetadataError::Xml(e.to_string()))?;

        match event {
            Event::DocType(_) => return Err(MetadataError::DoctypeForbidden),
            Event::Start(e) => {
                depth += 1;
                match e.local_name().as_ref() {
                    b"snapshot" if !seen_snapshot => {
                        seen_snapshot = true;
                        snapshot_depth = Some(depth);
                    }
                    b"timestamp" if snapshot_depth.is_some() => current = Some(Field::Timestamp),
                    b"buildNumber" if snapshot_depth.is_some() => {
                        current = Some(Field::BuildNumber);
                    }
                    _ => current = None,
                }
            }
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"snapshot" && !seen_snapshot {
                    seen_snapshot = true;
                }
            }
            Event::Text(t) => {
                let Some(field) = current else { continue };
                let text = t
                    .unescape()
                    .map_err(|e| MetadataError::Xml(e.to_string()))?
                    .into_owned();
                let slot = match field {
                    Field::Timestamp => &mut timestamp,
                    Field::BuildNumber => &mut build_number,
                };
                if slot.is_none() && !text.is_empty() {
                    *slot = Some(text);
                }
            }
            Event::End(_) => {
                current = None;
                if snapshot_depth == Some(depth) {
                    break;
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_snapshot {
        return Err(MetadataError::MissingSnapshot);
    }

    Ok(SnapshotVersion {
        timestamp: timestamp.ok_or(MetadataError::MissingField("timestamp"))?,
        build_number: build_number.ok_or(MetadataError::MissingField("buildNumber"))?,
    })
}

/// Resolves coordinate artifacts against an ordered repository list.
#[derive(Debug, Clone)]
pub struct Resolver {
    client: Client,
    repositories: Arc<[String]>,
}

impl Resolver {
    /// Create a resolver probing `repositories` in order with `client`.
    pub fn new(client: Client, repositories: impl Into<Arc<[String]>>) -> Self {
        Self {
            client,
            repositories: repositories.into(),
        }
    }

    /// Repository bases, each ending in `/`.
    pub fn repositories(&self) -> &[String] {
        &self.repositories
    }

    /// Resolve a coordinate, choosing the strategy by its version.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Resolve`] if no repository yields the artifact.
    pub async fn resolve(&self, coordinate: &Coordinate, extension: &str) -> Result<String> {
        if coordinate.is_floating() {
            self.resolve_floating(coordinate, extension).await
        } else {
            self.resolve_fixed(coordinate, extension).await
        }
    }

    /// Candidate artifact URLs, one per repository, in repository order.
    pub fn artifact_urls(&self, coordinate: &Coordinate, extension: &str) -> Vec<String> {
        self.repositories
            .iter()
            .map(|repo| {
                format!(
                    "{repo}{}/{}/{}/{}-{}.{extension}",
                    coordinate.group_path(),
                    coordinate.artifact(),
                    coordinate.version(),
                    coordinate.artifact(),
                    coordinate.version(),
                )
            })
            .collect()
    }

    /// Candidate metadata document URLs, one per repository, in repository order.
    pub fn metadata_urls(&self, coordinate: &Coordinate) -> Vec<String> {
        self.repositories
            .iter()
            .map(|repo| {
                format!(
                    "{repo}{}/{}/{}/{METADATA_DOCUMENT}",
                    coordinate.group_path(),
                    coordinate.artifact(),
                    coordinate.version(),
                )
            })
            .collect()
    }

    /// Fixed-version strategy: first repository whose artifact URL answers wins.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Resolve`] if every repository fails the probe.
    pub async fn resolve_fixed(&self, coordinate: &Coordinate, extension: &str) -> Result<String> {
        for url in self.artifact_urls(coordinate, extension) {
            if self.probe(&url).await {
                tracing::debug!("Resolved {coordinate} at {url}");
                return Ok(url);
            }
        }
        Err(Error::resolve(format!(
            "Cannot resolve dependency: {coordinate}"
        )))
    }

    /// Floating-version strategy: read build identifiers from repository metadata.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Resolve`] if the version does not float, no repository
    /// serves the metadata document, or the document lacks the snapshot fields.
    pub async fn resolve_floating(
        &self,
        coordinate: &Coordinate,
        extension: &str,
    ) -> Result<String> {
        if !coordinate.is_floating() {
            return Err(Error::resolve(format!(
                "Cannot resolve {coordinate} as a snapshot: version does not float"
            )));
        }

        let mut found = None;
        for url in self.metadata_urls(coordinate) {
            if let Some(document) = self.get_text(&url).await {
                found = Some((url, document));
                break;
            }
        }

        let Some((metadata_url, document)) = found else {
            return Err(Error::resolve(format!(
                "Cannot resolve dependency: {coordinate}"
            )));
        };

        let snapshot = parse_snapshot(&document).map_err(|e| {
            Error::resolve_with(format!("Cannot resolve dependency: {coordinate}"), e)
        })?;

        let dir = metadata_url
            .strip_suffix(&format!("/{METADATA_DOCUMENT}"))
            .unwrap_or(&metadata_url);

        let resolved = format!(
            "{dir}/{}-{}-{}-{}.{extension}",
            coordinate.artifact(),
            coordinate.base_version(),
            snapshot.timestamp,
            snapshot.build_number,
        );
        tracing::debug!("Resolved floating {coordinate} to {resolved}");
        Ok(resolved)
    }

    /// Lightweight existence check; any failure reads as "absent".
    async fn probe(&self, url: &str) -> bool {
        match self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                tracing::debug!("Probe {url} answered {}", resp.status());
                false
            }
            Err(e) => {
                tracing::debug!("Probe {url} failed: {e}");
                false
            }
        }
    }

    async fn get_text(&self, url: &str) -> Option<String> {
        let resp = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
            .send()
            .await
            .ok()?;
        if !resp.status().is_success() {
            tracing::debug!("Metadata {url} answered {}", resp.status());
            return None;
        }
        resp.text().await.ok()
    }
}
