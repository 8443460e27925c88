//! Project manifest parsing.
//!
//! A tether manifest (`tether.toml`) declares the working-directory settings
//! and the artifacts a project needs at runtime.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tether_schema::{Artifact, Coordinate, DEFAULT_EXTENSION, DEFAULT_PRIORITY};
use tokio::fs;

use crate::config::{DEFAULT_TIMEOUT, PipelineConfig, normalize_repository};

/// Default manifest file name.
pub const MANIFEST_FILE: &str = "tether.toml";

/// Top-level manifest parsed from a `tether.toml` file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    /// Pipeline settings.
    #[serde(default)]
    pub settings: Settings,
    /// Declared artifacts, in declaration order.
    #[serde(default)]
    pub artifact: Vec<ArtifactEntry>,
}

/// The `[settings]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Working directory, relative to the manifest's own directory.
    pub directory: Option<PathBuf>,
    pub timeout_ms: Option<u64>,
    /// Replaces the default repository list when present.
    pub repositories: Option<Vec<String>>,
    pub delete_on_relocate: Option<bool>,
}

/// One `[[artifact]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactEntry {
    /// `group:artifact:version`, exclusive with `name`/`version`/`url`.
    pub maven: Option<Coordinate>,
    pub name: Option<String>,
    pub version: Option<String>,
    pub url: Option<String>,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default)]
    pub relocate: BTreeMap<String, String>,
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_priority() -> i32 {
    DEFAULT_PRIORITY
}

fn default_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}

impl ArtifactEntry {
    /// Convert into a pipeline descriptor.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry mixes or omits source fields, or a
    /// relocation rule is invalid.
    pub fn to_artifact(&self) -> Result<Artifact> {
        let artifact = match (&self.maven, &self.name, &self.version, &self.url) {
            (Some(coordinate), None, None, None) => Artifact::from_coordinate(coordinate.clone()),
            (None, Some(name), Some(version), Some(url)) => {
                Artifact::url(name.as_str(), version.as_str(), url.as_str())
            }
            (Some(coordinate), ..) => {
                bail!("Artifact {coordinate} must not also set name, version or url")
            }
            _ => bail!("Artifact entry needs either `maven` or all of `name`, `version`, `url`"),
        };

        let mut artifact = artifact
            .with_priority(self.priority)
            .with_extension(self.extension.as_str());
        for (from, to) in &self.relocate {
            artifact = artifact
                .with_relocation(from.as_str(), to.as_str())
                .with_context(|| format!("Invalid relocation {from} = {to}"))?;
        }
        Ok(artifact)
    }
}

impl Manifest {
    /// Asynchronously load and parse a `Manifest` from the given file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if its contents are not
    /// valid TOML conforming to the manifest schema.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let manifest: Manifest = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        Ok(manifest)
    }

    /// All declared artifacts as pipeline descriptors.
    ///
    /// # Errors
    ///
    /// Returns the first entry that fails [`ArtifactEntry::to_artifact`].
    pub fn to_artifacts(&self) -> Result<Vec<Artifact>> {
        self.artifact
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                entry
                    .to_artifact()
                    .with_context(|| format!("In [[artifact]] #{}", i + 1))
            })
            .collect()
    }

    /// Pipeline configuration for a manifest located in `base_dir`.
    pub fn config(&self, base_dir: &Path) -> PipelineConfig {
        let mut config = match &self.settings.directory {
            Some(dir) => PipelineConfig::new(base_dir.join(dir)),
            None => PipelineConfig::default(),
        };
        config.timeout = self
            .settings
            .timeout_ms
            .map_or(DEFAULT_TIMEOUT, std::time::Duration::from_millis);
        if let Some(repositories) = &self.settings.repositories {
            config.repositories.clear();
            for repo in repositories {
                let repo = normalize_repository(repo);
                if !config.repositories.contains(&repo) {
                    config.repositories.push(repo);
                }
            }
        }
        if let Some(delete) = self.settings.delete_on_relocate {
            config.delete_on_relocate = delete;
        }
        config
    }
}
