//! Artifact descriptors and cache file naming.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::{Coordinate, DEFAULT_EXTENSION, DEFAULT_PRIORITY, RELOCATED_MARKER, Relocation};

/// Where an artifact's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Source {
    /// Located through the configured repositories.
    Maven(Coordinate),
    /// Fetched directly from a fixed URL.
    Url {
        /// Name used for the cache file.
        name: String,
        /// Version used for the cache file.
        version: String,
        /// Absolute download URL.
        url: String,
    },
}

/// A request for one external artifact plus its acquisition state.
///
/// Identity (`source`, `extension`, `priority`, relocation rules) is fixed once
/// the artifact is handed to a pipeline. Only `cache_file_name` and the
/// relocated flag change during a run.
///
/// # Example
///
/// ```
/// use tether_schema::Artifact;
///
/// let gson = Artifact::maven("com.google.code.gson", "gson", "2.10.1")
///     .with_priority(10)
///     .with_relocation("com.google.gson", "my.app.gson")
///     .unwrap();
///
/// assert_eq!(gson.cache_file_name(), "gson-2.10.1.jar");
/// assert_eq!(gson.shadow_file_name(), "gson-2.10.1-relocated.jar");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    source: Source,
    extension: String,
    priority: i32,
    relocations: BTreeSet<Relocation>,
    cache_file_name: String,
    relocated: bool,
}

impl Artifact {
    /// Create an artifact located by repository coordinate.
    pub fn maven(
        group: impl Into<String>,
        artifact: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self::from_source(Source::Maven(Coordinate::new(group, artifact, version)))
    }

    /// Create an artifact from an already parsed coordinate.
    pub fn from_coordinate(coordinate: Coordinate) -> Self {
        Self::from_source(Source::Maven(coordinate))
    }

    /// Create an artifact fetched from a direct URL.
    pub fn url(
        name: impl Into<String>,
        version: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self::from_source(Source::Url {
            name: name.into(),
            version: version.into(),
            url: url.into(),
        })
    }

    fn from_source(source: Source) -> Self {
        let mut artifact = Self {
            source,
            extension: DEFAULT_EXTENSION.to_string(),
            priority: DEFAULT_PRIORITY,
            relocations: BTreeSet::new(),
            cache_file_name: String::new(),
            relocated: false,
        };
        artifact.cache_file_name = artifact.canonical_file_name();
        artifact
    }

    /// Set the acquisition priority (lower goes first).
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the archive extension (default `jar`).
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into().trim_start_matches('.').to_string();
        self.cache_file_name = self.canonical_file_name();
        self
    }

    /// Add a symbol relocation rule.
    ///
    /// # Errors
    ///
    /// Returns an error if the rule is empty or maps a prefix onto itself.
    pub fn with_relocation(
        self,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Result<Self, crate::RelocationError> {
        Ok(self.with_rule(Relocation::new(from, to)?))
    }

    /// Add an already validated relocation rule.
    pub fn with_rule(mut self, rule: Relocation) -> Self {
        self.relocations.insert(rule);
        self
    }

    /// The artifact's origin.
    pub fn source(&self) -> &Source {
        &self.source
    }

    /// The repository coordinate, for coordinate-based artifacts.
    pub fn coordinate(&self) -> Option<&Coordinate> {
        match &self.source {
            Source::Maven(c) => Some(c),
            Source::Url { .. } => None,
        }
    }

    /// Name component of the cache file (artifact name or declared name).
    pub fn id(&self) -> &str {
        match &self.source {
            Source::Maven(c) => c.artifact(),
            Source::Url { name, .. } => name,
        }
    }

    /// Declared version string.
    pub fn version(&self) -> &str {
        match &self.source {
            Source::Maven(c) => c.version(),
            Source::Url { version, .. } => version,
        }
    }

    /// Archive extension, without the leading dot.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Acquisition and registration priority.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// The relocation rules requested for this artifact.
    pub fn relocations(&self) -> &BTreeSet<Relocation> {
        &self.relocations
    }

    /// Relocation rules as a from -> to map.
    pub fn relocation_map(&self) -> BTreeMap<String, String> {
        self.relocations
            .iter()
            .map(|r| (r.from().to_string(), r.to().to_string()))
            .collect()
    }

    /// Whether symbol relocation was requested.
    pub fn needs_relocation(&self) -> bool {
        !self.relocations.is_empty()
    }

    /// The file this artifact currently resolves to inside the working directory.
    pub fn cache_file_name(&self) -> &str {
        &self.cache_file_name
    }

    /// Whether a relocated shadow file has been produced or discovered.
    pub fn is_relocated(&self) -> bool {
        self.relocated
    }

    /// Whether the cache file names stay inside the working directory.
    ///
    /// Coordinates are checked when parsed; this also covers direct-URL names
    /// and coordinates built with [`Coordinate::new`].
    pub fn has_safe_file_name(&self) -> bool {
        [self.id(), self.version(), self.extension.as_str()]
            .into_iter()
            .all(crate::is_file_name_safe)
    }

    /// `{id}-{version}.{ext}`: the raw download's file name.
    pub fn canonical_file_name(&self) -> String {
        format!("{}-{}.{}", self.id(), self.version(), self.extension)
    }

    /// `{id}-{version}-relocated.{ext}`: the shadow file's name.
    pub fn shadow_file_name(&self) -> String {
        let canonical = self.canonical_file_name();
        let suffix = format!(".{}", self.extension);
        let stem = canonical.strip_suffix(&suffix).unwrap_or(&canonical);
        format!("{stem}{RELOCATED_MARKER}{suffix}")
    }

    /// Point this artifact at its shadow file.
    ///
    /// Does nothing when no relocation was requested.
    pub fn mark_relocated(&mut self) {
        if self.needs_relocation() {
            self.cache_file_name = self.shadow_file_name();
            self.relocated = true;
        }
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Source::Maven(c) => write!(f, "{c}"),
            Source::Url { name, version, url } => write!(f, "{name}:{version}:{url}"),
        }
    }
}
