//! Pipeline configuration and its builder.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tether_schema::Artifact;

use crate::namespace::Namespace;
use crate::pipeline::Pipeline;
use crate::relocate::EngineLoader;
use crate::reporter::{NullReporter, Reporter};

/// Repository consulted when the caller configures none of their own.
pub const MAVEN_CENTRAL: &str = "https://repo1.maven.org/maven2/";

/// Default timeout for probes and downloads.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Static settings for a [`Pipeline`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Working directory holding raw and relocated files.
    pub directory: PathBuf,
    /// Connect and request timeout.
    pub timeout: Duration,
    /// Repository base URLs in priority order, each ending in `/`.
    pub repositories: Vec<String>,
    /// Remove the raw file once its shadow file is written.
    pub delete_on_relocate: bool,
}

impl PipelineConfig {
    /// Configuration with defaults rooted at `directory`.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            timeout: DEFAULT_TIMEOUT,
            repositories: vec![MAVEN_CENTRAL.to_string()],
            delete_on_relocate: true,
        }
    }

    /// Append a repository unless already present.
    pub fn add_repository(&mut self, url: &str) {
        let url = normalize_repository(url);
        if !self.repositories.contains(&url) {
            self.repositories.push(url);
        }
    }

    /// Absolute-or-relative path of a file inside the working directory.
    pub fn path_of(&self, file_name: &str) -> PathBuf {
        self.directory.join(file_name)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new(crate::paths::libs_path())
    }
}

/// Ensure a repository base ends with exactly one `/`.
pub fn normalize_repository(url: &str) -> String {
    format!("{}/", url.trim().trim_end_matches('/'))
}

/// Fluent construction of a [`Pipeline`].
///
/// ```no_run
/// use tether_core::PipelineBuilder;
///
/// let pipeline = PipelineBuilder::new("libs")
///     .timeout_ms(10_000)
///     .repository("https://repo.papermc.io/repository/maven-public/")
///     .delete_on_relocate(false)
///     .build()
///     .unwrap();
/// ```
pub struct PipelineBuilder {
    config: PipelineConfig,
    reporter: Arc<dyn Reporter>,
    host: Option<Arc<dyn Namespace>>,
    engine_loader: Option<Arc<dyn EngineLoader>>,
    bootstrap: Option<Vec<Artifact>>,
}

impl std::fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PipelineBuilder {
    pub fn new(directory: impl AsRef<Path>) -> Self {
        Self::from_config(PipelineConfig::new(directory.as_ref()))
    }

    pub fn from_config(config: PipelineConfig) -> Self {
        Self {
            config,
            reporter: Arc::new(NullReporter),
            host: None,
            engine_loader: None,
            bootstrap: None,
        }
    }

    pub fn timeout_ms(mut self, millis: u64) -> Self {
        self.config.timeout = Duration::from_millis(millis);
        self
    }

    /// Append a repository after those already configured.
    pub fn repository(mut self, url: &str) -> Self {
        self.config.add_repository(url);
        self
    }

    /// Drop every configured repository, including the default.
    pub fn clear_repositories(mut self) -> Self {
        self.config.repositories.clear();
        self
    }

    pub fn delete_on_relocate(mut self, delete: bool) -> Self {
        self.config.delete_on_relocate = delete;
        self
    }

    pub fn reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Namespace that receives each run's final artifact paths.
    pub fn host(mut self, host: Arc<dyn Namespace>) -> Self {
        self.host = Some(host);
        self
    }

    /// Replace the rewrite engine used by the relocator.
    pub fn engine_loader(mut self, loader: Arc<dyn EngineLoader>) -> Self {
        self.engine_loader = Some(loader);
        self
    }

    /// Replace the artifacts the rewrite engine is bootstrapped from.
    pub fn bootstrap(mut self, artifacts: Vec<Artifact>) -> Self {
        self.bootstrap = Some(artifacts);
        self
    }

    /// Build the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn build(self) -> Result<Pipeline, reqwest::Error> {
        Pipeline::from_parts(
            self.config,
            self.reporter,
            self.host,
            self.engine_loader,
            self.bootstrap,
        )
    }
}
