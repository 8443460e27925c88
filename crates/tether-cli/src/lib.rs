//! tether - runtime artifact acquisition
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_panics_doc)]
//!
//! Resolves, downloads, relocates and registers JVM archives into a local
//! working directory, then prints the resulting classpath.
//!
//! # Directory Layout
//!
//! ```text
//! ~/.tether/
//! └── libs/       # Default working directory (raw and relocated archives)
//! ```

pub mod cmd;
pub mod ui;

pub use tether_core::USER_AGENT;
pub use tether_core::paths::*;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tether_core::Artifact;
use tether_core::manifest::MANIFEST_FILE;
use tether_schema::{Coordinate, Relocation, is_file_name_safe};

#[derive(Debug, Parser)]
#[command(name = "tether")]
#[command(author, version, about = "tether - fetch, relocate and register runtime artifacts")]
pub struct Cli {
    /// Suppress progress output on stderr
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Acquire artifacts and print the resulting classpath
    Fetch {
        /// Artifact spec: group:artifact:version or name:version@url
        #[arg(required = true, value_parser = parse_spec)]
        specs: Vec<Artifact>,
        /// Working directory (default: ~/.tether/libs)
        #[arg(long, env = "TETHER_DIR")]
        dir: Option<PathBuf>,
        /// Additional repository, consulted after Maven Central
        #[arg(long = "repo")]
        repos: Vec<String>,
        /// Probe and download timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// Keep raw archives after relocation
        #[arg(long)]
        keep_raw: bool,
        /// Relocation rule applied to every spec: FROM=TO
        #[arg(long)]
        relocate: Vec<Relocation>,
    },
    /// Acquire the artifacts declared in a manifest
    Sync {
        /// Manifest path
        #[arg(long, default_value = MANIFEST_FILE)]
        manifest: PathBuf,
    },
    /// Sync a manifest, then print the archive providing a symbol
    Locate {
        /// Dotted class name or resource path
        symbol: String,
        /// Manifest path
        #[arg(long, default_value = MANIFEST_FILE)]
        manifest: PathBuf,
    },
    /// List cached archives
    List {
        /// Working directory (default: ~/.tether/libs)
        #[arg(long, env = "TETHER_DIR")]
        dir: Option<PathBuf>,
    },
    /// Remove cached archives
    Clean {
        /// Working directory (default: ~/.tether/libs)
        #[arg(long, env = "TETHER_DIR")]
        dir: Option<PathBuf>,
        /// Show what would be removed without removing it
        #[arg(long)]
        dry_run: bool,
    },
}

/// Parse `group:artifact:version` or `name:version@url`.
///
/// # Example
///
/// ```
/// use tether_cli::parse_spec;
///
/// let gson = parse_spec("com.google.code.gson:gson:2.10.1").unwrap();
/// assert_eq!(gson.cache_file_name(), "gson-2.10.1.jar");
///
/// let tool = parse_spec("tool:1.0@https://example.com/tool.jar").unwrap();
/// assert_eq!(tool.cache_file_name(), "tool-1.0.jar");
/// ```
pub fn parse_spec(spec: &str) -> Result<Artifact, String> {
    if let Some((id, url)) = spec.split_once('@') {
        let (name, version) = id
            .split_once(':')
            .filter(|(n, v)| !n.is_empty() && !v.is_empty())
            .ok_or_else(|| format!("expected name:version@url, got '{spec}'"))?;
        if !is_file_name_safe(name) || !is_file_name_safe(version) {
            return Err(format!("'{id}' must not contain path separators or '..'"));
        }
        if !url.contains("://") {
            return Err(format!("'{url}' is not an absolute URL"));
        }
        return Ok(Artifact::url(name, version, url));
    }

    spec.parse::<Coordinate>()
        .map(Artifact::from_coordinate)
        .map_err(|e| e.to_string())
}

/// Resolve an optional `--dir` to the working directory.
pub fn working_dir(dir: Option<PathBuf>) -> PathBuf {
    dir.unwrap_or_else(libs_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::Source;

    #[test]
    fn test_parse_coordinate_spec() {
        let artifact = parse_spec("org.ow2.asm:asm:9.2").unwrap();
        assert_eq!(
            artifact.coordinate().map(ToString::to_string).as_deref(),
            Some("org.ow2.asm:asm:9.2")
        );
    }

    #[test]
    fn test_parse_url_spec() {
        let artifact = parse_spec("tool:1.0@https://example.com/t.jar").unwrap();
        match artifact.source() {
            Source::Url { name, version, url } => {
                assert_eq!(name, "tool");
                assert_eq!(version, "1.0");
                assert_eq!(url, "https://example.com/t.jar");
            }
            Source::Maven(_) => panic!("expected a URL source"),
        }
    }

    #[test]
    fn test_parse_spec_errors() {
        assert!(parse_spec("only-one-part").is_err());
        assert!(parse_spec(":1.0@https://example.com/t.jar").is_err());
        assert!(parse_spec("tool:1.0@example.com/t.jar").is_err());
        assert!(parse_spec("../tool:1.0@https://example.com/t.jar").is_err());
        assert!(parse_spec("g:../../evil:1").is_err());
    }

    #[test]
    fn test_cli_parses_fetch() {
        let cli = Cli::parse_from([
            "tether",
            "fetch",
            "a:b:1",
            "--repo",
            "https://repo.example/maven",
            "--relocate",
            "a.b=shaded.a.b",
            "--keep-raw",
        ]);
        match cli.command {
            Commands::Fetch {
                specs,
                repos,
                relocate,
                keep_raw,
                ..
            } => {
                assert_eq!(specs.len(), 1);
                assert_eq!(repos, ["https://repo.example/maven"]);
                assert_eq!(relocate[0].to(), "shaded.a.b");
                assert!(keep_raw);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
