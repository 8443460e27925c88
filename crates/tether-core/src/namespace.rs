//! Namespaces that archives are registered into.
//!
//! A [`NamespaceLoader`] is an append-only list of archives. Symbol lookup
//! searches its own archives first, in registration order, and only then asks
//! its parent. The relocator keeps one without a parent so the rewrite
//! engine's archives never leak into the host namespace.

use std::collections::HashSet;
use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use zip::ZipArchive;

use crate::error::{Error, Result};

/// Something archives can be registered into and symbols looked up from.
pub trait Namespace: Send + Sync {
    /// Make the archive at `path` visible to later lookups.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Load`] if the archive cannot be registered.
    fn register(&self, path: &Path) -> Result<()>;

    /// The archive providing `symbol`, if any.
    ///
    /// `symbol` is either a dotted class name (`com.example.Foo`) or a resource
    /// path (`com/example/Foo.class`, `META-INF/services/x`).
    fn locate(&self, symbol: &str) -> Option<PathBuf>;
}

/// Resource path a symbol is stored under inside an archive.
pub fn resource_name(symbol: &str) -> String {
    if symbol.contains('/') {
        symbol.to_string()
    } else {
        format!("{}.class", symbol.replace('.', "/"))
    }
}

struct Registered {
    path: PathBuf,
    // Entry names, read on first lookup. `None` if the archive is unreadable.
    index: OnceLock<Option<HashSet<String>>>,
}

impl Registered {
    fn provides(&self, resource: &str) -> bool {
        if self.path.is_dir() {
            return self.path.join(resource).is_file();
        }
        self.index
            .get_or_init(|| read_index(&self.path))
            .as_ref()
            .is_some_and(|names| names.contains(resource))
    }
}

fn read_index(path: &Path) -> Option<HashSet<String>> {
    let archive = File::open(path)
        .ok()
        .and_then(|f| ZipArchive::new(f).ok());
    match archive {
        Some(archive) => Some(archive.file_names().map(str::to_string).collect()),
        None => {
            tracing::warn!("{} is not a readable archive", path.display());
            None
        }
    }
}

/// Child-first, append-only archive namespace.
#[derive(Default)]
pub struct NamespaceLoader {
    entries: RwLock<Vec<Registered>>,
    parent: Option<Arc<dyn Namespace>>,
}

impl std::fmt::Debug for NamespaceLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamespaceLoader")
            .field("paths", &self.paths())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

impl NamespaceLoader {
    /// A root namespace with no parent.
    pub fn new() -> Self {
        Self::default()
    }

    /// A namespace that falls back to `parent` for symbols it lacks.
    pub fn with_parent(parent: Arc<dyn Namespace>) -> Self {
        Self {
            entries: RwLock::default(),
            parent: Some(parent),
        }
    }

    /// Registered archives, in registration order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|e| e.path.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered archives joined with the platform path separator.
    ///
    /// # Errors
    ///
    /// Returns an error if a path contains the separator itself.
    pub fn classpath(&self) -> std::result::Result<OsString, std::env::JoinPathsError> {
        std::env::join_paths(self.paths())
    }

    fn locate_local(&self, resource: &str) -> Option<PathBuf> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|e| e.provides(resource))
            .map(|e| e.path.clone())
    }
}

impl Namespace for NamespaceLoader {
    fn register(&self, path: &Path) -> Result<()> {
        let canonical = std::fs::canonicalize(path)
            .map_err(|e| Error::load_with(format!("Cannot register {}", path.display()), e))?;

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.iter().any(|e| e.path == canonical) {
            tracing::debug!("{} already registered", canonical.display());
            return Ok(());
        }
        tracing::debug!("Registered {}", canonical.display());
        entries.push(Registered {
            path: canonical,
            index: OnceLock::new(),
        });
        Ok(())
    }

    fn locate(&self, symbol: &str) -> Option<PathBuf> {
        let resource = resource_name(symbol);
        self.locate_local(&resource)
            .or_else(|| self.parent.as_ref()?.locate(symbol))
    }
}
