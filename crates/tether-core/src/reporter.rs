//! Reporter trait for dependency injection
//!
//! This trait allows the pipeline to report progress and status without
//! being coupled to a specific terminal or GUI implementation.

use std::path::Path;

use tether_schema::{Artifact, Status};

pub trait Reporter: Send + Sync {
    /// A run moved to the next stage.
    fn status(&self, status: Status);

    /// Updates the progress of a download.
    fn downloading(&self, artifact: &Artifact, current: u64, total: Option<u64>);

    /// An artifact's symbols are about to be rewritten.
    fn relocating(&self, artifact: &Artifact);

    /// An artifact was registered into the host namespace.
    fn loaded(&self, artifact: &Artifact, path: &Path);

    /// An artifact's stage failed with a specific reason.
    fn failed(&self, artifact: &Artifact, reason: &str);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn status(&self, status: Status) {
        (**self).status(status);
    }
    fn downloading(&self, artifact: &Artifact, current: u64, total: Option<u64>) {
        (**self).downloading(artifact, current, total);
    }
    fn relocating(&self, artifact: &Artifact) {
        (**self).relocating(artifact);
    }
    fn loaded(&self, artifact: &Artifact, path: &Path) {
        (**self).loaded(artifact, path);
    }
    fn failed(&self, artifact: &Artifact, reason: &str) {
        (**self).failed(artifact, reason);
    }
}

/// A no-op reporter for silent operations (e.g., bootstrap, testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn status(&self, _: Status) {}
    fn downloading(&self, _: &Artifact, _: u64, _: Option<u64>) {}
    fn relocating(&self, _: &Artifact) {}
    fn loaded(&self, _: &Artifact, _: &Path) {}
    fn failed(&self, _: &Artifact, _: &str) {}
}
