//! Shared descriptor types for tether.
//!
//! Everything in this crate is pure data: artifact identity, relocation rules,
//! cache file naming and the run status sequence. All I/O lives in `tether-core`.

pub mod artifact;
pub mod coordinate;
pub mod relocation;
pub mod status;

// Re-exports
pub use artifact::*;
pub use coordinate::*;
pub use relocation::*;
pub use status::*;

/// Priority assigned to artifacts that do not request one.
pub const DEFAULT_PRIORITY: i32 = 1000;

/// Archive extension used when an artifact does not declare one.
pub const DEFAULT_EXTENSION: &str = "jar";

/// Version suffix marking a floating (snapshot) build.
pub const FLOATING_SUFFIX: &str = "-SNAPSHOT";

/// Marker appended to a cache file stem once its symbols have been relocated.
pub const RELOCATED_MARKER: &str = "-relocated";

/// Whether `part` can be embedded in a cache file name without leaving the
/// working directory: non-empty, no path separators, no `..`, no NUL.
pub fn is_file_name_safe(part: &str) -> bool {
    !part.is_empty()
        && !part.contains("..")
        && !part.contains(['/', '\\', '\0'])
}
