//! The four failure kinds of a run.
//!
//! Each kind wraps an optional underlying cause so callers can branch on the
//! kind and still log the full chain.

use std::fmt;
use thiserror::Error;

/// Boxed underlying cause.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias for pipeline operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Which pipeline boundary failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`Error::Resolve`].
    Resolve,
    /// See [`Error::Download`].
    Download,
    /// See [`Error::Relocation`].
    Relocation,
    /// See [`Error::Load`].
    Load,
}

/// A failed run, tagged with the boundary it failed at.
#[derive(Error, Debug)]
pub enum Error {
    /// No repository yielded a usable location or metadata document.
    #[error("Resolve failed: {message}")]
    Resolve {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Transport failure while fetching, or a cache file that cannot be placed
    /// inside the working directory.
    #[error("Download failed: {message}")]
    Download {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Rewrite engine bootstrap or invocation failed.
    #[error("Relocation failed: {message}")]
    Relocation {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// A local path could not be registered.
    #[error("Load failed: {message}")]
    Load {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl Error {
    pub fn resolve(msg: impl fmt::Display) -> Self {
        Self::Resolve {
            message: msg.to_string(),
            source: None,
        }
    }

    pub fn resolve_with(msg: impl fmt::Display, source: impl Into<BoxError>) -> Self {
        Self::Resolve {
            message: msg.to_string(),
            source: Some(source.into()),
        }
    }

    pub fn download(msg: impl fmt::Display) -> Self {
        Self::Download {
            message: msg.to_string(),
            source: None,
        }
    }

    pub fn download_with(msg: impl fmt::Display, source: impl Into<BoxError>) -> Self {
        Self::Download {
            message: msg.to_string(),
            source: Some(source.into()),
        }
    }

    pub fn relocation(msg: impl fmt::Display) -> Self {
        Self::Relocation {
            message: msg.to_string(),
            source: None,
        }
    }

    pub fn relocation_with(msg: impl fmt::Display, source: impl Into<BoxError>) -> Self {
        Self::Relocation {
            message: msg.to_string(),
            source: Some(source.into()),
        }
    }

    pub fn load(msg: impl fmt::Display) -> Self {
        Self::Load {
            message: msg.to_string(),
            source: None,
        }
    }

    pub fn load_with(msg: impl fmt::Display, source: impl Into<BoxError>) -> Self {
        Self::Load {
            message: msg.to_string(),
            source: Some(source.into()),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Resolve { .. } => ErrorKind::Resolve,
            Self::Download { .. } => ErrorKind::Download,
            Self::Relocation { .. } => ErrorKind::Relocation,
            Self::Load { .. } => ErrorKind::Load,
        }
    }
}
