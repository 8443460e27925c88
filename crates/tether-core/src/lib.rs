//! tether - runtime artifact acquisition.
//!
//! Declared artifacts flow through one pipeline per run:
//!
//! ```text
//! resolve -> fetch -> relocate -> register
//! ```
//!
//! The working directory is the only persistent state. A second run over the
//! same artifacts re-derives everything from the files it finds there and
//! performs no network requests.
//!
//! # Directory Layout
//!
//! ```text
//! ~/.tether/
//! └── libs/                          # working directory (default)
//!     ├── gson-2.10.1.jar            # raw download
//!     └── gson-2.10.1-relocated.jar  # shadow file after relocation
//! ```

pub mod config;
pub mod error;
pub mod io;
pub mod manifest;
pub mod namespace;
pub mod paths;
pub mod pipeline;
pub mod relocate;
pub mod reporter;
pub mod resolver;

pub use config::{PipelineBuilder, PipelineConfig};
pub use error::{Error, ErrorKind, Result};
pub use namespace::{Namespace, NamespaceLoader};
pub use pipeline::Pipeline;
pub use reporter::{NullReporter, Reporter};
pub use tether_schema::{Artifact, Coordinate, Relocation, Source, Status};

/// User Agent string sent with every outbound request
pub const USER_AGENT: &str = concat!("tether/", env!("CARGO_PKG_VERSION"));
