//! Run status markers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stage markers emitted once per run, in this order.
///
/// `Downloading` and `Relocating` are conditional. A failed run ends with
/// `Failed` in place of `Finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    /// The run has started.
    Starting,
    /// At least one artifact is being fetched.
    Downloading,
    /// At least one fetched artifact is being relocated.
    Relocating,
    /// Artifacts are being registered into the host namespace.
    Loading,
    /// Every stage completed.
    Finished,
    /// A stage failed; the run's error carries the cause.
    Failed,
}

impl Status {
    /// Whether no further status follows this one.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Starting => "STARTING",
            Self::Downloading => "DOWNLOADING",
            Self::Relocating => "RELOCATING",
            Self::Loading => "LOADING",
            Self::Finished => "FINISHED",
            Self::Failed => "FAILED",
        };
        f.pad(s)
    }
}
