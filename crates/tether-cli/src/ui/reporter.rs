//! Console implementation of the pipeline reporter.

use std::path::Path;
use std::sync::Mutex;

use crossterm::style::Stylize;
use tether_core::{Artifact, Reporter, Status};

use super::format_size;

/// Renders pipeline progress to stderr.
#[derive(Debug, Default)]
pub struct ConsoleReporter {
    quiet: bool,
    // Last whole percentage printed per artifact, to keep progress terse.
    progress: Mutex<Option<(String, u64)>>,
}

impl ConsoleReporter {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            progress: Mutex::new(None),
        }
    }
}

fn status_label(status: Status) -> String {
    let label = format!("{status:<10}");
    match status {
        Status::Failed => label.red().bold().to_string(),
        Status::Finished => label.green().bold().to_string(),
        _ => label.cyan().to_string(),
    }
}

impl Reporter for ConsoleReporter {
    fn status(&self, status: Status) {
        if !self.quiet || status == Status::Failed {
            eprintln!("{}", status_label(status));
        }
    }

    fn downloading(&self, artifact: &Artifact, current: u64, total: Option<u64>) {
        if self.quiet {
            return;
        }
        let key = artifact.to_string();
        let Some(total) = total.filter(|t| *t > 0) else {
            if current == 0 {
                eprintln!("  {} {}", "fetching".dark_grey(), key);
            }
            return;
        };

        let percent = current.saturating_mul(100) / total;
        let mut last = self
            .progress
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let step = percent / 25;
        if last.as_ref().is_some_and(|(k, s)| *k == key && *s == step) {
            return;
        }
        *last = Some((key, step));
        eprintln!(
            "  {} {} {}",
            "fetching".dark_grey(),
            artifact,
            format!("{percent:>3}% of {}", format_size(total)).dark_grey()
        );
    }

    fn relocating(&self, artifact: &Artifact) {
        if !self.quiet {
            eprintln!("  {} {}", "relocating".dark_grey(), artifact);
        }
    }

    fn loaded(&self, artifact: &Artifact, path: &Path) {
        tracing::debug!("Loaded {artifact} from {}", path.display());
        if !self.quiet {
            eprintln!("  {} {}", "loaded".dark_grey(), artifact.cache_file_name());
        }
    }

    fn failed(&self, artifact: &Artifact, reason: &str) {
        eprintln!("  {} {}: {}", "failed".red(), artifact, reason);
    }
}
