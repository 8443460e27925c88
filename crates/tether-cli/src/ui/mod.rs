//! Terminal output
//!
//! Everything human-facing goes to stderr so stdout stays a clean classpath.

mod reporter;

pub use reporter::ConsoleReporter;

use crossterm::style::Stylize;

/// Styled one-line messages on stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    quiet: bool,
}

impl Output {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quiet(quiet: bool) -> Self {
        Self { quiet }
    }

    pub fn info(&self, msg: &str) {
        if !self.quiet {
            eprintln!("{} {msg}", "•".dark_grey());
        }
    }

    pub fn success(&self, msg: &str) {
        if !self.quiet {
            eprintln!("{} {msg}", "✓".green());
        }
    }

    pub fn error(&self, msg: &str) {
        eprintln!("{} {}", "✗".red(), msg.red());
    }
}

/// Human-readable byte count.
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}
