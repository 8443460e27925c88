use dirs::home_dir;
use std::path::PathBuf;

/// Returns the base directory, or None if the user's home cannot be resolved.
pub fn try_tether_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("TETHER_HOME") {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".tether"))
}

/// Returns the base directory (`~/.tether`), falling back to `./.tether`.
pub fn tether_home() -> PathBuf {
    try_tether_home().unwrap_or_else(|| PathBuf::from(".tether"))
}

/// Default working directory: ~/.tether/libs
pub fn libs_path() -> PathBuf {
    tether_home().join("libs")
}

