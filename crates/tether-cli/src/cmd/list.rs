//! List command

use std::path::{Path, PathBuf};

use anyhow::Result;
use crossterm::style::Stylize;
use tether_schema::RELOCATED_MARKER;
use walkdir::WalkDir;

use crate::ui::{Output, format_size};

/// One cached archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedFile {
    pub name: String,
    pub size: u64,
    pub relocated: bool,
}

/// Archives directly inside `dir`, sorted by name. Hidden files (in-flight
/// downloads) are skipped.
pub fn cached_files(dir: &Path) -> Vec<CachedFile> {
    let mut files: Vec<CachedFile> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let name = e.file_name().to_str()?.to_string();
            if name.starts_with('.') {
                return None;
            }
            let size = e.metadata().map(|m| m.len()).unwrap_or(0);
            let relocated = Path::new(&name)
                .file_stem()
                .and_then(|s| s.to_str())
                .is_some_and(|s| s.ends_with(RELOCATED_MARKER));
            Some(CachedFile {
                name,
                size,
                relocated,
            })
        })
        .collect();
    files.sort_by(|a, b| a.name.cmp(&b.name));
    files
}

/// Print the cached archives of the working directory.
pub fn list(dir: Option<PathBuf>) -> Result<()> {
    let dir = crate::working_dir(dir);
    let output = Output::new();
    let files = cached_files(&dir);

    if files.is_empty() {
        output.info(&format!("No artifacts cached in {}", dir.display()));
        return Ok(());
    }

    let width = files.iter().map(|f| f.name.len()).max().unwrap_or(0);
    let mut total = 0;
    for file in &files {
        total += file.size;
        let tag = if file.relocated { "relocated" } else { "" };
        println!(
            "  {:<width$} {:>10}  {}",
            file.name,
            format_size(file.size),
            tag.dark_grey()
        );
    }
    println!(
        "{}",
        format!("  {} files, {}", files.len(), format_size(total)).dark_grey()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cached_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b-1.jar"), b"bb").unwrap();
        std::fs::write(dir.path().join("a-1-relocated.jar"), b"a").unwrap();
        std::fs::write(dir.path().join(".tether-123.part"), b"partial").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let files = cached_files(dir.path());
        assert_eq!(
            files,
            vec![
                CachedFile {
                    name: "a-1-relocated.jar".into(),
                    size: 1,
                    relocated: true
                },
                CachedFile {
                    name: "b-1.jar".into(),
                    size: 2,
                    relocated: false
                },
            ]
        );
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(cached_files(&dir.path().join("absent")).is_empty());
    }
}
