//! Archive-level relocation: rename entries, rewrite class files and
//! service registrations, and write the result as a new archive.

use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::Context;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::RewriteEngine;
use super::classfile;
use super::mapping::Mapping;

const SERVICES_DIR: &str = "META-INF/services/";

/// Counters from one archive rewrite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveStats {
    pub entries: usize,
    pub renamed: usize,
    pub rewritten: usize,
    pub dropped: usize,
}

/// The built-in [`RewriteEngine`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveRelocator;

impl RewriteEngine for ArchiveRelocator {
    fn relocate(
        &self,
        input: &Path,
        output: &Path,
        rules: &BTreeMap<String, String>,
    ) -> anyhow::Result<()> {
        let stats = relocate_archive(input, output, &Mapping::new(rules))?;
        tracing::debug!(
            "Relocated {} -> {} ({} entries, {} renamed, {} rewritten, {} dropped)",
            input.display(),
            output.display(),
            stats.entries,
            stats.renamed,
            stats.rewritten,
            stats.dropped
        );
        Ok(())
    }
}

/// Signature files stop verifying once any entry changes.
fn is_signature_file(name: &str) -> bool {
    let Some(file) = name.strip_prefix("META-INF/") else {
        return false;
    };
    !file.contains('/')
        && [".SF", ".RSA", ".DSA", ".EC"]
            .iter()
            .any(|ext| file.ends_with(ext))
}

fn rename_entry(name: &str, mapping: &Mapping) -> Option<String> {
    // Service files are named after the dotted interface they implement.
    if let Some(service) = name.strip_prefix(SERVICES_DIR) {
        return mapping
            .rewrite_str(service)
            .map(|s| format!("{SERVICES_DIR}{s}"));
    }
    mapping.rewrite_str(name)
}

/// Rewrite `input` into `output` through `mapping`.
///
/// `output` is written through a temporary file in its own directory and only
/// appears once the archive is complete.
///
/// # Errors
///
/// Returns an error if `input` is not a readable archive, a class file is
/// malformed, or `output` cannot be written.
pub fn relocate_archive(
    input: &Path,
    output: &Path,
    mapping: &Mapping,
) -> anyhow::Result<ArchiveStats> {
    let file = File::open(input).with_context(|| format!("Cannot open {}", input.display()))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("{} is not a valid archive", input.display()))?;

    let parent = output.parent().unwrap_or_else(|| Path::new("."));
    let temp = tempfile::Builder::new()
        .prefix(".tether-")
        .suffix(".part")
        .tempfile_in(parent)?;
    let mut writer = ZipWriter::new(temp);

    let mut stats = ArchiveStats::default();
    let mut seen = HashSet::new();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        stats.entries += 1;

        if is_signature_file(&name) {
            stats.dropped += 1;
            continue;
        }

        let target = match rename_entry(&name, mapping) {
            Some(renamed) => {
                stats.renamed += 1;
                renamed
            }
            None => name.clone(),
        };
        if !seen.insert(target.clone()) {
            tracing::warn!("Duplicate entry {target} in {}, keeping the first", input.display());
            stats.dropped += 1;
            continue;
        }

        let method = match entry.compression() {
            CompressionMethod::Stored => CompressionMethod::Stored,
            _ => CompressionMethod::Deflated,
        };
        let options = SimpleFileOptions::default().compression_method(method);

        if entry.is_dir() {
            writer.add_directory(target, options)?;
            continue;
        }

        let mut data = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or(0));
        entry.read_to_end(&mut data)?;

        let rewritten = if name.ends_with(".class") && classfile::is_class_file(&data) {
            classfile::relocate_class(&data, mapping)
                .with_context(|| format!("Malformed class file {name}"))?
        } else if name.starts_with(SERVICES_DIR) {
            mapping.rewrite(&data)
        } else {
            None
        };
        if rewritten.is_some() {
            stats.rewritten += 1;
        }

        writer.start_file(target, options)?;
        writer.write_all(rewritten.as_deref().unwrap_or(&data))?;
    }

    let temp = writer.finish()?;
    temp.persist(output)
        .with_context(|| format!("Cannot write {}", output.display()))?;
    Ok(stats)
}
