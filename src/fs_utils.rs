use crate::error::BackupError;
use crate::packaging::FileEntry;
use anyhow::{Context, Result};
use glob::Pattern;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Exclusion patterns matched against paths relative to the source root.
///
/// Every configured pattern `p` is compiled into the four variants `p`,
/// `p/*`, `*/p` and `*/p/*`, so the match is anchored-agnostic:
/// `node_modules` prunes a root-level `node_modules/` as well as one nested
/// at any depth.
#[derive(Debug)]
pub struct ExcludeSet {
    patterns: Vec<Pattern>,
}

impl ExcludeSet {
    pub fn compile(patterns: &[String]) -> Result<Self, BackupError> {
        let mut compiled = Vec::with_capacity(patterns.len() * 4);
        for p in patterns {
            for variant in [p.clone(), format!("{p}/*"), format!("*/{p}"), format!("*/{p}/*")] {
                compiled.push(Pattern::new(&variant).map_err(|source| {
                    BackupError::InvalidExcludePattern {
                        pattern: p.clone(),
                        source,
                    }
                })?);
            }
        }
        Ok(Self { patterns: compiled })
    }

    pub fn matches(&self, relative: &Path) -> bool {
        let path_str = relative.to_string_lossy();
        self.patterns.iter().any(|p| p.matches(&path_str))
    }
}

/// Collects everything under `source_root` into archive entries, pruning
/// excluded paths. Entry names are relative and rooted at the directory's
/// base name, e.g. `myproject/src/lib.rs`; the root entry itself comes
/// first, so even an empty directory archives its folder name.
pub fn collect_entries(source_root: &Path, excludes: &ExcludeSet) -> Result<Vec<FileEntry>> {
    let base = source_root
        .file_name()
        .with_context(|| format!("source path has no base name: {}", source_root.display()))?
        .to_string_lossy()
        .to_string();

    let mut entries = vec![FileEntry {
        path: source_root.to_path_buf(),
        name_in_archive: base.clone(),
    }];
    walk_dir(source_root, source_root, &base, excludes, &mut entries)?;
    Ok(entries)
}

fn walk_dir(
    dir: &Path,
    root: &Path,
    base: &str,
    excludes: &ExcludeSet,
    entries: &mut Vec<FileEntry>,
) -> Result<()> {
    let mut children = fs::read_dir(dir)
        .with_context(|| format!("reading directory {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()
        .with_context(|| format!("reading directory {}", dir.display()))?;
    // Sort so identical trees produce identically ordered archives.
    children.sort_by_key(|e| e.file_name());

    for entry in children {
        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(&path).to_path_buf();

        if excludes.matches(&relative) {
            continue;
        }

        let file_type = entry
            .file_type()
            .with_context(|| format!("reading file type of {}", path.display()))?;
        if file_type.is_symlink() {
            warn!("skipping symlink {}", path.display());
            continue;
        }

        let name_in_archive = format!("{}/{}", base, relative.display());
        if file_type.is_dir() {
            entries.push(FileEntry {
                path: path.clone(),
                name_in_archive,
            });
            walk_dir(&path, root, base, excludes, entries)?;
        } else {
            entries.push(FileEntry {
                path,
                name_in_archive,
            });
        }
    }
    Ok(())
}

/// Compute the total size of all file entries.
pub fn total_size(entries: &[FileEntry]) -> Result<u64> {
    let mut total: u64 = 0;
    for entry in entries {
        if entry.path.is_file() {
            total += fs::metadata(&entry.path)?.len();
        }
    }
    Ok(total)
}

/// Convert bytes into a human-friendly string using binary (KiB, MiB, GiB...) units.
pub fn encode_size(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if (size * 10.0) % 10.0 == 0.0 {
        format!("{:.0} {}", size, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}
