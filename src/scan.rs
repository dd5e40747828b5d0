//! Local file discovery for `kbchat upload`.
//!
//! Arguments may be files or directories. Directories are walked
//! recursively, following symlinks; paths matching an exclude glob
//! (relative to the directory argument) are skipped. Each file becomes a
//! [`FileInput`] named by its base name. A file or directory entry that
//! cannot be read is reported as a failed upload instead of aborting the
//! batch.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::models::{FileInput, UploadResult};
use crate::upload::failed;

const DEFAULT_EXCLUDES: &[&str] = &["**/.git/**", "**/target/**", "**/node_modules/**", "**/.DS_Store"];

/// Files found on disk, plus the ones that could not be read.
#[derive(Debug, Default)]
pub struct LocalFiles {
    pub inputs: Vec<FileInput>,
    pub unreadable: Vec<UploadResult>,
}

pub fn collect_local_files(paths: &[PathBuf], excludes: &[String]) -> Result<LocalFiles> {
    let mut patterns: Vec<String> = DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect();
    patterns.extend(excludes.iter().cloned());
    let exclude_set = build_globset(&patterns)?;

    let mut found = LocalFiles::default();
    for root in paths {
        if !root.exists() {
            bail!("Path does not exist: {}", root.display());
        }
        if root.is_file() {
            read_into(root, &mut found);
            continue;
        }

        let mut files: Vec<PathBuf> = Vec::new();
        for entry in WalkDir::new(root).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().unwrap_or(root.as_path());
                    tracing::warn!(path = %path.display(), error = %e, "could not walk entry");
                    found
                        .unreadable
                        .push(failed(&display_name(path), format!("Unexpected error: {}", e)));
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            if exclude_set.is_match(relative) {
                continue;
            }
            files.push(entry.into_path());
        }
        files.sort();
        for path in &files {
            read_into(path, &mut found);
        }
    }
    Ok(found)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn read_into(path: &Path, found: &mut LocalFiles) {
    let name = display_name(path);

    match std::fs::read(path) {
        Ok(bytes) => found.inputs.push(FileInput::new(name, bytes)),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "could not read file");
            found
                .unreadable
                .push(failed(&name, format!("Unexpected error: {}", e)));
        }
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
