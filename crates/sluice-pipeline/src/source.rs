//! Source collection: turn a base directory and globs into a [`FileSet`].

use std::fs;
use std::path::{Path, PathBuf};

use globset::GlobSet;
use sluice_config::glob::build_globset;
use sluice_config::ConfigError;
use sluice_transforms::{logical_path, FileEntry, FileSet};
use walkdir::{DirEntry, WalkDir};

use crate::error::PipelineError;

/// Compiled source selection: a base directory plus globs relative to it.
#[derive(Debug, Clone)]
pub struct SourceSet {
    base: PathBuf,
    globs: GlobSet,
}

impl SourceSet {
    pub fn new(base: impl Into<PathBuf>, patterns: &[String]) -> Result<Self, ConfigError> {
        Ok(Self {
            base: base.into(),
            globs: build_globset(patterns)?,
        })
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Whether a logical path (relative to the base) is selected.
    pub fn matches(&self, logical: &str) -> bool {
        self.globs.is_match(logical)
    }

    /// Read every selected file, sorted by logical path.
    ///
    /// Hidden files and directories are skipped. A missing base directory
    /// yields an empty set.
    pub fn collect(&self) -> Result<FileSet, PipelineError> {
        let mut files = FileSet::new();

        if !self.base.is_dir() {
            tracing::warn!(
                "Source directory not found: {} (nothing to process)",
                self.base.display()
            );
            return Ok(files);
        }

        for entry in WalkDir::new(&self.base)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e))
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(
                        "Skipping unreadable entry under {}: {}",
                        self.base.display(),
                        e
                    );
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(&self.base).unwrap_or(path);
            let logical = logical_path(relative);
            if !self.matches(&logical) {
                continue;
            }

            let contents = fs::read(path).map_err(|e| PipelineError::Read {
                path: path.to_path_buf(),
                source: e,
            })?;
            files.insert(logical, FileEntry::with_origin(contents, path));
        }

        tracing::debug!(
            "Collected {} files from {}",
            files.len(),
            self.base.display()
        );

        Ok(files)
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}
