//! Snapshot file discovery.
//!
//! Expands the paths given to `agent import` into the list of snapshot
//! files to ingest, respecting the configured extensions and size limit.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Configuration for snapshot discovery.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// File extensions to include (without dot)
    pub extensions: Vec<String>,
    /// Maximum file size in bytes
    pub max_file_size: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["json".to_string()],
            max_file_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

impl From<&crate::config::ImportConfig> for ScanConfig {
    fn from(config: &crate::config::ImportConfig) -> Self {
        Self {
            extensions: config.extensions.clone(),
            max_file_size: config.max_file_size,
        }
    }
}

/// Finds snapshot files under files and directories.
pub struct SnapshotScanner {
    config: ScanConfig,
}

impl SnapshotScanner {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Expand the given paths into snapshot files.
    ///
    /// Files named explicitly are always kept. Directories are walked
    /// recursively; their entries are filtered and sorted by path.
    pub fn collect(&self, paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for path in paths {
            if path.is_dir() {
                let mut found = self.scan_dir(path)?;
                debug!("Found {} snapshot(s) in {}", found.len(), path.display());
                files.append(&mut found);
            } else if path.is_file() {
                files.push(path.clone());
            } else {
                return Err(anyhow::anyhow!("Path not found: {}", path.display()));
            }
        }

        Ok(files)
    }

    /// Walk a directory for matching snapshot files.
    fn scan_dir(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        let walker = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("Cannot read entry under {}: {}", dir.display(), e);
                    continue;
                }
            };

            if entry.file_type().is_file() && self.matches(entry.path()) {
                files.push(entry.into_path());
            }
        }

        files.sort();
        Ok(files)
    }

    /// Check if a file matches the extension and size criteria.
    pub fn matches(&self, path: &Path) -> bool {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        if !self.config.extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)) {
            return false;
        }

        match std::fs::metadata(path) {
            Ok(metadata) if metadata.len() <= self.config.max_file_size => true,
            Ok(metadata) => {
                warn!(
                    "Skipping {} ({} bytes exceeds limit of {})",
                    path.display(),
                    metadata.len(),
                    self.config.max_file_size
                );
                false
            }
            Err(_) => false,
        }
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}
