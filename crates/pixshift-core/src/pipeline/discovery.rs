//! File discovery for finding candidate images under an input root.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::ProcessingConfig;
use crate::error::DiscoveryError;

/// Discovers image files under an input root.
pub struct FileDiscovery {
    extensions: Vec<String>,
    recursive: bool,
}

impl FileDiscovery {
    /// Create a discovery instance accepting the configured extensions.
    pub fn new(config: &ProcessingConfig, recursive: bool) -> Self {
        Self {
            extensions: config.extensions(),
            recursive,
        }
    }

    /// Discover candidate files at `root`.
    ///
    /// A file root is returned as-is, whatever its extension. A directory root
    /// yields its immediate children, or all descendants when recursive, that
    /// carry a recognized extension. Results are sorted by path, but callers
    /// must not depend on the order.
    pub fn discover(&self, root: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
        if !root.exists() {
            return Err(DiscoveryError::NotFound(root.to_path_buf()));
        }
        if root.is_file() {
            return Ok(vec![root.to_path_buf()]);
        }
        if !root.is_dir() {
            return Err(DiscoveryError::NotFileOrDirectory(root.to_path_buf()));
        }

        let max_depth = if self.recursive { usize::MAX } else { 1 };
        let mut files = Vec::new();

        for entry in WalkDir::new(root)
            .min_depth(1)
            .max_depth(max_depth)
            .follow_links(true)
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry under {:?}: {}", root, e);
                    continue;
                }
            };
            let path = entry.path();
            if path.is_file() && self.is_supported(path) {
                files.push(path.to_path_buf());
            }
        }

        files.sort();
        tracing::debug!("Discovered {} candidate(s) under {:?}", files.len(), root);
        Ok(files)
    }

    /// Check if a file has a recognized extension (case-insensitive).
    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext_lower = ext.to_lowercase();
                self.extensions.iter().any(|known| *known == ext_lower)
            })
            .unwrap_or(false)
    }
}
