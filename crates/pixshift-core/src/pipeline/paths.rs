//! Output path resolution.

use std::path::{Path, PathBuf};

use crate::error::PathError;
use crate::format::TargetFormat;

/// Maps input files to output paths under a fixed output root.
#[derive(Debug, Clone)]
pub struct PathResolver {
    output_root: PathBuf,
    extension: &'static str,
    mirror: bool,
}

impl PathResolver {
    pub fn new(output_root: impl Into<PathBuf>, format: TargetFormat, mirror: bool) -> Self {
        Self {
            output_root: output_root.into(),
            extension: format.extension(),
            mirror,
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Compute the output path for `file` without touching the filesystem.
    ///
    /// Flat mode: `output_root/<stem>.<ext>`. Mirror mode:
    /// `output_root/<dir of file relative to input_root>/<stem>.<ext>`.
    pub fn output_path(&self, input_root: &Path, file: &Path) -> Result<PathBuf, PathError> {
        let stem = file
            .file_stem()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| PathError::NoFileStem(file.to_path_buf()))?;

        let mut name = stem.to_os_string();
        name.push(".");
        name.push(self.extension);

        if !self.mirror {
            return Ok(self.output_root.join(name));
        }

        let relative = file
            .strip_prefix(input_root)
            .map_err(|_| PathError::OutsideRoot {
                path: file.to_path_buf(),
                root: input_root.to_path_buf(),
            })?;
        let relative_dir = relative.parent().unwrap_or_else(|| Path::new(""));

        Ok(self.output_root.join(relative_dir).join(name))
    }

    /// Compute the output path and make sure its directory exists.
    ///
    /// Directory creation is idempotent, so concurrent callers targeting the
    /// same directory all succeed.
    pub fn resolve(&self, input_root: &Path, file: &Path) -> Result<PathBuf, PathError> {
        let output = self.output_path(input_root, file)?;
        let dir = output.parent().unwrap_or(&self.output_root);
        std::fs::create_dir_all(dir).map_err(|source| PathError::CreateDir {
            dir: dir.to_path_buf(),
            source,
        })?;
        Ok(output)
    }
}
