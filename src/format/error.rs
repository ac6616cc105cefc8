//! Error types for label-file operations.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while reading or writing label files.
///
/// A missing label file is not an error: [`load`](super::load) returns an
/// empty list for it.
#[derive(Error, Debug)]
pub enum FormatError {
    /// The label file exists but could not be read
    #[error("Failed to read label file {path:?}: {source}")]
    Read {
        /// Label file path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The label file (or its parent directory) could not be written
    #[error("Failed to write label file {path:?}: {source}")]
    Write {
        /// Label file path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

impl FormatError {
    /// Create a read error for a path.
    pub fn read(path: &Path, source: std::io::Error) -> Self {
        Self::Read {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Create a write error for a path.
    pub fn write(path: &Path, source: std::io::Error) -> Self {
        Self::Write {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Path of the label file involved.
    pub fn path(&self) -> &Path {
        match self {
            Self::Read { path, .. } | Self::Write { path, .. } => path,
        }
    }
}
