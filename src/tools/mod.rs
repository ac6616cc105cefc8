//! Batch maintenance over dataset trees.

mod merge;
mod remap;

pub use merge::{MergeReport, merge_trees};
pub use remap::{RemapReport, remap_labels};

use std::path::PathBuf;

use thiserror::Error;

use crate::naming::NamingError;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Directory {0:?} does not exist")]
    MissingDirectory(PathBuf),

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Naming(#[from] NamingError),
}

impl ToolError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ToolError::Io {
            path: path.into(),
            source,
        }
    }
}
