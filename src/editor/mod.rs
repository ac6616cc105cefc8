//! Post-hoc editing of an existing dataset.
//!
//! [`DatasetLayout`] resolves where images and labels live; [`EditingSession`]
//! owns the working copy of one image's boxes and writes it back wholesale on
//! save and on navigation.

mod dataset;
mod session;


pub use dataset::{DatasetLayout, is_image_file};
pub use session::{BoxOverlay, ClassChooser, EditingSession, PressOutcome};

use std::path::PathBuf;

use thiserror::Error;

use crate::format::FormatError;

/// Errors from the editing session. The message is the status text.
#[derive(Error, Debug)]
pub enum EditError {
    #[error("{0:?} is not a folder")]
    NotADirectory(PathBuf),

    #[error("No images found in {0:?}")]
    NoImages(PathBuf),

    #[error("Failed to read folder {path:?}: {source}")]
    ScanFolder {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Open an image first")]
    NoImageLoaded,

    #[error("Failed to read image {path:?}: {source}")]
    ImageRead {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Image {0:?} has no pixels")]
    EmptyImage(PathBuf),

    #[error("No annotation at index {index} (have {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Class id must not be empty")]
    EmptyClassId,

    #[error(transparent)]
    Format(#[from] FormatError),
}
