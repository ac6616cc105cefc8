//! Zero-padded, incrementing file names.
//!
//! Captured images are named `00001.jpg`, `00002.jpg`, ... per destination
//! folder. The next number is the highest existing conforming number plus
//! one, so gaps left by deleted files are never reused.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from filename generation.
#[derive(Error, Debug)]
pub enum NamingError {
    /// The folder could not be created or listed
    #[error("Failed to scan folder {folder:?}: {source}")]
    Io {
        folder: PathBuf,
        source: std::io::Error,
    },

    /// The next number does not fit in the configured width
    #[error("Numbering in {folder:?} exhausted all {digits}-digit names")]
    Exhausted { folder: PathBuf, digits: usize },
}

/// A file whose stem is entirely decimal digits, e.g. `007.jpg`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberedFile {
    pub number: u64,
    pub file_name: String,
    /// Number of digits in the stem, i.e. the padding width
    pub width: usize,
    /// Extension including the leading dot
    pub extension: String,
}

impl NumberedFile {
    /// Parse `^\d+\..+$`; anything else yields `None`.
    pub fn parse(file_name: &str) -> Option<Self> {
        let digits = file_name.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return None;
        }
        let extension = &file_name[digits..];
        if !extension.starts_with('.') || extension.len() < 2 {
            return None;
        }
        let number = file_name[..digits].parse().ok()?;
        Some(Self {
            number,
            file_name: file_name.to_string(),
            width: digits,
            extension: extension.to_string(),
        })
    }
}

/// List numbered files in a folder, sorted by number. A missing folder is empty.
pub fn scan_numbered(folder: &Path) -> Result<Vec<NumberedFile>, NamingError> {
    if !folder.is_dir() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(folder).map_err(|source| NamingError::Io {
        folder: folder.to_path_buf(),
        source,
    })?;

    let mut files: Vec<NumberedFile> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .filter_map(|e| e.file_name().to_str().and_then(NumberedFile::parse))
        .collect();
    files.sort_by(|a, b| a.number.cmp(&b.number).then_with(|| a.file_name.cmp(&b.file_name)));
    Ok(files)
}

/// Generate the next free name `<n padded to digits>.<extension>` in `folder`.
///
/// Only names with exactly `digits` digits and the same extension count
/// towards the maximum. The folder is created if it does not exist.
pub fn next_numbered_filename(
    folder: &Path,
    digits: usize,
    extension: &str,
) -> Result<String, NamingError> {
    fs::create_dir_all(folder).map_err(|source| NamingError::Io {
        folder: folder.to_path_buf(),
        source,
    })?;

    let suffix = format!(".{}", extension.trim_start_matches('.'));
    let highest = scan_numbered(folder)?
        .into_iter()
        .filter(|f| f.width == digits && f.extension == suffix)
        .map(|f| f.number)
        .max()
        .unwrap_or(0);

    let next = highest + 1;
    let name = format!("{:0width$}{}", next, suffix, width = digits);
    if name.len() != digits + suffix.len() {
        return Err(NamingError::Exhausted {
            folder: folder.to_path_buf(),
            digits,
        });
    }
    Ok(name)
}
