//! YOLO TXT line codec and label-file I/O.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::format::error::FormatError;
use crate::model::BoundingBox;

/// Extension of label files (without the dot).
pub const LABEL_EXTENSION: &str = "txt";

/// Parse a single label line.
///
/// Takes the first five whitespace-separated tokens positionally. Returns
/// `None` when there are fewer than five tokens or any of the four numeric
/// tokens is not a number (NaN counts as not a number). Parsed values are
/// clamped into `[0, 1]`.
pub fn parse_line(line: &str) -> Option<BoundingBox> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 5 {
        return None;
    }

    let class_id = parts[0];
    let cx = parse_coordinate(parts[1])?;
    let cy = parse_coordinate(parts[2])?;
    let w = parse_coordinate(parts[3])?;
    let h = parse_coordinate(parts[4])?;

    Some(BoundingBox::new(class_id, cx, cy, w, h))
}

fn parse_coordinate(token: &str) -> Option<f64> {
    token.parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Format a box as a label line, including the trailing newline.
///
/// The class id is written verbatim; coordinates are clamped and written with
/// six decimals.
pub fn format_line(bbox: &BoundingBox) -> String {
    let b = bbox.clamped();
    format!(
        "{} {:.6} {:.6} {:.6} {:.6}\n",
        b.class_id, b.x_center, b.y_center, b.width, b.height
    )
}

/// Label file path for an image: `<labels_root>/<image stem>.txt`.
pub fn label_path_for(labels_root: &Path, image_path: &Path) -> PathBuf {
    let stem = image_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown");
    labels_root.join(format!("{}.{}", stem, LABEL_EXTENSION))
}

/// Load every parseable box from a label file, in file order.
///
/// A missing file yields an empty list.
pub fn load(path: &Path) -> Result<Vec<BoundingBox>, FormatError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            log::debug!("No label file at {:?}, starting empty", path);
            return Ok(Vec::new());
        }
        Err(e) => return Err(FormatError::read(path, e)),
    };

    let mut boxes = Vec::new();
    let mut skipped = 0usize;
    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(line) {
            Some(bbox) => boxes.push(bbox),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        log::debug!("Skipped {} malformed line(s) in {:?}", skipped, path);
    }

    Ok(boxes)
}

/// Rewrite a label file with exactly the given boxes, creating parent
/// directories as needed.
pub fn save(path: &Path, boxes: &[BoundingBox]) -> Result<(), FormatError> {
    ensure_parent(path)?;

    let content: String = boxes.iter().map(format_line).collect();
    fs::write(path, content).map_err(|e| FormatError::write(path, e))?;

    log::info!("Saved {} annotation(s) to {:?}", boxes.len(), path);
    Ok(())
}

/// Append one already-formatted line to a label file, creating it if absent.
pub fn append_line(path: &Path, line: &str) -> Result<(), FormatError> {
    ensure_parent(path)?;

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| FormatError::write(path, e))?;
    file.write_all(line.as_bytes())
        .map_err(|e| FormatError::write(path, e))?;

    log::debug!("Appended label line to {:?}: {}", path, line.trim_end());
    Ok(())
}

/// Outcome of [`truncate_last_line`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LastLine {
    /// The last line matched and was removed.
    Removed,
    /// The file's last line differs from the expected text; file untouched.
    Mismatch,
    /// The label file does not exist.
    Missing,
}

/// Remove the last line of a label file only if it equals `expected`
/// byte for byte (trailing newline included).
pub fn truncate_last_line(path: &Path, expected: &str) -> Result<LastLine, FormatError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(LastLine::Missing),
        Err(e) => return Err(FormatError::read(path, e)),
    };

    match content.split_inclusive('\n').last() {
        Some(last) if last == expected => {
            let kept = &content[..content.len() - last.len()];
            fs::write(path, kept).map_err(|e| FormatError::write(path, e))?;
            Ok(LastLine::Removed)
        }
        _ => Ok(LastLine::Mismatch),
    }
}

fn ensure_parent(path: &Path) -> Result<(), FormatError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| FormatError::write(path, e))
        }
        _ => Ok(()),
    }
}
