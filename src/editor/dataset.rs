//! Dataset folder discovery for the editing session.

use std::path::{Path, PathBuf};

use crate::constants::IMAGE_EXTENSIONS;
use crate::editor::EditError;
use crate::format;

/// Check if a path has a supported image extension (case-insensitive).
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Resolved image and label roots of an opened dataset folder.
#[derive(Clone, Debug, PartialEq)]
pub struct DatasetLayout {
    /// Folder the user opened
    pub folder: PathBuf,
    pub images_root: PathBuf,
    pub labels_root: PathBuf,
    /// Every image under `images_root`, sorted by full path
    pub images: Vec<PathBuf>,
}

impl DatasetLayout {
    /// Resolve the roots of `folder` and collect its images.
    ///
    /// Images come from `folder/images` if it exists, else `folder` itself.
    /// Labels come from `folder/labels`, else `<parent>/labels`, else the
    /// images root.
    pub fn open(folder: &Path) -> Result<Self, EditError> {
        if !folder.is_dir() {
            return Err(EditError::NotADirectory(folder.to_path_buf()));
        }

        let images_root = Some(folder.join("images"))
            .filter(|p| p.is_dir())
            .unwrap_or_else(|| folder.to_path_buf());

        let labels_root = [
            Some(folder.join("labels")),
            folder.parent().map(|parent| parent.join("labels")),
        ]
        .into_iter()
        .flatten()
        .find(|p| p.is_dir())
        .unwrap_or_else(|| images_root.clone());

        let mut images = Vec::new();
        scan_images_recursive(&images_root, &mut images)?;
        if images.is_empty() {
            return Err(EditError::NoImages(images_root));
        }
        images.sort();

        log::info!(
            "Opened dataset {:?}: {} image(s), labels in {:?}",
            folder,
            images.len(),
            labels_root
        );

        Ok(Self {
            folder: folder.to_path_buf(),
            images_root,
            labels_root,
            images,
        })
    }

    /// Label file for one of this dataset's images.
    pub fn label_path_for(&self, image: &Path) -> PathBuf {
        format::label_path_for(&self.labels_root, image)
    }
}

fn scan_images_recursive(folder: &Path, images: &mut Vec<PathBuf>) -> Result<(), EditError> {
    let entries = std::fs::read_dir(folder).map_err(|source| EditError::ScanFolder {
        path: folder.to_path_buf(),
        source,
    })?;

    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();

        if path.is_file() && is_image_file(&path) {
            images.push(path);
        } else if path.is_dir() {
            // Keep going if one subdirectory is unreadable
            if let Err(e) = scan_images_recursive(&path, images) {
                log::warn!("Failed to scan subdirectory {:?}: {}", path, e);
            }
        }
    }

    Ok(())
}
