//! Screen acquisition collaborator.

use std::path::{Path, PathBuf};
use std::time::Duration;

use image::RgbImage;
use thiserror::Error;

use crate::model::PixelRect;

/// Errors from a screen source.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Zero or negative width/height; never silently replaced by a blank image
    #[error("Capture region {0} has no area")]
    DegenerateRegion(PixelRect),

    #[error("Capture region {region} lies outside the {width}x{height} frame")]
    OutOfFrame {
        region: PixelRect,
        width: u32,
        height: u32,
    },

    #[error("Failed to load frame {path:?}: {source}")]
    Load {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Screen capture failed: {0}")]
    Backend(String),
}

/// Something that can grab a rectangle of the screen.
///
/// Sources that draw an overlay on top of the screen can hide it in
/// [`before_capture`](ScreenSource::before_capture) and restore it in
/// [`after_capture`](ScreenSource::after_capture); the session calls both
/// around every grab, the latter even when the grab fails.
pub trait ScreenSource {
    /// Capture `region` in screen pixels.
    fn capture(&mut self, region: PixelRect) -> Result<RgbImage, SourceError>;

    fn before_capture(&mut self, _settle: Duration) {}

    fn after_capture(&mut self) {}
}

/// A source that crops from a still frame held in memory.
#[derive(Debug, Clone)]
pub struct FrameSource {
    frame: RgbImage,
}

impl FrameSource {
    pub fn new(frame: RgbImage) -> Self {
        Self { frame }
    }

    /// Load a frame from an image file.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let frame = image::open(path)
            .map_err(|source| SourceError::Load {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgb8();
        log::info!(
            "🖼️ Loaded {}x{} frame from {:?}",
            frame.width(),
            frame.height(),
            path
        );
        Ok(Self { frame })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.frame.dimensions()
    }
}

impl ScreenSource for FrameSource {
    fn capture(&mut self, region: PixelRect) -> Result<RgbImage, SourceError> {
        if region.is_degenerate() {
            return Err(SourceError::DegenerateRegion(region));
        }

        let (width, height) = self.frame.dimensions();
        let inside = region.x1 >= 0
            && region.y1 >= 0
            && i64::from(region.x2) <= i64::from(width)
            && i64::from(region.y2) <= i64::from(height);
        if !inside {
            return Err(SourceError::OutOfFrame {
                region,
                width,
                height,
            });
        }

        // Bounds were checked above, so every coordinate is non-negative.
        let view = image::imageops::crop_imm(
            &self.frame,
            region.x1 as u32,
            region.y1 as u32,
            region.width(),
            region.height(),
        );
        Ok(view.to_image())
    }
}
