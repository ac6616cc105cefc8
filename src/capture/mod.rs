//! Live capture session.
//!
//! The session is an explicit state machine:
//!
//! ```text
//! Idle ──enter_target_selection──▶ SelectingTarget ──confirm_target──▶ Annotating
//!   ▲                                   ▲                                 │  ▲
//!   └──── confirm_target failed ────────┘◀──── enter_target_selection ────┘  │
//!                                                        release (commit) ───┘
//! ```
//!
//! While annotating, every accepted drag writes a crop under
//! `<dataset_root>/<class>/` and appends one line to the target's label file.
//! The most recent commit can be undone once; starting a new target
//! selection forgets it.

mod source;
mod undo;

#[cfg(test)]
mod tests;

pub use source::{FrameSource, ScreenSource, SourceError};
pub use undo::{PendingUndo, UndoReport, VisualHandle};

use std::fmt;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;

use image::RgbImage;
use thiserror::Error;

use crate::config::CaptureConfig;
use crate::constants::MIN_DRAG_PIXELS;
use crate::format::{self, FormatError, LastLine};
use crate::model::{BoundingBox, PixelRect, Point, Rect};
use crate::naming::{self, NamingError};
use crate::notice::Notice;
use crate::transform::{clip_to_region, rect_to_box};

/// Errors surfaced by the capture session. The message is the status text.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: CaptureState,
    },

    #[error("Draw a target region before confirming")]
    NoTargetDrawn,

    #[error("Target region {0} has no area")]
    DegenerateTarget(PixelRect),

    #[error("Choose a class before annotating")]
    NoActiveClass,

    #[error("Class name must not be empty")]
    EmptyClassName,

    #[error("Annotation lies outside the target region")]
    OutsideTarget,

    #[error("No annotation to undo")]
    NothingToUndo,

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Naming(#[from] NamingError),

    #[error("Failed to create folder {path:?}: {source}")]
    CreateFolder {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to save image {path:?}: {source}")]
    ImageSave {
        path: PathBuf,
        source: image::ImageError,
    },

    /// The crop is on disk but its label line is not
    #[error("Saved crop {crop:?} but could not append its label to {label:?}: {source}")]
    LabelAppendFailed {
        crop: PathBuf,
        label: PathBuf,
        source: FormatError,
    },
}

/// Public view of the session mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    SelectingTarget,
    Annotating,
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CaptureState::Idle => "idle",
            CaptureState::SelectingTarget => "selecting a target",
            CaptureState::Annotating => "annotating",
        })
    }
}

/// The confirmed target screenshot that annotations are normalized against.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveTarget {
    pub region: PixelRect,
    pub image_path: PathBuf,
    pub label_path: PathBuf,
}

/// One annotation committed for the current target.
#[derive(Debug, Clone, PartialEq)]
pub struct CommittedBox {
    pub handle: VisualHandle,
    /// Clipped screen rectangle
    pub region: PixelRect,
    pub bbox: BoundingBox,
    pub crop_path: PathBuf,
}

/// Result of finishing a drag.
#[derive(Debug, Clone, PartialEq)]
pub enum ReleaseOutcome {
    /// No drag was in progress
    Ignored,
    /// Under one pixel on some axis; nothing changed
    Discarded,
    /// A target rectangle is ready for [`CaptureSession::confirm_target`]
    TargetCandidate(PixelRect),
    Annotated(CommittedBox),
}

#[derive(Debug)]
enum Mode {
    Idle,
    SelectingTarget { candidate: Option<PixelRect> },
    Annotating(ActiveTarget),
}

#[derive(Debug, Clone, Copy)]
struct Drag {
    start: Point,
    current: Point,
}

/// Interactive capture session over a [`ScreenSource`].
pub struct CaptureSession<S: ScreenSource> {
    source: S,
    config: CaptureConfig,
    mode: Mode,
    drag: Option<Drag>,
    active_class: Option<String>,
    committed: Vec<CommittedBox>,
    next_handle: u64,
    pending_undo: Option<PendingUndo>,
}

impl<S: ScreenSource> CaptureSession<S> {
    pub fn new(source: S, config: CaptureConfig) -> Self {
        Self {
            source,
            config,
            mode: Mode::Idle,
            drag: None,
            active_class: None,
            committed: Vec::new(),
            next_handle: 0,
            pending_undo: None,
        }
    }

    pub fn state(&self) -> CaptureState {
        match self.mode {
            Mode::Idle => CaptureState::Idle,
            Mode::SelectingTarget { .. } => CaptureState::SelectingTarget,
            Mode::Annotating(_) => CaptureState::Annotating,
        }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn active_target(&self) -> Option<&ActiveTarget> {
        match &self.mode {
            Mode::Annotating(target) => Some(target),
            _ => None,
        }
    }

    /// Drawn but not yet confirmed target rectangle.
    pub fn candidate(&self) -> Option<PixelRect> {
        match self.mode {
            Mode::SelectingTarget { candidate } => candidate,
            _ => None,
        }
    }

    pub fn active_class(&self) -> Option<&str> {
        self.active_class.as_deref()
    }

    /// Live rectangle of the drag in progress.
    pub fn preview(&self) -> Option<Rect> {
        self.drag
            .map(|drag| Rect::from_corners(drag.start, drag.current))
    }

    /// Rectangles committed for the current target, oldest first.
    pub fn committed_boxes(&self) -> &[CommittedBox] {
        &self.committed
    }

    pub fn pending_undo(&self) -> Option<&PendingUndo> {
        self.pending_undo.as_ref()
    }

    /// Start (or restart) target selection from any state.
    ///
    /// Drops the current target, its visual layer and the undo slot.
    pub fn enter_target_selection(&mut self) {
        log::debug!("Capture: {} -> selecting target", self.state());
        self.mode = Mode::SelectingTarget { candidate: None };
        self.drag = None;
        self.committed.clear();
        self.pending_undo = None;
    }

    /// Screenshot the drawn candidate and start annotating it.
    ///
    /// On a capture or save failure the session falls back to idle.
    pub fn confirm_target(&mut self) -> Result<ActiveTarget, CaptureError> {
        let region = match self.mode {
            Mode::SelectingTarget {
                candidate: Some(region),
            } => region,
            _ => return Err(CaptureError::NoTargetDrawn),
        };
        if region.is_degenerate() {
            return Err(CaptureError::DegenerateTarget(region));
        }

        match self.save_target(region) {
            Ok(target) => {
                log::info!(
                    "📸 Target {} saved to {:?}, labels go to {:?}",
                    region,
                    target.image_path,
                    target.label_path
                );
                self.mode = Mode::Annotating(target.clone());
                Ok(target)
            }
            Err(e) => {
                log::warn!("Target capture failed, returning to idle: {}", e);
                self.mode = Mode::Idle;
                self.drag = None;
                Err(e)
            }
        }
    }

    fn save_target(&mut self, region: PixelRect) -> Result<ActiveTarget, CaptureError> {
        let screenshot = self.grab(region)?;

        let images = self.config.images_path();
        let file_name = naming::next_numbered_filename(
            &images,
            self.config.target_digits,
            &self.config.image_extension,
        )?;
        let image_path = images.join(&file_name);
        screenshot
            .save(&image_path)
            .map_err(|source| CaptureError::ImageSave {
                path: image_path.clone(),
                source,
            })?;

        let label_path = format::label_path_for(&self.config.labels_path(), &image_path);
        Ok(ActiveTarget {
            region,
            image_path,
            label_path,
        })
    }

    /// Choose the class (and crop subfolder) for subsequent annotations.
    ///
    /// Whitespace becomes underscores so the name stays one label token;
    /// returns whether any was replaced.
    pub fn set_active_class(&mut self, name: &str) -> Result<bool, CaptureError> {
        if !matches!(self.mode, Mode::Annotating(_)) {
            return Err(CaptureError::InvalidState {
                operation: "choose a class",
                state: self.state(),
            });
        }

        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(CaptureError::EmptyClassName);
        }
        let clean: String = trimmed
            .chars()
            .map(|c| if c.is_whitespace() { '_' } else { c })
            .collect();
        let replaced = clean != trimmed;

        let folder = self.config.class_path(&clean);
        std::fs::create_dir_all(&folder).map_err(|source| CaptureError::CreateFolder {
            path: folder.clone(),
            source,
        })?;

        log::debug!("Active class set to '{}'", clean);
        self.active_class = Some(clean);
        Ok(replaced)
    }

    /// Begin a drag. Returns `false` when no drag can start in this state.
    pub fn press(&mut self, point: Point) -> bool {
        match &mut self.mode {
            Mode::Idle => {
                log::trace!("Press at ({}, {}) ignored while idle", point.x, point.y);
                return false;
            }
            Mode::SelectingTarget { candidate } => *candidate = None,
            Mode::Annotating(_) => {}
        }
        self.drag = Some(Drag {
            start: point,
            current: point,
        });
        true
    }

    pub fn drag_to(&mut self, point: Point) {
        if let Some(drag) = &mut self.drag {
            drag.current = point;
        }
    }

    /// Finish the drag at `point`.
    ///
    /// Validation failures (no class, outside the target) return an error
    /// before any file is written.
    pub fn release(&mut self, point: Point) -> Result<ReleaseOutcome, CaptureError> {
        let Some(drag) = self.drag.take() else {
            return Ok(ReleaseOutcome::Ignored);
        };

        let rect = Rect::from_corners(drag.start, point);
        if rect.width() < MIN_DRAG_PIXELS || rect.height() < MIN_DRAG_PIXELS {
            log::trace!("Discarding {}x{} drag", rect.width(), rect.height());
            return Ok(ReleaseOutcome::Discarded);
        }

        match &mut self.mode {
            Mode::Idle => Ok(ReleaseOutcome::Ignored),
            Mode::SelectingTarget { candidate } => {
                let region = PixelRect::from_rect(rect);
                *candidate = Some(region);
                log::debug!("Target candidate {}", region);
                Ok(ReleaseOutcome::TargetCandidate(region))
            }
            Mode::Annotating(target) => {
                let target = target.clone();
                self.commit(&target, PixelRect::from_rect(rect))
            }
        }
    }

    fn commit(
        &mut self,
        target: &ActiveTarget,
        raw: PixelRect,
    ) -> Result<ReleaseOutcome, CaptureError> {
        let class = self
            .active_class
            .clone()
            .ok_or(CaptureError::NoActiveClass)?;
        let clipped = clip_to_region(raw, target.region).ok_or(CaptureError::OutsideTarget)?;

        match self.write_annotation(target, &class, clipped) {
            Ok(committed) => Ok(ReleaseOutcome::Annotated(committed)),
            Err(e) => {
                // A half-written commit must never become undoable
                self.pending_undo = None;
                log::error!("{}", e);
                Err(e)
            }
        }
    }

    fn write_annotation(
        &mut self,
        target: &ActiveTarget,
        class: &str,
        clipped: PixelRect,
    ) -> Result<CommittedBox, CaptureError> {
        let crop = self.grab(clipped)?;

        let folder = self.config.class_path(class);
        let file_name = naming::next_numbered_filename(
            &folder,
            self.config.crop_digits,
            &self.config.image_extension,
        )?;
        let crop_path = folder.join(file_name);
        crop.save(&crop_path)
            .map_err(|source| CaptureError::ImageSave {
                path: crop_path.clone(),
                source,
            })?;

        let bbox = rect_to_box(clipped, target.region, class);
        let label_line = format::format_line(&bbox);
        format::append_line(&target.label_path, &label_line).map_err(|source| {
            CaptureError::LabelAppendFailed {
                crop: crop_path.clone(),
                label: target.label_path.clone(),
                source,
            }
        })?;

        let handle = VisualHandle(self.next_handle);
        self.next_handle += 1;
        let committed = CommittedBox {
            handle,
            region: clipped,
            bbox,
            crop_path: crop_path.clone(),
        };
        self.committed.push(committed.clone());
        self.pending_undo = Some(PendingUndo {
            crop_path,
            label_path: target.label_path.clone(),
            label_line,
            handle,
        });

        log::info!(
            "Saved {:?} and labelled it in {:?}",
            committed.crop_path,
            target.label_path
        );
        Ok(committed)
    }

    /// Revert the most recent commit.
    ///
    /// The label line is removed only if it is still the file's last line;
    /// the crop is deleted regardless. The undo slot is always consumed.
    pub fn undo_last(&mut self) -> Result<UndoReport, CaptureError> {
        if !matches!(self.mode, Mode::Annotating(_)) {
            return Err(CaptureError::InvalidState {
                operation: "undo",
                state: self.state(),
            });
        }
        let pending = self
            .pending_undo
            .take()
            .ok_or(CaptureError::NothingToUndo)?;

        let mut report = UndoReport::default();

        match self.committed.iter().position(|b| b.handle == pending.handle) {
            Some(index) => {
                self.committed.remove(index);
            }
            None => log::warn!("Undo target {:?} missing from the visual layer", pending.handle),
        }

        match format::truncate_last_line(&pending.label_path, &pending.label_line) {
            Ok(LastLine::Removed) => report.label_line_removed = true,
            Ok(LastLine::Mismatch) => report.push(
                Notice::warning("Label file changed since the annotation; left untouched")
                    .with_path(&pending.label_path),
            ),
            Ok(LastLine::Missing) => report.push(
                Notice::warning("Label file not found").with_path(&pending.label_path),
            ),
            Err(e) => report.push(
                Notice::error(format!("Failed to update label file: {}", e))
                    .with_path(&pending.label_path),
            ),
        }

        match std::fs::remove_file(&pending.crop_path) {
            Ok(()) => report.crop_deleted = true,
            Err(e) if e.kind() == ErrorKind::NotFound => report.push(
                Notice::warning("Crop image not found").with_path(&pending.crop_path),
            ),
            Err(e) => report.push(
                Notice::error(format!("Failed to delete crop image: {}", e))
                    .with_path(&pending.crop_path),
            ),
        }

        if report.reverted_anything() {
            report.push(Notice::info("Last annotation undone"));
        } else {
            report.push(Notice::warning("Undo found nothing to revert"));
        }
        Ok(report)
    }

    fn grab(&mut self, region: PixelRect) -> Result<RgbImage, SourceError> {
        self.source
            .before_capture(Duration::from_millis(self.config.settle_delay_ms));
        let result = self.source.capture(region);
        self.source.after_capture();
        result
    }
}
