//! Editing session controller.

use std::path::{Path, PathBuf};

use crate::classes::ClassRegistry;
use crate::config::EditorConfig;
use crate::editor::{DatasetLayout, EditError};
use crate::format;
use crate::model::{BoundingBox, Point, Rect};
use crate::transform::{ViewTransform, from_normalized, to_normalized};

/// Asks the user which class a freshly drawn box belongs to.
///
/// `None` cancels the new box.
pub trait ClassChooser {
    fn choose_class(&mut self) -> Option<String>;
}

impl<F> ClassChooser for F
where
    F: FnMut() -> Option<String>,
{
    fn choose_class(&mut self) -> Option<String> {
        self()
    }
}

/// One box as it should be drawn, rebuilt from the working list on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxOverlay {
    pub index: usize,
    /// Screen-space rectangle after zoom and pan
    pub rect: Rect,
    pub label: String,
    pub color: [u8; 3],
    pub selected: bool,
}

/// What a pointer press did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressOutcome {
    /// No image, or the press landed outside it
    Ignored,
    /// A box was hit and can now be dragged
    Selected(usize),
    /// A new box is being drawn
    Drawing,
    /// Empty area; selection cleared
    Deselected,
}

#[derive(Debug, Clone)]
struct LoadedImage {
    path: PathBuf,
    label_path: PathBuf,
    width: u32,
    height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Gesture {
    None,
    /// Normalized corners of the box being drawn
    Drawing { start: Point, current: Point },
    /// Normalized position of the last drag event
    Moving { index: usize, last: Point },
}

/// Working copy of one image's annotations plus navigation over a dataset.
pub struct EditingSession {
    config: EditorConfig,
    dataset: Option<DatasetLayout>,
    index: usize,
    current: Option<LoadedImage>,
    annotations: Vec<BoundingBox>,
    selected: Option<usize>,
    view: ViewTransform,
    new_armed: bool,
    gesture: Gesture,
}

impl EditingSession {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            config,
            dataset: None,
            index: 0,
            current: None,
            annotations: Vec::new(),
            selected: None,
            view: ViewTransform::identity(),
            new_armed: false,
            gesture: Gesture::None,
        }
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Open a dataset folder and load its first image. Returns the image count.
    ///
    /// If the first image cannot be read the dataset stays open with nothing
    /// loaded, so navigation can still move past it.
    pub fn open_dataset(&mut self, folder: &Path) -> Result<usize, EditError> {
        let layout = DatasetLayout::open(folder)?;
        let first = layout.images[0].clone();
        let count = layout.images.len();
        self.dataset = Some(layout);
        self.index = 0;
        self.unload();
        self.load_image(&first)?;
        Ok(count)
    }

    /// Load an image and its label file, replacing the working list.
    ///
    /// The label file comes from the dataset's labels root, or from the
    /// image's own folder when no dataset is open. A missing label file means
    /// no boxes. Nothing changes if the image cannot be read.
    pub fn load_image(&mut self, path: &Path) -> Result<(), EditError> {
        let (width, height) =
            image::image_dimensions(path).map_err(|source| EditError::ImageRead {
                path: path.to_path_buf(),
                source,
            })?;
        if width == 0 || height == 0 {
            return Err(EditError::EmptyImage(path.to_path_buf()));
        }

        let label_path = match &self.dataset {
            Some(dataset) => dataset.label_path_for(path),
            None => format::label_path_for(path.parent().unwrap_or(Path::new("")), path),
        };
        let annotations = format::load(&label_path)?;

        if let Some(index) = self
            .dataset
            .as_ref()
            .and_then(|d| d.images.iter().position(|p| p == path))
        {
            self.index = index;
        }

        log::info!(
            "Loaded {:?} ({}x{}) with {} annotation(s)",
            path,
            width,
            height,
            annotations.len()
        );

        self.current = Some(LoadedImage {
            path: path.to_path_buf(),
            label_path,
            width,
            height,
        });
        self.annotations = annotations;
        self.selected = None;
        self.new_armed = false;
        self.gesture = Gesture::None;
        self.reset_view();
        Ok(())
    }

    pub fn dataset(&self) -> Option<&DatasetLayout> {
        self.dataset.as_ref()
    }

    pub fn current_image(&self) -> Option<&Path> {
        self.current.as_ref().map(|c| c.path.as_path())
    }

    pub fn label_path(&self) -> Option<&Path> {
        self.current.as_ref().map(|c| c.label_path.as_path())
    }

    /// Pixel size of the loaded image.
    pub fn image_size(&self) -> Option<(u32, u32)> {
        self.current.as_ref().map(|c| (c.width, c.height))
    }

    pub fn annotations(&self) -> &[BoundingBox] {
        &self.annotations
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Zero-based index in the dataset and the dataset size. The index is
    /// kept even when the image there failed to load.
    pub fn position(&self) -> Option<(usize, usize)> {
        self.dataset
            .as_ref()
            .map(|dataset| (self.index, dataset.images.len()))
    }

    // ------------------------------------------------------------------
    // Selection and editing
    // ------------------------------------------------------------------

    /// First box in list order containing the normalized point.
    pub fn hit_test(&self, point: Point) -> Option<usize> {
        self.annotations.iter().position(|b| b.contains(point))
    }

    /// Select the box under a normalized point, clearing selection on a miss.
    pub fn select_at(&mut self, point: Point) -> Option<usize> {
        self.selected = self.hit_test(point);
        self.selected
    }

    /// Select by index, e.g. from a list view.
    pub fn select(&mut self, index: Option<usize>) -> Result<(), EditError> {
        if let Some(i) = index {
            self.check_index(i)?;
        }
        self.selected = index;
        Ok(())
    }

    /// Shift the selected box by a normalized delta, keeping it inside the
    /// image. Returns `false` when nothing is selected.
    pub fn move_selected(&mut self, dx: f64, dy: f64) -> bool {
        match self.selected.and_then(|i| self.annotations.get_mut(i)) {
            Some(bbox) => {
                bbox.translate_within_bounds(dx, dy);
                true
            }
            None => false,
        }
    }

    /// Arm drawing: the next press on empty image area starts a new box.
    pub fn begin_new_annotation(&mut self) -> Result<(), EditError> {
        if self.current.is_none() {
            return Err(EditError::NoImageLoaded);
        }
        log::debug!("New annotation armed");
        self.new_armed = true;
        Ok(())
    }

    /// Drop an armed or half-drawn box. Returns whether anything was dropped.
    pub fn cancel_new_annotation(&mut self) -> bool {
        let drawing = matches!(self.gesture, Gesture::Drawing { .. });
        if drawing {
            self.gesture = Gesture::None;
        }
        let was_armed = std::mem::take(&mut self.new_armed);
        was_armed || drawing
    }

    pub fn is_drawing_armed(&self) -> bool {
        self.new_armed
    }

    /// Remove the selected box; selection becomes none.
    pub fn delete_selected(&mut self) -> Option<BoundingBox> {
        let index = self.selected.take()?;
        if index >= self.annotations.len() {
            return None;
        }
        if matches!(self.gesture, Gesture::Moving { .. }) {
            self.gesture = Gesture::None;
        }
        Some(self.annotations.remove(index))
    }

    pub fn change_class(&mut self, index: usize, class_id: &str) -> Result<(), EditError> {
        self.check_index(index)?;
        let class_id = class_id.trim();
        if class_id.is_empty() {
            return Err(EditError::EmptyClassId);
        }
        let bbox = &mut self.annotations[index];
        log::debug!("Annotation {}: class {} -> {}", index, bbox.class_id, class_id);
        bbox.class_id = class_id.to_string();
        Ok(())
    }

    /// Overwrite the label file with the working list.
    pub fn save(&self) -> Result<(), EditError> {
        let current = self.current.as_ref().ok_or(EditError::NoImageLoaded)?;
        format::save(&current.label_path, &self.annotations)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// Save, then load the next image. `Ok(false)` at the end of the list.
    pub fn next(&mut self) -> Result<bool, EditError> {
        self.navigate_to(self.index.checked_add(1))
    }

    /// Save, then load the previous image. `Ok(false)` at the start.
    pub fn prev(&mut self) -> Result<bool, EditError> {
        self.navigate_to(self.index.checked_sub(1))
    }

    /// Move to `target`, saving the loaded image first.
    ///
    /// A failed save keeps the session where it was. A failed load still
    /// moves the index, leaving nothing loaded at the new position.
    fn navigate_to(&mut self, target: Option<usize>) -> Result<bool, EditError> {
        let Some((index, path)) = self.dataset.as_ref().zip(target).and_then(|(dataset, i)| {
            dataset.images.get(i).map(|path| (i, path.clone()))
        }) else {
            return Ok(false);
        };

        if self.current.is_some() {
            self.save()?;
        }
        self.index = index;
        self.unload();
        self.load_image(&path)?;
        Ok(true)
    }

    /// Forget the loaded image so a later save cannot write stale boxes.
    fn unload(&mut self) {
        self.current = None;
        self.annotations.clear();
        self.selected = None;
        self.new_armed = false;
        self.gesture = Gesture::None;
    }

    // ------------------------------------------------------------------
    // View
    // ------------------------------------------------------------------

    pub fn view(&self) -> ViewTransform {
        self.view
    }

    pub fn zoom_in(&mut self) {
        self.view = self.view.zoom_in(self.config.zoom_step, self.config.max_zoom);
    }

    pub fn zoom_out(&mut self) {
        self.view = self.view.zoom_out(self.config.zoom_step, self.config.min_zoom);
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.view = self.view.pan_by(dx, dy);
    }

    pub fn reset_view(&mut self) {
        self.view = ViewTransform::identity();
    }

    /// Screen-space overlays for every box, in list order.
    pub fn overlays(&self, classes: &ClassRegistry) -> Vec<BoxOverlay> {
        let Some(size) = self.image_size() else {
            return Vec::new();
        };
        self.annotations
            .iter()
            .enumerate()
            .map(|(index, bbox)| BoxOverlay {
                index,
                rect: self.to_screen_rect(bbox.rect(), size),
                label: classes.resolve(&bbox.class_id),
                color: classes.color_for(&bbox.class_id),
                selected: self.selected == Some(index),
            })
            .collect()
    }

    /// Screen-space preview of the box being drawn.
    pub fn preview(&self) -> Option<Rect> {
        let size = self.image_size()?;
        match self.gesture {
            Gesture::Drawing { start, current } => {
                Some(self.to_screen_rect(Rect::from_corners(start, current), size))
            }
            _ => None,
        }
    }

    fn to_screen_rect(&self, normalized: Rect, size: (u32, u32)) -> Rect {
        let a = from_normalized(Point::new(normalized.x1, normalized.y1), size);
        let b = from_normalized(Point::new(normalized.x2, normalized.y2), size);
        Rect::from_corners(self.view.image_to_screen(a), self.view.image_to_screen(b))
    }

    // ------------------------------------------------------------------
    // Pointer
    // ------------------------------------------------------------------

    /// Handle a button press at a screen position.
    ///
    /// A hit selects the box and starts moving it, even when drawing is
    /// armed. A miss starts drawing if armed, otherwise clears selection.
    pub fn press(&mut self, screen: Point) -> PressOutcome {
        let Some(size) = self.image_size() else {
            return PressOutcome::Ignored;
        };
        let image = self.view.screen_to_image(screen);
        let inside = image.x >= 0.0
            && image.y >= 0.0
            && image.x < f64::from(size.0)
            && image.y < f64::from(size.1);
        if !inside {
            return PressOutcome::Ignored;
        }

        let point = to_normalized(image, size);
        if let Some(index) = self.select_at(point) {
            self.gesture = Gesture::Moving { index, last: point };
            PressOutcome::Selected(index)
        } else if self.new_armed {
            self.gesture = Gesture::Drawing {
                start: point,
                current: point,
            };
            PressOutcome::Drawing
        } else {
            PressOutcome::Deselected
        }
    }

    /// Handle pointer motion with the button held.
    pub fn drag(&mut self, screen: Point) {
        let Some(point) = self.clamped_normalized(screen) else {
            return;
        };
        match &mut self.gesture {
            Gesture::None => {}
            Gesture::Drawing { current, .. } => *current = point,
            Gesture::Moving { index, last } => {
                let (dx, dy) = (point.x - last.x, point.y - last.y);
                *last = point;
                if let Some(bbox) = self.annotations.get_mut(*index) {
                    bbox.translate_within_bounds(dx, dy);
                }
            }
        }
    }

    /// Handle the button release. When a draw finishes above the minimum size
    /// the chooser is asked for a class; returns the index of the added box.
    pub fn release(&mut self, screen: Point, chooser: &mut impl ClassChooser) -> Option<usize> {
        self.drag(screen);
        let gesture = std::mem::replace(&mut self.gesture, Gesture::None);

        let Gesture::Drawing { start, current } = gesture else {
            return None;
        };
        self.new_armed = false;

        let rect = Rect::from_corners(start, current);
        let min = self.config.min_box_fraction;
        if rect.width() <= min || rect.height() <= min {
            log::debug!(
                "New box {:.4}x{:.4} below minimum {}, discarded",
                rect.width(),
                rect.height(),
                min
            );
            return None;
        }

        let class_id = chooser.choose_class()?;
        let class_id = class_id.trim();
        if class_id.is_empty() {
            return None;
        }

        self.annotations.push(BoundingBox::from_rect(class_id, rect));
        let index = self.annotations.len() - 1;
        self.selected = Some(index);
        log::debug!("Added annotation {} with class {}", index, class_id);
        Some(index)
    }

    fn clamped_normalized(&self, screen: Point) -> Option<Point> {
        let size = self.image_size()?;
        let image = self.view.screen_to_image(screen);
        let clamped = Point::new(
            image.x.clamp(0.0, f64::from(size.0)),
            image.y.clamp(0.0, f64::from(size.1)),
        );
        Some(to_normalized(clamped, size))
    }

    fn check_index(&self, index: usize) -> Result<(), EditError> {
        if index < self.annotations.len() {
            Ok(())
        } else {
            Err(EditError::IndexOutOfRange {
                index,
                len: self.annotations.len(),
            })
        }
    }
}
