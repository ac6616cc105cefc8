//! The normalized bounding-box record.

use super::geometry::{Point, Rect};

/// Clamp a normalized coordinate into `[0, 1]`.
pub fn clamp_unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// A bounding box in YOLO center/extent form, normalized to the owning
/// image's width and height.
///
/// `class_id` is an opaque token. It is usually a small class index such as
/// `"0"`, but capture sessions write folder names like `"car"` verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBox {
    pub class_id: String,
    pub x_center: f64,
    pub y_center: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    /// Create a box, clamping all four numeric fields into `[0, 1]`.
    pub fn new(
        class_id: impl Into<String>,
        x_center: f64,
        y_center: f64,
        width: f64,
        height: f64,
    ) -> Self {
        Self {
            class_id: class_id.into(),
            x_center: clamp_unit(x_center),
            y_center: clamp_unit(y_center),
            width: clamp_unit(width),
            height: clamp_unit(height),
        }
    }

    /// Build a box from a normalized corner rectangle.
    pub fn from_rect(class_id: impl Into<String>, rect: Rect) -> Self {
        let center = rect.center();
        Self::new(class_id, center.x, center.y, rect.width(), rect.height())
    }

    /// Return a copy with every field clamped into `[0, 1]`.
    pub fn clamped(&self) -> Self {
        Self::new(
            self.class_id.clone(),
            self.x_center,
            self.y_center,
            self.width,
            self.height,
        )
    }

    /// Normalized corner rectangle. May extend past `[0, 1]` for loaded boxes.
    pub fn rect(&self) -> Rect {
        let half_w = self.width / 2.0;
        let half_h = self.height / 2.0;
        Rect {
            x1: self.x_center - half_w,
            y1: self.y_center - half_h,
            x2: self.x_center + half_w,
            y2: self.y_center + half_h,
        }
    }

    /// Inclusive hit test against a normalized point.
    pub fn contains(&self, point: Point) -> bool {
        self.rect().contains(point)
    }

    /// Shift the center by a normalized delta, keeping the full extent inside
    /// the image. A box already poking past an edge snaps flush to it.
    pub fn translate_within_bounds(&mut self, dx: f64, dy: f64) {
        let half_w = clamp_unit(self.width) / 2.0;
        let half_h = clamp_unit(self.height) / 2.0;
        self.x_center = (self.x_center + dx).min(1.0 - half_w).max(half_w);
        self.y_center = (self.y_center + dy).min(1.0 - half_h).max(half_h);
    }
}
