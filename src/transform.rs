//! Coordinate transforms between screen, image and normalized space.
//!
//! The two sessions use different reference frames. Capture crops the screen
//! to a target region first and normalizes boxes against that region
//! ([`clip_to_region`], [`rect_to_box`]). Editing works on an already-cropped
//! image and normalizes against the full image extent ([`screen_to_image`],
//! [`to_normalized`]); zoom and pan are display-only and are inverted before
//! normalizing.

use crate::model::{BoundingBox, PixelRect, Point, clamp_unit};

/// Divide an image-space point by the image extent.
pub fn to_normalized(point: Point, extent: (u32, u32)) -> Point {
    let (width, height) = extent;
    Point::new(point.x / f64::from(width), point.y / f64::from(height))
}

/// Multiply a normalized point by the image extent.
pub fn from_normalized(point: Point, extent: (u32, u32)) -> Point {
    let (width, height) = extent;
    Point::new(point.x * f64::from(width), point.y * f64::from(height))
}

/// Intersect a raw drag rectangle with the target region.
///
/// Returns `None` (reject, no annotation) when the intersection has no area.
pub fn clip_to_region(raw: PixelRect, target: PixelRect) -> Option<PixelRect> {
    raw.intersect(&target)
}

/// Convert a clipped screen rectangle into a box normalized against the
/// target region.
pub fn rect_to_box(clipped: PixelRect, target: PixelRect, class_id: &str) -> BoundingBox {
    let target_w = f64::from(target.width());
    let target_h = f64::from(target.height());
    let box_w = f64::from(clipped.width());
    let box_h = f64::from(clipped.height());

    let center_x = f64::from(clipped.x1) + box_w / 2.0 - f64::from(target.x1);
    let center_y = f64::from(clipped.y1) + box_h / 2.0 - f64::from(target.y1);

    BoundingBox::new(
        class_id,
        clamp_unit(center_x / target_w),
        clamp_unit(center_y / target_h),
        clamp_unit(box_w / target_w),
        clamp_unit(box_h / target_h),
    )
}

/// `(event_point - pan) / zoom`.
pub fn screen_to_image(event: Point, pan: Point, zoom: f64) -> Point {
    Point::new((event.x - pan.x) / zoom, (event.y - pan.y) / zoom)
}

/// `image_point * zoom + pan`.
pub fn image_to_screen(image: Point, pan: Point, zoom: f64) -> Point {
    Point::new(image.x * zoom + pan.x, image.y * zoom + pan.y)
}

/// Pan/zoom state of the editing canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub zoom: f64,
    pub pan_x: f64,
    pub pan_y: f64,
}

impl ViewTransform {
    /// Create a new transform with the given zoom and pan.
    pub fn new(zoom: f64, pan_x: f64, pan_y: f64) -> Self {
        Self { zoom, pan_x, pan_y }
    }

    /// Create an identity transform (zoom=1, no pan).
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0)
    }

    pub fn pan(&self) -> Point {
        Point::new(self.pan_x, self.pan_y)
    }

    /// Apply a pan delta to the transform.
    pub fn pan_by(&self, dx: f64, dy: f64) -> ViewTransform {
        ViewTransform {
            zoom: self.zoom,
            pan_x: self.pan_x + dx,
            pan_y: self.pan_y + dy,
        }
    }

    /// Zoom in by a factor (e.g., 1.2 for 20% zoom in).
    pub fn zoom_in(&self, factor: f64, max_zoom: f64) -> ViewTransform {
        ViewTransform {
            zoom: (self.zoom * factor).min(max_zoom),
            ..*self
        }
    }

    /// Zoom out by a factor (e.g., 1.2 for 20% zoom out).
    pub fn zoom_out(&self, factor: f64, min_zoom: f64) -> ViewTransform {
        ViewTransform {
            zoom: (self.zoom / factor).max(min_zoom),
            ..*self
        }
    }

    pub fn screen_to_image(&self, event: Point) -> Point {
        screen_to_image(event, self.pan(), self.zoom)
    }

    pub fn image_to_screen(&self, image: Point) -> Point {
        image_to_screen(image, self.pan(), self.zoom)
    }
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::identity()
    }
}
