//! Plain geometry types.
//!
//! [`Point`] and [`Rect`] are frame-agnostic: the same types carry screen
//! coordinates, image pixel coordinates and normalized `[0, 1]` coordinates.
//! Each function that takes one documents which frame it expects.
//! [`PixelRect`] is the integer rectangle used for screen regions.

/// A 2D point.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle stored as min/max corners.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Rect {
    /// Create a rectangle from two arbitrary corner points (min-maxed).
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x1: a.x.min(b.x),
            y1: a.y.min(b.y),
            x2: a.x.max(b.x),
            y2: a.y.max(b.y),
        }
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    pub fn center(&self) -> Point {
        Point::new(self.x1 + self.width() / 2.0, self.y1 + self.height() / 2.0)
    }

    /// Inclusive containment test.
    pub fn contains(&self, point: Point) -> bool {
        self.x1 <= point.x && point.x <= self.x2 && self.y1 <= point.y && point.y <= self.y2
    }
}

/// An integer rectangle in screen pixels, min-maxed on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelRect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl PixelRect {
    /// Create a rectangle from two corners in any order.
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        }
    }

    /// Snap a floating-point drag rectangle to the pixel grid, rounding
    /// every coordinate down.
    pub fn from_rect(rect: Rect) -> Self {
        Self::new(
            rect.x1.floor() as i32,
            rect.y1.floor() as i32,
            rect.x2.floor() as i32,
            rect.y2.floor() as i32,
        )
    }

    /// Width in pixels; exact for any pair of `i32` edges.
    pub fn width(&self) -> u32 {
        self.x2.abs_diff(self.x1)
    }

    pub fn height(&self) -> u32 {
        self.y2.abs_diff(self.y1)
    }

    /// A rectangle with no area cannot be captured or annotated.
    pub fn is_degenerate(&self) -> bool {
        self.x2 <= self.x1 || self.y2 <= self.y1
    }

    /// Intersection with another rectangle, `None` when the overlap has no area.
    pub fn intersect(&self, other: &PixelRect) -> Option<PixelRect> {
        let clipped = PixelRect {
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
            x2: self.x2.min(other.x2),
            y2: self.y2.min(other.y2),
        };
        (!clipped.is_degenerate()).then_some(clipped)
    }
}

impl std::fmt::Display for PixelRect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {}, {})", self.x1, self.y1, self.x2, self.y2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_from_corners_any_order() {
        let rect = Rect::from_corners(Point::new(10.0, 2.0), Point::new(4.0, 8.0));
        assert_eq!(rect, Rect { x1: 4.0, y1: 2.0, x2: 10.0, y2: 8.0 });
        assert_eq!(rect.width(), 6.0);
        assert_eq!(rect.center(), Point::new(7.0, 5.0));
    }

    #[test]
    fn test_pixel_rect_min_maxed() {
        let rect = PixelRect::new(300, 300, 100, 100);
        assert_eq!(rect, PixelRect::new(100, 100, 300, 300));
        assert_eq!(rect.width(), 200);
    }

    #[test]
    fn test_pixel_rect_intersection() {
        let target = PixelRect::new(100, 100, 300, 300);

        let partial = PixelRect::new(50, 250, 150, 400);
        assert_eq!(
            partial.intersect(&target),
            Some(PixelRect::new(100, 250, 150, 300))
        );

        // Touching edges share no area
        let touching = PixelRect::new(0, 0, 100, 100);
        assert_eq!(touching.intersect(&target), None);

        let outside = PixelRect::new(0, 0, 50, 50);
        assert_eq!(outside.intersect(&target), None);
    }

    #[test]
    fn test_pixel_rect_floors_floats() {
        let rect = PixelRect::from_rect(Rect { x1: 10.9, y1: 20.2, x2: 30.7, y2: 40.0 });
        assert_eq!(rect, PixelRect::new(10, 20, 30, 40));

        // Straddling zero keeps a one-pixel extent
        let rect = PixelRect::from_rect(Rect { x1: -0.5, y1: -0.5, x2: 0.6, y2: 0.6 });
        assert_eq!(rect, PixelRect::new(-1, -1, 0, 0));
        assert!(!rect.is_degenerate());
    }

    #[test]
    fn test_pixel_rect_extent_at_i32_limits() {
        let rect = PixelRect::new(i32::MIN, i32::MIN, i32::MAX, 0);
        assert_eq!(rect.width(), u32::MAX);
        assert_eq!(rect.height(), 1u32 << 31);
        assert!(!rect.is_degenerate());
        assert_eq!(PixelRect::new(5, 5, 5, 9).width(), 0);
        assert!(PixelRect::new(5, 5, 5, 9).is_degenerate());
    }
}
