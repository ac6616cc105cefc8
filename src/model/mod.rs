//! Data models shared by the capture and editing sessions.

mod bbox;
mod geometry;

pub use bbox::{BoundingBox, clamp_unit};
pub use geometry::{PixelRect, Point, Rect};
