//! collectai - object-detection dataset capture and label editing
//!
//! Two workflows share one YOLO-style label format:
//!
//! - [`capture::CaptureSession`] grabs a target region from a [`capture::ScreenSource`],
//!   saves it as a numbered image and appends one normalized label line per
//!   box drawn over it, with a one-step undo.
//! - [`editor::EditingSession`] walks an existing dataset folder and lets boxes
//!   be selected, moved, deleted, relabelled and drawn, saving on navigation.
//!
//! [`classes::ClassRegistry`] maps class ids to display names and colors,
//! and [`tools`] holds the batch remap and merge utilities.

pub mod capture;
pub mod classes;
pub mod config;
pub mod constants;
pub mod editor;
pub mod format;
pub mod model;
pub mod naming;
pub mod notice;
pub mod tools;
pub mod transform;

pub use classes::ClassRegistry;
pub use config::AppConfig;
pub use model::{BoundingBox, PixelRect, Point, Rect};
pub use notice::{Notice, Severity};
