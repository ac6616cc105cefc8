//! YOLO label-file format.
//!
//! Every image owns one `.txt` label file with the same base name, stored in
//! a `labels/` tree parallel to the `images/` tree. Each line is one box:
//!
//! ```text
//! <class_id> <x_center> <y_center> <width> <height>
//! ```
//!
//! Floats are written with six decimals. Reading is tolerant: any whitespace
//! separates tokens, tokens past the fifth are ignored, and lines that do not
//! parse are skipped. Because [`save`] rewrites the whole file, a load/save
//! cycle drops those skipped lines.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use collectai::format;
//!
//! let mut boxes = format::load(&label_path)?;
//! boxes.push(BoundingBox::new("0", 0.5, 0.5, 0.2, 0.2));
//! format::save(&label_path, &boxes)?;
//! ```

mod error;
mod yolo;

pub use error::FormatError;
pub use yolo::{
    LABEL_EXTENSION, LastLine, append_line, format_line, label_path_for, load, parse_line, save,
    truncate_last_line,
};
