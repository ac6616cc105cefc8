//! Global constants for collectai

/// Drags narrower or shorter than this many screen pixels are discarded
pub const MIN_DRAG_PIXELS: f64 = 1.0;

/// New editor boxes must exceed this fraction of the image on both axes
pub const DEFAULT_MIN_BOX_FRACTION: f64 = 0.01;

/// Digits in target screenshot names (`00001.jpg`)
pub const DEFAULT_TARGET_DIGITS: usize = 5;

/// Digits in per-class crop names (`001.jpg`)
pub const DEFAULT_CROP_DIGITS: usize = 3;

/// Extension for captured images
pub const DEFAULT_IMAGE_EXTENSION: &str = "jpg";

/// Capture output root, relative to the working directory
pub const DEFAULT_DATASET_ROOT: &str = "ekran_goruntusu";

pub const DEFAULT_IMAGES_DIR: &str = "images";

pub const DEFAULT_LABELS_DIR: &str = "labels";

/// Pause after hiding an overlay before grabbing the screen
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 200;

/// Class mapping file, relative to the editor's working directory
pub const DEFAULT_CLASS_MAPPING_FILE: &str = "annotation_editor_config.json";

pub const DEFAULT_ZOOM_STEP: f64 = 1.2;

pub const DEFAULT_MIN_ZOOM: f64 = 0.1;

pub const DEFAULT_MAX_ZOOM: f64 = 5.0;

/// Supported image extensions
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tiff", "tif", "webp"];
