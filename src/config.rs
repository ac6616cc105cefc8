//! Configuration file support for collectai.
//!
//! The configuration is a pretty-printed JSON document. Every field has a
//! default, so a partial file (or none at all) is valid.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the configuration file format
    #[serde(default = "default_version")]
    pub version: u32,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Capture session settings
    #[serde(default)]
    pub capture: CaptureConfig,

    /// Editing session settings
    #[serde(default)]
    pub editor: EditorConfig,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

/// Capture session section of the config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Root folder that receives `images/`, `labels/` and class folders
    pub dataset_root: PathBuf,
    /// Target screenshot folder name under the root
    pub images_dir: String,
    /// Label folder name under the root
    pub labels_dir: String,
    /// Zero-padding width for target screenshot names
    pub target_digits: usize,
    /// Zero-padding width for per-class crop names
    pub crop_digits: usize,
    /// Extension (and encoder) for saved images
    pub image_extension: String,
    /// Delay for screen sources that hide an overlay before grabbing
    pub settle_delay_ms: u64,
}

impl CaptureConfig {
    pub fn images_path(&self) -> PathBuf {
        self.dataset_root.join(&self.images_dir)
    }

    pub fn labels_path(&self) -> PathBuf {
        self.dataset_root.join(&self.labels_dir)
    }

    /// Folder that receives crops for one class.
    pub fn class_path(&self, class_name: &str) -> PathBuf {
        self.dataset_root.join(class_name)
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            dataset_root: PathBuf::from(constants::DEFAULT_DATASET_ROOT),
            images_dir: constants::DEFAULT_IMAGES_DIR.to_string(),
            labels_dir: constants::DEFAULT_LABELS_DIR.to_string(),
            target_digits: constants::DEFAULT_TARGET_DIGITS,
            crop_digits: constants::DEFAULT_CROP_DIGITS,
            image_extension: constants::DEFAULT_IMAGE_EXTENSION.to_string(),
            settle_delay_ms: constants::DEFAULT_SETTLE_DELAY_MS,
        }
    }
}

/// Editing session section of the config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Class mapping JSON file
    pub class_mapping_file: PathBuf,
    /// Minimum new-box size as a fraction of the image, per axis
    pub min_box_fraction: f64,
    /// Multiplicative zoom step
    pub zoom_step: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            class_mapping_file: PathBuf::from(constants::DEFAULT_CLASS_MAPPING_FILE),
            min_box_fraction: constants::DEFAULT_MIN_BOX_FRACTION,
            zoom_step: constants::DEFAULT_ZOOM_STEP,
            min_zoom: constants::DEFAULT_MIN_ZOOM,
            max_zoom: constants::DEFAULT_MAX_ZOOM,
        }
    }
}

impl AppConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            log_level: LogLevel::default(),
            capture: CaptureConfig::default(),
            editor: EditorConfig::default(),
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        // Validate version compatibility
        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config)
    }

    /// Get the default filename for the config file.
    pub fn default_filename() -> &'static str {
        "collectai-config.json"
    }

    /// Get the default config file path.
    pub fn default_path() -> Option<PathBuf> {
        // Try to use XDG config directory, fall back to home directory
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("collectai").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("collectai")
                    .join(Self::default_filename())
            })
        }
    }

    /// Load configuration from a file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Load configuration from `path`, falling back to defaults when the file
    /// is absent or unusable.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return Self::default();
        }

        match Self::load_from_file(path) {
            Ok(config) => {
                log::info!("Loaded configuration from {:?}", path);
                config
            }
            Err(e) => {
                log::warn!("Failed to load config file {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Save configuration to a file, creating parent directories if needed.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = self.to_json()?;
        std::fs::write(path, json)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
