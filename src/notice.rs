//! User-facing status messages for non-fatal outcomes.

use std::fmt;
use std::path::{Path, PathBuf};

/// Severity level for a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Informational message, not a problem.
    Info,
    /// Something was skipped or left untouched.
    Warning,
    /// An operation failed; the user may need to reconcile files by hand.
    Error,
}

/// A message for the status surface, optionally tied to a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
    pub path: Option<PathBuf>,
}

impl Notice {
    /// Create a new notice.
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            path: None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    /// Set the path this notice relates to.
    pub fn with_path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Forward the notice to the log at the matching level.
    pub fn log(&self) {
        match self.severity {
            Severity::Info => log::info!("{}", self),
            Severity::Warning => log::warn!("{}", self),
            Severity::Error => log::error!("{}", self),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{} ({})", self.message, path.display()),
            None => f.write_str(&self.message),
        }
    }
}
