//! Single-slot undo for the capture session.

use std::path::PathBuf;

use crate::notice::Notice;

/// Identifies one committed rectangle in the session's visual layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VisualHandle(pub(crate) u64);

/// Artifacts of the most recently committed annotation.
///
/// Set right after a successful label append, consumed by undo, and dropped
/// whenever a new target selection starts.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingUndo {
    pub crop_path: PathBuf,
    pub label_path: PathBuf,
    /// Exact text that was appended, trailing newline included
    pub label_line: String,
    pub handle: VisualHandle,
}

/// What an undo actually reverted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UndoReport {
    pub label_line_removed: bool,
    pub crop_deleted: bool,
    pub notices: Vec<Notice>,
}

impl UndoReport {
    /// True when at least one artifact was reverted.
    pub fn reverted_anything(&self) -> bool {
        self.label_line_removed || self.crop_deleted
    }

    pub(crate) fn push(&mut self, notice: Notice) {
        notice.log();
        self.notices.push(notice);
    }
}
