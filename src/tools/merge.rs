//! Merge two capture trees with renumbering.

use std::fs;
use std::path::{Path, PathBuf};

use crate::naming::{NumberedFile, scan_numbered};
use crate::notice::Notice;
use crate::tools::ToolError;

/// Outcome of [`merge_trees`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeReport {
    /// Primary files copied under their own names
    pub copied: usize,
    /// Secondary files copied under new numbers
    pub renumbered: usize,
    /// Files left alone because the target name was taken
    pub skipped: Vec<Notice>,
}

/// Merge `secondary` into `target` alongside `primary`.
///
/// The directory structure follows `primary`. In each directory the primary's
/// numbered files keep their names and the secondary's files of the same
/// relative directory continue the sequence after the primary's highest
/// number, padded to the primary's width. Existing target files are never
/// overwritten and non-numbered files are ignored.
pub fn merge_trees(
    primary: &Path,
    secondary: &Path,
    target: &Path,
) -> Result<MergeReport, ToolError> {
    if !primary.is_dir() {
        return Err(ToolError::MissingDirectory(primary.to_path_buf()));
    }

    let mut relative_dirs = vec![PathBuf::new()];
    collect_dirs(primary, Path::new(""), &mut relative_dirs)?;

    let mut report = MergeReport::default();
    for relative in &relative_dirs {
        let target_dir = target.join(relative);
        fs::create_dir_all(&target_dir).map_err(|e| ToolError::io(&target_dir, e))?;
        merge_dir(
            &primary.join(relative),
            &secondary.join(relative),
            &target_dir,
            &mut report,
        )?;
    }

    log::info!(
        "Merged into {:?}: {} copied, {} renumbered, {} skipped",
        target,
        report.copied,
        report.renumbered,
        report.skipped.len()
    );
    Ok(report)
}

fn collect_dirs(root: &Path, relative: &Path, out: &mut Vec<PathBuf>) -> Result<(), ToolError> {
    let folder = root.join(relative);
    let mut children: Vec<PathBuf> = fs::read_dir(&folder)
        .map_err(|e| ToolError::io(&folder, e))?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .map(|e| relative.join(e.file_name()))
        .collect();
    children.sort();

    for child in children {
        out.push(child.clone());
        collect_dirs(root, &child, out)?;
    }
    Ok(())
}

fn merge_dir(
    primary: &Path,
    secondary: &Path,
    target: &Path,
    report: &mut MergeReport,
) -> Result<(), ToolError> {
    let primary_files = scan_numbered(primary)?;
    let secondary_files = scan_numbered(secondary)?;

    for file in &primary_files {
        if copy_new(&primary.join(&file.file_name), &target.join(&file.file_name), report)? {
            report.copied += 1;
        }
    }

    if secondary_files.is_empty() {
        return Ok(());
    }

    let (highest, width) = match primary_files.last() {
        Some(last) => (last.number, last.width),
        None => (0, minimal_width(secondary_files.len())),
    };

    for (offset, file) in secondary_files.iter().enumerate() {
        let number = highest + 1 + offset as u64;
        let new_name = renumbered_name(number, width, file);
        if copy_new(&secondary.join(&file.file_name), &target.join(&new_name), report)? {
            log::debug!("{:?}: {} -> {}", secondary, file.file_name, new_name);
            report.renumbered += 1;
        }
    }
    Ok(())
}

/// Digits needed to write `count`.
fn minimal_width(count: usize) -> usize {
    count.max(1).to_string().len()
}

fn renumbered_name(number: u64, width: usize, file: &NumberedFile) -> String {
    format!("{:0width$}{}", number, file.extension, width = width)
}

/// Copy unless `to` exists; a skip is recorded as a warning.
fn copy_new(from: &Path, to: &Path, report: &mut MergeReport) -> Result<bool, ToolError> {
    if to.exists() {
        let notice = Notice::warning("Target file already exists, skipped").with_path(to);
        notice.log();
        report.skipped.push(notice);
        return Ok(false);
    }
    fs::copy(from, to).map_err(|e| ToolError::io(from, e))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn names(folder: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(folder)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_secondary_continues_primary_numbering() {
        let dir = tempfile::tempdir().unwrap();
        let (a, b, out) = (dir.path().join("a"), dir.path().join("b"), dir.path().join("out"));

        touch(&a.join("images").join("00001.jpg"), "a1");
        touch(&a.join("images").join("00002.jpg"), "a2");
        touch(&a.join("images").join("notes.txt"), "ignored");
        touch(&b.join("images").join("00001.jpg"), "b1");
        touch(&b.join("images").join("00007.jpg"), "b7");

        let report = merge_trees(&a, &b, &out).unwrap();
        assert_eq!(report.copied, 2);
        assert_eq!(report.renumbered, 2);
        assert!(report.skipped.is_empty());

        assert_eq!(
            names(&out.join("images")),
            vec!["00001.jpg", "00002.jpg", "00003.jpg", "00004.jpg"]
        );
        assert_eq!(fs::read_to_string(out.join("images").join("00003.jpg")).unwrap(), "b1");
        assert_eq!(fs::read_to_string(out.join("images").join("00004.jpg")).unwrap(), "b7");
    }

    #[test]
    fn test_labels_keep_their_extension() {
        let dir = tempfile::tempdir().unwrap();
        let (a, b, out) = (dir.path().join("a"), dir.path().join("b"), dir.path().join("out"));

        touch(&a.join("labels").join("00005.txt"), "a");
        touch(&b.join("labels").join("00001.txt"), "b");

        merge_trees(&a, &b, &out).unwrap();
        assert_eq!(names(&out.join("labels")), vec!["00005.txt", "00006.txt"]);
    }

    #[test]
    fn test_empty_primary_folder_uses_minimal_width() {
        let dir = tempfile::tempdir().unwrap();
        let (a, b, out) = (dir.path().join("a"), dir.path().join("b"), dir.path().join("out"));

        fs::create_dir_all(a.join("car")).unwrap();
        for n in 1..=12 {
            touch(&b.join("car").join(format!("{:03}.jpg", n)), "x");
        }
        // Folders only in the secondary tree are not merged
        touch(&b.join("only_b").join("001.jpg"), "x");

        let report = merge_trees(&a, &b, &out).unwrap();
        assert_eq!(report.renumbered, 12);
        let merged = names(&out.join("car"));
        assert_eq!(merged.first().unwrap(), "01.jpg");
        assert_eq!(merged.last().unwrap(), "12.jpg");
        assert!(!out.join("only_b").exists());
    }

    #[test]
    fn test_existing_target_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let (a, b, out) = (dir.path().join("a"), dir.path().join("b"), dir.path().join("out"));

        touch(&a.join("001.jpg"), "a1");
        touch(&b.join("001.jpg"), "b1");
        touch(&out.join("002.jpg"), "existing");

        let report = merge_trees(&a, &b, &out).unwrap();
        assert_eq!(report.copied, 1);
        assert_eq!(report.renumbered, 0);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].path.as_deref(), Some(out.join("002.jpg").as_path()));
        assert_eq!(fs::read_to_string(out.join("002.jpg")).unwrap(), "existing");
    }

    #[test]
    fn test_missing_primary() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            merge_trees(&dir.path().join("a"), dir.path(), &dir.path().join("out")),
            Err(ToolError::MissingDirectory(_))
        ));
    }

    #[test]
    fn test_minimal_width() {
        assert_eq!(minimal_width(0), 1);
        assert_eq!(minimal_width(9), 1);
        assert_eq!(minimal_width(10), 2);
        assert_eq!(minimal_width(120), 3);
    }
}
