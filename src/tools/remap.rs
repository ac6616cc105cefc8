//! Rewrite class tokens in label files.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::format::LABEL_EXTENSION;
use crate::tools::ToolError;

/// Totals from [`remap_labels`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemapReport {
    pub files_rewritten: usize,
    pub lines_remapped: usize,
}

/// Replace the class token of every label line in `dir` found in `map`.
///
/// Only `*.txt` files directly inside `dir` are touched. A remapped line is
/// re-joined with single spaces; every other line is written back as it was.
pub fn remap_labels(dir: &Path, map: &HashMap<String, String>) -> Result<RemapReport, ToolError> {
    if !dir.is_dir() {
        return Err(ToolError::MissingDirectory(dir.to_path_buf()));
    }

    let mut files: Vec<_> = fs::read_dir(dir)
        .map_err(|e| ToolError::io(dir, e))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file() && p.extension().and_then(|e| e.to_str()) == Some(LABEL_EXTENSION)
        })
        .collect();
    files.sort();

    let mut report = RemapReport::default();
    for path in files {
        let content = fs::read_to_string(&path).map_err(|e| ToolError::io(&path, e))?;
        let (rewritten, remapped) = remap_content(&content, map);
        if remapped == 0 {
            continue;
        }

        fs::write(&path, rewritten).map_err(|e| ToolError::io(&path, e))?;
        log::info!("Remapped {} line(s) in {:?}", remapped, path);
        report.files_rewritten += 1;
        report.lines_remapped += remapped;
    }

    Ok(report)
}

fn remap_content(content: &str, map: &HashMap<String, String>) -> (String, usize) {
    let mut out = String::with_capacity(content.len());
    let mut remapped = 0;

    for line in content.split_inclusive('\n') {
        let mut tokens = line.split_whitespace();
        match tokens.next().and_then(|first| map.get(first)) {
            Some(replacement) => {
                let rest: Vec<&str> = tokens.collect();
                out.push_str(replacement);
                for token in rest {
                    out.push(' ');
                    out.push_str(token);
                }
                out.push('\n');
                remapped += 1;
            }
            None => out.push_str(line),
        }
    }

    (out, remapped)
}
