//! Render parsed file diffs back into git's unified diff format.
//!
//! The output feeds the diff prompt and is later searched by the review
//! line mapper, so it must be byte-stable for a given input: files and
//! hunks keep their parsed order and nothing is reflowed.

use crate::models::diff::{ChangeKind, FileDiff, Hunk};

/// Similarity reported for renames and copies whose index was not parsed.
const DEFAULT_SIMILARITY: u8 = 100;

/// Serialize file diffs into a single unified diff.
///
/// Files are joined with a newline; the result has no trailing newline.
pub fn to_unified_diff(files: &[FileDiff]) -> String {
    files
        .iter()
        .map(serialize_file)
        .collect::<Vec<_>>()
        .join("\n")
}

fn serialize_file(file: &FileDiff) -> String {
    let mut out: Vec<String> = Vec::new();

    out.push(format!("diff --git a/{} b/{}", file.old_path, file.new_path));

    match file.kind {
        ChangeKind::Add => {
            if let Some(mode) = &file.new_mode {
                out.push(format!("new file mode {mode}"));
            }
        }
        ChangeKind::Delete => {
            if let Some(mode) = &file.old_mode {
                out.push(format!("deleted file mode {mode}"));
            }
        }
        ChangeKind::Modify | ChangeKind::Rename | ChangeKind::Copy => {
            if let (Some(old), Some(new)) = (&file.old_mode, &file.new_mode) {
                if old != new {
                    out.push(format!("old mode {old}"));
                    out.push(format!("new mode {new}"));
                }
            }
        }
    }

    if matches!(file.kind, ChangeKind::Rename | ChangeKind::Copy) {
        let verb = if file.kind == ChangeKind::Rename {
            "rename"
        } else {
            "copy"
        };
        out.push(format!(
            "similarity index {}%",
            file.similarity.unwrap_or(DEFAULT_SIMILARITY)
        ));
        out.push(format!("{verb} from {}", file.old_path));
        out.push(format!("{verb} to {}", file.new_path));
    }

    if let (Some(old), Some(new)) = (&file.old_revision, &file.new_revision) {
        match unchanged_mode(file) {
            Some(mode) => out.push(format!("index {old}..{new} {mode}")),
            None => out.push(format!("index {old}..{new}")),
        }
    }

    if file.kind == ChangeKind::Add {
        out.push("--- /dev/null".to_string());
    } else {
        out.push(format!("--- a/{}", file.old_path));
    }

    if file.kind == ChangeKind::Delete {
        out.push("+++ /dev/null".to_string());
    } else {
        out.push(format!("+++ b/{}", file.new_path));
    }

    for hunk in &file.hunks {
        serialize_hunk(hunk, &mut out);
    }

    out.join("\n")
}

/// The mode git appends to the `index` line: only when it did not change.
fn unchanged_mode(file: &FileDiff) -> Option<&str> {
    match file.kind {
        ChangeKind::Add | ChangeKind::Delete => None,
        _ => match (&file.old_mode, &file.new_mode) {
            (Some(old), Some(new)) if old == new => Some(new.as_str()),
            _ => None,
        },
    }
}

fn serialize_hunk(hunk: &Hunk, out: &mut Vec<String>) {
    let mut header = format!(
        "@@ -{},{} +{},{} @@",
        hunk.old_start, hunk.old_count, hunk.new_start, hunk.new_count
    );
    if let Some(text) = hunk.header.as_deref().filter(|t| !t.is_empty()) {
        header.push(' ');
        header.push_str(text);
    }
    out.push(header);

    for line in &hunk.lines {
        out.push(format!("{}{}", line.line_type.marker(), line.content));
    }
}
