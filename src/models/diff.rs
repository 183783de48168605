//! Parsed unified diffs.

use serde::{Deserialize, Serialize};

/// Which side(s) of the diff a line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffLineType {
    Added,
    Removed,
    Context,
}

impl DiffLineType {
    /// The single-character marker git prefixes the line with.
    pub fn marker(self) -> char {
        match self {
            DiffLineType::Added => '+',
            DiffLineType::Removed => '-',
            DiffLineType::Context => ' ',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffLine {
    pub line_type: DiffLineType,
    /// Text after the marker character.
    pub content: String,
    /// 1-based, absent for added lines.
    pub old_line_no: Option<u32>,
    /// 1-based, absent for removed lines.
    pub new_line_no: Option<u32>,
}

/// One `@@ -a,b +c,d @@` section and its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hunk {
    pub old_start: u32,
    pub old_count: u32,
    pub new_start: u32,
    pub new_count: u32,
    /// Section text git prints after the closing `@@`, usually the
    /// enclosing function signature.
    pub header: Option<String>,
    pub lines: Vec<DiffLine>,
}

/// How a file changed between the two sides of a diff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Add,
    Delete,
    #[default]
    Modify,
    Rename,
    Copy,
}

/// A diff for a single file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDiff {
    /// Path on the old side, without the `a/` prefix.
    pub old_path: String,
    /// Path on the new side, without the `b/` prefix.
    pub new_path: String,
    pub kind: ChangeKind,
    /// File mode before the change (`100644`, `100755`, ...).
    pub old_mode: Option<String>,
    /// File mode after the change.
    pub new_mode: Option<String>,
    /// Abbreviated blob id of the old side, from the `index` line.
    pub old_revision: Option<String>,
    /// Abbreviated blob id of the new side, from the `index` line.
    pub new_revision: Option<String>,
    /// Similarity percentage for renames and copies.
    pub similarity: Option<u8>,
    /// Set for `Binary files ... differ` and `GIT binary patch` entries,
    /// which never carry hunks.
    pub is_binary: bool,
    pub hunks: Vec<Hunk>,
}

impl FileDiff {
    /// Path the file is known by after the change, or before it for
    /// deletions.
    pub fn path(&self) -> &str {
        if self.kind == ChangeKind::Delete {
            &self.old_path
        } else {
            &self.new_path
        }
    }
}
