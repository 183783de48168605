//! Unified diff format parser.
//!
//! Parses the unified diff a code host returns for a pull request into
//! `Vec<FileDiff>`, keeping the extended header data (modes, revisions,
//! rename/copy similarity) needed to serialize it back.

use std::iter::Peekable;
use std::str::Lines;

use crate::models::diff::{ChangeKind, DiffLine, DiffLineType, FileDiff, Hunk};

const FILE_START: &str = "diff --git ";
const HUNK_START: &str = "@@";

/// Parse a unified diff string into a list of file diffs.
///
/// Files and hunks are returned in the order they appear in the input.
/// Text before the first `diff --git` line is ignored.
pub fn parse_unified_diff(input: &str) -> Vec<FileDiff> {
    let mut files = Vec::new();
    let mut lines = input.lines().peekable();

    while let Some(line) = lines.next() {
        let Some(header) = line.strip_prefix(FILE_START) else {
            continue;
        };
        let (old_path, new_path) = split_paths(header);
        let mut file = FileDiff {
            old_path,
            new_path,
            ..FileDiff::default()
        };

        while let Some(&next) = lines.peek() {
            if next.starts_with(FILE_START) {
                break;
            }
            if next.starts_with(HUNK_START) {
                if let Some(hunk) = parse_hunk(&mut lines) {
                    file.hunks.push(hunk);
                }
                continue;
            }
            apply_extended_header(next, &mut file);
            lines.next();
        }

        files.push(file);
    }

    files
}

/// Split `a/old b/new` into its two paths.
///
/// Code hosts always emit the default `a/` and `b/` prefixes. Paths with
/// spaces are split at the last ` b/`.
fn split_paths(header: &str) -> (String, String) {
    let header = header.trim_end();
    match header.rfind(" b/") {
        Some(split) => {
            let old = &header[..split];
            let new = &header[split + 3..];
            (old.strip_prefix("a/").unwrap_or(old).to_string(), new.to_string())
        }
        None => (header.to_string(), header.to_string()),
    }
}

/// Record one extended header line (everything between `diff --git` and
/// the first hunk). Unknown lines, `---` and `+++` are ignored.
fn apply_extended_header(line: &str, file: &mut FileDiff) {
    let owned = |value: &str| Some(value.trim().to_string());

    if let Some(mode) = line.strip_prefix("new file mode ") {
        file.kind = ChangeKind::Add;
        file.new_mode = owned(mode);
    } else if let Some(mode) = line.strip_prefix("deleted file mode ") {
        file.kind = ChangeKind::Delete;
        file.old_mode = owned(mode);
    } else if let Some(mode) = line.strip_prefix("old mode ") {
        file.old_mode = owned(mode);
    } else if let Some(mode) = line.strip_prefix("new mode ") {
        file.new_mode = owned(mode);
    } else if let Some(path) = line.strip_prefix("rename from ") {
        file.kind = ChangeKind::Rename;
        file.old_path = path.to_string();
    } else if let Some(path) = line.strip_prefix("rename to ") {
        file.kind = ChangeKind::Rename;
        file.new_path = path.to_string();
    } else if let Some(path) = line.strip_prefix("copy from ") {
        file.kind = ChangeKind::Copy;
        file.old_path = path.to_string();
    } else if let Some(path) = line.strip_prefix("copy to ") {
        file.kind = ChangeKind::Copy;
        file.new_path = path.to_string();
    } else if let Some(value) = line.strip_prefix("similarity index ") {
        file.similarity = value.trim().trim_end_matches('%').parse().ok();
    } else if let Some(rest) = line.strip_prefix("index ") {
        parse_index_line(rest, file);
    } else if line.starts_with("Binary files") || line.starts_with("GIT binary patch") {
        file.is_binary = true;
    }
}

/// Parse the tail of an `index abc1234..def5678 100644` line.
///
/// The trailing mode is only present when the mode did not change, so it
/// fills whichever side is still unknown.
fn parse_index_line(rest: &str, file: &mut FileDiff) {
    let mut parts = rest.split_whitespace();
    if let Some((old, new)) = parts.next().and_then(|revs| revs.split_once("..")) {
        file.old_revision = Some(old.to_string());
        file.new_revision = Some(new.to_string());
    }
    if let Some(mode) = parts.next() {
        file.old_mode.get_or_insert_with(|| mode.to_string());
        file.new_mode.get_or_insert_with(|| mode.to_string());
    }
}

/// Parse one hunk, starting at its `@@` line.
///
/// Returns `None` (consuming only the header) when the header is malformed.
fn parse_hunk(lines: &mut Peekable<Lines<'_>>) -> Option<Hunk> {
    let mut hunk = parse_hunk_header(lines.next()?)?;
    let mut old_line = hunk.old_start;
    let mut new_line = hunk.new_start;

    while let Some(&next) = lines.peek() {
        if next.starts_with(FILE_START) || next.starts_with(HUNK_START) {
            break;
        }
        let (line_type, content) = match next.as_bytes().first() {
            Some(b'+') => (DiffLineType::Added, &next[1..]),
            Some(b'-') => (DiffLineType::Removed, &next[1..]),
            Some(b' ') => (DiffLineType::Context, &next[1..]),
            // Some hosts drop the marker of blank context lines.
            None => (DiffLineType::Context, ""),
            // "\ No newline at end of file"
            Some(b'\\') => {
                lines.next();
                continue;
            }
            Some(_) => break,
        };
        lines.next();

        let (old_no, new_no) = match line_type {
            DiffLineType::Added => (None, Some(new_line)),
            DiffLineType::Removed => (Some(old_line), None),
            DiffLineType::Context => (Some(old_line), Some(new_line)),
        };
        if old_no.is_some() {
            old_line += 1;
        }
        if new_no.is_some() {
            new_line += 1;
        }
        hunk.lines.push(DiffLine {
            line_type,
            content: content.to_string(),
            old_line_no: old_no,
            new_line_no: new_no,
        });
    }

    Some(hunk)
}

/// Parse `@@ -old_start,old_count +new_start,new_count @@ section`.
fn parse_hunk_header(line: &str) -> Option<Hunk> {
    let rest = line.strip_prefix("@@ -")?;
    let (ranges, section) = rest.split_once(" @@")?;
    let (old, new) = ranges.split_once(" +")?;
    let (old_start, old_count) = parse_range(old)?;
    let (new_start, new_count) = parse_range(new)?;
    let section = section.trim();

    Some(Hunk {
        old_start,
        old_count,
        new_start,
        new_count,
        header: (!section.is_empty()).then(|| section.to_string()),
        lines: Vec::new(),
    })
}

/// `start,count`, or `start` alone for a count of one.
fn parse_range(range: &str) -> Option<(u32, u32)> {
    match range.split_once(',') {
        Some((start, count)) => Some((start.parse().ok()?, count.parse().ok()?)),
        None => Some((range.parse().ok()?, 1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TWO_FILES: &str = "diff --git a/src/api/client.ts b/src/api/client.ts
index 3f2a1b0..9c4d2e7 100644
--- a/src/api/client.ts
+++ b/src/api/client.ts
@@ -10,4 +10,5 @@ export class Client {
   constructor(private base: string) {}
-  get(path: string) {
+  get(path: string, retries = 3) {
+    this.retries = retries;
     return fetch(this.base + path);
@@ -40,2 +41,2 @@ export class Client {
-  // old note
+  // retries are bounded
   close() {}
diff --git a/README.md b/README.md
index aaaaaaa..bbbbbbb 100644
--- a/README.md
+++ b/README.md
@@ -1 +1 @@
-# Widget
+# Widget client
";

    #[test]
    fn files_and_hunks_keep_source_order() {
        let files = parse_unified_diff(TWO_FILES);
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path(), "src/api/client.ts");
        assert_eq!(files[1].path(), "README.md");
        assert_eq!(files[0].hunks.len(), 2);
        assert_eq!(files[0].hunks[1].new_start, 41);
        assert_eq!(files[0].kind, ChangeKind::Modify);
        assert_eq!(files[0].old_revision.as_deref(), Some("3f2a1b0"));
        assert_eq!(files[0].new_revision.as_deref(), Some("9c4d2e7"));
        assert_eq!(files[0].old_mode.as_deref(), Some("100644"));
        assert_eq!(files[0].new_mode.as_deref(), Some("100644"));
    }

    #[test]
    fn hunk_lines_carry_types_and_numbers() {
        let files = parse_unified_diff(TWO_FILES);
        let hunk = &files[0].hunks[0];
        assert_eq!(hunk.header.as_deref(), Some("export class Client {"));
        assert_eq!((hunk.old_count, hunk.new_count), (4, 5));

        let summary: Vec<(DiffLineType, Option<u32>, Option<u32>)> = hunk
            .lines
            .iter()
            .map(|l| (l.line_type, l.old_line_no, l.new_line_no))
            .collect();
        assert_eq!(
            summary,
            vec![
                (DiffLineType::Context, Some(10), Some(10)),
                (DiffLineType::Removed, Some(11), None),
                (DiffLineType::Added, None, Some(11)),
                (DiffLineType::Added, None, Some(12)),
                (DiffLineType::Context, Some(12), Some(13)),
            ]
        );
        assert_eq!(hunk.lines[2].content, "  get(path: string, retries = 3) {");
        let added = files[0]
            .hunks
            .iter()
            .flat_map(|h| &h.lines)
            .filter(|l| l.line_type == DiffLineType::Added)
            .count();
        assert_eq!(added, 3);
    }

    #[test]
    fn single_line_ranges_default_count_to_one() {
        let files = parse_unified_diff(TWO_FILES);
        let hunk = &files[1].hunks[0];
        assert_eq!((hunk.old_start, hunk.old_count), (1, 1));
        assert_eq!(hunk.header, None);
    }

    #[test]
    fn added_and_deleted_files() {
        let diff = "diff --git a/docs/new.md b/docs/new.md
new file mode 100644
index 0000000..e69de29
--- /dev/null
+++ b/docs/new.md
@@ -0,0 +1,2 @@
+# New
+Text
diff --git a/scripts/old.sh b/scripts/old.sh
deleted file mode 100755
index 5b1a2c3..0000000
--- a/scripts/old.sh
+++ /dev/null
@@ -1 +0,0 @@
-echo old
";
        let files = parse_unified_diff(diff);
        assert_eq!(files[0].kind, ChangeKind::Add);
        assert_eq!(files[0].new_mode.as_deref(), Some("100644"));
        assert_eq!(files[0].old_mode, None);
        assert_eq!(files[1].kind, ChangeKind::Delete);
        assert_eq!(files[1].old_mode.as_deref(), Some("100755"));
        assert_eq!(files[1].path(), "scripts/old.sh");
    }

    #[test]
    fn renames_copies_and_mode_changes() {
        let diff = "diff --git a/lib/util.js b/lib/helpers.js
similarity index 92%
rename from lib/util.js
rename to lib/helpers.js
index 1111111..2222222 100644
diff --git a/a.txt b/a copy.txt
similarity index 100%
copy from a.txt
copy to a copy.txt
diff --git a/bin/run b/bin/run
old mode 100644
new mode 100755
";
        let files = parse_unified_diff(diff);
        assert_eq!(files.len(), 3);

        assert_eq!(files[0].kind, ChangeKind::Rename);
        assert_eq!(files[0].old_path, "lib/util.js");
        assert_eq!(files[0].new_path, "lib/helpers.js");
        assert_eq!(files[0].similarity, Some(92));
        assert!(files[0].hunks.is_empty());

        assert_eq!(files[1].kind, ChangeKind::Copy);
        assert_eq!(files[1].new_path, "a copy.txt");
        assert_eq!(files[1].similarity, Some(100));

        assert_eq!(files[2].kind, ChangeKind::Modify);
        assert_eq!(files[2].old_mode.as_deref(), Some("100644"));
        assert_eq!(files[2].new_mode.as_deref(), Some("100755"));
    }

    #[test]
    fn binary_files_are_flagged() {
        let diff = "diff --git a/img/logo.png b/img/logo.png
index 1a2b3c4..5d6e7f8 100644
Binary files a/img/logo.png and b/img/logo.png differ
diff --git a/font.woff b/font.woff
new file mode 100644
index 0000000..abc1234
GIT binary patch
literal 12
ScmZ?wbhEHbWMp7v00960
";
        let files = parse_unified_diff(diff);
        assert!(files.iter().all(|f| f.is_binary));
        assert!(files.iter().all(|f| f.hunks.is_empty()));
    }

    #[test]
    fn no_newline_marker_and_blank_context_lines() {
        let diff = "diff --git a/config.toml b/config.toml
index 1234567..89abcde 100644
--- a/config.toml
+++ b/config.toml
@@ -1,3 +1,3 @@
 [server]

-port = 80
\\ No newline at end of file
+port = 8080
\\ No newline at end of file
";
        let files = parse_unified_diff(diff);
        let lines = &files[0].hunks[0].lines;
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1].line_type, DiffLineType::Context);
        assert_eq!(lines[1].content, "");
        assert_eq!(lines[3].content, "port = 8080");
        assert_eq!(lines[3].new_line_no, Some(3));
    }

    #[test]
    fn paths_with_spaces() {
        let (old, new) = split_paths("a/My Docs/read me.md b/My Docs/read me.md");
        assert_eq!(old, "My Docs/read me.md");
        assert_eq!(new, "My Docs/read me.md");
    }

    #[test]
    fn malformed_hunk_header_is_skipped() {
        let diff = "diff --git a/x.rs b/x.rs
--- a/x.rs
+++ b/x.rs
@@ nonsense @@
+ignored
";
        let files = parse_unified_diff(diff);
        assert_eq!(files.len(), 1);
        assert!(files[0].hunks.is_empty());
    }

    #[test]
    fn empty_input_has_no_files() {
        assert!(parse_unified_diff("").is_empty());
        assert!(parse_unified_diff("not a diff\n").is_empty());
    }
}
