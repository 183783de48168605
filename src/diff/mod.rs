//! Diff engine: unified diff parsing, serialization, and file exclusion.

pub mod exclude;
pub mod parser;
pub mod serialize;

pub use exclude::ExcludedFiles;
pub use parser::parse_unified_diff;
pub use serialize::to_unified_diff;

use crate::models::FileDiff;

/// Parse a raw diff and keep only text files that are not excluded.
///
/// Source order of files and hunks is preserved.
pub fn reviewable_files(raw: &str, excluded: &ExcludedFiles) -> Vec<FileDiff> {
    parse_unified_diff(raw)
        .into_iter()
        .filter(|file| !file.is_binary)
        .filter(|file| !excluded.excludes(&file.old_path, &file.new_path))
        .collect()
}
