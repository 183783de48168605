//! File exclusion for diff and file contexts.
//!
//! Lockfiles and other generated files add tokens without adding signal,
//! so they are dropped before a diff or file list reaches a prompt.

use std::collections::BTreeSet;

use globset::{Glob, GlobSet, GlobSetBuilder};

/// Basenames excluded when the caller does not supply its own set.
pub const DEFAULT_EXCLUDED_FILES: &[&str] = &[
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "Cargo.lock",
];

/// A set of excluded basenames plus optional glob patterns.
#[derive(Debug, Clone)]
pub struct ExcludedFiles {
    names: BTreeSet<String>,
    patterns: GlobSet,
}

impl ExcludedFiles {
    /// Exclude exactly the given basenames.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            patterns: GlobSet::empty(),
        }
    }

    /// Exclude nothing.
    pub fn none() -> Self {
        Self::from_names(Vec::<String>::new())
    }

    /// Add glob patterns (matched against the full path).
    pub fn with_patterns(mut self, patterns: &[String]) -> Result<Self, globset::Error> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            builder.add(Glob::new(pattern)?);
        }
        self.patterns = builder.build()?;
        Ok(self)
    }

    /// Whether a single path is excluded, by basename or by pattern.
    pub fn matches(&self, path: &str) -> bool {
        let name = path.rsplit('/').next().unwrap_or(path);
        self.names.contains(name) || self.patterns.is_match(path)
    }

    /// A change is excluded when either side of it is.
    pub fn excludes(&self, old_path: &str, new_path: &str) -> bool {
        self.matches(old_path) || self.matches(new_path)
    }
}

impl Default for ExcludedFiles {
    fn default() -> Self {
        Self::from_names(DEFAULT_EXCLUDED_FILES.iter().copied())
    }
}
