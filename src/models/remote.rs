//! Records fetched from the code host.
//!
//! Every platform backend normalizes its wire format into these types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A repository label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Label {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }
}

/// A pull request as returned by a single fetch or a search.
///
/// Search results do not carry head or base refs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    /// Login of the author.
    pub author: Option<String>,
    pub url: String,
    pub labels: Vec<Label>,
    pub head_sha: Option<String>,
    pub base_ref: Option<String>,
    pub merged_at: Option<DateTime<Utc>>,
}

/// An issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub url: String,
    pub labels: Vec<Label>,
}

/// A comment on an issue or pull request conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: u64,
    pub body: String,
    /// Login of the author, if the account still exists.
    pub author: Option<String>,
}

/// A published release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Release {
    pub tag: String,
    pub name: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Status of a file within a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Added,
    Removed,
    Modified,
    Renamed,
    Copied,
    Changed,
    Unchanged,
}

/// One entry of a pull request's changed-file list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangedFile {
    pub path: String,
    pub previous_path: Option<String>,
    pub status: FileStatus,
    /// Hunk text; absent for binary files and very large diffs.
    pub patch: Option<String>,
    pub additions: u64,
    pub deletions: u64,
}

/// A ticket from an external issue tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub identifier: String,
    pub title: String,
    pub description: Option<String>,
    pub url: Option<String>,
}
