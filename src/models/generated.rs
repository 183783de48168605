//! Typed results of generation calls.
//!
//! Each struct is also the JSON schema handed to the model; field doc
//! comments become the schema descriptions the model sees.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Estimated size of a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    /// Touches only a few lines of code or configuration.
    Trivial,
    /// Touches a few functions across one or two files.
    Minor,
    /// A significant refactor or a large new feature.
    Major,
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Complexity::Trivial => write!(f, "trivial"),
            Complexity::Minor => write!(f, "minor"),
            Complexity::Major => write!(f, "major"),
        }
    }
}

/// Result of describing a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PullRequestDescription {
    /// Your new PR title. Do not change it if it is already good.
    pub title: String,
    /// Your estimate of the complexity of the PR.
    pub complexity: Complexity,
    /// Your new PR description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Result of labeling a pull request or issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GeneratedLabels {
    /// Names of the labels to apply.
    pub labels: Vec<String>,
}

/// Result of describing a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ReleaseDescription {
    /// The release notes.
    pub description: String,
}

/// One finding of a generated review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewFinding {
    /// The ID of the file context as given in the prompt (can be repeated
    /// if the review lines do not overlap).
    pub file_context_id: usize,
    /// The line the review is about. Be sure to include the leading "+" or
    /// "-" character if present.
    pub line: String,
    /// If the line occurs multiple times, which one is it? (0-indexed)
    #[serde(default)]
    pub occurrence: usize,
    /// The specific review feedback for the selected context. This is
    /// different from the top level comment.
    pub comment: String,
}

/// Result of reviewing a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GeneratedReview {
    /// The summary to be left on the PR as a comment. Keep it short.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// The list of reviews to be left on the PR. If a change looks good,
    /// do not include a review.
    pub reviews: Vec<ReviewFinding>,
}

/// A review finding mapped onto a diff position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineComment {
    pub path: String,
    /// Line offset into the file's patch, counted from its first hunk header.
    pub position: usize,
    pub body: String,
}
