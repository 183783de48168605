//! Applying generation results to the code host.
//!
//! Nothing here runs unless the caller opted into a write.

use std::sync::Arc;

use indexmap::IndexSet;
use tracing::{info, warn};

use crate::constants::REVIEW_TAG;
use crate::models::remote::Comment;
use crate::models::{InlineComment, IssueRef, WriteMode};
use crate::remote::{PullRequestUpdate, RemoteError, RemotePlatform, ReviewSubmission};

/// Body of a review with no surviving inline comments.
pub const LGTM: &str = "LGTM";

/// Body of a review with inline comments but no summary.
pub const DEFAULT_REVIEW_SUMMARY: &str = "Some notes";

/// Writes results back to one code host.
#[derive(Clone)]
pub struct RemoteWriter {
    remote: Arc<dyn RemotePlatform>,
}

impl RemoteWriter {
    pub fn new(remote: Arc<dyn RemotePlatform>) -> Self {
        Self { remote }
    }

    /// Update a pull request's title and/or body.
    pub async fn update_pr(
        &self,
        target: &IssueRef,
        update: &PullRequestUpdate,
    ) -> Result<(), RemoteError> {
        if update.is_empty() {
            return Ok(());
        }
        info!(
            pr = %target,
            title = update.title.is_some(),
            body = update.body.is_some(),
            "updating pull request"
        );
        self.remote
            .update_pull_request(&target.repo, target.number, update)
            .await
    }

    /// Create or update the single comment carrying `tag`.
    ///
    /// Only comments by the authenticated user are considered when the
    /// user can be resolved. The tag is appended to `body` if missing.
    pub async fn upsert_comment(
        &self,
        target: &IssueRef,
        body: &str,
        tag: &str,
    ) -> Result<Comment, RemoteError> {
        let body = if body.contains(tag) {
            body.to_string()
        } else {
            format!("{body}\n\n{tag}")
        };

        let user = match self.remote.authenticated_user().await {
            Ok(user) => user,
            Err(e) => {
                warn!("could not resolve authenticated user: {e}");
                None
            }
        };
        let comments = self.remote.comments(&target.repo, target.number).await?;
        let existing = comments.iter().find(|comment| {
            comment.body.contains(tag)
                && user
                    .as_deref()
                    .is_none_or(|login| comment.author.as_deref() == Some(login))
        });

        match existing {
            Some(comment) => {
                info!(target = %target, comment_id = comment.id, "updating tagged comment");
                self.remote
                    .update_comment(&target.repo, comment.id, &body)
                    .await
            }
            None => {
                info!(target = %target, "creating tagged comment");
                self.remote
                    .create_comment(&target.repo, target.number, &body)
                    .await
            }
        }
    }

    /// Write generated labels according to `mode`.
    ///
    /// Returns the label set written, or `None` for [`WriteMode::Skip`].
    pub async fn write_labels(
        &self,
        target: &IssueRef,
        existing: &[String],
        generated: &[String],
        mode: WriteMode,
    ) -> Result<Option<Vec<String>>, RemoteError> {
        let Some(labels) = merge_labels(existing, generated, mode) else {
            return Ok(None);
        };
        info!(target = %target, ?mode, labels = ?labels, "writing labels");
        self.remote
            .set_labels(&target.repo, target.number, &labels)
            .await?;
        Ok(Some(labels))
    }

    /// Submit a comment-only review.
    pub async fn submit_review(
        &self,
        target: &IssueRef,
        head_sha: Option<&str>,
        body: String,
        comments: Vec<InlineComment>,
    ) -> Result<(), RemoteError> {
        info!(target = %target, comments = comments.len(), "submitting review");
        let review = ReviewSubmission {
            commit_id: head_sha.map(str::to_string),
            body,
            comments,
        };
        self.remote
            .submit_review(&target.repo, target.number, &review)
            .await
    }
}

/// The label set to write for `mode`, deduplicated in first-seen order.
pub fn merge_labels(existing: &[String], generated: &[String], mode: WriteMode) -> Option<Vec<String>> {
    let merged: IndexSet<&String> = match mode {
        WriteMode::Skip => return None,
        WriteMode::Replace => generated.iter().collect(),
        WriteMode::Add => existing.iter().chain(generated).collect(),
    };
    Some(merged.into_iter().cloned().collect())
}

/// Top-level review body: summary (or a fallback), optional footer, and
/// the review tag.
pub fn review_body(summary: Option<&str>, mapped_comments: usize, footer: Option<&str>) -> String {
    let summary = summary.map(str::trim).filter(|s| !s.is_empty());
    let lead = match (mapped_comments, summary) {
        (0, _) => LGTM,
        (_, Some(summary)) => summary,
        (_, None) => DEFAULT_REVIEW_SUMMARY,
    };
    join_sections([Some(lead), footer, Some(REVIEW_TAG)])
}

/// Join non-empty sections with blank lines.
pub fn join_sections<'a>(sections: impl IntoIterator<Item = Option<&'a str>>) -> String {
    sections
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
