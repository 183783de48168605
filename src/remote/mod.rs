//! Code-host transport.
//!
//! [`RemotePlatform`] is the full set of reads and writes the pipeline
//! needs from a code host. One implementation exists per platform and is
//! chosen once, from config, when the facade is built.

pub mod github;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::RemoteConfig;
use crate::models::remote::{ChangedFile, Comment, Issue, Label, PullRequest, Release};
use crate::models::{InlineComment, RepoRef};

pub use github::GithubPlatform;

/// Errors from code-host calls.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("{entity} not found")]
    NotFound { entity: String },

    #[error("request failed with HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("remote not configured: {0}")]
    NotConfigured(String),
}

impl RemoteError {
    pub fn not_found(entity: impl Into<String>) -> Self {
        RemoteError::NotFound {
            entity: entity.into(),
        }
    }
}

/// Supported code hosts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Github,
}

/// Filters for a merged pull request search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullRequestSearch {
    /// Base branch the pull requests were merged into.
    pub base: Option<String>,
    /// Exclusive lower bound on the merge time.
    pub merged_after: Option<DateTime<Utc>>,
    /// Exclusive upper bound on the merge time.
    pub merged_before: Option<DateTime<Utc>>,
}

/// Fields to change on a pull request. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PullRequestUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl PullRequestUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.body.is_none()
    }
}

/// A review to submit. Reviews are always plain comments; they never
/// approve or request changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewSubmission {
    /// Commit the positions refer to; the platform default is the head.
    pub commit_id: Option<String>,
    pub body: String,
    pub comments: Vec<InlineComment>,
}

/// Reads and writes against one code host.
///
/// Single-entity reads return `Ok(None)` when the entity does not exist so
/// callers decide whether absence is an error. Every other failure is an
/// `Err`.
#[async_trait]
pub trait RemotePlatform: Send + Sync {
    async fn pull_request(&self, repo: &RepoRef, number: u64)
    -> Result<Option<PullRequest>, RemoteError>;

    /// Unified diff text of a pull request.
    async fn pull_request_diff(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<Option<String>, RemoteError>;

    async fn pull_request_files(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<Vec<ChangedFile>, RemoteError>;

    /// Raw bytes of a file at a ref.
    async fn file_content(
        &self,
        repo: &RepoRef,
        path: &str,
        git_ref: &str,
    ) -> Result<Option<Vec<u8>>, RemoteError>;

    async fn issue(&self, repo: &RepoRef, number: u64) -> Result<Option<Issue>, RemoteError>;

    async fn repository_labels(&self, repo: &RepoRef) -> Result<Vec<Label>, RemoteError>;

    /// Replace the labels of an issue or pull request.
    async fn set_labels(
        &self,
        repo: &RepoRef,
        number: u64,
        labels: &[String],
    ) -> Result<(), RemoteError>;

    async fn update_pull_request(
        &self,
        repo: &RepoRef,
        number: u64,
        update: &PullRequestUpdate,
    ) -> Result<(), RemoteError>;

    async fn comments(&self, repo: &RepoRef, number: u64) -> Result<Vec<Comment>, RemoteError>;

    async fn create_comment(
        &self,
        repo: &RepoRef,
        number: u64,
        body: &str,
    ) -> Result<Comment, RemoteError>;

    async fn update_comment(
        &self,
        repo: &RepoRef,
        comment_id: u64,
        body: &str,
    ) -> Result<Comment, RemoteError>;

    /// Login of the token's owner, when the token may read it.
    async fn authenticated_user(&self) -> Result<Option<String>, RemoteError>;

    async fn default_branch(&self, repo: &RepoRef) -> Result<String, RemoteError>;

    async fn latest_release(&self, repo: &RepoRef) -> Result<Option<Release>, RemoteError>;

    async fn release_by_tag(
        &self,
        repo: &RepoRef,
        tag: &str,
    ) -> Result<Option<Release>, RemoteError>;

    async fn search_merged_pull_requests(
        &self,
        repo: &RepoRef,
        search: &PullRequestSearch,
    ) -> Result<Vec<PullRequest>, RemoteError>;

    /// Closing issues of many pull requests in one round trip. Pull
    /// requests without linked issues are absent from the map.
    async fn linked_issues(
        &self,
        repo: &RepoRef,
        numbers: &[u64],
    ) -> Result<HashMap<u64, Vec<Issue>>, RemoteError>;

    /// Conversation comments of many pull requests in one round trip.
    /// Pull requests without comments are absent from the map.
    async fn pull_request_comments(
        &self,
        repo: &RepoRef,
        numbers: &[u64],
    ) -> Result<HashMap<u64, Vec<Comment>>, RemoteError>;

    async fn submit_review(
        &self,
        repo: &RepoRef,
        number: u64,
        review: &ReviewSubmission,
    ) -> Result<(), RemoteError>;
}

/// Build the transport for the configured platform.
pub fn create_platform(config: &RemoteConfig) -> Result<Arc<dyn RemotePlatform>, RemoteError> {
    match config.platform {
        Platform::Github => Ok(Arc::new(GithubPlatform::new(config)?)),
    }
}
