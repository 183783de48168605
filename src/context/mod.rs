//! Remote context assembly.
//!
//! Fetches pull requests, diffs, files, issues and labels from the code
//! host and wraps each in a [`Context`] with its prompt fragment rendered.

pub mod render;

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

use crate::diff::{ExcludedFiles, reviewable_files};
use crate::models::context::{
    CommentContext, DiffContext, IssueContext, LabelContext, PullRequestContext, PullRequestFile,
    PullRequestFileContext, TicketContext,
};
use crate::models::remote::{ChangedFile, FileStatus, Label, PullRequest, Ticket};
use crate::models::{ChangeBundle, Context, ContextKind, IssueRef, ReleaseInclude, ReleaseWindow, RepoRef};
use crate::remote::{PullRequestSearch, RemoteError, RemotePlatform};

/// Concurrent blob fetches when file content is requested.
const FILE_FETCH_CONCURRENCY: usize = 8;

/// A pull request together with the labels already applied to it.
#[derive(Debug, Clone)]
pub struct PullRequestContexts {
    pub pr: PullRequestContext,
    pub labels: Vec<LabelContext>,
}

/// An issue together with the labels already applied to it.
#[derive(Debug, Clone)]
pub struct IssueContexts {
    pub issue: IssueContext,
    pub labels: Vec<LabelContext>,
}

pub fn pull_request_context(pr: PullRequest) -> PullRequestContext {
    Context::new(ContextKind::Pr, pr, render::pull_request)
}

pub fn label_context(label: Label) -> LabelContext {
    Context::new(ContextKind::Label, label, render::label)
}

/// Wraps a ticket from an external tracker for attachment to a
/// [`ChangeBundle`]. No tracker is queried here.
pub fn ticket_context(ticket: Ticket) -> TicketContext {
    Context::new(ContextKind::Ticket, ticket, render::ticket)
}

/// Builds contexts from one code host.
#[derive(Clone)]
pub struct RemoteContextBuilder {
    remote: Arc<dyn RemotePlatform>,
}

impl RemoteContextBuilder {
    pub fn new(remote: Arc<dyn RemotePlatform>) -> Self {
        Self { remote }
    }

    /// Fetch a pull request. A missing pull request is an error.
    pub async fn pr_get(&self, target: &IssueRef) -> Result<PullRequestContexts, RemoteError> {
        let pr = self
            .remote
            .pull_request(&target.repo, target.number)
            .await?
            .ok_or_else(|| RemoteError::not_found(format!("pull request {target}")))?;
        let labels = pr.labels.iter().cloned().map(label_context).collect();
        Ok(PullRequestContexts {
            pr: pull_request_context(pr),
            labels,
        })
    }

    /// Fetch and re-serialize a pull request's diff without binary or
    /// excluded files. `None` when the platform has no diff.
    pub async fn pr_diff(
        &self,
        target: &IssueRef,
        excluded: &ExcludedFiles,
    ) -> Result<Option<DiffContext>, RemoteError> {
        let Some(raw) = self
            .remote
            .pull_request_diff(&target.repo, target.number)
            .await?
        else {
            return Ok(None);
        };
        let files = reviewable_files(&raw, excluded);
        debug!(pr = %target, files = files.len(), "built diff context");
        Ok(Some(Context::new(ContextKind::Diff, files, render::diff)))
    }

    /// Fetch a pull request's changed files.
    ///
    /// With `content_ref`, each file's text at that ref is attached.
    /// Removed files are never fetched; binary or non-UTF-8 content is
    /// left out without failing the call.
    pub async fn pr_files(
        &self,
        target: &IssueRef,
        excluded: &ExcludedFiles,
        content_ref: Option<&str>,
    ) -> Result<Vec<PullRequestFileContext>, RemoteError> {
        let files: Vec<ChangedFile> = self
            .remote
            .pull_request_files(&target.repo, target.number)
            .await?
            .into_iter()
            .filter(|file| {
                let old = file.previous_path.as_deref().unwrap_or(&file.path);
                !excluded.excludes(old, &file.path)
            })
            .collect();

        let contents = match content_ref {
            Some(git_ref) => self.fetch_contents(&target.repo, &files, git_ref).await?,
            None => vec![None; files.len()],
        };

        Ok(files
            .into_iter()
            .zip(contents)
            .map(|(file, content)| {
                let data = PullRequestFile {
                    path: file.path.clone(),
                    patch: file.patch.clone(),
                    content,
                    file,
                };
                Context::new(ContextKind::PrFile, data, render::file)
            })
            .collect())
    }

    async fn fetch_contents(
        &self,
        repo: &RepoRef,
        files: &[ChangedFile],
        git_ref: &str,
    ) -> Result<Vec<Option<String>>, RemoteError> {
        let semaphore = Arc::new(Semaphore::new(FILE_FETCH_CONCURRENCY));
        let mut join_set = JoinSet::new();

        for (index, file) in files.iter().enumerate() {
            if file.status == FileStatus::Removed {
                continue;
            }
            let remote = Arc::clone(&self.remote);
            let sem = Arc::clone(&semaphore);
            let repo = repo.clone();
            let path = file.path.clone();
            let git_ref = git_ref.to_string();

            join_set.spawn(async move {
                let _permit = sem.acquire().await;
                let bytes = remote.file_content(&repo, &path, &git_ref).await;
                (index, bytes)
            });
        }

        let mut contents = vec![None; files.len()];
        while let Some(joined) = join_set.join_next().await {
            let (index, bytes) =
                joined.map_err(|e| RemoteError::Transport(format!("file fetch task failed: {e}")))?;
            contents[index] = bytes?.and_then(decode_text);
        }
        Ok(contents)
    }

    /// Fetch an issue. A missing issue is an error.
    pub async fn issue_get(&self, target: &IssueRef) -> Result<IssueContexts, RemoteError> {
        let issue = self
            .remote
            .issue(&target.repo, target.number)
            .await?
            .ok_or_else(|| RemoteError::not_found(format!("issue {target}")))?;
        let labels = issue.labels.iter().cloned().map(label_context).collect();
        Ok(IssueContexts {
            issue: Context::new(ContextKind::Issue, issue, render::issue),
            labels,
        })
    }

    /// Repository labels, minus any named in `exclude`.
    pub async fn labels_get(
        &self,
        repo: &RepoRef,
        exclude: Option<&BTreeSet<String>>,
    ) -> Result<Vec<LabelContext>, RemoteError> {
        let labels = self.remote.repository_labels(repo).await?;
        Ok(labels
            .into_iter()
            .filter(|label| exclude.is_none_or(|names| !names.contains(&label.name)))
            .map(label_context)
            .collect())
    }

    /// Change bundles for the pull requests of a release window.
    pub async fn pr_window(
        &self,
        repo: &RepoRef,
        window: &ReleaseWindow,
        include: ReleaseInclude,
    ) -> Result<Vec<ChangeBundle>, RemoteError> {
        match window {
            ReleaseWindow::Unreleased => self.pr_unreleased(repo, include).await,
            ReleaseWindow::Tags { from, to } => {
                self.pr_between_tags(repo, from.as_deref(), to.as_deref(), include)
                    .await
            }
            ReleaseWindow::Range { since, until } => {
                self.pr_in_range(repo, *since, *until, include).await
            }
        }
    }

    /// Pull requests merged into the default branch since the latest
    /// release, or ever when there is no release.
    pub async fn pr_unreleased(
        &self,
        repo: &RepoRef,
        include: ReleaseInclude,
    ) -> Result<Vec<ChangeBundle>, RemoteError> {
        let (branch, latest) = tokio::try_join!(
            self.remote.default_branch(repo),
            self.remote.latest_release(repo)
        )?;
        if latest.is_none() {
            debug!(repo = %repo, "no previous release, searching all merged pull requests");
        }
        let search = PullRequestSearch {
            base: Some(branch),
            merged_after: latest.and_then(|release| release.published_at),
            merged_before: None,
        };
        self.bundles(repo, &search, include).await
    }

    /// Pull requests merged between the publish times of two releases.
    /// Either tag may be omitted to leave that side open.
    pub async fn pr_between_tags(
        &self,
        repo: &RepoRef,
        from: Option<&str>,
        to: Option<&str>,
        include: ReleaseInclude,
    ) -> Result<Vec<ChangeBundle>, RemoteError> {
        let branch = self.remote.default_branch(repo).await?;
        let merged_after = match from {
            Some(tag) => self.release_time(repo, tag).await?,
            None => None,
        };
        let merged_before = match to {
            Some(tag) => self.release_time(repo, tag).await?,
            None => None,
        };
        let search = PullRequestSearch {
            base: Some(branch),
            merged_after,
            merged_before,
        };
        self.bundles(repo, &search, include).await
    }

    /// Pull requests merged into the default branch within a time range.
    pub async fn pr_in_range(
        &self,
        repo: &RepoRef,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
        include: ReleaseInclude,
    ) -> Result<Vec<ChangeBundle>, RemoteError> {
        let branch = self.remote.default_branch(repo).await?;
        let search = PullRequestSearch {
            base: Some(branch),
            merged_after: since,
            merged_before: until,
        };
        self.bundles(repo, &search, include).await
    }

    /// Conversation comments of many pull requests, in one round trip.
    pub async fn pr_comments(
        &self,
        repo: &RepoRef,
        numbers: &[u64],
    ) -> Result<HashMap<u64, Vec<CommentContext>>, RemoteError> {
        if numbers.is_empty() {
            return Ok(HashMap::new());
        }
        let comments = self.remote.pull_request_comments(repo, numbers).await?;
        Ok(comments
            .into_iter()
            .map(|(number, comments)| {
                let contexts = comments
                    .into_iter()
                    .map(|c| Context::new(ContextKind::PrReviewComment, c, render::comment))
                    .collect();
                (number, contexts)
            })
            .collect())
    }

    async fn release_time(
        &self,
        repo: &RepoRef,
        tag: &str,
    ) -> Result<Option<DateTime<Utc>>, RemoteError> {
        let release = self
            .remote
            .release_by_tag(repo, tag)
            .await?
            .ok_or_else(|| RemoteError::not_found(format!("release {tag} in {repo}")))?;
        Ok(release.published_at)
    }

    async fn bundles(
        &self,
        repo: &RepoRef,
        search: &PullRequestSearch,
        include: ReleaseInclude,
    ) -> Result<Vec<ChangeBundle>, RemoteError> {
        let prs = self.remote.search_merged_pull_requests(repo, search).await?;
        debug!(repo = %repo, count = prs.len(), "found merged pull requests");
        if prs.is_empty() {
            return Ok(Vec::new());
        }

        let mut linked = if include.issues {
            let numbers: Vec<u64> = prs.iter().map(|pr| pr.number).collect();
            self.remote.linked_issues(repo, &numbers).await?
        } else {
            HashMap::new()
        };
        if include.tickets {
            debug!("no issue tracker configured, skipping tickets");
        }

        Ok(prs
            .into_iter()
            .map(|pr| {
                let issue = linked
                    .remove(&pr.number)
                    .and_then(|issues| issues.into_iter().next())
                    .map(|issue| Context::new(ContextKind::Issue, issue, render::issue));
                let labels = if include.labels {
                    pr.labels.iter().cloned().map(label_context).collect()
                } else {
                    Vec::new()
                };
                ChangeBundle {
                    pr: pull_request_context(pr),
                    issue,
                    ticket: None,
                    labels,
                }
            })
            .collect())
    }
}

/// Decode file bytes as text. Content with NUL bytes or invalid UTF-8 is
/// treated as binary.
pub fn decode_text(bytes: Vec<u8>) -> Option<String> {
    if bytes.contains(&0) {
        return None;
    }
    String::from_utf8(bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_text_accepts_utf8() {
        assert_eq!(decode_text("héllo\n".as_bytes().to_vec()).as_deref(), Some("héllo\n"));
    }

    #[test]
    fn decode_text_rejects_binary() {
        assert_eq!(decode_text(vec![0x89, b'P', b'N', b'G', 0, 1]), None);
        assert_eq!(decode_text(vec![0xff, 0xfe, b'a']), None);
    }

    #[test]
    fn label_context_renders_once() {
        let ctx = label_context(Label::named("bug"));
        assert_eq!(ctx.kind(), ContextKind::Label);
        assert!(ctx.prompt().contains("<name>bug</name>"));
    }
}
