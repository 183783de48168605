//! Shared fakes for integration tests: an in-memory code host and a
//! canned generation provider.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use relgen::models::remote::{
    ChangedFile, Comment, FileStatus, Issue, Label, PullRequest, Release,
};
use relgen::models::RepoRef;
use relgen::orchestrator::{Relgen, Settings};
use relgen::providers::{GenerationProvider, GenerationRequest, ProviderError, ResultShape};
use relgen::remote::{
    PullRequestSearch, PullRequestUpdate, RemoteError, RemotePlatform, ReviewSubmission,
};

/// Everything the fake code host knows, plus a log of what was written.
///
/// The fake serves a single repository; the `repo` argument is ignored.
#[derive(Debug, Default)]
pub struct HostState {
    pub prs: HashMap<u64, PullRequest>,
    pub diffs: HashMap<u64, String>,
    pub files: HashMap<u64, Vec<ChangedFile>>,
    /// Keyed by `(path, ref)`.
    pub blobs: HashMap<(String, String), Vec<u8>>,
    pub issues: HashMap<u64, Issue>,
    pub repo_labels: Vec<Label>,
    pub comments: HashMap<u64, Vec<Comment>>,
    pub user: Option<String>,
    pub default_branch: String,
    pub releases: Vec<Release>,
    pub merged: Vec<PullRequest>,
    pub linked: HashMap<u64, Vec<Issue>>,

    pub label_writes: Vec<(u64, Vec<String>)>,
    pub updates: Vec<(u64, PullRequestUpdate)>,
    pub reviews: Vec<(u64, ReviewSubmission)>,
    pub searches: Vec<PullRequestSearch>,
    pub blob_fetches: Vec<String>,
    next_comment_id: u64,
}

pub struct FakeHost {
    pub state: Mutex<HostState>,
}

impl FakeHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(HostState {
                default_branch: "main".into(),
                next_comment_id: 1000,
                ..Default::default()
            }),
        })
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut HostState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn add_pr(&self, pr: PullRequest) {
        self.with(|s| {
            s.prs.insert(pr.number, pr);
        });
    }

    pub fn add_comment(&self, number: u64, author: &str, body: &str) -> u64 {
        self.with(|s| {
            s.next_comment_id += 1;
            let id = s.next_comment_id;
            s.comments.entry(number).or_default().push(Comment {
                id,
                body: body.into(),
                author: Some(author.into()),
            });
            id
        })
    }

    pub fn comments_on(&self, number: u64) -> Vec<Comment> {
        self.with(|s| s.comments.get(&number).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl RemotePlatform for FakeHost {
    async fn pull_request(
        &self,
        _repo: &RepoRef,
        number: u64,
    ) -> Result<Option<PullRequest>, RemoteError> {
        Ok(self.with(|s| s.prs.get(&number).cloned()))
    }

    async fn pull_request_diff(
        &self,
        _repo: &RepoRef,
        number: u64,
    ) -> Result<Option<String>, RemoteError> {
        Ok(self.with(|s| s.diffs.get(&number).cloned()))
    }

    async fn pull_request_files(
        &self,
        _repo: &RepoRef,
        number: u64,
    ) -> Result<Vec<ChangedFile>, RemoteError> {
        Ok(self.with(|s| s.files.get(&number).cloned().unwrap_or_default()))
    }

    async fn file_content(
        &self,
        _repo: &RepoRef,
        path: &str,
        git_ref: &str,
    ) -> Result<Option<Vec<u8>>, RemoteError> {
        Ok(self.with(|s| {
            s.blob_fetches.push(path.to_string());
            s.blobs.get(&(path.to_string(), git_ref.to_string())).cloned()
        }))
    }

    async fn issue(&self, _repo: &RepoRef, number: u64) -> Result<Option<Issue>, RemoteError> {
        Ok(self.with(|s| s.issues.get(&number).cloned()))
    }

    async fn repository_labels(&self, _repo: &RepoRef) -> Result<Vec<Label>, RemoteError> {
        Ok(self.with(|s| s.repo_labels.clone()))
    }

    async fn set_labels(
        &self,
        _repo: &RepoRef,
        number: u64,
        labels: &[String],
    ) -> Result<(), RemoteError> {
        self.with(|s| s.label_writes.push((number, labels.to_vec())));
        Ok(())
    }

    async fn update_pull_request(
        &self,
        _repo: &RepoRef,
        number: u64,
        update: &PullRequestUpdate,
    ) -> Result<(), RemoteError> {
        self.with(|s| {
            if let Some(pr) = s.prs.get_mut(&number) {
                if let Some(title) = &update.title {
                    pr.title = title.clone();
                }
                if let Some(body) = &update.body {
                    pr.body = Some(body.clone());
                }
            }
            s.updates.push((number, update.clone()));
        });
        Ok(())
    }

    async fn comments(&self, _repo: &RepoRef, number: u64) -> Result<Vec<Comment>, RemoteError> {
        Ok(self.comments_on(number))
    }

    async fn create_comment(
        &self,
        _repo: &RepoRef,
        number: u64,
        body: &str,
    ) -> Result<Comment, RemoteError> {
        let author = self.with(|s| s.user.clone());
        let id = self.add_comment(number, author.as_deref().unwrap_or("ghost"), body);
        Ok(Comment {
            id,
            body: body.into(),
            author,
        })
    }

    async fn update_comment(
        &self,
        _repo: &RepoRef,
        comment_id: u64,
        body: &str,
    ) -> Result<Comment, RemoteError> {
        self.with(|s| {
            s.comments
                .values_mut()
                .flatten()
                .find(|comment| comment.id == comment_id)
                .map(|comment| {
                    comment.body = body.to_string();
                    comment.clone()
                })
                .ok_or_else(|| RemoteError::not_found(format!("comment {comment_id}")))
        })
    }

    async fn authenticated_user(&self) -> Result<Option<String>, RemoteError> {
        Ok(self.with(|s| s.user.clone()))
    }

    async fn default_branch(&self, _repo: &RepoRef) -> Result<String, RemoteError> {
        Ok(self.with(|s| s.default_branch.clone()))
    }

    async fn latest_release(&self, _repo: &RepoRef) -> Result<Option<Release>, RemoteError> {
        Ok(self.with(|s| s.releases.last().cloned()))
    }

    async fn release_by_tag(
        &self,
        _repo: &RepoRef,
        tag: &str,
    ) -> Result<Option<Release>, RemoteError> {
        Ok(self.with(|s| s.releases.iter().find(|r| r.tag == tag).cloned()))
    }

    async fn search_merged_pull_requests(
        &self,
        _repo: &RepoRef,
        search: &PullRequestSearch,
    ) -> Result<Vec<PullRequest>, RemoteError> {
        Ok(self.with(|s| {
            s.searches.push(search.clone());
            s.merged
                .iter()
                .filter(|pr| match (pr.merged_at, search.merged_after) {
                    (Some(at), Some(after)) => at > after,
                    _ => true,
                })
                .filter(|pr| match (pr.merged_at, search.merged_before) {
                    (Some(at), Some(before)) => at < before,
                    _ => true,
                })
                .cloned()
                .collect()
        }))
    }

    async fn linked_issues(
        &self,
        _repo: &RepoRef,
        numbers: &[u64],
    ) -> Result<HashMap<u64, Vec<Issue>>, RemoteError> {
        Ok(self.with(|s| {
            numbers
                .iter()
                .filter_map(|n| s.linked.get(n).map(|issues| (*n, issues.clone())))
                .collect()
        }))
    }

    async fn pull_request_comments(
        &self,
        _repo: &RepoRef,
        numbers: &[u64],
    ) -> Result<HashMap<u64, Vec<Comment>>, RemoteError> {
        Ok(self.with(|s| {
            numbers
                .iter()
                .filter_map(|n| s.comments.get(n).map(|comments| (*n, comments.clone())))
                .collect()
        }))
    }

    async fn submit_review(
        &self,
        _repo: &RepoRef,
        number: u64,
        review: &ReviewSubmission,
    ) -> Result<(), RemoteError> {
        self.with(|s| s.reviews.push((number, review.clone())));
        Ok(())
    }
}

/// Replies with canned text per result shape and records every request.
pub struct StubModel {
    replies: Mutex<Vec<(ResultShape, String)>>,
    pub requests: Mutex<Vec<GenerationRequest>>,
}

impl StubModel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn reply(&self, shape: ResultShape, text: &str) {
        self.replies.lock().unwrap().push((shape, text.to_string()));
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> String {
        self.requests
            .lock()
            .unwrap()
            .last()
            .map(|r| r.prompt.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl GenerationProvider for StubModel {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .iter()
            .find(|(shape, _)| *shape == request.shape)
            .map(|(_, text)| text.clone())
            .ok_or_else(|| ProviderError::ApiError(format!("no reply for {:?}", request.shape)))
    }
}

pub fn relgen(host: &Arc<FakeHost>, model: &Arc<StubModel>) -> Relgen {
    Relgen::new(host.clone(), model.clone(), Settings::default())
}

pub fn pr(number: u64, title: &str) -> PullRequest {
    PullRequest {
        number,
        title: title.into(),
        body: None,
        author: Some("octocat".into()),
        url: format!("https://github.com/acme/widget/pull/{number}"),
        labels: vec![],
        head_sha: Some(format!("sha{number}")),
        base_ref: Some("main".into()),
        merged_at: None,
    }
}

pub fn merged(number: u64, title: &str, author: &str, at: &str) -> PullRequest {
    PullRequest {
        author: Some(author.into()),
        head_sha: None,
        base_ref: None,
        merged_at: Some(time(at)),
        ..pr(number, title)
    }
}

pub fn changed(path: &str, status: FileStatus, patch: Option<&str>) -> ChangedFile {
    ChangedFile {
        path: path.into(),
        previous_path: None,
        status,
        patch: patch.map(str::to_string),
        additions: 1,
        deletions: 0,
    }
}

pub fn release(tag: &str, at: &str) -> Release {
    Release {
        tag: tag.into(),
        name: Some(tag.into()),
        published_at: Some(time(at)),
    }
}

pub fn time(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .unwrap()
        .with_timezone(&Utc)
}
