//! GitHub REST v3 and GraphQL v4 transport.
//!
//! Works against github.com and GitHub Enterprise Server (set `api_url`
//! to `https://<host>/api/v3`).

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{PullRequestSearch, PullRequestUpdate, RemoteError, RemotePlatform, ReviewSubmission};
use crate::config::RemoteConfig;
use crate::constants::{APP_NAME, ENV_GITHUB_TOKEN, ENV_GITHUB_TOKEN_FALLBACK};
use crate::models::RepoRef;
use crate::models::remote::{
    ChangedFile, Comment, FileStatus, Issue, Label, PullRequest, Release,
};

/// Page size for REST list endpoints (the API maximum).
const PAGE_SIZE: usize = 100;

/// Upper bound on pages fetched from a REST list endpoint. File listings
/// stop at 3000 files.
const MAX_PAGES: usize = 30;

/// Search results GitHub serves for one query. Pages past it are a 422.
const SEARCH_RESULT_CAP: usize = 1000;

/// Closing issues fetched per pull request in a batch query.
const LINKED_ISSUES_PER_PR: usize = 50;

/// Most recent comments fetched per pull request in a batch query.
/// Older comments beyond this window are not seen.
const COMMENTS_PER_PR: usize = 100;

const MEDIA_JSON: &str = "application/vnd.github+json";
const MEDIA_DIFF: &str = "application/vnd.github.v3.diff";
const MEDIA_RAW: &str = "application/vnd.github.raw";
const API_VERSION: &str = "2022-11-28";

/// GitHub implementation of [`RemotePlatform`].
pub struct GithubPlatform {
    client: reqwest::Client,
    api_url: String,
}

impl GithubPlatform {
    /// Build a client authenticated with the configured token.
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let token = config.token.as_deref().ok_or_else(|| {
            RemoteError::NotConfigured(format!(
                "no GitHub token found. Set {ENV_GITHUB_TOKEN} or {ENV_GITHUB_TOKEN_FALLBACK}."
            ))
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(APP_NAME));
        headers.insert(ACCEPT, HeaderValue::from_static(MEDIA_JSON));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| RemoteError::NotConfigured("GitHub token is not a valid header value".into()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| RemoteError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_url)
    }

    fn repo_url(&self, repo: &RepoRef, path: &str) -> String {
        self.url(&format!("/repos/{}/{}{path}", repo.owner, repo.repo))
    }

    /// Send a request, mapping 404 to `NotFound` and other non-2xx
    /// statuses to `Http`.
    async fn execute(&self, builder: RequestBuilder, entity: &str) -> Result<Response, RemoteError> {
        let request = builder
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        debug!(method = %request.method(), url = %request.url(), "github request");

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(RemoteError::not_found(entity));
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(RemoteError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, entity: &str) -> Result<T, RemoteError> {
        let response = self.execute(self.client.get(url), entity).await?;
        decode(response).await
    }

    /// Fetch every page of a REST list endpoint.
    async fn get_paged<T: DeserializeOwned>(
        &self,
        url: &str,
        entity: &str,
    ) -> Result<Vec<T>, RemoteError> {
        let mut items = Vec::new();
        for page in 1..=MAX_PAGES {
            let builder = self
                .client
                .get(url)
                .query(&[("per_page", PAGE_SIZE), ("page", page)]);
            let batch: Vec<T> = decode(self.execute(builder, entity).await?).await?;
            let done = batch.len() < PAGE_SIZE;
            items.extend(batch);
            if done {
                break;
            }
        }
        Ok(items)
    }

    fn graphql_url(&self) -> String {
        match self.api_url.strip_suffix("/api/v3") {
            Some(host) => format!("{host}/api/graphql"),
            None => self.url("/graphql"),
        }
    }

    /// Run one aliased query over many pull requests of a repository.
    ///
    /// `selection` is the field selection applied to each `pullRequest`.
    async fn batch_query<T: DeserializeOwned>(
        &self,
        repo: &RepoRef,
        numbers: &[u64],
        selection: &str,
    ) -> Result<HashMap<u64, T>, RemoteError> {
        if numbers.is_empty() {
            return Ok(HashMap::new());
        }

        let body = serde_json::json!({
            "query": batch_query_text(numbers, selection),
            "variables": { "owner": repo.owner, "name": repo.repo },
        });
        let builder = self.client.post(self.graphql_url()).json(&body);
        let response: GqlResponse<GqlRepository<T>> =
            decode(self.execute(builder, "graphql endpoint").await?).await?;

        for error in &response.errors {
            debug!(message = %error.message, "graphql error");
        }
        let repository = response
            .data
            .and_then(|data| data.repository)
            .ok_or_else(|| match response.errors.first() {
                Some(error) => RemoteError::Decode(error.message.clone()),
                None => RemoteError::not_found(format!("repository {repo}")),
            })?;

        Ok(repository
            .into_iter()
            .filter_map(|(alias, value)| Some((parse_alias(&alias)?, value?)))
            .collect())
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
    response
        .json::<T>()
        .await
        .map_err(|e| RemoteError::Decode(e.to_string()))
}

/// Treat `NotFound` as absence.
fn optional<T>(result: Result<T, RemoteError>) -> Result<Option<T>, RemoteError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(RemoteError::NotFound { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Whether search paging should stop after a page of `page_len` items,
/// with `fetched` collected so far out of `total_count` matches.
fn search_exhausted(fetched: usize, page_len: usize, total_count: u64) -> bool {
    let reachable = total_count.min(SEARCH_RESULT_CAP as u64);
    page_len < PAGE_SIZE || fetched as u64 >= reachable
}

/// GraphQL selection for the most recent comments of a pull request.
fn comments_selection() -> String {
    format!("comments(last: {COMMENTS_PER_PR}) {{ nodes {{ databaseId body author {{ login }} }} }}")
}

/// Build the issue-search query for merged pull requests.
fn search_query(repo: &RepoRef, search: &PullRequestSearch) -> String {
    let mut query = format!("repo:{}/{} is:pr is:merged", repo.owner, repo.repo);
    if let Some(base) = &search.base {
        query.push_str(&format!(" base:{base}"));
    }
    if let Some(after) = &search.merged_after {
        query.push_str(&format!(" merged:>{}", iso(after)));
    }
    if let Some(before) = &search.merged_before {
        query.push_str(&format!(" merged:<{}", iso(before)));
    }
    query
}

fn iso(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn batch_query_text(numbers: &[u64], selection: &str) -> String {
    let fields: Vec<String> = numbers
        .iter()
        .map(|n| format!("pr{n}: pullRequest(number: {n}) {{ {selection} }}"))
        .collect();
    format!(
        "query($owner: String!, $name: String!) {{ repository(owner: $owner, name: $name) {{ {} }} }}",
        fields.join(" ")
    )
}

fn parse_alias(alias: &str) -> Option<u64> {
    alias.strip_prefix("pr")?.parse().ok()
}

#[async_trait]
impl RemotePlatform for GithubPlatform {
    async fn pull_request(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<Option<PullRequest>, RemoteError> {
        let url = self.repo_url(repo, &format!("/pulls/{number}"));
        let pr: Option<GhPullRequest> = optional(self.get_json(&url, "pull request").await)?;
        Ok(pr.map(Into::into))
    }

    async fn pull_request_diff(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<Option<String>, RemoteError> {
        let url = self.repo_url(repo, &format!("/pulls/{number}"));
        let builder = self.client.get(url).header(ACCEPT, MEDIA_DIFF);
        let Some(response) = optional(self.execute(builder, "pull request diff").await)? else {
            return Ok(None);
        };
        let text = response
            .text()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))?;
        Ok(Some(text))
    }

    async fn pull_request_files(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<Vec<ChangedFile>, RemoteError> {
        let url = self.repo_url(repo, &format!("/pulls/{number}/files"));
        let files: Vec<GhFile> = self.get_paged(&url, "pull request files").await?;
        Ok(files.into_iter().map(Into::into).collect())
    }

    async fn file_content(
        &self,
        repo: &RepoRef,
        path: &str,
        git_ref: &str,
    ) -> Result<Option<Vec<u8>>, RemoteError> {
        let mut url = Url::parse(&self.repo_url(repo, "/contents"))
            .map_err(|e| RemoteError::NotConfigured(format!("invalid api_url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| RemoteError::NotConfigured("api_url cannot be a base URL".into()))?
            .extend(path.split('/'));

        let builder = self
            .client
            .get(url)
            .query(&[("ref", git_ref)])
            .header(ACCEPT, MEDIA_RAW);
        let Some(response) = optional(self.execute(builder, "file").await)? else {
            return Ok(None);
        };
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))?;
        Ok(Some(bytes.to_vec()))
    }

    async fn issue(&self, repo: &RepoRef, number: u64) -> Result<Option<Issue>, RemoteError> {
        let url = self.repo_url(repo, &format!("/issues/{number}"));
        let issue: Option<GhIssue> = optional(self.get_json(&url, "issue").await)?;
        Ok(issue.map(Into::into))
    }

    async fn repository_labels(&self, repo: &RepoRef) -> Result<Vec<Label>, RemoteError> {
        let url = self.repo_url(repo, "/labels");
        let labels: Vec<GhLabel> = self.get_paged(&url, "repository").await?;
        Ok(labels.into_iter().map(Into::into).collect())
    }

    async fn set_labels(
        &self,
        repo: &RepoRef,
        number: u64,
        labels: &[String],
    ) -> Result<(), RemoteError> {
        let url = self.repo_url(repo, &format!("/issues/{number}/labels"));
        let body = serde_json::json!({ "labels": labels });
        self.execute(self.client.put(url).json(&body), "issue").await?;
        Ok(())
    }

    async fn update_pull_request(
        &self,
        repo: &RepoRef,
        number: u64,
        update: &PullRequestUpdate,
    ) -> Result<(), RemoteError> {
        let url = self.repo_url(repo, &format!("/pulls/{number}"));
        self.execute(self.client.patch(url).json(update), "pull request")
            .await?;
        Ok(())
    }

    async fn comments(&self, repo: &RepoRef, number: u64) -> Result<Vec<Comment>, RemoteError> {
        let url = self.repo_url(repo, &format!("/issues/{number}/comments"));
        let comments: Vec<GhComment> = self.get_paged(&url, "issue").await?;
        Ok(comments.into_iter().map(Into::into).collect())
    }

    async fn create_comment(
        &self,
        repo: &RepoRef,
        number: u64,
        body: &str,
    ) -> Result<Comment, RemoteError> {
        let url = self.repo_url(repo, &format!("/issues/{number}/comments"));
        let builder = self.client.post(url).json(&serde_json::json!({ "body": body }));
        let comment: GhComment = decode(self.execute(builder, "issue").await?).await?;
        Ok(comment.into())
    }

    async fn update_comment(
        &self,
        repo: &RepoRef,
        comment_id: u64,
        body: &str,
    ) -> Result<Comment, RemoteError> {
        let url = self.repo_url(repo, &format!("/issues/comments/{comment_id}"));
        let builder = self.client.patch(url).json(&serde_json::json!({ "body": body }));
        let comment: GhComment = decode(self.execute(builder, "comment").await?).await?;
        Ok(comment.into())
    }

    async fn authenticated_user(&self) -> Result<Option<String>, RemoteError> {
        // App and Actions tokens may not read /user.
        match self.get_json::<GhUser>(&self.url("/user"), "user").await {
            Ok(user) => Ok(Some(user.login)),
            Err(RemoteError::Http {
                status: 401 | 403, ..
            })
            | Err(RemoteError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn default_branch(&self, repo: &RepoRef) -> Result<String, RemoteError> {
        let url = self.repo_url(repo, "");
        let repository: GhRepository = self
            .get_json(&url, &format!("repository {repo}"))
            .await?;
        Ok(repository.default_branch)
    }

    async fn latest_release(&self, repo: &RepoRef) -> Result<Option<Release>, RemoteError> {
        let url = self.repo_url(repo, "/releases/latest");
        let release: Option<GhRelease> = optional(self.get_json(&url, "release").await)?;
        Ok(release.map(Into::into))
    }

    async fn release_by_tag(
        &self,
        repo: &RepoRef,
        tag: &str,
    ) -> Result<Option<Release>, RemoteError> {
        let url = self.repo_url(repo, &format!("/releases/tags/{tag}"));
        let release: Option<GhRelease> = optional(self.get_json(&url, "release").await)?;
        Ok(release.map(Into::into))
    }

    async fn search_merged_pull_requests(
        &self,
        repo: &RepoRef,
        search: &PullRequestSearch,
    ) -> Result<Vec<PullRequest>, RemoteError> {
        let query = search_query(repo, search);
        debug!(query = %query, "searching merged pull requests");

        let url = self.url("/search/issues");
        let mut pulls = Vec::new();
        for page in 1..=SEARCH_RESULT_CAP / PAGE_SIZE {
            let builder = self
                .client
                .get(&url)
                .query(&[("q", query.as_str())])
                .query(&[("per_page", PAGE_SIZE), ("page", page)]);
            let result: GhSearch = decode(self.execute(builder, "search").await?).await?;
            let count = result.items.len();
            pulls.extend(result.items.into_iter().map(PullRequest::from));
            if search_exhausted(pulls.len(), count, result.total_count) {
                if result.total_count > SEARCH_RESULT_CAP as u64 {
                    debug!(
                        total = result.total_count,
                        kept = pulls.len(),
                        "search results truncated at the platform cap"
                    );
                }
                break;
            }
        }
        Ok(pulls)
    }

    async fn linked_issues(
        &self,
        repo: &RepoRef,
        numbers: &[u64],
    ) -> Result<HashMap<u64, Vec<Issue>>, RemoteError> {
        let selection = format!(
            "closingIssuesReferences(first: {LINKED_ISSUES_PER_PR}) {{ nodes {{ number title body url labels(first: 20) {{ nodes {{ name description }} }} }} }}"
        );
        let found: HashMap<u64, GqlClosingIssues> =
            self.batch_query(repo, numbers, &selection).await?;
        Ok(found
            .into_iter()
            .map(|(n, pr)| (n, pr.closing_issues_references.nodes))
            .filter(|(_, issues)| !issues.is_empty())
            .map(|(n, issues)| (n, issues.into_iter().map(Into::into).collect()))
            .collect())
    }

    async fn pull_request_comments(
        &self,
        repo: &RepoRef,
        numbers: &[u64],
    ) -> Result<HashMap<u64, Vec<Comment>>, RemoteError> {
        let found: HashMap<u64, GqlComments> =
            self.batch_query(repo, numbers, &comments_selection()).await?;
        Ok(found
            .into_iter()
            .map(|(n, pr)| (n, pr.comments.nodes))
            .filter(|(_, comments)| !comments.is_empty())
            .map(|(n, comments)| (n, comments.into_iter().map(Into::into).collect()))
            .collect())
    }

    async fn submit_review(
        &self,
        repo: &RepoRef,
        number: u64,
        review: &ReviewSubmission,
    ) -> Result<(), RemoteError> {
        let url = self.repo_url(repo, &format!("/pulls/{number}/reviews"));
        let comments: Vec<serde_json::Value> = review
            .comments
            .iter()
            .map(|c| {
                serde_json::json!({
                    "path": c.path,
                    "position": c.position,
                    "body": c.body,
                })
            })
            .collect();
        let mut payload = serde_json::json!({
            "event": "COMMENT",
            "body": review.body,
            "comments": comments,
        });
        if let Some(commit_id) = &review.commit_id {
            payload["commit_id"] = serde_json::Value::String(commit_id.clone());
        }
        self.execute(self.client.post(url).json(&payload), "pull request")
            .await?;
        Ok(())
    }
}

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Deserialize)]
struct GhUser {
    login: String,
}

#[derive(Deserialize)]
struct GhLabel {
    name: String,
    description: Option<String>,
}

impl From<GhLabel> for Label {
    fn from(label: GhLabel) -> Self {
        Label {
            name: label.name,
            description: label.description.filter(|d| !d.is_empty()),
        }
    }
}

#[derive(Deserialize)]
struct GhBranch {
    sha: String,
    #[serde(rename = "ref")]
    name: String,
}

#[derive(Deserialize)]
struct GhPullRequest {
    number: u64,
    title: String,
    body: Option<String>,
    user: Option<GhUser>,
    html_url: String,
    #[serde(default)]
    labels: Vec<GhLabel>,
    head: GhBranch,
    base: GhBranch,
    merged_at: Option<DateTime<Utc>>,
}

impl From<GhPullRequest> for PullRequest {
    fn from(pr: GhPullRequest) -> Self {
        PullRequest {
            number: pr.number,
            title: pr.title,
            body: pr.body,
            author: pr.user.map(|u| u.login),
            url: pr.html_url,
            labels: pr.labels.into_iter().map(Into::into).collect(),
            head_sha: Some(pr.head.sha),
            base_ref: Some(pr.base.name),
            merged_at: pr.merged_at,
        }
    }
}

#[derive(Deserialize)]
struct GhIssuePullRequest {
    merged_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct GhIssue {
    number: u64,
    title: String,
    body: Option<String>,
    user: Option<GhUser>,
    html_url: String,
    #[serde(default)]
    labels: Vec<GhLabel>,
    pull_request: Option<GhIssuePullRequest>,
}

impl From<GhIssue> for Issue {
    fn from(issue: GhIssue) -> Self {
        Issue {
            number: issue.number,
            title: issue.title,
            body: issue.body,
            url: issue.html_url,
            labels: issue.labels.into_iter().map(Into::into).collect(),
        }
    }
}

/// Search hits are issue-shaped; merge time sits under `pull_request`.
impl From<GhIssue> for PullRequest {
    fn from(issue: GhIssue) -> Self {
        PullRequest {
            number: issue.number,
            title: issue.title,
            body: issue.body,
            author: issue.user.map(|u| u.login),
            url: issue.html_url,
            labels: issue.labels.into_iter().map(Into::into).collect(),
            head_sha: None,
            base_ref: None,
            merged_at: issue.pull_request.and_then(|pr| pr.merged_at),
        }
    }
}

#[derive(Deserialize)]
struct GhSearch {
    total_count: u64,
    items: Vec<GhIssue>,
}

#[derive(Deserialize)]
struct GhComment {
    id: u64,
    body: Option<String>,
    user: Option<GhUser>,
}

impl From<GhComment> for Comment {
    fn from(comment: GhComment) -> Self {
        Comment {
            id: comment.id,
            body: comment.body.unwrap_or_default(),
            author: comment.user.map(|u| u.login),
        }
    }
}

#[derive(Deserialize)]
struct GhRelease {
    tag_name: String,
    name: Option<String>,
    published_at: Option<DateTime<Utc>>,
}

impl From<GhRelease> for Release {
    fn from(release: GhRelease) -> Self {
        Release {
            tag: release.tag_name,
            name: release.name,
            published_at: release.published_at,
        }
    }
}

#[derive(Deserialize)]
struct GhFile {
    filename: String,
    previous_filename: Option<String>,
    status: FileStatus,
    patch: Option<String>,
    #[serde(default)]
    additions: u64,
    #[serde(default)]
    deletions: u64,
}

impl From<GhFile> for ChangedFile {
    fn from(file: GhFile) -> Self {
        ChangedFile {
            path: file.filename,
            previous_path: file.previous_filename,
            status: file.status,
            patch: file.patch,
            additions: file.additions,
            deletions: file.deletions,
        }
    }
}

#[derive(Deserialize)]
struct GhRepository {
    default_branch: String,
}

#[derive(Deserialize)]
struct GqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GqlError>,
}

#[derive(Deserialize)]
struct GqlError {
    message: String,
}

#[derive(Deserialize)]
#[serde(bound = "T: DeserializeOwned")]
struct GqlRepository<T> {
    repository: Option<HashMap<String, Option<T>>>,
}

#[derive(Deserialize)]
struct GqlNodes<T> {
    nodes: Vec<T>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GqlClosingIssues {
    closing_issues_references: GqlNodes<GqlIssue>,
}

#[derive(Deserialize)]
struct GqlIssue {
    number: u64,
    title: String,
    body: Option<String>,
    url: String,
    labels: Option<GqlNodes<GhLabel>>,
}

impl From<GqlIssue> for Issue {
    fn from(issue: GqlIssue) -> Self {
        Issue {
            number: issue.number,
            title: issue.title,
            body: issue.body,
            url: issue.url,
            labels: issue
                .labels
                .map(|l| l.nodes.into_iter().map(Into::into).collect())
                .unwrap_or_default(),
        }
    }
}

#[derive(Deserialize)]
struct GqlComments {
    comments: GqlNodes<GqlComment>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GqlComment {
    database_id: Option<u64>,
    body: String,
    author: Option<GhUser>,
}

impl From<GqlComment> for Comment {
    fn from(comment: GqlComment) -> Self {
        Comment {
            id: comment.database_id.unwrap_or_default(),
            body: comment.body,
            author: comment.author.map(|a| a.login),
        }
    }
}
