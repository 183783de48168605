//! The `Relgen` facade: one method per high-level operation, each
//! fetching context, generating, and optionally writing back.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::{Config, GenerationConfig};
use crate::constants::DESCRIBE_TAG;
use crate::context::RemoteContextBuilder;
use crate::diff::ExcludedFiles;
use crate::generation::{GenerationError, GenerationService};
use crate::metadata;
use crate::models::remote::PullRequest;
use crate::models::{
    DescribeTargets, ExcludeSpec, ExcludedContexts, GeneratedLabels, GeneratedReview,
    InlineComment, IssueRef, Persona, PullRequestDescription, ReleaseDescription, ReleaseInclude,
    ReleaseWindow, RepoRef, WriteMode,
};
use crate::providers::GenerationProvider;
use crate::providers::rig::RigProvider;
use crate::remote::{PullRequestUpdate, RemoteError, RemotePlatform, create_platform};
use crate::review::LineMapper;
use crate::write::{RemoteWriter, join_sections, review_body};

/// Errors from a high-level operation.
#[derive(Error, Debug)]
pub enum RelgenError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to encode metadata: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("background task failed: {0}")]
    Task(String),
}

impl From<crate::providers::ProviderError> for RelgenError {
    fn from(err: crate::providers::ProviderError) -> Self {
        RelgenError::Generation(GenerationError::Provider(err))
    }
}

/// Settings fixed for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Maximum concurrent generation calls.
    pub concurrency: usize,
    pub line_match_threshold: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from(&GenerationConfig::default())
    }
}

impl From<&GenerationConfig> for Settings {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            concurrency: config.concurrency.max(1),
            line_match_threshold: config.line_match_threshold,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PrDescribeOptions {
    pub write: DescribeTargets,
    pub template: Option<String>,
    pub prompt: Option<String>,
    pub footer: Option<String>,
    pub excluded_contexts: ExcludedContexts,
    /// Globs excluded in addition to the default lockfiles.
    pub excluded_file_patterns: Vec<String>,
}

/// Options for labeling a pull request or an issue.
#[derive(Debug, Clone, Default)]
pub struct LabelOptions {
    pub write: WriteMode,
    pub exclude: ExcludeSpec,
    pub prompt: Option<String>,
    /// Globs excluded from the diff in addition to the default lockfiles.
    pub excluded_file_patterns: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PrReviewOptions {
    pub write: bool,
    pub prompt: Option<String>,
    pub footer: Option<String>,
    pub excluded_contexts: ExcludedContexts,
    pub excluded_file_patterns: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ReleaseDescribeOptions {
    pub window: ReleaseWindow,
    pub persona: Persona,
    pub template: Option<String>,
    pub prompt: Option<String>,
    pub include: ReleaseInclude,
}

#[derive(Debug, Clone, Default)]
pub struct ReleaseAscribeOptions {
    pub window: ReleaseWindow,
    /// Regex; pull requests with a matching title are skipped.
    pub excluded_pattern: Option<String>,
    pub excluded_contexts: ExcludedContexts,
    pub excluded_file_patterns: Vec<String>,
}

/// A generated review and where its findings landed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewOutcome {
    #[serde(flatten)]
    pub review: GeneratedReview,
    /// Findings placed on the diff.
    pub comments: Vec<InlineComment>,
    /// Findings that could not be placed.
    pub dropped: usize,
}

/// One pull request attributed to its author.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AscribedChange {
    pub pr: PullRequest,
    pub metadata: PullRequestDescription,
}

/// Everything one author contributed to a release window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorChanges {
    pub author: String,
    pub items: Vec<AscribedChange>,
}

/// Author shown for pull requests whose author account is gone.
pub const UNKNOWN_AUTHOR: &str = "unknown";

/// Entry point for every operation.
pub struct Relgen {
    builder: RemoteContextBuilder,
    generator: GenerationService,
    writer: RemoteWriter,
    settings: Settings,
}

impl Relgen {
    pub fn new(
        remote: Arc<dyn RemotePlatform>,
        provider: Arc<dyn GenerationProvider>,
        settings: Settings,
    ) -> Self {
        Self {
            builder: RemoteContextBuilder::new(Arc::clone(&remote)),
            generator: GenerationService::new(provider),
            writer: RemoteWriter::new(remote),
            settings,
        }
    }

    /// Build the platform and provider named in `config`.
    pub fn from_config(config: &Config) -> Result<Self, RelgenError> {
        let remote = create_platform(&config.remote)?;
        let provider: Arc<dyn GenerationProvider> =
            Arc::new(RigProvider::new(config.provider.clone())?);
        Ok(Self::new(remote, provider, Settings::from(&config.generation)))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Describe a pull request and write the result to the chosen targets.
    pub async fn pr_describe(
        &self,
        target: &IssueRef,
        options: &PrDescribeOptions,
    ) -> Result<PullRequestDescription, RelgenError> {
        let excluded = excluded_files(&options.excluded_file_patterns)?;
        let contexts = self.builder.pr_get(target).await?;
        let content_ref = content_ref(contexts.pr.data(), options.excluded_contexts);
        let files = self
            .builder
            .pr_files(target, &excluded, content_ref.as_deref())
            .await?;

        let result = self
            .generator
            .describe_pr(
                &contexts.pr,
                &files,
                None,
                options.template.as_deref(),
                options.prompt.as_deref(),
            )
            .await?;

        if options.write.any() {
            self.write_description(target, &result, options).await?;
        }
        Ok(result)
    }

    async fn write_description(
        &self,
        target: &IssueRef,
        result: &PullRequestDescription,
        options: &PrDescribeOptions,
    ) -> Result<(), RelgenError> {
        let block = metadata::to_block(result)?;
        let description = result.description.as_deref();
        let footer = options.footer.as_deref();

        let mut update = PullRequestUpdate::default();
        if options.write.title {
            update.title = Some(result.title.clone());
        }
        if options.write.description && description.is_some() {
            update.body = Some(join_sections([description, footer, Some(block.as_str())]));
        }
        self.writer.update_pr(target, &update).await?;

        if options.write.comment {
            let body = join_sections([description, footer, Some(block.as_str()), Some(DESCRIBE_TAG)]);
            self.writer.upsert_comment(target, &body, DESCRIBE_TAG).await?;
        }
        Ok(())
    }

    /// Label a pull request from its diff.
    pub async fn pr_label(
        &self,
        target: &IssueRef,
        options: &LabelOptions,
    ) -> Result<GeneratedLabels, RelgenError> {
        let excluded = excluded_files(&options.excluded_file_patterns)?;
        let (contexts, diff, available) = tokio::try_join!(
            self.builder.pr_get(target),
            self.builder.pr_diff(target, &excluded),
            self.builder.labels_get(&target.repo, options.exclude.named()),
        )?;

        let existing = (!options.exclude.hides_existing()).then_some(contexts.labels.as_slice());
        let result = self
            .generator
            .label_pr(
                &contexts.pr,
                diff.as_ref(),
                &available,
                existing,
                options.prompt.as_deref(),
            )
            .await?;

        let current: Vec<String> = contexts.pr.data().labels.iter().map(|l| l.name.clone()).collect();
        self.writer
            .write_labels(target, &current, &result.labels, options.write)
            .await?;
        Ok(result)
    }

    /// Label an issue.
    pub async fn issue_label(
        &self,
        target: &IssueRef,
        options: &LabelOptions,
    ) -> Result<GeneratedLabels, RelgenError> {
        let (contexts, available) = tokio::try_join!(
            self.builder.issue_get(target),
            self.builder.labels_get(&target.repo, options.exclude.named()),
        )?;

        let existing = (!options.exclude.hides_existing()).then_some(contexts.labels.as_slice());
        let result = self
            .generator
            .label_issue(&contexts.issue, &available, existing, options.prompt.as_deref())
            .await?;

        let current: Vec<String> = contexts
            .issue
            .data()
            .labels
            .iter()
            .map(|l| l.name.clone())
            .collect();
        self.writer
            .write_labels(target, &current, &result.labels, options.write)
            .await?;
        Ok(result)
    }

    /// Review a pull request against `rules`, mapping findings onto the
    /// diff and optionally submitting them.
    pub async fn pr_review(
        &self,
        target: &IssueRef,
        rules: &[String],
        options: &PrReviewOptions,
    ) -> Result<ReviewOutcome, RelgenError> {
        let excluded = excluded_files(&options.excluded_file_patterns)?;
        let contexts = self.builder.pr_get(target).await?;
        let content_ref = content_ref(contexts.pr.data(), options.excluded_contexts);
        let files = self
            .builder
            .pr_files(target, &excluded, content_ref.as_deref())
            .await?;

        let review = self
            .generator
            .review_pr(&contexts.pr, &files, rules, options.prompt.as_deref())
            .await?;

        let mapper = LineMapper::new(self.settings.line_match_threshold);
        let mapped = mapper.map(&files, &review.reviews);
        if mapped.dropped > 0 {
            info!(pr = %target, dropped = mapped.dropped, "some review findings could not be placed");
        }

        if options.write {
            let body = review_body(
                review.summary.as_deref(),
                mapped.comments.len(),
                options.footer.as_deref(),
            );
            self.writer
                .submit_review(
                    target,
                    contexts.pr.data().head_sha.as_deref(),
                    body,
                    mapped.comments.clone(),
                )
                .await?;
        }

        Ok(ReviewOutcome {
            review,
            comments: mapped.comments,
            dropped: mapped.dropped,
        })
    }

    /// Describe the pull requests of a release window. `None` when the
    /// window holds no merged pull requests.
    pub async fn release_describe(
        &self,
        repo: &RepoRef,
        options: &ReleaseDescribeOptions,
    ) -> Result<Option<ReleaseDescription>, RelgenError> {
        let changes = self
            .builder
            .pr_window(repo, &options.window, options.include)
            .await?;
        if changes.is_empty() {
            info!(repo = %repo, "no changes found");
            return Ok(None);
        }

        let result = self
            .generator
            .describe_release(
                &changes,
                options.persona,
                options.template.as_deref(),
                options.prompt.as_deref(),
            )
            .await?;
        Ok(Some(result))
    }

    /// Attribute the pull requests of a release window to their authors.
    ///
    /// Each pull request's description metadata is recovered from its body
    /// or comments when present, and generated (without writing) otherwise.
    /// `None` when the window holds no merged pull requests.
    pub async fn release_ascribe(
        &self,
        repo: &RepoRef,
        options: &ReleaseAscribeOptions,
    ) -> Result<Option<Vec<AuthorChanges>>, RelgenError> {
        let excluded_title = options
            .excluded_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|e| RelgenError::Config(format!("invalid excluded pattern: {e}")))?;
        let excluded = excluded_files(&options.excluded_file_patterns)?;

        let prs: Vec<PullRequest> = self
            .builder
            .pr_window(repo, &options.window, ReleaseInclude::default())
            .await?
            .into_iter()
            .map(|bundle| bundle.pr.into_data())
            .filter(|pr| excluded_title.as_ref().is_none_or(|re| !re.is_match(&pr.title)))
            .collect();
        if prs.is_empty() {
            info!(repo = %repo, "no changes found");
            return Ok(None);
        }

        let numbers: Vec<u64> = prs.iter().map(|pr| pr.number).collect();
        let comments = self.builder.pr_comments(repo, &numbers).await?;

        let mut recovered: Vec<Option<PullRequestDescription>> = prs
            .iter()
            .map(|pr| {
                let from_body = pr.body.as_deref().and_then(metadata::find);
                from_body.or_else(|| {
                    comments
                        .get(&pr.number)
                        .into_iter()
                        .flatten()
                        .find_map(|comment| metadata::find(&comment.data().body))
                })
            })
            .collect();

        let missing: Vec<usize> = (0..prs.len()).filter(|&i| recovered[i].is_none()).collect();
        debug!(
            total = prs.len(),
            missing = missing.len(),
            "recovered pull request metadata"
        );
        let generated = self
            .generate_missing(repo, &prs, &missing, &excluded, options.excluded_contexts)
            .await?;
        for (index, description) in generated {
            recovered[index] = Some(description);
        }

        let mut by_author: IndexMap<String, Vec<AscribedChange>> = IndexMap::new();
        for (pr, description) in prs.into_iter().zip(recovered) {
            let Some(description) = description else {
                continue;
            };
            let author = pr.author.clone().unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());
            by_author.entry(author).or_default().push(AscribedChange {
                pr,
                metadata: description,
            });
        }

        if by_author.is_empty() {
            info!(repo = %repo, "no changes found");
            return Ok(None);
        }
        Ok(Some(
            by_author
                .into_iter()
                .map(|(author, items)| AuthorChanges { author, items })
                .collect(),
        ))
    }

    /// Describe the pull requests at `indices`, a bounded number at a time.
    ///
    /// A pull request with nothing to describe (only lockfiles, binaries or
    /// no changes at all) is left out of the result.
    async fn generate_missing(
        &self,
        repo: &RepoRef,
        prs: &[PullRequest],
        indices: &[usize],
        excluded: &ExcludedFiles,
        excluded_contexts: ExcludedContexts,
    ) -> Result<HashMap<usize, PullRequestDescription>, RelgenError> {
        let semaphore = Arc::new(Semaphore::new(self.settings.concurrency.max(1)));
        let mut join_set = JoinSet::new();

        for &index in indices {
            let builder = self.builder.clone();
            let generator = self.generator.clone();
            let sem = Arc::clone(&semaphore);
            let excluded = excluded.clone();
            let target = IssueRef {
                repo: repo.clone(),
                number: prs[index].number,
            };

            join_set.spawn(async move {
                let _permit = sem.acquire().await;
                let result = describe_without_writing(
                    &builder,
                    &generator,
                    &target,
                    &excluded,
                    excluded_contexts,
                )
                .await;
                (index, result)
            });
        }

        let mut generated = HashMap::new();
        while let Some(joined) = join_set.join_next().await {
            let (index, result) = joined.map_err(|e| RelgenError::Task(e.to_string()))?;
            match result {
                Ok(description) => {
                    generated.insert(index, description);
                }
                Err(RelgenError::Generation(GenerationError::MissingContext(reason))) => {
                    warn!(pr = prs[index].number, %reason, "skipping pull request with nothing to describe");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(generated)
    }
}

async fn describe_without_writing(
    builder: &RemoteContextBuilder,
    generator: &GenerationService,
    target: &IssueRef,
    excluded: &ExcludedFiles,
    excluded_contexts: ExcludedContexts,
) -> Result<PullRequestDescription, RelgenError> {
    let contexts = builder.pr_get(target).await?;
    let content_ref = content_ref(contexts.pr.data(), excluded_contexts);
    let files = builder
        .pr_files(target, excluded, content_ref.as_deref())
        .await?;
    let description = generator
        .describe_pr(&contexts.pr, &files, None, None, None)
        .await?;
    Ok(description)
}

/// Ref to fetch file content at, unless content is excluded.
fn content_ref(pr: &PullRequest, excluded: ExcludedContexts) -> Option<String> {
    if excluded.file_content {
        return None;
    }
    pr.head_sha.clone()
}

fn excluded_files(patterns: &[String]) -> Result<ExcludedFiles, RelgenError> {
    ExcludedFiles::default()
        .with_patterns(patterns)
        .map_err(|e| RelgenError::Config(format!("invalid excluded file pattern: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_never_allow_zero_concurrency() {
        let settings = Settings::from(&GenerationConfig {
            concurrency: 0,
            line_match_threshold: 0.9,
        });
        assert_eq!(settings.concurrency, 1);
        assert_eq!(settings.line_match_threshold, 0.9);
    }

    #[test]
    fn invalid_file_pattern_is_config_error() {
        let result = excluded_files(&["src/[".to_string()]);
        assert!(matches!(result, Err(RelgenError::Config(_))));
    }

    #[test]
    fn content_ref_respects_exclusion() {
        let pr = PullRequest {
            number: 1,
            title: "x".into(),
            body: None,
            author: None,
            url: String::new(),
            labels: vec![],
            head_sha: Some("abc123".into()),
            base_ref: None,
            merged_at: None,
        };
        assert_eq!(content_ref(&pr, ExcludedContexts::default()).as_deref(), Some("abc123"));
        let excluded = ExcludedContexts {
            file_content: true,
            ..Default::default()
        };
        assert_eq!(content_ref(&pr, excluded), None);
    }
}
