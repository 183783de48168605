//! Generation service: prompt construction, the model call, and result
//! validation for each generation operation.

pub mod parse;
pub mod prompts;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::models::context::{
    DiffContext, IssueContext, LabelContext, PullRequestContext, PullRequestFileContext,
    TicketContext,
};
use crate::models::generated::{
    GeneratedLabels, GeneratedReview, PullRequestDescription, ReleaseDescription,
};
use crate::models::{ChangeBundle, Persona};
use crate::providers::{GenerationProvider, GenerationRequest, ProviderError, ResultShape};

use prompts::{LabelSubject, PromptPair};

/// Errors from a generation call.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("generated {shape:?} result is invalid: {message}")]
    Validation { shape: ResultShape, message: String },

    #[error("cannot generate without {0}")]
    MissingContext(String),
}

/// Builds prompts, calls the provider, and validates the reply.
#[derive(Clone)]
pub struct GenerationService {
    provider: Arc<dyn GenerationProvider>,
}

impl GenerationService {
    pub fn new(provider: Arc<dyn GenerationProvider>) -> Self {
        Self { provider }
    }

    pub async fn describe_pr(
        &self,
        pr: &PullRequestContext,
        files: &[PullRequestFileContext],
        ticket: Option<&TicketContext>,
        template: Option<&str>,
        extra: Option<&str>,
    ) -> Result<PullRequestDescription, GenerationError> {
        if files.is_empty() {
            return Err(GenerationError::MissingContext(
                "changed files for the pull request".into(),
            ));
        }
        let pair = prompts::describe_pr(pr, files, ticket, template, extra);
        self.generate(pair, ResultShape::PullRequestDescription).await
    }

    /// Label a pull request. `existing` is `None` when applied labels are
    /// hidden from the model.
    pub async fn label_pr(
        &self,
        pr: &PullRequestContext,
        diff: Option<&DiffContext>,
        available: &[LabelContext],
        existing: Option<&[LabelContext]>,
        extra: Option<&str>,
    ) -> Result<GeneratedLabels, GenerationError> {
        let diff = diff.ok_or_else(|| {
            GenerationError::MissingContext("a diff for the pull request".into())
        })?;
        let pair = prompts::label(
            LabelSubject::PullRequest,
            pr.prompt(),
            Some(diff),
            available,
            existing,
            extra,
        );
        self.generate(pair, ResultShape::Labels).await
    }

    pub async fn label_issue(
        &self,
        issue: &IssueContext,
        available: &[LabelContext],
        existing: Option<&[LabelContext]>,
        extra: Option<&str>,
    ) -> Result<GeneratedLabels, GenerationError> {
        let pair = prompts::label(
            LabelSubject::Issue,
            issue.prompt(),
            None,
            available,
            existing,
            extra,
        );
        self.generate(pair, ResultShape::Labels).await
    }

    pub async fn describe_release(
        &self,
        changes: &[ChangeBundle],
        persona: Persona,
        template: Option<&str>,
        extra: Option<&str>,
    ) -> Result<ReleaseDescription, GenerationError> {
        if changes.is_empty() {
            return Err(GenerationError::MissingContext("merged pull requests".into()));
        }
        let pair = prompts::describe_release(changes, persona, template, extra);
        self.generate(pair, ResultShape::ReleaseDescription).await
    }

    pub async fn review_pr(
        &self,
        pr: &PullRequestContext,
        files: &[PullRequestFileContext],
        rules: &[String],
        extra: Option<&str>,
    ) -> Result<GeneratedReview, GenerationError> {
        if rules.is_empty() {
            return Err(GenerationError::MissingContext("review rules".into()));
        }
        if files.is_empty() {
            return Err(GenerationError::MissingContext(
                "changed files for the pull request".into(),
            ));
        }
        let pair = prompts::review_pr(pr, files, rules, extra);
        self.generate(pair, ResultShape::Review).await
    }

    async fn generate<T: DeserializeOwned>(
        &self,
        pair: PromptPair,
        shape: ResultShape,
    ) -> Result<T, GenerationError> {
        debug!(?shape, system = %pair.system, user = %pair.user, "generation prompt");
        let request = GenerationRequest {
            system: pair.system,
            prompt: pair.user,
            shape,
        };
        let reply = self.provider.generate(&request).await?;
        parse::parse_reply(&reply).map_err(|message| GenerationError::Validation { shape, message })
    }
}
