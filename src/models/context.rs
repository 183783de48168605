//! The uniform context envelope handed to prompt builders.
//!
//! A [`Context`] pairs a piece of remote data with the prompt fragment
//! rendered from it. The fragment is produced once, when the context is
//! built, and the envelope is immutable afterwards.

use std::fmt;

use serde::Serialize;

use super::diff::FileDiff;
use super::remote::{ChangedFile, Comment, Issue, Label, PullRequest, Ticket};

/// What kind of data a context carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContextKind {
    Pr,
    PrFile,
    Diff,
    Issue,
    Label,
    Ticket,
    PrReviewComment,
    Code,
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContextKind::Pr => "pr",
            ContextKind::PrFile => "pr-file",
            ContextKind::Diff => "diff",
            ContextKind::Issue => "issue",
            ContextKind::Label => "label",
            ContextKind::Ticket => "ticket",
            ContextKind::PrReviewComment => "pr-review-comment",
            ContextKind::Code => "code",
        };
        f.write_str(s)
    }
}

/// Remote data plus its pre-rendered prompt fragment.
#[derive(Debug, Clone, Serialize)]
pub struct Context<D> {
    kind: ContextKind,
    data: D,
    prompt: String,
}

impl<D> Context<D> {
    /// Build a context, rendering its prompt from `data` exactly once.
    pub fn new(kind: ContextKind, data: D, render: impl FnOnce(&D) -> String) -> Self {
        let prompt = render(&data);
        Self { kind, data, prompt }
    }

    pub fn kind(&self) -> ContextKind {
        self.kind
    }

    pub fn data(&self) -> &D {
        &self.data
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn into_data(self) -> D {
        self.data
    }
}

/// Data of a `pr-file` context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PullRequestFile {
    pub path: String,
    pub patch: Option<String>,
    /// Full text at the head ref. `None` for removed, binary or
    /// non-UTF-8 files, and when content was not requested.
    pub content: Option<String>,
    /// The platform's file record.
    pub file: ChangedFile,
}

pub type PullRequestContext = Context<PullRequest>;
pub type PullRequestFileContext = Context<PullRequestFile>;
pub type DiffContext = Context<Vec<FileDiff>>;
pub type IssueContext = Context<Issue>;
pub type LabelContext = Context<Label>;
pub type TicketContext = Context<Ticket>;
pub type CommentContext = Context<Comment>;

/// A pull request with everything that travels with it into a release.
#[derive(Debug, Clone)]
pub struct ChangeBundle {
    pub pr: PullRequestContext,
    pub issue: Option<IssueContext>,
    pub ticket: Option<TicketContext>,
    pub labels: Vec<LabelContext>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_is_rendered_once_at_construction() {
        let mut calls = 0;
        let ctx = Context::new(ContextKind::Label, Label::named("bug"), |label| {
            calls += 1;
            format!("<label>{}</label>", label.name)
        });
        assert_eq!(calls, 1);
        assert_eq!(ctx.prompt(), "<label>bug</label>");
        assert_eq!(ctx.prompt(), "<label>bug</label>");
        assert_eq!(ctx.kind(), ContextKind::Label);
        assert_eq!(ctx.data().name, "bug");
    }

    #[test]
    fn kind_names() {
        assert_eq!(ContextKind::PrFile.to_string(), "pr-file");
        assert_eq!(ContextKind::PrReviewComment.to_string(), "pr-review-comment");
        assert_eq!(
            serde_json::to_string(&ContextKind::PrReviewComment).unwrap(),
            "\"pr-review-comment\""
        );
    }
}
