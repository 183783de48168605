//! Output renderers: colored terminal text and JSON.

pub mod json;
pub mod terminal;

use serde::Serialize;

use crate::models::{GeneratedLabels, PullRequestDescription, ReleaseDescription};
use crate::orchestrator::{AuthorChanges, ReviewOutcome};

/// Shown when a release window holds no merged pull requests.
pub const NO_CHANGES: &str = "No changes found";

/// The result of one command, ready to render.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Outcome {
    PrDescription(PullRequestDescription),
    Labels(GeneratedLabels),
    Review(ReviewOutcome),
    /// `None` when the window was empty.
    ReleaseDescription(Option<ReleaseDescription>),
    /// `None` when the window was empty.
    Ascription(Option<Vec<AuthorChanges>>),
}

impl Outcome {
    /// Whether this is an empty release window.
    pub fn is_no_changes(&self) -> bool {
        matches!(
            self,
            Outcome::ReleaseDescription(None) | Outcome::Ascription(None)
        )
    }
}

/// Trait for rendering a command outcome to an output format.
pub trait OutputRenderer {
    fn render(&self, outcome: &Outcome) -> String;
}
