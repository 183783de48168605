//! Caller-selected behaviour for the high-level operations.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Whether and how generated labels are written back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum WriteMode {
    /// Return the result only.
    #[default]
    #[value(skip)]
    Skip,
    /// Union generated labels into the existing set.
    Add,
    /// Replace the label set with the generated labels.
    #[value(name = "set")]
    Replace,
}

/// Which labels to keep away from the model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ExcludeSpec {
    #[default]
    Nothing,
    /// Hide these repository labels from the available list.
    Named(BTreeSet<String>),
    /// Do not show the labels already applied to the item.
    Existing,
}

impl ExcludeSpec {
    pub fn hides_existing(&self) -> bool {
        matches!(self, ExcludeSpec::Existing)
    }

    pub fn named(&self) -> Option<&BTreeSet<String>> {
        match self {
            ExcludeSpec::Named(names) => Some(names),
            _ => None,
        }
    }
}

impl FromStr for ExcludeSpec {
    type Err = String;

    /// `existing`, or a comma-separated list of label names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim() == "existing" {
            return Ok(ExcludeSpec::Existing);
        }
        let names: BTreeSet<String> = split_list(s).map(str::to_string).collect();
        if names.is_empty() {
            Ok(ExcludeSpec::Nothing)
        } else {
            Ok(ExcludeSpec::Named(names))
        }
    }
}

/// Where a generated PR description is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DescribeTargets {
    pub title: bool,
    pub description: bool,
    pub comment: bool,
}

impl DescribeTargets {
    pub fn any(&self) -> bool {
        self.title || self.description || self.comment
    }
}

impl FromStr for DescribeTargets {
    type Err = String;

    /// Comma-separated subset of `title`, `description`, `comment`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut targets = DescribeTargets::default();
        for item in split_list(s) {
            match item {
                "title" => targets.title = true,
                "description" => targets.description = true,
                "comment" => targets.comment = true,
                other => {
                    return Err(format!(
                        "unknown write target '{other}'. Expected: title, description, comment"
                    ));
                }
            }
        }
        Ok(targets)
    }
}

/// Context kinds a caller may leave out to shrink the prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExcludedContexts {
    pub ticket: bool,
    pub file_content: bool,
}

impl FromStr for ExcludedContexts {
    type Err = String;

    /// Comma-separated subset of `ticket`, `file-content`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut excluded = ExcludedContexts::default();
        for item in split_list(s) {
            match item {
                "ticket" => excluded.ticket = true,
                "file-content" => excluded.file_content = true,
                other => {
                    return Err(format!(
                        "unknown context '{other}'. Expected: ticket, file-content"
                    ));
                }
            }
        }
        Ok(excluded)
    }
}

/// Audience of generated release notes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    Marketing,
    #[default]
    Engineering,
    Product,
    Leadership,
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Persona::Marketing => write!(f, "marketing"),
            Persona::Engineering => write!(f, "engineering"),
            Persona::Product => write!(f, "product"),
            Persona::Leadership => write!(f, "leadership"),
        }
    }
}

/// Extra contexts attached to each change of a release.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReleaseInclude {
    pub issues: bool,
    pub tickets: bool,
    pub labels: bool,
}

impl FromStr for ReleaseInclude {
    type Err = String;

    /// Comma-separated subset of `issues`, `tickets`, `labels`, or `all`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut include = ReleaseInclude::default();
        for item in split_list(s) {
            match item {
                "issues" => include.issues = true,
                "tickets" => include.tickets = true,
                "labels" => include.labels = true,
                "all" => {
                    include = ReleaseInclude {
                        issues: true,
                        tickets: true,
                        labels: true,
                    }
                }
                other => {
                    return Err(format!(
                        "unknown include '{other}'. Expected: issues, tickets, labels, all"
                    ));
                }
            }
        }
        Ok(include)
    }
}

/// The set of merged pull requests a release operation covers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ReleaseWindow {
    /// Merged since the latest release (or ever, without a release).
    #[default]
    Unreleased,
    /// Merged between the publish times of two releases. Either bound may
    /// be open.
    Tags {
        from: Option<String>,
        to: Option<String>,
    },
    /// Merged within an explicit time range.
    Range {
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    },
}

fn split_list(s: &str) -> impl Iterator<Item = &str> {
    s.split(',').map(str::trim).filter(|item| !item.is_empty())
}
