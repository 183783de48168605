//! Terminal renderer: styled flowing text, no tables.

use colored::Colorize;

use crate::models::{
    GeneratedLabels, InlineComment, PullRequestDescription, ReleaseDescription,
};
use crate::orchestrator::{AuthorChanges, ReviewOutcome};
use crate::output::{NO_CHANGES, Outcome, OutputRenderer};

/// Terminal output renderer with colored, flowing text.
pub struct TerminalRenderer;

impl OutputRenderer for TerminalRenderer {
    fn render(&self, outcome: &Outcome) -> String {
        match outcome {
            Outcome::PrDescription(result) => description(result),
            Outcome::Labels(result) => labels(result),
            Outcome::Review(result) => review(result),
            Outcome::ReleaseDescription(Some(result)) => release(result),
            Outcome::Ascription(Some(authors)) => ascription(authors),
            Outcome::ReleaseDescription(None) | Outcome::Ascription(None) => {
                format!("{}\n", format!("  ✔ {NO_CHANGES}.").yellow())
            }
        }
    }
}

fn description(result: &PullRequestDescription) -> String {
    let mut output = format!(
        " {} {}\n",
        result.title.bold(),
        format!("({})", result.complexity).dimmed()
    );
    match &result.description {
        Some(text) => {
            output.push('\n');
            output.push_str(text.trim_end());
            output.push('\n');
        }
        None => output.push_str(&format!("   {}\n", "No description generated.".dimmed())),
    }
    output
}

fn labels(result: &GeneratedLabels) -> String {
    if result.labels.is_empty() {
        return format!("{}\n", "  ✔ No labels suggested.".green());
    }
    let names: Vec<String> = result
        .labels
        .iter()
        .map(|name| name.cyan().bold().to_string())
        .collect();
    format!(" {} {}\n", "Labels:".bold(), names.join(", "))
}

fn review(result: &ReviewOutcome) -> String {
    let mut output = String::new();
    if result.comments.is_empty() {
        output.push_str(&format!("{}\n", "  ✔ LGTM, no comments.".green()));
    } else {
        let mut sorted: Vec<&InlineComment> = result.comments.iter().collect();
        sorted.sort_by(|a, b| a.path.cmp(&b.path).then(a.position.cmp(&b.position)));

        let mut current_file = "";
        for comment in sorted {
            if comment.path != current_file {
                if !current_file.is_empty() {
                    output.push('\n');
                }
                current_file = &comment.path;
            }
            let location = format!("{}@{}", comment.path, comment.position);
            output.push_str(&format!(" {} {}\n", "●".blue().bold(), location.bold()));
            output.push_str(&format!("   {}\n", comment.body));
        }
        output.push('\n');
    }

    if let Some(summary) = &result.review.summary {
        output.push_str(&format!(" {} {}\n", "Summary:".bold(), summary));
    }
    output.push_str(&format!("{}\n", "───────────────────────────────────".dimmed()));
    output.push_str(&format!(
        " {} {}, {} {}\n",
        result.comments.len().to_string().bold(),
        if result.comments.len() == 1 { "comment" } else { "comments" },
        result.dropped.to_string().yellow().bold(),
        "could not be placed on the diff",
    ));
    output
}

fn release(result: &ReleaseDescription) -> String {
    format!("{}\n", result.description.trim_end())
}

fn ascription(authors: &[AuthorChanges]) -> String {
    let mut output = String::new();
    for (index, author) in authors.iter().enumerate() {
        if index > 0 {
            output.push('\n');
        }
        output.push_str(&format!(
            " {} {}\n",
            format!("@{}", author.author).bold(),
            format!("({} pull requests)", author.items.len()).dimmed()
        ));
        for item in &author.items {
            output.push_str(&format!(
                "   #{} {} {}\n",
                item.pr.number,
                item.metadata.title,
                format!("[{}]", item.metadata.complexity).dimmed()
            ));
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::remote::PullRequest;
    use crate::models::{Complexity, GeneratedReview};
    use crate::orchestrator::AscribedChange;

    #[test]
    fn render_no_changes_is_distinct() {
        let output = TerminalRenderer.render(&Outcome::ReleaseDescription(None));
        assert!(output.contains("No changes found"));
        let output = TerminalRenderer.render(&Outcome::ReleaseDescription(Some(
            ReleaseDescription {
                description: "## Highlights".into(),
            },
        )));
        assert!(!output.contains("No changes found"));
        assert!(output.contains("## Highlights"));
    }

    #[test]
    fn render_review_groups_by_file() {
        let outcome = Outcome::Review(ReviewOutcome {
            review: GeneratedReview {
                summary: Some("Mostly fine".into()),
                reviews: vec![],
            },
            comments: vec![
                InlineComment {
                    path: "src/b.rs".into(),
                    position: 2,
                    body: "Second".into(),
                },
                InlineComment {
                    path: "src/a.rs".into(),
                    position: 7,
                    body: "First".into(),
                },
            ],
            dropped: 1,
        });
        let output = TerminalRenderer.render(&outcome);
        let first = output.find("src/a.rs@7").unwrap();
        let second = output.find("src/b.rs@2").unwrap();
        assert!(first < second);
        assert!(output.contains("Mostly fine"));
        assert!(output.contains("could not be placed"));
    }

    #[test]
    fn render_ascription() {
        let pr = PullRequest {
            number: 12,
            title: "wip".into(),
            body: None,
            author: Some("octo".into()),
            url: String::new(),
            labels: vec![],
            head_sha: None,
            base_ref: None,
            merged_at: None,
        };
        let authors = vec![AuthorChanges {
            author: "octo".into(),
            items: vec![AscribedChange {
                pr,
                metadata: PullRequestDescription {
                    title: "Speed up search".into(),
                    complexity: Complexity::Major,
                    description: None,
                },
            }],
        }];
        let output = TerminalRenderer.render(&Outcome::Ascription(Some(authors)));
        assert!(output.contains("octo"));
        assert!(output.contains("#12 Speed up search"));
        assert!(output.contains("major"));
    }

    #[test]
    fn render_empty_labels() {
        let output = TerminalRenderer.render(&Outcome::Labels(GeneratedLabels { labels: vec![] }));
        assert!(output.contains("No labels suggested"));
    }
}
