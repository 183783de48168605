//! System and user prompts for each generation operation.

use crate::models::context::{
    DiffContext, LabelContext, PullRequestContext, PullRequestFileContext, TicketContext,
};
use crate::models::{ChangeBundle, Persona};

/// A system prompt plus the user prompt that goes with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

const GRAMMAR: &str = "Use proper English grammar and punctuation like a native speaker.";

/// Used when no template is configured for a pull request description.
pub const DEFAULT_DESCRIBE_TEMPLATE: &str = "### Changes
A bullet point list of the important changes, one sentence each

### Implementation
ONLY INCLUDED IF THE CHANGES ARE \"major\" COMPLEXITY.
If the changes are \"major\" complexity, use this section to explain the context and approach at a high level in a few sentences. If they are not \"major\", omit this section.

### Other Notes
ONLY INCLUDED IF THERE ARE CHANGES UNRELATED TO ANYTHING DESCRIBED ABOVE.
If there are small tweaks to things unrelated to the main purpose of the PR, highlight them here in a bullet point list.
If there are no small tweaks, omit this section.
One sentence each.
Do not repeat yourself in this section; if a change is mentioned in the \"Changes\" section, it does not need to be mentioned here.";

/// What a label prompt is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelSubject {
    PullRequest,
    Issue,
}

impl LabelSubject {
    fn article(self) -> &'static str {
        match self {
            LabelSubject::PullRequest => "a pull request",
            LabelSubject::Issue => "an issue",
        }
    }

    fn short(self) -> &'static str {
        match self {
            LabelSubject::PullRequest => "PR",
            LabelSubject::Issue => "issue",
        }
    }
}

pub fn describe_pr(
    pr: &PullRequestContext,
    files: &[PullRequestFileContext],
    ticket: Option<&TicketContext>,
    template: Option<&str>,
    extra: Option<&str>,
) -> PromptPair {
    let template = template.unwrap_or(DEFAULT_DESCRIBE_TEMPLATE);
    let template_line = format!(
        "Follow the following template in your PR description as closely as possible:\n<template>\n{template}\n</template>"
    );
    let system = [
        "You are an expert software engineer tasked with summarizing a pull request.",
        "Use the given context to generate a summary that will be added as a comment.",
        "Keep your output concise and relevant.",
        GRAMMAR,
        "DO NOT RETURN A DESCRIPTION if you lack enough context.",
        "DO NOT RETURN A DESCRIPTION if the description is already good.",
        "Complexity is \"trivial\" if it touches only a few lines of code or configuration.",
        "Complexity is \"minor\" if it touches a few functions across one or two files.",
        "Complexity is \"major\" if it's a significant refactor or adds a huge new feature (hundreds of lines of code).",
        template_line.as_str(),
    ]
    .join("\n");

    let mut user = format!("Here's the relevant context:\n{}\n", pr.prompt());
    if let Some(ticket) = ticket {
        user.push_str(&format!("{}\n", ticket.prompt()));
    }
    user.push_str(&format!("<files>\n{}\n</files>", join_prompts(files)));
    push_extra(&mut user, extra);

    PromptPair { system, user }
}

/// Prompt for labeling a pull request (with `diff`) or an issue.
///
/// `existing` is `None` when the caller hides the applied labels.
pub fn label(
    subject: LabelSubject,
    item_prompt: &str,
    diff: Option<&DiffContext>,
    available: &[LabelContext],
    existing: Option<&[LabelContext]>,
    extra: Option<&str>,
) -> PromptPair {
    let short = subject.short();
    let persona = format!(
        "You are an expert software engineer tasked with labeling {}.",
        subject.article()
    );
    let task =
        format!("Use the given context to generate a list of labels that will be added to the {short}.");
    let restraint = format!(
        "RARELY USE MORE THAN ONE LABEL except when it is necessary (the {short} fits multiple labels very well)."
    );
    let system = [
        persona.as_str(),
        task.as_str(),
        "If no labels are relevant, return an empty list.",
        GRAMMAR,
        "DO NOT INCLUDE A LABEL if it is not relevant.",
        restraint.as_str(),
        "PRESERVE EXISTING LABELS if they are still relevant, even if it means using multiple labels.",
    ]
    .join("\n");

    let mut user = format!("Here's the {short} context:\n{item_prompt}\n");
    if let Some(diff) = diff {
        user.push_str(&format!("{}\n", diff.prompt()));
    }
    user.push_str(&format!(
        "\nHere are the available labels:\n<labels>\n{}\n</labels>",
        join_prompts(available)
    ));
    if let Some(existing) = existing.filter(|labels| !labels.is_empty()) {
        user.push_str(&format!(
            "\n\nHere are the labels already applied to the {short}:\n<labels>\n{}\n</labels>",
            join_prompts(existing)
        ));
    }
    push_extra(&mut user, extra);

    PromptPair { system, user }
}

pub fn describe_release(
    changes: &[ChangeBundle],
    persona: Persona,
    template: Option<&str>,
    extra: Option<&str>,
) -> PromptPair {
    let mut system = match persona {
        Persona::Marketing => "You are a highly experienced product manager tasked with summarizing the latest release for use in marketing materials.\nUse the given context to generate a summary that will be used in marketing materials.",
        Persona::Product => "You are a highly experienced product manager tasked with summarizing the latest release for the rest of the product org.\nUse the given context to generate a summary that will be used in a product update.",
        Persona::Leadership => "You are a highly experienced product manager tasked with summarizing the latest release for leadership.\nUse the given context to generate a summary that will be shown to company leadership.",
        Persona::Engineering => "You are an expert software engineer tasked with creating a detailed changelog of the release for other engineers.\nUse the given context to generate release notes that will be shown on the repository releases page.",
    }
    .to_string();
    system.push_str(&format!("\n{GRAMMAR}\nKeep your output concise and relevant."));
    if let Some(template) = template {
        system.push_str(&format!(
            "\nFollow the following template in your response as closely as possible:\n<template>\n{template}\n</template>"
        ));
    }

    let blocks: Vec<String> = changes.iter().map(change_block).collect();
    let mut user = format!("Here's the relevant context:\n{}", blocks.join("\n"));
    push_extra(&mut user, extra);

    PromptPair { system, user }
}

pub fn review_pr(
    pr: &PullRequestContext,
    files: &[PullRequestFileContext],
    rules: &[String],
    extra: Option<&str>,
) -> PromptPair {
    let system = [
        "You are an expert software engineer tasked with reviewing a pull request to ensure it follows some given rules.",
        GRAMMAR,
        "Refer to files by the file context ID given in the prompt.",
        "Patches are provided, these include preceding '+' or '-' characters to indicate added or removed lines.",
        "When providing line context, print the relevant line verbatim.",
        "You may include multiple reviews for the same file if necessary.",
        "Return an empty array of reviews if there are no important issues to address.",
        "Use the given context to review the PR, following the rules given.",
        "Make sure to explain each review comment clearly and concisely.",
        "If no change is needed, do not include a review.",
        "DO NOT MENTION ISSUES UNRELATED TO THE GIVEN RULES.",
    ]
    .join("\n");

    let file_blocks: Vec<String> = files
        .iter()
        .enumerate()
        .map(|(id, file)| format!("<file-context id={id}>\n{}\n</file-context>", file.prompt()))
        .collect();
    let rule_blocks: Vec<String> = rules
        .iter()
        .map(|rule| format!("<rule>\n{rule}\n</rule>"))
        .collect();

    let mut user = format!(
        "Here's the PR context:\n{}\n\n<files>\n{}\n</files>\n\n<rules>\n{}\n</rules>",
        pr.prompt(),
        file_blocks.join("\n"),
        rule_blocks.join("\n")
    );
    push_extra(&mut user, extra);

    PromptPair { system, user }
}

fn change_block(change: &ChangeBundle) -> String {
    let mut parts = vec![change.pr.prompt()];
    if let Some(issue) = &change.issue {
        parts.push(issue.prompt());
    }
    if let Some(ticket) = &change.ticket {
        parts.push(ticket.prompt());
    }
    parts.extend(change.labels.iter().map(|label| label.prompt()));
    format!("<change>\n{}\n</change>", parts.join("\n"))
}

fn join_prompts<D>(contexts: &[crate::models::Context<D>]) -> String {
    contexts
        .iter()
        .map(|ctx| ctx.prompt())
        .collect::<Vec<_>>()
        .join("\n")
}

fn push_extra(user: &mut String, extra: Option<&str>) {
    if let Some(extra) = extra.map(str::trim).filter(|e| !e.is_empty()) {
        user.push_str(&format!("\n\nExtra instructions:\n{extra}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{label_context, pull_request_context, ticket_context};
    use crate::models::remote::{Label, PullRequest, Ticket};
    use pretty_assertions::assert_eq;

    fn pr(title: &str) -> PullRequestContext {
        pull_request_context(PullRequest {
            number: 42,
            title: title.into(),
            body: Some("Body".into()),
            author: Some("octocat".into()),
            url: "https://github.com/acme/widget/pull/42".into(),
            labels: vec![],
            head_sha: Some("abc".into()),
            base_ref: Some("main".into()),
            merged_at: None,
        })
    }

    #[test]
    fn describe_uses_default_template_and_thresholds() {
        let prompt = describe_pr(&pr("Add x"), &[], None, None, None);
        assert!(prompt.system.contains("### Changes"));
        assert!(prompt.system.contains("Complexity is \"minor\""));
        assert!(prompt.user.starts_with("Here's the relevant context:\n<pr>"));
        assert!(!prompt.user.contains("Extra instructions"));
    }

    #[test]
    fn describe_custom_template_and_extra() {
        let prompt = describe_pr(&pr("Add x"), &[], None, Some("## Summary"), Some("Be brief"));
        assert!(prompt.system.contains("<template>\n## Summary\n</template>"));
        assert!(!prompt.system.contains("### Changes"));
        assert!(prompt.user.ends_with("\n\nExtra instructions:\nBe brief"));
    }

    #[test]
    fn label_lists_available_and_existing() {
        let available = vec![label_context(Label::named("bug")), label_context(Label::named("feature"))];
        let existing = vec![label_context(Label::named("bug"))];
        let prompt = label(
            LabelSubject::Issue,
            "<issue/>",
            None,
            &available,
            Some(existing.as_slice()),
            None,
        );
        assert!(prompt.system.contains("labeling an issue"));
        assert_eq!(
            prompt.user,
            "Here's the issue context:\n<issue/>\n\nHere are the available labels:\n<labels>\n<label>\n  <name>bug</name>\n</label>\n<label>\n  <name>feature</name>\n</label>\n</labels>\n\nHere are the labels already applied to the issue:\n<labels>\n<label>\n  <name>bug</name>\n</label>\n</labels>"
        );
    }

    #[test]
    fn label_hides_existing_when_not_given() {
        let available = vec![label_context(Label::named("bug"))];
        let prompt = label(LabelSubject::PullRequest, "<pr/>", None, &available, None, None);
        assert!(!prompt.user.contains("already applied"));
    }

    #[test]
    fn release_personas_differ() {
        let changes = vec![ChangeBundle {
            pr: pr("Ship it"),
            issue: None,
            ticket: None,
            labels: vec![],
        }];
        let marketing = describe_release(&changes, Persona::Marketing, None, None);
        let engineering = describe_release(&changes, Persona::Engineering, Some("- item"), None);
        assert!(marketing.system.contains("marketing materials"));
        assert!(!marketing.system.contains("<template>"));
        assert!(engineering.system.contains("changelog"));
        assert!(engineering.system.contains("<template>\n- item\n</template>"));
        assert!(engineering.user.contains("<change>\n<pr>"));
    }

    #[test]
    fn release_change_block_includes_ticket_after_pr() {
        let changes = vec![ChangeBundle {
            pr: pr("Faster uploads"),
            issue: None,
            ticket: Some(ticket_context(Ticket {
                identifier: "ENG-12".into(),
                title: "Uploads time out".into(),
                description: None,
                url: None,
            })),
            labels: vec![label_context(Label::named("feature"))],
        }];
        let prompt = describe_release(&changes, Persona::Engineering, None, None);
        assert!(prompt.user.contains(
            "<ticket>\n  <identifier>ENG-12</identifier>\n  <title>Uploads time out</title>\n  <description></description>\n</ticket>\n<label>"
        ));
        let pr_at = prompt.user.find("<pr>").unwrap();
        let ticket_at = prompt.user.find("<ticket>").unwrap();
        assert!(pr_at < ticket_at);
    }

    #[test]
    fn review_numbers_files_and_closes_rules() {
        let prompt = review_pr(&pr("Fix"), &[], &["No unwrap".to_string()], Some("Focus on src"));
        assert!(prompt.user.contains("<rules>\n<rule>\nNo unwrap\n</rule>\n</rules>"));
        assert!(prompt.user.ends_with("Extra instructions:\nFocus on src"));
        assert!(prompt.system.contains("file context ID"));
    }
}
