//! Prompt fragments for each context kind.
//!
//! Text is interpolated as-is, without entity escaping, so diff lines
//! quoted back by the model match the patch they came from.

use crate::diff::to_unified_diff;
use crate::models::context::PullRequestFile;
use crate::models::diff::FileDiff;
use crate::models::remote::{Comment, Issue, Label, PullRequest, Ticket};

pub fn pull_request(pr: &PullRequest) -> String {
    titled("pr", &pr.title, pr.body.as_deref())
}

pub fn issue(issue: &Issue) -> String {
    titled("issue", &issue.title, issue.body.as_deref())
}

pub fn label(label: &Label) -> String {
    let mut out = format!("<label>\n  <name>{}</name>\n", label.name);
    if let Some(description) = label.description.as_deref().filter(|d| !d.is_empty()) {
        out.push_str(&format!("  <description>{description}</description>\n"));
    }
    out.push_str("</label>");
    out
}

pub fn ticket(ticket: &Ticket) -> String {
    format!(
        "<ticket>\n  <identifier>{}</identifier>\n  <title>{}</title>\n  <description>{}</description>\n</ticket>",
        ticket.identifier,
        ticket.title,
        ticket.description.as_deref().unwrap_or_default()
    )
}

// Takes `&Vec` to fit `Context::<Vec<FileDiff>>::new`.
#[allow(clippy::ptr_arg)]
pub fn diff(files: &Vec<FileDiff>) -> String {
    format!("<diff>\n<raw>\n{}\n</raw>\n</diff>", to_unified_diff(files))
}

pub fn file(file: &PullRequestFile) -> String {
    let mut out = format!("<file>\n  <path>{}</path>\n", file.path);
    if let Some(patch) = &file.patch {
        out.push_str(&format!("  <patch>\n{patch}\n  </patch>\n"));
    }
    if let Some(content) = &file.content {
        out.push_str(&format!("  <content>\n{content}\n  </content>\n"));
    }
    out.push_str("</file>");
    out
}

pub fn comment(comment: &Comment) -> String {
    format!(
        "<comment>\n  <author>{}</author>\n  <body>{}</body>\n</comment>",
        comment.author.as_deref().unwrap_or_default(),
        comment.body
    )
}

fn titled(tag: &str, title: &str, body: Option<&str>) -> String {
    format!(
        "<{tag}>\n  <title>{title}</title>\n  <body>{}</body>\n</{tag}>",
        body.unwrap_or_default()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::remote::{ChangedFile, FileStatus};
    use pretty_assertions::assert_eq;

    #[test]
    fn pull_request_with_missing_body() {
        let pr = PullRequest {
            number: 1,
            title: "Add <b> & co".into(),
            body: None,
            author: None,
            url: String::new(),
            labels: vec![],
            head_sha: None,
            base_ref: None,
            merged_at: None,
        };
        assert_eq!(
            pull_request(&pr),
            "<pr>\n  <title>Add <b> & co</title>\n  <body></body>\n</pr>"
        );
    }

    #[test]
    fn label_omits_missing_description() {
        assert_eq!(label(&Label::named("bug")), "<label>\n  <name>bug</name>\n</label>");
        let described = Label {
            name: "feature".into(),
            description: Some("New things".into()),
        };
        assert_eq!(
            label(&described),
            "<label>\n  <name>feature</name>\n  <description>New things</description>\n</label>"
        );
    }

    #[test]
    fn file_renders_only_present_parts() {
        let record = ChangedFile {
            path: "src/a.ts".into(),
            previous_path: None,
            status: FileStatus::Removed,
            patch: Some("@@ -1 +0,0 @@\n-gone();".into()),
            additions: 0,
            deletions: 1,
        };
        let data = PullRequestFile {
            path: record.path.clone(),
            patch: record.patch.clone(),
            content: None,
            file: record,
        };
        assert_eq!(
            file(&data),
            "<file>\n  <path>src/a.ts</path>\n  <patch>\n@@ -1 +0,0 @@\n-gone();\n  </patch>\n</file>"
        );
    }

    #[test]
    fn comment_includes_author() {
        let c = Comment {
            id: 3,
            body: "Looks fine".into(),
            author: Some("octocat".into()),
        };
        assert_eq!(
            comment(&c),
            "<comment>\n  <author>octocat</author>\n  <body>Looks fine</body>\n</comment>"
        );
    }
}
