//! Mapping review findings onto diff positions.
//!
//! The model quotes the line it is commenting on instead of giving a line
//! number. Each quote is fuzzy-matched against the file's patch; the
//! `occurrence` ordinal picks among repeated identical lines.

use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use tracing::{debug, warn};

use crate::models::context::PullRequestFileContext;
use crate::models::generated::{InlineComment, ReviewFinding};

/// Default minimum similarity for a quoted line to match a patch line.
pub const DEFAULT_LINE_MATCH_THRESHOLD: f64 = 0.95;

/// Findings mapped onto the diff, plus how many could not be placed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappedReview {
    pub comments: Vec<InlineComment>,
    pub dropped: usize,
}

/// Places review findings at diff positions.
pub struct LineMapper {
    threshold: f64,
    matcher: SkimMatcherV2,
}

impl Default for LineMapper {
    fn default() -> Self {
        Self::new(DEFAULT_LINE_MATCH_THRESHOLD)
    }
}

impl LineMapper {
    /// `threshold` is clamped to `0.0..=1.0`.
    pub fn new(threshold: f64) -> Self {
        let threshold = if threshold.is_nan() {
            DEFAULT_LINE_MATCH_THRESHOLD
        } else {
            threshold.clamp(0.0, 1.0)
        };
        Self {
            threshold,
            matcher: SkimMatcherV2::default().respect_case(),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Map every finding. `files` must be in the order their ids were
    /// given to the model.
    pub fn map(&self, files: &[PullRequestFileContext], findings: &[ReviewFinding]) -> MappedReview {
        let mut mapped = MappedReview::default();
        for finding in findings {
            match self.map_finding(files, finding) {
                Some(comment) => mapped.comments.push(comment),
                None => mapped.dropped += 1,
            }
        }
        mapped
    }

    /// Map one finding, or `None` when it cannot be placed.
    pub fn map_finding(
        &self,
        files: &[PullRequestFileContext],
        finding: &ReviewFinding,
    ) -> Option<InlineComment> {
        let Some(file) = files.get(finding.file_context_id) else {
            warn!(
                file_context_id = finding.file_context_id,
                "dropping review finding: unknown file context"
            );
            return None;
        };
        let path = &file.data().path;
        let Some(patch) = file.data().patch.as_deref() else {
            warn!(path = %path, "dropping review finding: file has no patch");
            return None;
        };

        match self.position(patch, &finding.line, finding.occurrence) {
            Some(position) => {
                debug!(path = %path, position, "mapped review finding");
                Some(InlineComment {
                    path: path.clone(),
                    position,
                    body: finding.comment.clone(),
                })
            }
            None => {
                warn!(
                    path = %path,
                    line = %finding.line,
                    occurrence = finding.occurrence,
                    "dropping review finding: line not found in patch"
                );
                None
            }
        }
    }

    /// Index into [`corpus`] of the `occurrence`-th line matching `quote`.
    ///
    /// Index 0 is the first hunk header, which cannot carry a comment.
    pub fn position(&self, patch: &str, quote: &str, occurrence: usize) -> Option<usize> {
        let query = normalize(quote);
        if query.is_empty() {
            return None;
        }
        corpus(patch)
            .iter()
            .enumerate()
            .filter(|(_, line)| self.similarity(&query, line) >= self.threshold)
            .map(|(index, _)| index)
            .nth(occurrence)
            .filter(|&index| index > 0)
    }

    /// Similarity in `0.0..=1.0` of `candidate` to `query`.
    ///
    /// The fuzzy score is normalized by the query's score against itself,
    /// then scaled by the length ratio so a short quote does not match a
    /// longer line that merely contains it.
    fn similarity(&self, query: &str, candidate: &str) -> f64 {
        if query == candidate {
            return 1.0;
        }
        let (Some(score), Some(best)) = (
            self.matcher.fuzzy_match(candidate, query),
            self.matcher.fuzzy_match(query, query),
        ) else {
            return 0.0;
        };
        if best <= 0 {
            return 0.0;
        }
        let score_ratio = (score as f64 / best as f64).min(1.0);
        let (a, b) = (query.chars().count(), candidate.chars().count());
        let length_ratio = a.min(b) as f64 / a.max(b) as f64;
        score_ratio * length_ratio
    }
}

/// Searchable lines of a patch: everything from the first hunk header on,
/// trimmed with inner whitespace collapsed.
pub fn corpus(patch: &str) -> Vec<String> {
    patch
        .lines()
        .skip_while(|line| !line.trim_start().starts_with("@@"))
        .map(normalize)
        .collect()
}

fn normalize(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::render;
    use crate::models::context::PullRequestFile;
    use crate::models::remote::{ChangedFile, FileStatus};
    use crate::models::{Context, ContextKind};
    use pretty_assertions::assert_eq;

    const PATCH: &str = "@@ -1,4 +1,6 @@\n a();\n+foo()\n b();\n c();\n+foo()\n d();";

    fn file(path: &str, patch: Option<&str>) -> PullRequestFileContext {
        let record = ChangedFile {
            path: path.into(),
            previous_path: None,
            status: FileStatus::Modified,
            patch: patch.map(str::to_string),
            additions: 2,
            deletions: 0,
        };
        let data = PullRequestFile {
            path: record.path.clone(),
            patch: record.patch.clone(),
            content: None,
            file: record,
        };
        Context::new(ContextKind::PrFile, data, render::file)
    }

    fn finding(id: usize, line: &str, occurrence: usize) -> ReviewFinding {
        ReviewFinding {
            file_context_id: id,
            line: line.into(),
            occurrence,
            comment: "Rename this".into(),
        }
    }

    #[test]
    fn corpus_starts_at_first_hunk() {
        let lines = corpus("diff --git a/x b/x\n--- a/x\n+++ b/x\n@@ -1 +1 @@\n-  old   value\n+new");
        assert_eq!(lines, vec!["@@ -1 +1 @@", "- old value", "+new"]);
    }

    #[test]
    fn occurrence_selects_among_repeated_lines() {
        let mapper = LineMapper::default();
        assert_eq!(mapper.position(PATCH, "+foo()", 0), Some(2));
        assert_eq!(mapper.position(PATCH, "+foo()", 1), Some(5));
        assert_eq!(mapper.position(PATCH, "+foo()", 2), None);
    }

    #[test]
    fn whitespace_drift_still_matches() {
        let mapper = LineMapper::default();
        assert_eq!(mapper.position(PATCH, "  +foo()  ", 0), Some(2));
        assert_eq!(mapper.position(PATCH, " c();", 0), Some(4));
    }

    #[test]
    fn longer_line_containing_quote_does_not_match() {
        let mapper = LineMapper::default();
        let patch = "@@ -1 +1 @@\n+foo() // trailing note";
        assert_eq!(mapper.position(patch, "+foo()", 0), None);
    }

    #[test]
    fn map_drops_unplaceable_findings() {
        let mapper = LineMapper::default();
        let files = vec![file("src/a.ts", Some(PATCH)), file("logo.png", None)];
        let findings = vec![
            finding(0, "+foo()", 1),
            finding(0, "+foo()", 2),
            finding(1, "+anything", 0),
            finding(7, "+foo()", 0),
        ];
        let mapped = mapper.map(&files, &findings);
        assert_eq!(
            mapped.comments,
            vec![InlineComment {
                path: "src/a.ts".into(),
                position: 5,
                body: "Rename this".into(),
            }]
        );
        assert_eq!(mapped.dropped, 3);
    }

    #[test]
    fn hunk_header_is_never_a_position() {
        let mapper = LineMapper::new(0.0);
        // Threshold 0 matches everything, including the header at index 0.
        assert_eq!(mapper.position(PATCH, "+foo()", 0), None);
        assert_eq!(mapper.position(PATCH, "+foo()", 1), Some(1));
    }

    #[test]
    fn threshold_is_clamped() {
        assert_eq!(LineMapper::new(3.0).threshold(), 1.0);
        assert_eq!(LineMapper::new(-1.0).threshold(), 0.0);
        assert_eq!(LineMapper::new(f64::NAN).threshold(), DEFAULT_LINE_MATCH_THRESHOLD);
    }
}
