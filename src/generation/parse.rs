//! Extracting a typed result from a raw model reply.

use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;

/// Maximum length of reply text to include in validation error messages.
const PREVIEW_LEN: usize = 2000;

/// Content inside markdown code fences.
///
/// The closing ``` must appear at the start of a line (`\n````) to avoid
/// matching triple-backticks embedded inside JSON string values.
static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*\n(.*?)\n```").expect("fence regex is valid"));

/// Parse the first JSON candidate in `text` that deserializes into `T`.
///
/// Returns a description of the failure otherwise.
pub fn parse_reply<T: DeserializeOwned>(text: &str) -> Result<T, String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err("empty response".to_string());
    }

    let mut first_error = None;
    for candidate in extract_json_candidates(trimmed) {
        match serde_json::from_str::<T>(&candidate) {
            Ok(value) => return Ok(value),
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }

    let reason = first_error.map(|e| e.to_string()).unwrap_or_default();
    Err(format!(
        "{reason}. Response: {}",
        preview(trimmed, PREVIEW_LEN)
    ))
}

/// Extract candidate JSON strings from a reply.
///
/// Returns the text itself, the outermost `{...}` slice, and the content
/// of any markdown code fences, in that order.
fn extract_json_candidates(text: &str) -> Vec<String> {
    let mut candidates = vec![text.to_string()];

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            let slice = &text[start..=end];
            if slice != text {
                candidates.push(slice.to_string());
            }
        }
    }

    for cap in FENCE_RE.captures_iter(text) {
        if let Some(inner) = cap.get(1) {
            let inner = inner.as_str().trim();
            if !inner.is_empty() {
                candidates.push(inner.to_string());
            }
        }
    }

    candidates
}

fn preview(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
