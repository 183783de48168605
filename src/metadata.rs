//! The hidden metadata block stored in generated pull request bodies and
//! comments.
//!
//! ```text
//! <!-- METADATA
//! {"title":"...","complexity":"minor"}
//! -->
//! ```
//!
//! The block lets later runs recover a previous generation without
//! calling the model again.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::constants::{METADATA_CLOSE, METADATA_OPEN};

/// Render `value` as a metadata block.
pub fn to_block<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(value)?;
    // "-->" can only occur inside a JSON string; escape it so the block
    // has a single terminator.
    let json = json.replace(METADATA_CLOSE, "--\\u003e");
    Ok(format!("{METADATA_OPEN}\n{json}\n{METADATA_CLOSE}"))
}

/// Recover the first metadata block in `text` that parses as `T`.
pub fn find<T: DeserializeOwned>(text: &str) -> Option<T> {
    let text = text.replace("\r\n", "\n");
    let mut rest = text.as_str();
    while let Some(start) = rest.find(METADATA_OPEN) {
        let after = &rest[start + METADATA_OPEN.len()..];
        let close = format!("\n{METADATA_CLOSE}");
        let end = after.find(&close)?;
        if let Ok(value) = serde_json::from_str(after[..end].trim()) {
            return Some(value);
        }
        rest = &after[end + close.len()..];
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Complexity, PullRequestDescription};
    use pretty_assertions::assert_eq;

    fn description() -> PullRequestDescription {
        PullRequestDescription {
            title: "Add retry to uploads".into(),
            complexity: Complexity::Minor,
            description: Some("### Changes\n- Retries uploads <!-- like this -->".into()),
        }
    }

    #[test]
    fn round_trips_through_a_body() {
        let block = to_block(&description()).unwrap();
        let body = format!("Some text written by a human.\n\n{block}\n\n<!-- Generated by Relgen -->");
        let parsed: PullRequestDescription = find(&body).unwrap();
        assert_eq!(parsed, description());
    }

    #[test]
    fn block_has_a_single_terminator() {
        let block = to_block(&description()).unwrap();
        assert_eq!(block.matches("-->").count(), 1);
        assert!(block.starts_with("<!-- METADATA\n{"));
        assert!(block.ends_with("}\n-->"));
    }

    #[test]
    fn tolerates_crlf_bodies() {
        let block = to_block(&description()).unwrap().replace('\n', "\r\n");
        let parsed: Option<PullRequestDescription> = find(&format!("intro\r\n{block}"));
        assert_eq!(parsed, Some(description()));
    }

    #[test]
    fn missing_or_broken_block_is_none() {
        assert_eq!(find::<PullRequestDescription>("no metadata here"), None);
        assert_eq!(find::<PullRequestDescription>("<!-- METADATA\n{not json\n-->"), None);
        assert_eq!(find::<PullRequestDescription>("<!-- METADATA\n{}"), None);
    }

    #[test]
    fn skips_blocks_of_other_shapes() {
        let other = "<!-- METADATA\n{\"labels\":[]}\n-->";
        let block = to_block(&description()).unwrap();
        let parsed: Option<PullRequestDescription> = find(&format!("{other}\n{block}"));
        assert_eq!(parsed, Some(description()));
    }
}
