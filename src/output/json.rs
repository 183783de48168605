//! JSON output renderer.
//!
//! Results are printed as-is. An empty release window renders as
//! `{"changes": null, "message": "No changes found"}` so scripts can tell
//! it apart from a result.

use crate::output::{NO_CHANGES, Outcome, OutputRenderer};

/// JSON output renderer.
pub struct JsonRenderer;

impl OutputRenderer for JsonRenderer {
    fn render(&self, outcome: &Outcome) -> String {
        let value = if outcome.is_no_changes() {
            serde_json::json!({
                "changes": null,
                "message": NO_CHANGES,
            })
        } else {
            serde_json::to_value(outcome).unwrap_or_default()
        };
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
    }
}
