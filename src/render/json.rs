//! JSON renderer: structured output for tooling integration.
//!
//! Serializes the Document model directly; [`Document::from_json`] reads it
//! back, so a stored document can be re-rendered in another format.

use crate::model::*;
use crate::render::Renderer;
use tracing::error;

pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, _ruleset: &str, doc: &Document) -> String {
        match serde_json::to_string_pretty(doc) {
            Ok(mut out) => {
                out.push('\n');
                out
            }
            Err(e) => {
                error!(error = %e, "failed to serialize document");
                String::new()
            }
        }
    }

    fn file_extension(&self) -> &str {
        "json"
    }
}
