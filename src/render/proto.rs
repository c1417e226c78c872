//! Build-language text format, one `rule { ... }` block per entry.

use crate::model::*;
use crate::render::{known_type, Renderer};

pub struct ProtoRenderer;

impl Renderer for ProtoRenderer {
    fn render(&self, _ruleset: &str, doc: &Document) -> String {
        let mut out = String::new();
        for rule in &doc.rules {
            out.push_str("rule {\n");
            out.push_str(&format!("  name: \"{}\"\n", escape(&rule.name)));
            out.push_str(&format!("  documentation: \"{}\"\n", escape(&rule.summary)));
            for attr in &rule.attributes {
                out.push_str("  attribute {\n");
                out.push_str(&format!("    name: \"{}\"\n", escape(&attr.name)));
                out.push_str(&format!("    type: {}\n", known_type(&rule.name, attr).as_str()));
                out.push_str(&format!("    mandatory: {}\n", attr.mandatory));
                out.push_str(&format!("    documentation: \"{}\"\n", escape(&attr.doc)));
                out.push_str("  }\n");
            }
            out.push_str("}\n");
        }
        out
    }

    fn file_extension(&self) -> &str {
        "pb"
    }
}

/// C-style escaping; bytes outside printable ASCII become octal escapes.
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for &b in s.as_bytes() {
        match b {
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            b'"' => out.push_str("\\\""),
            b'\'' => out.push_str("\\'"),
            b'\\' => out.push_str("\\\\"),
            0x20..=0x7e => out.push(b as char),
            _ => out.push_str(&format!("\\{:03o}", b)),
        }
    }
    out
}
