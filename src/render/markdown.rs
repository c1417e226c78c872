//! Markdown renderer.
//!
//! Output is markdown with embedded HTML, so anchors, the call signature and
//! the attribute table survive any markdown engine unchanged.

use crate::model::*;
use crate::render::{html_escape, markdown_to_html, type_description, Renderer};
use crate::toc;

pub struct MarkdownRenderer;

impl Renderer for MarkdownRenderer {
    fn render(&self, ruleset: &str, doc: &Document) -> String {
        let mut output = String::new();

        output.push_str(&format!("<h1>{} Rules</h1>\n\n", html_escape(ruleset)));

        if !doc.rules.is_empty() {
            output.push_str(&toc::render_toc(doc));
            output.push('\n');
        }

        for rule in &doc.rules {
            output.push_str(&render_rule(rule, str::to_string));
            output.push('\n');
        }

        output
    }

    fn file_extension(&self) -> &str {
        "md"
    }
}

/// One rule: heading, signature, summary and attribute table. The summary
/// goes through `summary` first.
pub(crate) fn render_rule(rule: &RuleEntry, summary: impl Fn(&str) -> String) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!(
        "<h2 id=\"{}\">{}</h2>\n",
        toc::rule_anchor(&rule.name),
        html_escape(&rule.name)
    ));

    lines.push("<pre>".to_string());
    lines.push(toc::render_signature(rule));
    lines.push("</pre>\n".to_string());

    if !rule.summary.is_empty() {
        lines.push(summary(&rule.summary));
        lines.push(String::new());
    }

    if !rule.attributes.is_empty() {
        lines.push(format!(
            "<h3 id=\"{}_args\">Attributes</h3>\n",
            toc::rule_anchor(&rule.name)
        ));
        lines.push(render_attribute_table(rule));
    }

    lines.join("\n")
}

fn render_attribute_table(rule: &RuleEntry) -> String {
    let mut out = String::new();
    out.push_str("<table class=\"params-table\">\n");
    out.push_str("  <colgroup>\n");
    out.push_str("    <col class=\"col-param\" />\n");
    out.push_str("    <col class=\"col-description\" />\n");
    out.push_str("  </colgroup>\n");
    out.push_str("  <tbody>\n");
    for attr in &rule.attributes {
        out.push_str(&format!(
            "    <tr id=\"{}\">\n",
            toc::attr_anchor(&rule.name, &attr.name)
        ));
        out.push_str(&format!(
            "      <td><code>{}</code></td>\n",
            html_escape(&attr.name)
        ));
        out.push_str("      <td>\n");
        out.push_str(&format!(
            "        <p><code>{}</code></p>\n",
            type_description(&rule.name, attr)
        ));
        if !attr.doc.is_empty() {
            out.push_str(&markdown_to_html(&attr.doc));
        }
        out.push_str("      </td>\n");
        out.push_str("    </tr>\n");
    }
    out.push_str("  </tbody>\n");
    out.push_str("</table>\n");
    out
}
