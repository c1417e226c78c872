//! Anchors, table of contents and call signatures shared by the markdown
//! and HTML renderers.

use crate::model::{Document, RuleEntry};
use crate::render::html_escape;

/// Anchor id of a rule heading.
pub fn rule_anchor(rule: &str) -> String {
    html_escape(rule)
}

/// Anchor id of an attribute row: `rule.attr`.
pub fn attr_anchor(rule: &str, attr: &str) -> String {
    format!("{}.{}", html_escape(rule), html_escape(attr))
}

/// The `<div class="toc">` block listing every rule of the document.
pub fn render_toc(doc: &Document) -> String {
    let mut out = String::new();
    out.push_str("<div class=\"toc\">\n");
    out.push_str("  <h2>Rules</h2>\n");
    out.push_str("  <ul>\n");
    for rule in &doc.rules {
        out.push_str(&format!(
            "    <li><a href=\"#{}\">{}</a></li>\n",
            rule_anchor(&rule.name),
            html_escape(&rule.name)
        ));
    }
    out.push_str("  </ul>\n");
    out.push_str("</div>\n");
    out
}

/// Call signature with every attribute linked to its table row, e.g.
/// `my_rule(<a href="#my_rule.name">name</a>, ...)`.
pub fn render_signature(rule: &RuleEntry) -> String {
    let args: Vec<String> = rule
        .attributes
        .iter()
        .map(|attr| {
            format!(
                "<a href=\"#{}\">{}</a>",
                attr_anchor(&rule.name, &attr.name),
                html_escape(&attr.name)
            )
        })
        .collect();
    format!("{}({})", html_escape(&rule.name), args.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttrType, AttributeEntry};

    fn rule(name: &str, attrs: &[&str]) -> RuleEntry {
        RuleEntry {
            name: name.to_string(),
            summary: String::new(),
            attributes: attrs
                .iter()
                .map(|a| AttributeEntry {
                    name: a.to_string(),
                    attr_type: AttrType::String,
                    mandatory: false,
                    doc: String::new(),
                })
                .collect(),
        }
    }

    #[test]
    fn anchors() {
        assert_eq!(rule_anchor("cc_gen"), "cc_gen");
        assert_eq!(attr_anchor("cc_gen", "srcs"), "cc_gen.srcs");
    }

    #[test]
    fn signature_links_attributes() {
        assert_eq!(
            render_signature(&rule("gen", &["name", "out"])),
            "gen(<a href=\"#gen.name\">name</a>, <a href=\"#gen.out\">out</a>)"
        );
        assert_eq!(render_signature(&rule("bare", &[])), "bare()");
    }

    #[test]
    fn toc_lists_rules_in_order() {
        let doc = Document {
            rules: vec![rule("alpha", &[]), rule("beta", &[])],
        };
        let toc = render_toc(&doc);
        let alpha = toc.find("#alpha").unwrap();
        let beta = toc.find("#beta").unwrap();
        assert!(alpha < beta);
        assert!(toc.starts_with("<div class=\"toc\">"));
    }
}
