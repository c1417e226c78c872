//! HTML renderer: standalone page around the markdown renderer's sections.

use crate::model::*;
use crate::render::{html_escape, markdown, markdown_to_html, Renderer};
use crate::toc;

pub struct HtmlRenderer;

impl Renderer for HtmlRenderer {
    fn render(&self, ruleset: &str, doc: &Document) -> String {
        let mut out = String::new();

        out.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
        out.push_str("<meta charset=\"utf-8\">\n");
        out.push_str(&format!("<title>{} Rules</title>\n", html_escape(ruleset)));
        out.push_str("<style>\n");
        out.push_str("body { font-family: system-ui, sans-serif; max-width: 48em; margin: 2em auto; padding: 0 1em; }\n");
        out.push_str("code { background: #f4f4f4; padding: 0.15em 0.3em; border-radius: 3px; }\n");
        out.push_str("pre { background: #f4f4f4; padding: 1em; border-radius: 5px; overflow-x: auto; }\n");
        out.push_str(".params-table { border-collapse: collapse; width: 100%; }\n");
        out.push_str(".params-table td { border-top: 1px solid #ddd; padding: 0.5em; vertical-align: top; }\n");
        out.push_str(".col-param { width: 25%; }\n");
        out.push_str("</style>\n");
        out.push_str("</head>\n<body>\n");

        out.push_str(&format!("<h1>{} Rules</h1>\n", html_escape(ruleset)));

        if !doc.rules.is_empty() {
            out.push_str(&toc::render_toc(doc));
        }

        for rule in &doc.rules {
            out.push_str("<section>\n");
            out.push_str(&markdown::render_rule(rule, markdown_to_html));
            out.push_str("</section>\n");
        }

        out.push_str("</body>\n</html>\n");
        out
    }

    fn file_extension(&self) -> &str {
        "html"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        Document {
            rules: vec![RuleEntry {
                name: "gen".to_string(),
                summary: "Generates *one* file.".to_string(),
                attributes: vec![AttributeEntry {
                    name: "name".to_string(),
                    attr_type: AttrType::Name,
                    mandatory: true,
                    doc: String::new(),
                }],
            }],
        }
    }

    #[test]
    fn standalone_page() {
        let out = HtmlRenderer.render("gen_rules", &sample());
        assert!(out.starts_with("<!DOCTYPE html>"));
        assert!(out.contains("<title>gen_rules Rules</title>"));
        assert!(out.contains("<h2 id=\"gen\">gen</h2>"));
        assert!(out.trim_end().ends_with("</html>"));
    }

    #[test]
    fn summary_is_converted_to_html() {
        let out = HtmlRenderer.render("gen_rules", &sample());
        assert!(out.contains("<p>Generates <em>one</em> file.</p>"), "{out}");
    }
}
