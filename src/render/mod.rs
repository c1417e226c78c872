//! Renderer module: trait-based format dispatch.

pub mod html;
pub mod json;
pub mod markdown;
pub mod proto;

use crate::model::{AttrType, AttributeEntry, Document};
use anyhow::{anyhow, Result};
use tracing::warn;

/// Trait for rendering a Document into a specific output format.
pub trait Renderer {
    /// `ruleset` names the source the document came from, e.g. `cc_rules`.
    fn render(&self, ruleset: &str, doc: &Document) -> String;
    fn file_extension(&self) -> &str;
}

/// Create a renderer for the given format name.
pub fn create_renderer(format: &str) -> Result<Box<dyn Renderer>> {
    match format {
        "markdown" | "md" => Ok(Box::new(markdown::MarkdownRenderer)),
        "html" => Ok(Box::new(html::HtmlRenderer)),
        "json" => Ok(Box::new(json::JsonRenderer)),
        "proto" | "pb" => Ok(Box::new(proto::ProtoRenderer)),
        _ => Err(anyhow!(
            "unknown format: {}. Use markdown, html, json, or proto",
            format
        )),
    }
}

const BUILD_REF: &str = "http://bazel.io/docs/build-ref.html";

static UNKNOWN: AttrType = AttrType::Unknown;

/// The attribute's type with `Unrecognized` collapsed to `Unknown`.
pub(crate) fn known_type<'a>(rule: &str, attr: &'a AttributeEntry) -> &'a AttrType {
    match &attr.attr_type {
        AttrType::Unrecognized(name) => {
            warn!(rule, attribute = %attr.name, attr_type = %name, "unrecognized attribute type");
            &UNKNOWN
        }
        ty => ty,
    }
}

/// Human-readable type description for the attribute tables, e.g.
/// `List of strings; Optional`. NAME and LABEL types link to the build
/// reference.
pub(crate) fn type_description(rule: &str, attr: &AttributeEntry) -> String {
    let label = || format!("<a href=\"{BUILD_REF}#labels\">Label</a>");
    let labels = || format!("<a href=\"{BUILD_REF}#labels\">labels</a>");
    let kind = match known_type(rule, attr) {
        AttrType::Integer => "Integer".to_string(),
        AttrType::String => "String".to_string(),
        AttrType::Label => label(),
        AttrType::Output => "Output".to_string(),
        AttrType::StringList => "List of strings".to_string(),
        AttrType::LabelList => format!("List of {}", labels()),
        AttrType::OutputList => "List of outputs".to_string(),
        AttrType::DistributionSet => "Distribution Set".to_string(),
        AttrType::License => "License".to_string(),
        AttrType::StringDict => "Dictionary mapping strings to string".to_string(),
        AttrType::FilesetEntryList => "List of FilesetEntry".to_string(),
        AttrType::LabelListDict => format!("Dictionary mapping strings to lists of {}", labels()),
        AttrType::StringListDict => "Dictionary mapping strings to lists of strings".to_string(),
        AttrType::Boolean => "Boolean".to_string(),
        AttrType::Tristate => "Tristate".to_string(),
        AttrType::IntegerList => "List of integers".to_string(),
        AttrType::StringDictUnary => "String Dict Unary".to_string(),
        AttrType::LabelDictUnary => "Label Dict Unary".to_string(),
        AttrType::SelectorList => "Selector List".to_string(),
        AttrType::LabelKeyedStringDict => format!("Dictionary mapping {} to strings", labels()),
        AttrType::Name => format!("<a href=\"{BUILD_REF}#name\">Name</a>"),
        AttrType::Unknown | AttrType::Unrecognized(_) => "Unknown".to_string(),
    };
    let requirement = if attr.mandatory { "Required" } else { "Optional" };
    format!("{kind}; {requirement}")
}

pub(crate) fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Markdown docstring text as an HTML fragment.
pub(crate) fn markdown_to_html(text: &str) -> String {
    comrak::markdown_to_html(text, &comrak::Options::default())
}
