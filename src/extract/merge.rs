//! Merge & assembly: join a recovered schema with its docstrings and
//! produce the ordered [`Document`].
//!
//! Ordering is the same for rules and macros: attributes whose name starts
//! with `_` are dropped, `name` comes first and the rest follow in
//! ascending order. Entries within one document are sorted by name.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::docstring::DocAssociation;
use super::rules::StubSchema;
use crate::model::{AttributeEntry, Document, RuleEntry};

/// Combine the schema of every public rule with its documentation.
///
/// Rules without a docstring get an empty summary; attributes without a
/// fragment get empty documentation.
pub fn assemble(schema: StubSchema, docs: &DocAssociation) -> Document {
    let entries = schema.rules.into_iter().map(|(name, rule)| {
        let doc = docs.get(&name);
        if doc.is_none() {
            debug!(rule = %name, "no docstring");
        }
        let attributes = rule
            .attrs
            .into_iter()
            .map(|(attr_name, descriptor)| AttributeEntry {
                doc: doc
                    .and_then(|d| d.attrs.get(&attr_name))
                    .cloned()
                    .unwrap_or_default(),
                name: attr_name,
                attr_type: descriptor.attr_type,
                mandatory: descriptor.mandatory,
            })
            .collect();
        let summary = doc.map(|d| d.summary.clone()).unwrap_or_default();
        entry(name, summary, attributes)
    });
    document(entries)
}

/// Build one entry with its attributes filtered and ordered.
pub fn entry(name: String, summary: String, mut attributes: Vec<AttributeEntry>) -> RuleEntry {
    attributes.retain(|a| !a.name.starts_with('_'));
    attributes.sort_by(|a, b| attribute_order(&a.name, &b.name));
    RuleEntry {
        name,
        summary,
        attributes,
    }
}

/// Collect entries into a document sorted by name. A later entry replaces
/// an earlier one of the same name.
pub fn document(entries: impl IntoIterator<Item = RuleEntry>) -> Document {
    let by_name: BTreeMap<String, RuleEntry> =
        entries.into_iter().map(|e| (e.name.clone(), e)).collect();
    Document {
        rules: by_name.into_values().collect(),
    }
}

/// Concatenate two documents of the same file, keeping each one's order.
pub fn concat(mut first: Document, second: Document) -> Document {
    for rule in &second.rules {
        if first.rule(&rule.name).is_some() {
            warn!(symbol = %rule.name, "documented both as a macro and as a rule");
        }
    }
    first.rules.extend(second.rules);
    first
}

/// `name` sorts before everything else.
fn attribute_order(a: &str, b: &str) -> Ordering {
    match (a == "name", b == "name") {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.cmp(b),
    }
}
