//! Docstring association: pair each public top-level assignment with the
//! string literal statement directly after it, and split docstrings into a
//! summary plus per-attribute fragments.
//!
//! This pass reads the syntax tree only. It never evaluates anything and
//! never fails: a symbol without a usable docstring simply has no entry.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::syntax::ast::{Expr, Module, StmtKind};

/// `identifier: text` at the entry indentation of an attribute listing.
static RE_ATTR_ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*):(?:\s+(.*))?$").unwrap());

/// Documentation recovered for one symbol.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolDoc {
    pub summary: String,
    pub attrs: BTreeMap<String, String>,
}

/// Documentation keyed by the name of the symbol it follows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocAssociation {
    pub symbols: BTreeMap<String, SymbolDoc>,
}

impl DocAssociation {
    pub fn get(&self, name: &str) -> Option<&SymbolDoc> {
        self.symbols.get(name)
    }
}

/// Walk top-level statements, pairing `name = ...` with a following string
/// literal statement.
pub fn associate(module: &Module) -> DocAssociation {
    let mut association = DocAssociation::default();
    let mut pending: Option<&str> = None;

    for stmt in &module.statements {
        pending = match (&stmt.kind, pending) {
            (StmtKind::Expr(Expr::Str(doc)), Some(key)) => {
                association
                    .symbols
                    .insert(key.to_string(), parse_docstring(doc));
                None
            }
            (
                StmtKind::Assign {
                    target: Expr::Ident(name),
                    op: None,
                    ..
                },
                _,
            ) if !name.starts_with('_') => Some(name.as_str()),
            _ => None,
        };
    }
    association
}

/// Split a docstring into its summary and attribute fragments.
///
/// The summary is everything before an `Args:` or `Attributes:` line. In
/// the listing after it, a line at the entry indentation that reads
/// `identifier: text` starts a fragment; deeper-indented and blank lines
/// continue it. A less-indented line or a second marker ends the listing.
pub fn parse_docstring(raw: &str) -> SymbolDoc {
    let text = dedent(raw);
    let lines: Vec<&str> = text.lines().collect();

    let (summary, listing) = match lines.iter().position(|l| is_marker(l)) {
        Some(i) => (&lines[..i], &lines[i + 1..]),
        None => (&lines[..], &[][..]),
    };

    SymbolDoc {
        summary: summary.join("\n").trim().to_string(),
        attrs: parse_listing(listing),
    }
}

fn parse_listing(lines: &[&str]) -> BTreeMap<String, String> {
    let mut attrs = BTreeMap::new();
    let Some(entry_indent) = lines
        .iter()
        .find(|l| !l.trim().is_empty())
        .map(|l| indent_of(l))
    else {
        return attrs;
    };

    let mut current: Option<(String, Vec<&str>)> = None;
    for line in lines {
        if line.trim().is_empty() {
            if let Some((_, fragment)) = current.as_mut() {
                fragment.push("");
            }
            continue;
        }
        let indent = indent_of(line);
        if indent < entry_indent || is_marker(line) {
            break;
        }
        if indent == entry_indent {
            if let Some(caps) = RE_ATTR_ENTRY.captures(line.trim()) {
                flush(&mut attrs, current.take());
                let first = caps.get(2).map_or("", |m| m.as_str());
                current = Some((caps[1].to_string(), vec![first]));
                continue;
            }
        }
        if let Some((_, fragment)) = current.as_mut() {
            fragment.push(line.trim());
        }
    }
    flush(&mut attrs, current);
    attrs
}

fn flush(attrs: &mut BTreeMap<String, String>, entry: Option<(String, Vec<&str>)>) {
    if let Some((name, fragment)) = entry {
        attrs.insert(name, fragment.join("\n").trim().to_string());
    }
}

fn is_marker(line: &str) -> bool {
    matches!(line.trim(), "Args:" | "Attributes:")
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start_matches([' ', '\t']).len()
}

/// Strip the first line's surrounding whitespace and the common leading
/// indentation of the remaining lines.
fn dedent(raw: &str) -> String {
    let mut lines = raw.lines();
    let first = lines.next().unwrap_or("").trim();
    let rest: Vec<&str> = lines.collect();
    let margin = rest
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| indent_of(l))
        .min()
        .unwrap_or(0);

    std::iter::once(first)
        .chain(rest.iter().map(|l| {
            if l.trim().is_empty() {
                ""
            } else {
                &l[margin..]
            }
        }))
        .collect::<Vec<_>>()
        .join("\n")
}
