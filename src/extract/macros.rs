//! Macro extraction: public top-level `def`s documented like rules.
//!
//! Parameters become attributes of type `UNKNOWN`, mandatory when they have
//! no default. `*args` and `**kwargs` are not attributes.

use tracing::debug;

use super::docstring::parse_docstring;
use super::merge;
use crate::model::{AttrType, AttributeEntry, Document};
use crate::syntax::ast::{Module, Param, StmtKind};

pub fn extract_module(module: &Module) -> Document {
    let entries = module.statements.iter().filter_map(|stmt| {
        let StmtKind::Def(def) = &stmt.kind else {
            return None;
        };
        if def.name.starts_with('_') {
            debug!(macro_name = %def.name, "skipping private macro");
            return None;
        }

        let doc = def.docstring().map(parse_docstring).unwrap_or_default();
        let fragment = |name: &str| doc.attrs.get(name).cloned().unwrap_or_default();

        let mut attributes: Vec<AttributeEntry> = def
            .params
            .iter()
            .filter_map(|param| match param {
                Param::Named { name, default } => Some(AttributeEntry {
                    name: name.clone(),
                    attr_type: AttrType::Unknown,
                    mandatory: default.is_none(),
                    doc: fragment(name),
                }),
                Param::Args(_) | Param::Kwargs(_) => None,
            })
            .collect();
        if !attributes.iter().any(|a| a.name == "name") {
            attributes.push(AttributeEntry {
                name: "name".to_string(),
                attr_type: AttrType::Unknown,
                mandatory: true,
                doc: fragment("name"),
            });
        }

        debug!(macro_name = %def.name, attributes = attributes.len(), "extracted macro");
        Some(merge::entry(def.name.clone(), doc.summary.clone(), attributes))
    });
    merge::document(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;

    fn extract(source: &str) -> Document {
        extract_module(&parse(source, "test.bzl").unwrap())
    }

    #[test]
    fn parameters_become_attributes() {
        let doc = extract(
            r#"
def example_macro(name, foo, visibility = None, *args, **kwargs):
    """An example macro.

    Args:
      name: A unique name for this rule.
      foo: A test argument.
      visibility: The visibility of this rule.
    """
    native.genrule(name = name)
"#,
        );
        let m = doc.rule("example_macro").unwrap();
        assert_eq!(m.summary, "An example macro.");
        let names: Vec<&str> = m.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["name", "foo", "visibility"]);
        let foo = m.attribute("foo").unwrap();
        assert!(foo.mandatory);
        assert_eq!(foo.attr_type, AttrType::Unknown);
        assert_eq!(foo.doc, "A test argument.");
        assert!(!m.attribute("visibility").unwrap().mandatory);
    }

    #[test]
    fn name_is_added_when_missing() {
        let doc = extract("def helper(x = 1):\n    pass\n");
        let m = doc.rule("helper").unwrap();
        let name = m.attribute("name").unwrap();
        assert!(name.mandatory);
        assert_eq!(m.attributes[0].name, "name");
        assert_eq!(m.summary, "");
    }

    #[test]
    fn private_defs_and_private_params_are_skipped() {
        let doc = extract("def _impl(ctx):\n    pass\n\ndef public(name, _internal = 1):\n    pass\n");
        assert_eq!(doc.rules.len(), 1);
        let m = doc.rule("public").unwrap();
        assert!(m.attribute("_internal").is_none());
    }

    #[test]
    fn nested_defs_are_not_macros() {
        let doc = extract("def outer(name):\n    def inner(name):\n        pass\n");
        assert!(doc.rule("inner").is_none());
        assert!(doc.rule("outer").is_some());
    }
}
