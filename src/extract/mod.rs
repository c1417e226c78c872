//! Rule and macro extraction for one source file.
//!
//! The source is parsed once. Three independent passes over the syntax tree
//! feed a single document:
//! - [`rules`] evaluates the file against the [`stubs`] to recover rule schemas;
//! - [`docstring`] pairs symbols with the string literals after them;
//! - [`macros`] reads public functions straight off the syntax tree.
//!
//! [`merge`] joins and orders the results.

pub mod docstring;
pub mod macros;
pub mod merge;
pub mod rules;
pub mod stubs;

use crate::error::{EvalError, ExtractResult};
use crate::model::Document;
use crate::syntax::{self, ast::Module};

/// Extract every public rule of `source`.
///
/// Syntax and evaluation errors are fatal. Missing documentation is not:
/// affected summaries and attributes are empty.
pub fn extract(source: &str, source_name: &str) -> ExtractResult<Document> {
    let module = syntax::parse(source, source_name)?;
    Ok(rule_document(&module, source_name)?)
}

/// Extract every public macro of `source`.
pub fn extract_macros(source: &str, source_name: &str) -> ExtractResult<Document> {
    let module = syntax::parse(source, source_name)?;
    Ok(macros::extract_module(&module))
}

/// Macros followed by rules, each group sorted by name.
pub fn extract_file(source: &str, source_name: &str) -> ExtractResult<Document> {
    let module = syntax::parse(source, source_name)?;
    let macros = macros::extract_module(&module);
    let rules = rule_document(&module, source_name)?;
    Ok(merge::concat(macros, rules))
}

fn rule_document(module: &Module, source_name: &str) -> Result<Document, EvalError> {
    let schema = rules::recover_module(module, source_name, &stubs::STUB_ENVIRONMENT)?;
    let docs = docstring::associate(module);
    Ok(merge::assemble(schema, &docs))
}
