//! bzldoc: reference documentation for rules and macros defined in `.bzl`
//! files.
//!
//! A file is parsed once per pass. Rule schemas come from evaluating the
//! top level against stand-in built-ins, documentation from the string
//! literals that follow each public assignment, and macros from public
//! function definitions. The result is a format-agnostic [`Document`] that
//! the [`render`] module turns into proto text, JSON, markdown or HTML.

pub mod batch;
pub mod error;
pub mod extract;
pub mod model;
pub mod render;
pub mod syntax;
pub mod toc;

pub use error::{EvalError, ExtractError, ExtractResult, SyntaxError};
pub use extract::{extract, extract_file, extract_macros};
pub use model::{AttrType, AttributeEntry, Document, RuleEntry};
