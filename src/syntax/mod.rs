//! Front-end for the configuration dialect: tokens, syntax tree, parser.

pub mod ast;
pub mod lexer;
pub mod parser;

pub use parser::parse;

use crate::error::SyntaxError;

/// Maps byte offsets to 1-based line and column numbers.
pub struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        LineIndex { starts }
    }

    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let line = match self.starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        (line + 1, offset - self.starts[line] + 1)
    }

    pub fn error(&self, source_name: &str, offset: usize, message: impl Into<String>) -> SyntaxError {
        let (line, column) = self.line_col(offset);
        SyntaxError {
            source_name: source_name.to_string(),
            line,
            column,
            message: message.into(),
        }
    }
}
