//! Error types for extraction.
//!
//! Only structural failures are errors. Missing documentation leaves empty
//! strings in the document, never an error.

use derive_more::Display;
use std::path::PathBuf;

/// The source does not conform to the configuration dialect grammar.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("{source_name}:{line}:{column}: syntax error: {message}")]
pub struct SyntaxError {
    pub source_name: String,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl std::error::Error for SyntaxError {}

/// The source parsed but failed while being evaluated against the stubs.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("{source_name}:{line}: evaluation error: {message}")]
pub struct EvalError {
    pub source_name: String,
    pub line: usize,
    pub message: String,
}

impl std::error::Error for EvalError {}

/// Fatal failure for one source file. No partial document exists.
#[derive(Debug, Display)]
pub enum ExtractError {
    #[display("{}", _0)]
    Syntax(SyntaxError),

    #[display("{}", _0)]
    Eval(EvalError),

    #[display("failed to read {}: {}", _0.display(), _1)]
    Io(PathBuf, std::io::Error),

    #[display("invalid document {}: {}", _0.display(), _1)]
    Json(PathBuf, serde_json::Error),
}

impl std::error::Error for ExtractError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExtractError::Syntax(e) => Some(e),
            ExtractError::Eval(e) => Some(e),
            ExtractError::Io(_, e) => Some(e),
            ExtractError::Json(_, e) => Some(e),
        }
    }
}

impl From<SyntaxError> for ExtractError {
    fn from(e: SyntaxError) -> Self {
        ExtractError::Syntax(e)
    }
}

impl From<EvalError> for ExtractError {
    fn from(e: EvalError) -> Self {
        ExtractError::Eval(e)
    }
}

/// Result type alias.
pub type ExtractResult<T> = Result<T, ExtractError>;
