//! Per-file batch extraction.
//!
//! Every file is read and extracted on its own: a failure is recorded in
//! that file's outcome and never affects the others.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ExtractError, ExtractResult};
use crate::extract::extract_file;
use crate::model::Document;

/// Result of processing one input file.
#[derive(Debug)]
pub struct FileOutcome {
    pub path: PathBuf,
    /// Base name of the rendered output, e.g. `cc_rules` for `cc_rules.bzl`.
    pub ruleset: String,
    pub result: ExtractResult<Document>,
}

pub fn extract_paths(paths: &[PathBuf]) -> Vec<FileOutcome> {
    paths.iter().map(|p| extract_path(p)).collect()
}

/// Extract a `.bzl` file, or read back a `.json` document.
pub fn extract_path(path: &Path) -> FileOutcome {
    debug!(path = %path.display(), "processing");
    let result = fs::read_to_string(path)
        .map_err(|e| ExtractError::Io(path.to_path_buf(), e))
        .and_then(|text| {
            if path.extension().is_some_and(|ext| ext == "json") {
                Document::from_json(&text).map_err(|e| ExtractError::Json(path.to_path_buf(), e))
            } else {
                extract_file(&text, &path.display().to_string())
            }
        });
    FileOutcome {
        path: path.to_path_buf(),
        ruleset: ruleset_name(path),
        result,
    }
}

/// "rules/cc_rules.bzl" -> "cc_rules", "out/cc_rules.json" -> "cc_rules"
pub fn ruleset_name(path: &Path) -> String {
    let filename = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    filename
        .strip_suffix(".bzl")
        .or_else(|| filename.strip_suffix(".json"))
        .unwrap_or(&filename)
        .to_string()
}
