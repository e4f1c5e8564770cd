//! Model list parsing
//!
//! A model list is plain text with one source path per line. Order is
//! preserved exactly as written.

use crate::domain::{BatchError, ParseError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Line rejected by the parser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidLine {
    /// 1-based line number
    pub line_no: usize,
    pub content: String,
}

/// Counters describing how the input was consumed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelListReport {
    pub total_lines: usize,
    pub paths_count: usize,
    pub skipped_blank: usize,
    pub skipped_comments: usize,
    pub invalid_lines: Vec<InvalidLine>,
}

/// Parsed model list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelList {
    pub paths: Vec<String>,
    pub report: ModelListReport,
}

impl ModelList {
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Parses model list text
///
/// Per line: trim; blank lines and `#` comments are counted and skipped; one
/// matching pair of surrounding double quotes is removed; the remainder is
/// the path. A line left empty by unquoting, or with an unmatched leading
/// quote, is reported in `invalid_lines`.
pub fn parse_model_list(text: &str) -> ModelList {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut list = ModelList::default();

    for (idx, raw) in text.lines().enumerate() {
        list.report.total_lines += 1;
        let line = raw.trim();

        if line.is_empty() {
            list.report.skipped_blank += 1;
            continue;
        }
        if line.starts_with('#') {
            list.report.skipped_comments += 1;
            continue;
        }

        match unquote(line) {
            Some(path) if !path.is_empty() => list.paths.push(path.to_string()),
            _ => list.report.invalid_lines.push(InvalidLine {
                line_no: idx + 1,
                content: raw.to_string(),
            }),
        }
    }

    list.report.paths_count = list.paths.len();
    list
}

/// Strips one matching pair of double quotes; `None` for an unmatched
/// leading quote
fn unquote(line: &str) -> Option<&str> {
    if let Some(rest) = line.strip_prefix('"') {
        rest.strip_suffix('"')
    } else {
        Some(line)
    }
}

/// Reads and parses a model list file
///
/// # Errors
///
/// Returns [`BatchError::Parse`] naming the path when the file cannot be
/// read or is not UTF-8 text.
pub fn read_model_list(path: &Path) -> Result<ModelList> {
    let bytes = std::fs::read(path)
        .map_err(|e| BatchError::Parse(ParseError::new(path, format!("cannot read model list: {e}"))))?;
    let text = String::from_utf8(bytes)
        .map_err(|e| BatchError::Parse(ParseError::new(path, format!("model list is not UTF-8 text: {e}"))))?;

    let list = parse_model_list(&text);
    tracing::debug!(
        path = %path.display(),
        paths = list.report.paths_count,
        invalid = list.report.invalid_lines.len(),
        "Parsed model list"
    );
    Ok(list)
}
