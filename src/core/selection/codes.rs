//! Code set for codes-mode selection

use crate::config::SelectionSettings;
use crate::core::model_list::parse_model_list;
use crate::domain::{BatchError, ConfigError, ParseError, Result};
use std::collections::BTreeSet;

/// Set of accepted attribute values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeSet {
    codes: BTreeSet<String>,
    case_insensitive: bool,
}

impl CodeSet {
    pub fn new<I, S>(codes: I, case_insensitive: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let codes = codes
            .into_iter()
            .map(|c| fold(c.as_ref().trim(), case_insensitive))
            .filter(|c| !c.is_empty())
            .collect();
        Self {
            codes,
            case_insensitive,
        }
    }

    /// Builds the set from inline codes plus the optional codes file
    ///
    /// The codes file uses the model list rules: one code per line, blank
    /// lines and `#` comments skipped, one pair of quotes stripped.
    ///
    /// # Errors
    ///
    /// An unreadable codes file is a [`BatchError::Parse`]; a resulting empty
    /// set is a [`BatchError::Configuration`].
    pub fn from_settings(settings: &SelectionSettings) -> Result<Self> {
        let mut codes: Vec<String> = settings.codes.clone();

        if let Some(path) = &settings.codes_file {
            let text = std::fs::read_to_string(path).map_err(|e| {
                BatchError::Parse(ParseError::new(path, format!("cannot read codes file: {e}")))
            })?;
            let list = parse_model_list(&text);
            for invalid in &list.report.invalid_lines {
                tracing::warn!(
                    path = %path.display(),
                    line = invalid.line_no,
                    content = %invalid.content,
                    "Ignoring invalid codes file line"
                );
            }
            codes.extend(list.paths);
        }

        let set = Self::new(codes, settings.case_insensitive_codes);
        if set.is_empty() {
            return Err(ConfigError::single(
                "selection.codes",
                "non-empty code set (inline codes and codes_file are both empty)",
            )
            .into());
        }
        Ok(set)
    }

    pub fn contains(&self, value: &str) -> bool {
        self.codes.contains(&fold(value.trim(), self.case_insensitive))
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

fn fold(value: &str, case_insensitive: bool) -> String {
    if case_insensitive {
        value.to_lowercase()
    } else {
        value.to_string()
    }
}
