//! Coordinator selection markup
//!
//! The markup file is a JSON object keyed by item number:
//!
//! ```json
//! {
//!   "A-101": { "pdf": true, "dwg": false, "priority": 1, "notes": "issue for tender" },
//!   "A-102": { "pdf": true }
//! }
//! ```
//!
//! A document that is not a JSON object is a [`ParseError`]. Individual
//! entries that are malformed are skipped and listed as anomalies. Unknown
//! fields are listed as anomalies too, but the entry is kept.

use crate::domain::{BatchError, ExportKind, ParseError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

const ENTRY_FIELDS: [&str; 4] = ["pdf", "dwg", "priority", "notes"];

/// Export request for one item number
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkupEntry {
    #[serde(default)]
    pub pdf: bool,
    #[serde(default)]
    pub dwg: bool,
    /// Informational; does not affect processing order
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl MarkupEntry {
    pub fn requests(&self, kind: ExportKind) -> bool {
        match kind {
            ExportKind::Pdf => self.pdf,
            ExportKind::Dwg => self.dwg,
        }
    }
}

/// Non-fatal problem with one markup entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkupAnomaly {
    pub key: String,
    pub message: String,
}

/// Parsed markup, keyed by trimmed item number
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionMarkup {
    pub entries: BTreeMap<String, MarkupEntry>,
    pub anomalies: Vec<MarkupAnomaly>,
}

impl SelectionMarkup {
    /// Looks up an entry by item number; the number is trimmed first
    pub fn get(&self, number: &str) -> Option<&MarkupEntry> {
        self.entries.get(number.trim())
    }

    /// Parses markup text
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::Parse`] when the text is not a JSON object.
    pub fn parse(text: &str, origin: &Path) -> Result<Self> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let value: Value = serde_json::from_str(text)
            .map_err(|e| BatchError::Parse(ParseError::new(origin, format!("invalid JSON: {e}"))))?;
        let Value::Object(map) = value else {
            return Err(BatchError::Parse(ParseError::new(
                origin,
                "expected a JSON object keyed by item number",
            )));
        };

        let mut markup = SelectionMarkup::default();
        for (raw_key, raw_entry) in map {
            let key = raw_key.trim().to_string();
            if key.is_empty() {
                markup.anomaly(&raw_key, "empty item number");
                continue;
            }
            if markup.entries.contains_key(&key) {
                markup.anomaly(&raw_key, "duplicate item number after trimming; first entry kept");
                continue;
            }
            match parse_entry(raw_entry) {
                Ok((entry, unknown)) => {
                    for field in unknown {
                        markup.anomaly(&key, &format!("unknown field `{field}` ignored"));
                    }
                    if !entry.pdf && !entry.dwg {
                        markup.anomaly(&key, "entry requests no export kind");
                    }
                    markup.entries.insert(key, entry);
                }
                Err(message) => markup.anomaly(&key, &message),
            }
        }
        Ok(markup)
    }

    /// Reads and parses a markup file
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::Parse`] naming the path when the file is
    /// unreadable or structurally invalid.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            BatchError::Parse(ParseError::new(path, format!("cannot read selection file: {e}")))
        })?;
        let markup = Self::parse(&text, path)?;
        tracing::info!(
            path = %path.display(),
            entries = markup.entries.len(),
            anomalies = markup.anomalies.len(),
            "Loaded selection markup"
        );
        Ok(markup)
    }

    fn anomaly(&mut self, key: &str, message: &str) {
        self.anomalies.push(MarkupAnomaly {
            key: key.to_string(),
            message: message.to_string(),
        });
    }
}

/// Parses one entry, returning it with the names of unrecognized fields
fn parse_entry(value: Value) -> std::result::Result<(MarkupEntry, Vec<String>), String> {
    let Value::Object(map) = value else {
        return Err("entry is not an object".to_string());
    };
    let unknown: Vec<String> = map
        .keys()
        .filter(|name| !ENTRY_FIELDS.contains(&name.as_str()))
        .cloned()
        .collect();
    let flag = |name: &str| match map.get(name) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(other) => Err(format!("`{name}` must be a boolean, got {other}")),
    };
    let priority = match map.get("priority") {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => match n.as_i64() {
            Some(p) => Some(p),
            None => return Err(format!("`priority` must be an integer, got {n}")),
        },
        Some(other) => return Err(format!("`priority` must be an integer, got {other}")),
    };
    let notes = match map.get("notes") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => return Err(format!("`notes` must be a string, got {other}")),
    };
    let entry = MarkupEntry {
        pdf: flag("pdf")?,
        dwg: flag("dwg")?,
        priority,
        notes,
    };
    Ok((entry, unknown))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<SelectionMarkup> {
        SelectionMarkup::parse(text, Path::new("markup.json"))
    }

    #[test]
    fn test_parse_entries() {
        let markup = parse(
            r#"{ " A-101 ": {"pdf": true, "priority": 2, "notes": "tender"}, "A-102": {"dwg": true} }"#,
        )
        .unwrap();
        assert_eq!(markup.entries.len(), 2);
        let entry = markup.get("A-101").unwrap();
        assert!(entry.requests(ExportKind::Pdf));
        assert!(!entry.requests(ExportKind::Dwg));
        assert_eq!(entry.priority, Some(2));
        assert_eq!(entry.notes.as_deref(), Some("tender"));
        assert!(markup.anomalies.is_empty());
    }

    #[test]
    fn test_non_object_document_is_parse_error() {
        assert!(matches!(parse("[1, 2]"), Err(BatchError::Parse(_))));
        assert!(matches!(parse("{ not json"), Err(BatchError::Parse(_))));
    }

    #[test]
    fn test_bad_entries_are_anomalies() {
        let markup = parse(
            r#"{ "A-1": "yes", "A-2": {"pdf": "true"}, "": {"pdf": true}, "A-3": {}, "A-4": {"pdf": true},
                 "A-5": {"PDF": true}, "A-6": {"pdf": true, "colour": "red"} }"#,
        )
        .unwrap();
        assert_eq!(markup.entries.len(), 4);
        assert!(markup.get("A-4").is_some());
        assert!(markup.get("A-3").is_some());
        assert!(markup.get("A-6").unwrap().requests(ExportKind::Pdf));
        let messages = |key: &str| -> Vec<&str> {
            markup
                .anomalies
                .iter()
                .filter(|a| a.key == key)
                .map(|a| a.message.as_str())
                .collect()
        };
        assert!(messages("A-5").contains(&"unknown field `PDF` ignored"));
        assert!(messages("A-5").contains(&"entry requests no export kind"));
        assert_eq!(messages("A-6"), vec!["unknown field `colour` ignored"]);
        assert!(messages("A-4").is_empty());
        let keys: Vec<&str> = markup.anomalies.iter().map(|a| a.key.as_str()).collect();
        assert!(keys.contains(&"A-1"));
        assert!(keys.contains(&"A-2"));
        assert!(keys.contains(&""));
        assert!(keys.contains(&"A-3"));
    }

    #[test]
    fn test_unreadable_file() {
        let err = SelectionMarkup::load(Path::new("/missing/markup.json")).unwrap_err();
        assert!(matches!(err, BatchError::Parse(_)));
    }
}
