//! Domain error types
//!
//! This module defines the error hierarchy for sheetbatch. Per-attempt export
//! failures are not errors at this level: they are classified into an
//! [`ExportErrorKind`](crate::domain::attempt::ExportErrorKind) and carried on
//! the attempt result. Only configuration, input parsing, checkpoint
//! corruption, and source-level failures surface as [`BatchError`].

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Main sheetbatch error type
#[derive(Debug, Error)]
pub enum BatchError {
    /// Configuration-related errors (fatal, pre-run)
    #[error("{0}")]
    Configuration(#[from] ConfigError),

    /// Structurally broken input (model list, selection markup, codes file)
    #[error("{0}")]
    Parse(#[from] ParseError),

    /// Checkpoint store could not be parsed and no recovery policy applies
    #[error("Checkpoint store {path} is corrupt: {message}")]
    CheckpointCorruption { path: PathBuf, message: String },

    /// Source-level failure reported by the document or item provider
    #[error("{0}")]
    Source(#[from] SourceError),

    /// A live status surface could not be written
    #[error("Status write error: {0}")]
    StatusWrite(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

/// One failing configuration key and the shape it was expected to have
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    /// Dotted key path, e.g. `export.pdf.paper_size`
    pub key: String,

    /// Human readable description of the expected value
    pub expected: String,
}

impl ConfigIssue {
    pub fn new(key: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            expected: expected.into(),
        }
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: expected {}", self.key, self.expected)
    }
}

/// Aggregated configuration failure
///
/// Always lists every failing key, never just the first one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub issues: Vec<ConfigIssue>,
}

impl ConfigError {
    pub fn new(issues: Vec<ConfigIssue>) -> Self {
        Self { issues }
    }

    /// Convenience constructor for a single issue
    pub fn single(key: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::new(vec![ConfigIssue::new(key, expected)])
    }

    /// Returns true when the given key is among the failing keys
    pub fn mentions(&self, key: &str) -> bool {
        self.issues.iter().any(|issue| issue.key == key)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Configuration error ({} issue{}): ",
            self.issues.len(),
            if self.issues.len() == 1 { "" } else { "s" }
        )?;
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigError {}

/// A model list, markup, or codes file that is structurally unusable
#[derive(Debug, Clone, Error)]
#[error("Failed to parse {path}: {message}")]
pub struct ParseError {
    pub path: PathBuf,
    pub message: String,
}

impl ParseError {
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Classification of a source-level failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    NotFound,
    AccessDenied,
    Locked,
    Unsupported,
    Unknown,
}

impl fmt::Display for SourceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotFound => "not_found",
            Self::AccessDenied => "access_denied",
            Self::Locked => "locked",
            Self::Unsupported => "unsupported",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Structured failure returned by a document or item provider
#[derive(Debug, Clone, Error)]
#[error("Source {path} failed ({kind}): {message}")]
pub struct SourceError {
    pub kind: SourceErrorKind,
    pub message: String,
    pub path: String,
}

impl SourceError {
    pub fn new(kind: SourceErrorKind, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            path: path.into(),
        }
    }

    /// Classify an I/O error raised while touching a source
    pub fn from_io(err: &std::io::Error, path: impl Into<String>) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => SourceErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => SourceErrorKind::AccessDenied,
            std::io::ErrorKind::WouldBlock => SourceErrorKind::Locked,
            _ => SourceErrorKind::Unknown,
        };
        Self::new(kind, err.to_string(), path)
    }
}

impl From<std::io::Error> for BatchError {
    fn from(err: std::io::Error) -> Self {
        BatchError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for BatchError {
    fn from(err: serde_json::Error) -> Self {
        BatchError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for BatchError {
    fn from(err: toml::de::Error) -> Self {
        BatchError::Configuration(ConfigError::single(
            "<document>",
            format!("valid TOML ({err})"),
        ))
    }
}
