//! Export kinds and per-attempt results

use crate::domain::ids::SourceId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Artifact kinds the core can request from an exporter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportKind {
    /// Vector document
    Pdf,
    /// CAD drawing
    Dwg,
}

impl ExportKind {
    /// All kinds in their canonical processing order
    pub const ALL: [ExportKind; 2] = [ExportKind::Pdf, ExportKind::Dwg];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Dwg => "dwg",
        }
    }

    /// File extension of the primary artifact
    pub fn extension(&self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "dwg" => Ok(Self::Dwg),
            other => Err(format!("Unknown export kind '{other}'. Must be one of: pdf, dwg")),
        }
    }
}

/// Classification of a failed export attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportErrorKind {
    NotFound,
    AccessDenied,
    Locked,
    VerificationFailure,
    Unknown,
}

impl ExportErrorKind {
    /// Classify an I/O error raised at the exporter boundary
    pub fn from_io(err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound,
            std::io::ErrorKind::PermissionDenied => Self::AccessDenied,
            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::ResourceBusy => Self::Locked,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for ExportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotFound => "not_found",
            Self::AccessDenied => "access_denied",
            Self::Locked => "locked",
            Self::VerificationFailure => "verification_failure",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Outcome of one (source, item, kind) attempt
///
/// Produced once per attempt (or skip) and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptResult {
    pub source_id: SourceId,
    pub item_number: String,
    pub item_name: String,
    pub kind: ExportKind,
    pub success: bool,
    pub output_path: String,
    pub skipped: bool,
    pub duration_ms: u64,
    pub error_kind: Option<ExportErrorKind>,
    pub error_message: Option<String>,
    pub violation: bool,
}

impl AttemptResult {
    /// Result for an attempt that was skipped because a verified artifact
    /// already exists
    pub fn skipped(
        source_id: SourceId,
        item_number: impl Into<String>,
        item_name: impl Into<String>,
        kind: ExportKind,
        output_path: impl Into<String>,
    ) -> Self {
        Self {
            source_id,
            item_number: item_number.into(),
            item_name: item_name.into(),
            kind,
            success: true,
            output_path: output_path.into(),
            skipped: true,
            duration_ms: 0,
            error_kind: None,
            error_message: None,
            violation: false,
        }
    }

    /// True when the attempt ran and failed
    pub fn is_failure(&self) -> bool {
        !self.success && !self.skipped
    }
}
