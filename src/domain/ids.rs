//! Domain identifier types
//!
//! Source identifiers are derived from the source path so that the same model
//! list always yields the same checkpoint keys and output locations.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Sentinel used for group and subgroup ids that could not be inferred
pub const UNKNOWN: &str = "Unknown";

/// Stable identifier for one source document
///
/// Format: `{stem-slug}-{10 hex chars of sha256(normalized path)}`.
///
/// # Examples
///
/// ```
/// use sheetbatch::domain::ids::SourceId;
///
/// let a = SourceId::from_path("C:\\Models\\Arch.rvt");
/// let b = SourceId::from_path("C:/Models/Arch.rvt");
/// assert_eq!(a, b);
/// assert!(a.as_str().starts_with("arch-"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceId(String);

impl SourceId {
    /// Creates a SourceId from an existing identifier string
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Source ID cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Derives the identifier for a source path
    pub fn from_path(path: &str) -> Self {
        let normalized = normalize_path(path);

        let mut hasher = Sha256::new();
        hasher.update(normalized.as_bytes());
        let digest = format!("{:x}", hasher.finalize());

        let stem = file_stem(&normalized);
        let slug = slugify(stem);
        let slug = if slug.is_empty() { "source".to_string() } else { slug };

        Self(format!("{}-{}", slug, &digest[..10]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SourceId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for SourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Canonicalizes path separators to `/` and trims surrounding whitespace
pub fn normalize_path(path: &str) -> String {
    path.trim().replace('\\', "/")
}

/// Returns the file name of a normalized path without its extension
pub fn file_stem(normalized: &str) -> &str {
    let name = normalized.rsplit('/').next().unwrap_or(normalized);
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}

fn slugify(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_dash = false;
    for c in s.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash && !out.is_empty() {
            out.push('-');
            last_dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}
