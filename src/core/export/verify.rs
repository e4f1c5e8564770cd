//! Post-export artifact checks
//!
//! Only two checks are made: the primary artifact exists with at least the
//! configured size, and the number of files sharing its stem stays within the
//! configured bound. Contents are never inspected.

use std::path::Path;

/// Upper bound of directory entries inspected by [`count_related`]
pub const SCAN_LIMIT: usize = 10_000;

/// Outcome of verifying one artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactCheck {
    Ok { size: u64 },
    Missing,
    TooSmall { size: u64, min_size: u64 },
}

impl ArtifactCheck {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    /// Message stored on a failed attempt
    pub fn describe(&self, path: &Path) -> String {
        match self {
            Self::Ok { size } => format!("{} ({} bytes)", path.display(), size),
            Self::Missing => format!("artifact {} was not produced", path.display()),
            Self::TooSmall { size, min_size } => format!(
                "artifact {} is {} bytes, below the {} byte minimum",
                path.display(),
                size,
                min_size
            ),
        }
    }
}

/// Checks that the primary artifact exists and is large enough
pub fn check_artifact(path: &Path, min_size: u64) -> ArtifactCheck {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() && meta.len() >= min_size => ArtifactCheck::Ok { size: meta.len() },
        Ok(meta) if meta.is_file() => ArtifactCheck::TooSmall {
            size: meta.len(),
            min_size,
        },
        _ => ArtifactCheck::Missing,
    }
}

/// True when `file_name` belongs to the artifact with file stem `stem`
///
/// The stem must be followed by an extension or by a separator, so `A-1`
/// does not claim `A-10.pdf`.
fn is_related(file_name: &str, stem: &str) -> bool {
    let Some(rest) = file_name.strip_prefix(stem) else {
        return false;
    };
    let mut chars = rest.chars();
    match chars.next() {
        Some('.') => chars.next().is_some_and(|c| c.is_ascii_alphabetic()),
        Some(' ' | '-' | '_' | '(') => true,
        _ => false,
    }
}

/// Counts files in the artifact's directory that belong to its stem
///
/// At most [`SCAN_LIMIT`] entries are inspected.
pub fn count_related(path: &Path) -> usize {
    let (Some(dir), Some(stem)) = (path.parent(), path.file_stem().and_then(|s| s.to_str())) else {
        return 0;
    };
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    entries
        .take(SCAN_LIMIT)
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter(|entry| is_related(&entry.file_name().to_string_lossy(), stem))
        .count()
}

/// True when more related files exist than `max_artifacts` allows
pub fn exceeds_artifact_bound(path: &Path, max_artifacts: usize) -> bool {
    count_related(path) > max_artifacts
}
