//! Deterministic artifact paths
//!
//! `<root>/<group>/<subgroup>/<kind>/<source stem>/<number> - <name>.<ext>`
//!
//! Every component is sanitized for common filesystems. Items without a
//! number use `_unnumbered_<opaque id>` in place of the number.

use crate::domain::ids::file_stem;
use crate::domain::{ExportKind, ItemDescriptor, SourceIdentity};
use std::path::{Path, PathBuf};

const MAX_COMPONENT_CHARS: usize = 120;
const RESERVED_NAMES: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Makes one path component safe on Windows and POSIX filesystems
pub fn sanitize_component(raw: &str) -> String {
    let mut out: String = raw
        .trim()
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .take(MAX_COMPONENT_CHARS)
        .collect();

    while out.ends_with('.') || out.ends_with(' ') {
        out.pop();
    }
    if out.is_empty() {
        return "_".to_string();
    }
    let base = out.split('.').next().unwrap_or_default().to_ascii_uppercase();
    if RESERVED_NAMES.contains(&base.as_str()) {
        out.insert(0, '_');
    }
    out
}

/// File stem of an item's artifact, before sanitizing
pub fn artifact_stem(item: &ItemDescriptor) -> String {
    let number = item.normalized_number();
    let number = if number.is_empty() {
        format!("_unnumbered_{}", item.opaque_id.trim())
    } else {
        number.to_string()
    };
    let name = item.name.trim();
    if name.is_empty() {
        number
    } else {
        format!("{number} - {name}")
    }
}

/// Directory holding every artifact of one kind for one source
pub fn artifact_dir(root: &Path, source: &SourceIdentity, kind: ExportKind) -> PathBuf {
    root.join(sanitize_component(&source.group_id))
        .join(sanitize_component(&source.subgroup_id))
        .join(kind.as_str())
        .join(sanitize_component(file_stem(&source.path)))
}

/// Full path of the primary artifact for one item and kind
pub fn artifact_path(root: &Path, source: &SourceIdentity, kind: ExportKind, item: &ItemDescriptor) -> PathBuf {
    artifact_dir(root, source, kind).join(format!(
        "{}.{}",
        sanitize_component(&artifact_stem(item)),
        kind.extension()
    ))
}
