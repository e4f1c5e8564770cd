//! Write-temp-then-replace file primitive
//!
//! Every persisted surface (checkpoint, progress, failures, reports) goes
//! through [`write_atomic`]. The temporary file lives next to the target so
//! the final rename stays on one filesystem; a reader sees either the old
//! complete document or the new complete document.

use crate::domain::{BatchError, Result};
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Atomically replaces `path` with `bytes`
///
/// Creates missing parent directories. The temporary file is removed when any
/// step fails.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;

    let tmp = temp_path_for(&parent, path);
    let result = (|| {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&tmp, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

/// Serializes `value` as pretty JSON and writes it atomically
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &json)
        .map_err(|e| BatchError::Io(format!("Failed to write {}: {}", path.display(), e)))
}

fn temp_path_for(parent: &Path, path: &Path) -> PathBuf {
    let filename = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("surface");
    parent.join(format!(".{}.{}.tmp", filename, std::process::id()))
}
