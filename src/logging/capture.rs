//! Error capture for failure paths
//!
//! [`ErrorCapture`] is the one structured surface every component reports
//! failures through. Each entry is appended as a JSON line to the run's error
//! log and mirrored as a `tracing` event. When the log file cannot be written
//! the entry goes to the secondary sink (stderr, prefixed with
//! [`SECONDARY_SINK_PREFIX`]) and the caller carries on; capture never
//! returns an error.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Prefix for lines written to the secondary sink
pub const SECONDARY_SINK_PREFIX: &str = "STATUS-SINK";

/// Severity of a captured entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureLevel {
    Warn,
    Error,
}

/// One line of the error log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub timestamp: DateTime<Utc>,
    pub level: CaptureLevel,
    pub source_id: Option<String>,
    pub item_id: Option<String>,
    pub message: String,
    pub error_detail: Option<String>,
}

/// Structured, non-fatal failure logger
///
/// One instance per run, shared by reference with every component.
#[derive(Debug)]
pub struct ErrorCapture {
    log_path: Option<PathBuf>,
    entries: AtomicUsize,
    sink_failures: AtomicUsize,
}

impl ErrorCapture {
    /// Creates a capture appending to `log_path`
    ///
    /// A parent directory that cannot be created is not an error here; the
    /// first write will fail over to the secondary sink instead.
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        let log_path = log_path.into();
        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        Self {
            log_path: Some(log_path),
            entries: AtomicUsize::new(0),
            sink_failures: AtomicUsize::new(0),
        }
    }

    /// Creates a capture that only emits tracing events
    pub fn tracing_only() -> Self {
        Self {
            log_path: None,
            entries: AtomicUsize::new(0),
            sink_failures: AtomicUsize::new(0),
        }
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    /// Captures an error entry
    pub fn error(
        &self,
        source_id: Option<&str>,
        item_id: Option<&str>,
        message: impl Into<String>,
        error_detail: Option<&str>,
    ) {
        self.capture(CaptureLevel::Error, source_id, item_id, message.into(), error_detail);
    }

    /// Captures a warning entry
    pub fn warn(
        &self,
        source_id: Option<&str>,
        item_id: Option<&str>,
        message: impl Into<String>,
        error_detail: Option<&str>,
    ) {
        self.capture(CaptureLevel::Warn, source_id, item_id, message.into(), error_detail);
    }

    /// Number of entries captured so far
    pub fn entries(&self) -> usize {
        self.entries.load(Ordering::Relaxed)
    }

    /// Number of entries that had to go to the secondary sink
    pub fn sink_failures(&self) -> usize {
        self.sink_failures.load(Ordering::Relaxed)
    }

    fn capture(
        &self,
        level: CaptureLevel,
        source_id: Option<&str>,
        item_id: Option<&str>,
        message: String,
        error_detail: Option<&str>,
    ) {
        let entry = ErrorEntry {
            timestamp: Utc::now(),
            level,
            source_id: source_id.map(str::to_string),
            item_id: item_id.map(str::to_string),
            message,
            error_detail: error_detail.map(str::to_string),
        };

        match level {
            CaptureLevel::Error => tracing::error!(
                source_id = entry.source_id.as_deref().unwrap_or("-"),
                item_id = entry.item_id.as_deref().unwrap_or("-"),
                detail = entry.error_detail.as_deref().unwrap_or(""),
                "{}",
                entry.message
            ),
            CaptureLevel::Warn => tracing::warn!(
                source_id = entry.source_id.as_deref().unwrap_or("-"),
                item_id = entry.item_id.as_deref().unwrap_or("-"),
                detail = entry.error_detail.as_deref().unwrap_or(""),
                "{}",
                entry.message
            ),
        }

        self.entries.fetch_add(1, Ordering::Relaxed);

        if let Some(path) = &self.log_path {
            if let Err(e) = write_entry(path, &entry) {
                self.sink_failures.fetch_add(1, Ordering::Relaxed);
                eprintln!(
                    "{SECONDARY_SINK_PREFIX} {} ({e:#})",
                    serde_json::to_string(&entry).unwrap_or_else(|_| entry.message.clone())
                );
            }
        }
    }
}

fn write_entry(path: &Path, entry: &ErrorEntry) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open error log: {}", path.display()))?;
    let line = serde_json::to_string(entry).context("Failed to serialize error entry")?;
    writeln!(file, "{line}").context("Failed to write error entry")?;
    Ok(())
}

/// Reads every entry of an error log, skipping unparseable lines
pub fn read_entries(path: &Path) -> Result<Vec<ErrorEntry>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read error log: {}", path.display()))?;
    Ok(contents
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect())
}
