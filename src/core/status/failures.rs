//! Failure surface
//!
//! One row per distinct `(source, item, kind)` that is currently failing. A
//! run starts from the failed checkpoint records, so keys not yet retried
//! stay visible. A repeated failure replaces the row for its key; a later
//! success removes it. The full attempt history lives in the per-source
//! reports.

use crate::core::atomic::write_json_atomic;
use crate::core::ordering::compare_numbers;
use crate::core::state::{CheckpointRecord, CheckpointStatus};
use crate::domain::{AttemptResult, BatchError, ExportErrorKind, ExportKind, Result, SourceId};
use crate::logging::ErrorCapture;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One failing key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRow {
    pub source_id: SourceId,
    pub source_path: String,
    pub item_number: String,
    pub item_name: String,
    pub kind: ExportKind,
    pub error_kind: ExportErrorKind,
    pub error_message: String,
    pub output_path: String,
    pub timestamp: DateTime<Utc>,
    /// Failures for this key during the current run; 0 for rows carried
    /// over from the checkpoint
    pub failures: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureDocument {
    pub run_id: String,
    pub updated_at: DateTime<Utc>,
    pub rows: Vec<FailureRow>,
}

type RowKey = (SourceId, String, ExportKind);

/// Writer for the failure surface
#[derive(Debug)]
pub struct FailureSurface {
    path: PathBuf,
    run_id: String,
    rows: BTreeMap<RowKey, FailureRow>,
}

impl FailureSurface {
    /// Starts the surface for this run from the failed checkpoint records,
    /// replacing any previous surface
    pub fn start<'a>(
        path: impl Into<PathBuf>,
        run_id: &str,
        checkpoint: impl IntoIterator<Item = &'a CheckpointRecord>,
        capture: &ErrorCapture,
    ) -> Self {
        let rows = checkpoint
            .into_iter()
            .filter(|record| record.status == CheckpointStatus::Failed)
            .map(|record| {
                (
                    (record.source_id.clone(), record.item_number.clone(), record.kind),
                    FailureRow {
                        source_id: record.source_id.clone(),
                        source_path: record.source_path.clone(),
                        item_number: record.item_number.clone(),
                        item_name: record.item_name.clone(),
                        kind: record.kind,
                        error_kind: record.error_kind.unwrap_or(ExportErrorKind::Unknown),
                        error_message: record.last_error.clone().unwrap_or_default(),
                        output_path: record.output_path.clone(),
                        timestamp: record.timestamp,
                        failures: 0,
                    },
                )
            })
            .collect();
        let surface = Self {
            path: path.into(),
            run_id: run_id.to_string(),
            rows,
        };
        surface.write(capture);
        surface
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &FailureRow> {
        self.rows.values()
    }

    /// Applies one attempt result and rewrites the surface
    ///
    /// Skipped results change nothing.
    pub fn observe(&mut self, result: &AttemptResult, source_path: &str, capture: &ErrorCapture) {
        if result.skipped {
            return;
        }
        let key = (result.source_id.clone(), result.item_number.clone(), result.kind);

        if result.success {
            self.rows.remove(&key);
        } else {
            let failures = self.rows.get(&key).map_or(0, |row| row.failures) + 1;
            self.rows.insert(
                key,
                FailureRow {
                    source_id: result.source_id.clone(),
                    source_path: source_path.to_string(),
                    item_number: result.item_number.clone(),
                    item_name: result.item_name.clone(),
                    kind: result.kind,
                    error_kind: result.error_kind.unwrap_or(ExportErrorKind::Unknown),
                    error_message: result.error_message.clone().unwrap_or_default(),
                    output_path: result.output_path.clone(),
                    timestamp: Utc::now(),
                    failures,
                },
            );
        }
        self.write(capture);
    }

    fn document(&self) -> FailureDocument {
        let mut rows: Vec<FailureRow> = self.rows.values().cloned().collect();
        rows.sort_by(|a, b| {
            a.source_id
                .cmp(&b.source_id)
                .then_with(|| compare_numbers(&a.item_number, &b.item_number))
                .then_with(|| a.kind.cmp(&b.kind))
        });
        FailureDocument {
            run_id: self.run_id.clone(),
            updated_at: Utc::now(),
            rows,
        }
    }

    fn write(&self, capture: &ErrorCapture) {
        if let Err(e) = write_json_atomic(&self.path, &self.document()) {
            capture.error(None, None, "Failure surface write failed", Some(&e.to_string()));
        }
    }
}

/// Reads a failure surface
pub fn read_failures(path: &Path) -> Result<FailureDocument> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| BatchError::StatusWrite(format!("Cannot read {}: {}", path.display(), e)))?;
    Ok(serde_json::from_str(&text)?)
}
