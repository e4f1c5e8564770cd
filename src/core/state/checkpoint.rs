//! Durable per-item, per-kind attempt state
//!
//! The store is one JSON document under the output root. It is rewritten
//! atomically after every recorded attempt, so a crash between attempts
//! leaves the previous complete document in place.

use crate::config::{CorruptionPolicy, ResumePolicy};
use crate::core::atomic::write_json_atomic;
use crate::domain::{AttemptResult, BatchError, ExportErrorKind, ExportKind, Result, SourceId};
use crate::logging::ErrorCapture;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const DOCUMENT_VERSION: u32 = 1;

/// Last known outcome of one attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointStatus {
    Success,
    Failed,
}

/// Key of one checkpoint record
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CheckpointKey {
    pub source_id: SourceId,
    pub item_number: String,
    pub kind: ExportKind,
}

impl CheckpointKey {
    pub fn new(source_id: &SourceId, item_number: &str, kind: ExportKind) -> Self {
        Self {
            source_id: source_id.clone(),
            item_number: item_number.to_string(),
            kind,
        }
    }
}

/// Stored record for one `(source, item, kind)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub source_id: SourceId,
    #[serde(default)]
    pub source_path: String,
    pub item_number: String,
    #[serde(default)]
    pub item_name: String,
    pub kind: ExportKind,
    pub status: CheckpointStatus,
    pub output_path: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub last_error: Option<String>,
    #[serde(default)]
    pub error_kind: Option<ExportErrorKind>,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub violation: bool,
    /// Number of attempts recorded for this key across runs
    #[serde(default)]
    pub attempts: u32,
}

impl CheckpointRecord {
    pub fn key(&self) -> CheckpointKey {
        CheckpointKey::new(&self.source_id, &self.item_number, self.kind)
    }

    pub fn is_success(&self) -> bool {
        self.status == CheckpointStatus::Success
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CheckpointDocument {
    version: u32,
    updated_at: DateTime<Utc>,
    records: Vec<CheckpointRecord>,
}

/// Why an item-kind will be attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptReason {
    NoRecord,
    PreviousFailure,
    ArtifactMissing,
    ArtifactTooSmall,
    Overwrite,
}

impl AttemptReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoRecord => "no_record",
            Self::PreviousFailure => "previous_failure",
            Self::ArtifactMissing => "artifact_missing",
            Self::ArtifactTooSmall => "artifact_too_small",
            Self::Overwrite => "overwrite",
        }
    }
}

/// Outcome of [`CheckpointStore::decide`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Skip,
    Attempt(AttemptReason),
}

impl Decision {
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip)
    }
}

/// Checkpoint store bound to one file
#[derive(Debug)]
pub struct CheckpointStore {
    path: PathBuf,
    policy: ResumePolicy,
    records: BTreeMap<CheckpointKey, CheckpointRecord>,
}

impl CheckpointStore {
    /// Opens the store at `path`, starting empty if the file does not exist
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::CheckpointCorruption`] when the file cannot be
    /// parsed and the policy is [`CorruptionPolicy::Fail`].
    pub fn open(
        path: impl Into<PathBuf>,
        policy: ResumePolicy,
        corruption: CorruptionPolicy,
        capture: &ErrorCapture,
    ) -> Result<Self> {
        let path = path.into();
        let mut store = Self {
            path,
            policy,
            records: BTreeMap::new(),
        };

        if !store.path.exists() {
            tracing::debug!(path = %store.path.display(), "No checkpoint found, starting empty");
            return Ok(store);
        }

        match read_document(&store.path) {
            Ok(document) => {
                for record in document.records {
                    store.records.insert(record.key(), record);
                }
                tracing::info!(
                    path = %store.path.display(),
                    records = store.records.len(),
                    "Loaded checkpoint"
                );
                Ok(store)
            }
            Err(message) => match corruption {
                CorruptionPolicy::Fail => Err(BatchError::CheckpointCorruption {
                    path: store.path.clone(),
                    message,
                }),
                CorruptionPolicy::BackupAndRestart => {
                    let backup = backup_path(&store.path, Utc::now());
                    std::fs::rename(&store.path, &backup).map_err(|e| {
                        BatchError::CheckpointCorruption {
                            path: store.path.clone(),
                            message: format!("{message}; backup to {} failed: {e}", backup.display()),
                        }
                    })?;
                    capture.warn(
                        None,
                        None,
                        format!(
                            "Checkpoint {} was unreadable; moved to {} and restarted empty",
                            store.path.display(),
                            backup.display()
                        ),
                        Some(&message),
                    );
                    Ok(store)
                }
            },
        }
    }

    /// Reads a checkpoint without opening it for a run
    ///
    /// Returns the record count, zero when the file does not exist, or the
    /// reason the file cannot be used.
    pub fn inspect(path: &Path) -> std::result::Result<usize, String> {
        if !path.exists() {
            return Ok(0);
        }
        read_document(path).map(|document| document.records.len())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn policy(&self) -> ResumePolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, source_id: &SourceId, item_number: &str, kind: ExportKind) -> Option<&CheckpointRecord> {
        self.records.get(&CheckpointKey::new(source_id, item_number, kind))
    }

    /// All records in key order
    pub fn records(&self) -> impl Iterator<Item = &CheckpointRecord> {
        self.records.values()
    }

    /// Records belonging to one source, in key order
    pub fn records_for<'a>(&'a self, source_id: &'a SourceId) -> impl Iterator<Item = &'a CheckpointRecord> + 'a {
        self.records
            .values()
            .filter(move |record| &record.source_id == source_id)
    }

    /// Decides whether an item-kind can be skipped
    ///
    /// Skipping requires a success record for the exact key and an artifact
    /// at `expected_output_path` of at least `min_size_bytes`. Under the
    /// overwrite policy every item-kind is attempted.
    pub fn decide(
        &self,
        source_id: &SourceId,
        item_number: &str,
        kind: ExportKind,
        expected_output_path: &Path,
        min_size_bytes: u64,
    ) -> Decision {
        if self.policy == ResumePolicy::Overwrite {
            return Decision::Attempt(AttemptReason::Overwrite);
        }

        let Some(record) = self.get(source_id, item_number, kind) else {
            return Decision::Attempt(AttemptReason::NoRecord);
        };
        if !record.is_success() {
            return Decision::Attempt(AttemptReason::PreviousFailure);
        }

        match std::fs::metadata(expected_output_path) {
            Ok(meta) if meta.is_file() && meta.len() >= min_size_bytes => Decision::Skip,
            Ok(meta) if meta.is_file() => Decision::Attempt(AttemptReason::ArtifactTooSmall),
            _ => Decision::Attempt(AttemptReason::ArtifactMissing),
        }
    }

    /// Records an attempt and persists the whole store
    ///
    /// Skipped results are not attempts and leave the store untouched.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the store cannot be persisted; the
    /// in-memory record is kept either way.
    pub fn record(&mut self, result: &AttemptResult, source_path: &str) -> Result<()> {
        if result.skipped {
            return Ok(());
        }

        let key = CheckpointKey::new(&result.source_id, &result.item_number, result.kind);
        let attempts = self.records.get(&key).map_or(0, |r| r.attempts) + 1;
        let record = CheckpointRecord {
            source_id: result.source_id.clone(),
            source_path: source_path.to_string(),
            item_number: result.item_number.clone(),
            item_name: result.item_name.clone(),
            kind: result.kind,
            status: if result.success {
                CheckpointStatus::Success
            } else {
                CheckpointStatus::Failed
            },
            output_path: result.output_path.clone(),
            timestamp: Utc::now(),
            last_error: result.error_message.clone(),
            error_kind: result.error_kind,
            duration_ms: result.duration_ms,
            violation: result.violation,
            attempts,
        };
        self.records.insert(key, record);
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        let document = CheckpointDocument {
            version: DOCUMENT_VERSION,
            updated_at: Utc::now(),
            records: self.records.values().cloned().collect(),
        };
        write_json_atomic(&self.path, &document)
    }
}

fn read_document(path: &Path) -> std::result::Result<CheckpointDocument, String> {
    let text = std::fs::read_to_string(path).map_err(|e| format!("unreadable: {e}"))?;
    let document: CheckpointDocument =
        serde_json::from_str(&text).map_err(|e| format!("invalid JSON: {e}"))?;
    if document.version != DOCUMENT_VERSION {
        return Err(format!(
            "unsupported checkpoint version {} (expected {})",
            document.version, DOCUMENT_VERSION
        ));
    }
    Ok(document)
}

/// Side path for an unreadable checkpoint: `<name>.corrupt-<UTC timestamp>`
pub fn backup_path(path: &Path, at: DateTime<Utc>) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "checkpoint.json".to_string());
    path.with_file_name(format!("{}.corrupt-{}", name, at.format("%Y%m%dT%H%M%SZ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const TOWER: &str = "/m/tower.json";

    fn result(source: &SourceId, number: &str, success: bool, output: &Path) -> AttemptResult {
        AttemptResult {
            source_id: source.clone(),
            item_number: number.to_string(),
            item_name: "Plan".to_string(),
            kind: ExportKind::Pdf,
            success,
            output_path: output.to_string_lossy().into_owned(),
            skipped: false,
            duration_ms: 12,
            error_kind: (!success).then_some(ExportErrorKind::Locked),
            error_message: (!success).then(|| "file locked".to_string()),
            violation: false,
        }
    }

    fn open(path: &Path, policy: ResumePolicy) -> CheckpointStore {
        CheckpointStore::open(path, policy, CorruptionPolicy::Fail, &ErrorCapture::tracing_only()).unwrap()
    }

    #[test]
    fn test_skip_requires_record_and_artifact() {
        let dir = tempdir().unwrap();
        let source = SourceId::from_path("/m/tower.json");
        let artifact = dir.path().join("A-1.pdf");
        let mut store = open(&dir.path().join("checkpoint.json"), ResumePolicy::Resume);

        assert_eq!(
            store.decide(&source, "A-1", ExportKind::Pdf, &artifact, 4),
            Decision::Attempt(AttemptReason::NoRecord)
        );

        store.record(&result(&source, "A-1", true, &artifact), TOWER).unwrap();
        assert_eq!(
            store.decide(&source, "A-1", ExportKind::Pdf, &artifact, 4),
            Decision::Attempt(AttemptReason::ArtifactMissing)
        );

        std::fs::write(&artifact, b"ab").unwrap();
        assert_eq!(
            store.decide(&source, "A-1", ExportKind::Pdf, &artifact, 4),
            Decision::Attempt(AttemptReason::ArtifactTooSmall)
        );

        std::fs::write(&artifact, b"abcdef").unwrap();
        assert!(store.decide(&source, "A-1", ExportKind::Pdf, &artifact, 4).is_skip());
        assert_eq!(
            store.decide(&source, "A-1", ExportKind::Dwg, &artifact, 4),
            Decision::Attempt(AttemptReason::NoRecord)
        );
    }

    #[test]
    fn test_failed_record_is_attempted() {
        let dir = tempdir().unwrap();
        let source = SourceId::from_path("/m/tower.json");
        let artifact = dir.path().join("A-1.pdf");
        std::fs::write(&artifact, b"abcdef").unwrap();
        let mut store = open(&dir.path().join("checkpoint.json"), ResumePolicy::Resume);

        store.record(&result(&source, "A-1", false, &artifact), TOWER).unwrap();
        assert_eq!(
            store.decide(&source, "A-1", ExportKind::Pdf, &artifact, 1),
            Decision::Attempt(AttemptReason::PreviousFailure)
        );
    }

    #[test]
    fn test_overwrite_bypasses_skip() {
        let dir = tempdir().unwrap();
        let source = SourceId::from_path("/m/tower.json");
        let artifact = dir.path().join("A-1.pdf");
        std::fs::write(&artifact, b"abcdef").unwrap();
        let mut store = open(&dir.path().join("checkpoint.json"), ResumePolicy::Overwrite);
        store.record(&result(&source, "A-1", true, &artifact), TOWER).unwrap();

        assert_eq!(
            store.decide(&source, "A-1", ExportKind::Pdf, &artifact, 1),
            Decision::Attempt(AttemptReason::Overwrite)
        );
    }

    #[test]
    fn test_records_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");
        let source = SourceId::from_path("/m/tower.json");
        let artifact = dir.path().join("A-1.pdf");
        {
            let mut store = open(&path, ResumePolicy::Resume);
            store.record(&result(&source, "A-1", false, &artifact), TOWER).unwrap();
            store.record(&result(&source, "A-1", true, &artifact), TOWER).unwrap();
            store.record(&result(&source, "A-2", true, &artifact), TOWER).unwrap();
        }

        let store = open(&path, ResumePolicy::Resume);
        assert_eq!(store.len(), 2);
        let record = store.get(&source, "A-1", ExportKind::Pdf).unwrap();
        assert!(record.is_success());
        assert_eq!(record.attempts, 2);
        assert_eq!(record.last_error, None);
        assert_eq!(record.source_path, TOWER);
        assert_eq!(store.records_for(&source).count(), 2);
    }

    #[test]
    fn test_skipped_results_are_not_recorded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");
        let source = SourceId::from_path("/m/tower.json");
        let mut store = open(&path, ResumePolicy::Resume);
        store
            .record(
                &AttemptResult::skipped(source, "A-1", "Plan", ExportKind::Pdf, "/x.pdf"),
                TOWER,
            )
            .unwrap();
        assert!(store.is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn test_corruption_fails_under_fail_policy() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");
        std::fs::write(&path, b"{ truncated").unwrap();

        let err = CheckpointStore::open(
            &path,
            ResumePolicy::Resume,
            CorruptionPolicy::Fail,
            &ErrorCapture::tracing_only(),
        )
        .unwrap_err();
        assert!(matches!(err, BatchError::CheckpointCorruption { .. }));
        assert!(path.exists());
    }

    #[test]
    fn test_corruption_backs_up_and_restarts() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");
        std::fs::write(&path, b"not json").unwrap();
        let capture = ErrorCapture::tracing_only();

        let store = CheckpointStore::open(
            &path,
            ResumePolicy::Resume,
            CorruptionPolicy::BackupAndRestart,
            &capture,
        )
        .unwrap();

        assert!(store.is_empty());
        assert!(!path.exists());
        let backups: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("checkpoint.json.corrupt-"))
            .collect();
        assert_eq!(backups.len(), 1);
        assert_eq!(capture.entries(), 1);
    }

    #[test]
    fn test_inspect_reports_count_or_reason() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");
        assert_eq!(CheckpointStore::inspect(&path), Ok(0));

        let source = SourceId::from_path("/m/tower.json");
        open(&path, ResumePolicy::Resume)
            .record(&result(&source, "A-1", true, &dir.path().join("A-1.pdf")), TOWER)
            .unwrap();
        assert_eq!(CheckpointStore::inspect(&path), Ok(1));

        std::fs::write(&path, b"[]").unwrap();
        assert!(CheckpointStore::inspect(&path).unwrap_err().contains("invalid JSON"));
    }

    #[test]
    fn test_backup_path_format() {
        let at = DateTime::parse_from_rfc3339("2026-03-04T05:06:07Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            backup_path(Path::new("/out/checkpoint.json"), at),
            PathBuf::from("/out/checkpoint.json.corrupt-20260304T050607Z")
        );
    }
}
