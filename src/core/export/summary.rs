//! Run summary
//!
//! Totals for a whole run, written to `run_summary.json` in the reports
//! directory and used by the CLI to pick its exit code.

use crate::core::report::{KindTotals, SourceReport, SourceStatus};
use crate::core::status::RunState;
use crate::domain::ExportKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Exit code: every selected item-kind succeeded or was skipped
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code: the run completed with per-item or per-source failures
pub const EXIT_PARTIAL_FAILURE: i32 = 1;
/// Exit code: fatal configuration or environment failure
pub const EXIT_FATAL: i32 = 2;
/// Exit code: the run was interrupted
pub const EXIT_INTERRUPTED: i32 = 130;

/// Category of a source-level error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunErrorType {
    SourceOpen,
    ItemListing,
}

/// Source-level error recorded in the summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunError {
    pub error_type: RunErrorType,
    pub source_path: String,
    pub message: String,
}

impl RunError {
    pub fn new(error_type: RunErrorType, source_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_type,
            source_path: source_path.into(),
            message: message.into(),
        }
    }
}

/// Summary of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub state: RunState,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_ms: u64,
    pub sources_total: usize,
    pub sources_processed: usize,
    pub sources_failed: usize,
    pub totals: BTreeMap<ExportKind, KindTotals>,
    pub errors: Vec<RunError>,
}

impl RunSummary {
    pub fn new(run_id: &str, sources_total: usize) -> Self {
        Self {
            run_id: run_id.to_string(),
            state: RunState::Running,
            started_at: Utc::now(),
            finished_at: None,
            duration_ms: 0,
            sources_total,
            sources_processed: 0,
            sources_failed: 0,
            totals: BTreeMap::new(),
            errors: Vec::new(),
        }
    }

    /// Folds one finished source report into the totals
    pub fn add_source(&mut self, report: &SourceReport) {
        self.sources_processed += 1;
        if report.status == SourceStatus::OpenFailed {
            self.sources_failed += 1;
        }
        for (kind, totals) in &report.totals {
            self.totals.entry(*kind).or_default().add(totals);
        }
    }

    pub fn add_error(&mut self, error: RunError) {
        self.errors.push(error);
    }

    /// Marks the run finished
    pub fn finish(&mut self, state: RunState, duration: Duration) {
        self.state = state;
        self.finished_at = Some(Utc::now());
        self.duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
    }

    pub fn totals_for(&self, kind: ExportKind) -> KindTotals {
        self.totals.get(&kind).copied().unwrap_or_default()
    }

    /// Failed item-kind attempts across all kinds
    pub fn failures(&self) -> usize {
        self.totals.values().map(|t| t.failure).sum()
    }

    /// True when nothing failed at item or source level
    pub fn is_successful(&self) -> bool {
        self.failures() == 0 && self.sources_failed == 0 && self.errors.is_empty()
    }

    /// Share of attempted item-kinds that ended verified, as a percentage
    pub fn success_rate(&self) -> f64 {
        let (ok, attempted) = self.totals.values().fold((0, 0), |(ok, attempted), t| {
            (ok + t.success + t.skip, attempted + t.success + t.skip + t.failure)
        });
        if attempted == 0 {
            return 100.0;
        }
        ok as f64 / attempted as f64 * 100.0
    }

    /// Process exit code for this outcome
    pub fn exit_code(&self) -> i32 {
        if self.state == RunState::Cancelled {
            EXIT_INTERRUPTED
        } else if self.is_successful() {
            EXIT_SUCCESS
        } else {
            EXIT_PARTIAL_FAILURE
        }
    }

    /// Log the summary
    pub fn log_summary(&self) {
        for (kind, totals) in &self.totals {
            tracing::info!(
                kind = %kind,
                selected = totals.selected,
                success = totals.success,
                skip = totals.skip,
                failure = totals.failure,
                not_attempted = totals.not_attempted,
                violations = totals.violations,
                "Kind totals"
            );
        }
        tracing::info!(
            run_id = %self.run_id,
            state = ?self.state,
            sources = self.sources_total,
            sources_failed = self.sources_failed,
            duration_ms = self.duration_ms,
            success_rate = format!("{:.2}%", self.success_rate()),
            "Run finished"
        );

        if !self.errors.is_empty() {
            tracing::warn!(error_count = self.errors.len(), "Run finished with source errors");
            for error in &self.errors {
                tracing::warn!(
                    error_type = ?error.error_type,
                    source = %error.source_path,
                    message = %error.message,
                    "Source error"
                );
            }
        }
    }
}
