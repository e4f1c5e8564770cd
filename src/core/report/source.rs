//! Per-source report
//!
//! A [`SourceReport`] is seeded with the selected items of one source and
//! updated with each attempt result. Every selected `(item, kind)` is in
//! exactly one bucket, so for each kind
//! `selected == success + skip + failure + not_attempted`.

use crate::core::selection::{SelectionResult, SelectionStats};
use crate::core::state::{CheckpointStatus, CheckpointStore};
use crate::domain::{AttemptResult, ExportErrorKind, ExportKind, SourceIdentity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How far processing of a source got
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    /// Items are still being processed
    InProgress,
    /// Every selected item was processed
    Completed,
    /// The run was cancelled before the source finished
    Interrupted,
    /// The document provider could not open the source
    OpenFailed,
    /// Regenerated from checkpoint records
    Regenerated,
}

/// Outcome of one kind for one item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KindCell {
    pub success: bool,
    pub skipped: bool,
    pub duration_ms: u64,
    pub output_path: String,
    pub error_kind: Option<ExportErrorKind>,
    pub error_message: Option<String>,
    pub violation: bool,
}

impl From<&AttemptResult> for KindCell {
    fn from(result: &AttemptResult) -> Self {
        Self {
            success: result.success,
            skipped: result.skipped,
            duration_ms: result.duration_ms,
            output_path: result.output_path.clone(),
            error_kind: result.error_kind,
            error_message: result.error_message.clone(),
            violation: result.violation,
        }
    }
}

/// One report row per selected item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub source_id: String,
    pub group_id: String,
    pub subgroup_id: String,
    pub item_number: String,
    pub item_name: String,
    /// Requested kinds; a kind without a cell was not attempted
    pub kinds: Vec<ExportKind>,
    pub results: BTreeMap<ExportKind, KindCell>,
}

/// Counters for one kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindTotals {
    pub selected: usize,
    pub success: usize,
    pub skip: usize,
    pub failure: usize,
    pub not_attempted: usize,
    pub violations: usize,
}

impl KindTotals {
    pub fn add(&mut self, other: &KindTotals) {
        self.selected += other.selected;
        self.success += other.success;
        self.skip += other.skip;
        self.failure += other.failure;
        self.not_attempted += other.not_attempted;
        self.violations += other.violations;
    }

    /// True when every selected pair is in exactly one bucket
    pub fn reconciles(&self) -> bool {
        self.selected == self.success + self.skip + self.failure + self.not_attempted
    }
}

/// Report for one source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceReport {
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub source: SourceIdentity,
    pub status: SourceStatus,
    pub open_error: Option<String>,
    pub selection: SelectionStats,
    pub missing_reference_keys: Vec<String>,
    pub totals: BTreeMap<ExportKind, KindTotals>,
    pub rows: Vec<ReportRow>,
}

impl SourceReport {
    /// Seeds a report with the ordered selection
    pub fn new(run_id: &str, source: SourceIdentity, selection: &SelectionResult, enabled: &[ExportKind]) -> Self {
        let rows = selection
            .ordered_items
            .iter()
            .map(|item| ReportRow {
                source_id: source.source_id.to_string(),
                group_id: source.group_id.clone(),
                subgroup_id: source.subgroup_id.clone(),
                item_number: item.descriptor.display_id().to_string(),
                item_name: item.descriptor.name.clone(),
                kinds: item.kinds.clone(),
                results: BTreeMap::new(),
            })
            .collect();

        let mut report = Self {
            run_id: run_id.to_string(),
            generated_at: Utc::now(),
            source,
            status: SourceStatus::InProgress,
            open_error: None,
            selection: selection.stats,
            missing_reference_keys: selection.missing_reference_keys.clone(),
            totals: enabled.iter().map(|k| (*k, KindTotals::default())).collect(),
            rows,
        };
        report.recompute();
        report
    }

    /// Report for a source the provider could not open
    pub fn open_failed(run_id: &str, source: SourceIdentity, error: &str, enabled: &[ExportKind]) -> Self {
        let mut report = Self::new(run_id, source, &SelectionResult::default(), enabled);
        report.status = SourceStatus::OpenFailed;
        report.open_error = Some(error.to_string());
        report
    }

    /// Rebuilds a report from checkpoint records
    ///
    /// Skips are not stored in the checkpoint, so verified earlier successes
    /// count as `success` here.
    pub fn from_checkpoint(
        run_id: &str,
        source: SourceIdentity,
        selection: &SelectionResult,
        enabled: &[ExportKind],
        store: &CheckpointStore,
    ) -> Self {
        let mut report = Self::new(run_id, source, selection, enabled);
        let source_id = report.source.source_id.clone();
        for row in &mut report.rows {
            for kind in &row.kinds {
                if let Some(record) = store.get(&source_id, &row.item_number, *kind) {
                    row.results.insert(
                        *kind,
                        KindCell {
                            success: record.status == CheckpointStatus::Success,
                            skipped: false,
                            duration_ms: record.duration_ms,
                            output_path: record.output_path.clone(),
                            error_kind: record.error_kind,
                            error_message: record.last_error.clone(),
                            violation: record.violation,
                        },
                    );
                }
            }
        }
        report.status = SourceStatus::Regenerated;
        report.recompute();
        report
    }

    /// Applies one attempt result to its row
    ///
    /// Results for items or kinds outside the selection are ignored.
    pub fn apply(&mut self, result: &AttemptResult) {
        let row = self
            .rows
            .iter_mut()
            .find(|row| row.item_number == result.item_number);
        match row {
            Some(row) if row.kinds.contains(&result.kind) => {
                row.results.insert(result.kind, KindCell::from(result));
            }
            _ => {
                tracing::debug!(
                    item = %result.item_number,
                    kind = %result.kind,
                    "Ignoring result outside the selection"
                );
                return;
            }
        }
        self.recompute();
    }

    /// Sets the final status
    pub fn finalize(&mut self, status: SourceStatus) {
        self.status = status;
        self.recompute();
    }

    pub fn totals_for(&self, kind: ExportKind) -> KindTotals {
        self.totals.get(&kind).copied().unwrap_or_default()
    }

    fn recompute(&mut self) {
        for totals in self.totals.values_mut() {
            *totals = KindTotals::default();
        }
        for row in &self.rows {
            for kind in &row.kinds {
                let totals = self.totals.entry(*kind).or_default();
                totals.selected += 1;
                match row.results.get(kind) {
                    None => totals.not_attempted += 1,
                    Some(cell) if cell.skipped => totals.skip += 1,
                    Some(cell) if cell.success => totals.success += 1,
                    Some(_) => totals.failure += 1,
                }
                if row.results.get(kind).is_some_and(|cell| cell.violation) {
                    totals.violations += 1;
                }
            }
        }
        self.generated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::selection::SelectedItem;
    use crate::domain::{DocumentMeta, ItemDescriptor, SourceId};

    fn identity() -> SourceIdentity {
        SourceIdentity::infer("/m/tower.json", &DocumentMeta::default(), None)
    }

    fn selection(count: usize) -> SelectionResult {
        SelectionResult {
            ordered_items: (1..=count)
                .map(|i| SelectedItem {
                    descriptor: ItemDescriptor::new(format!("A-{i}"), "Plan", format!("id-{i}")),
                    kinds: vec![ExportKind::Pdf],
                    priority: None,
                    notes: None,
                })
                .collect(),
            stats: SelectionStats {
                total: count,
                matched: count,
                ..SelectionStats::default()
            },
            ..SelectionResult::default()
        }
    }

    fn attempt(source: &SourceId, number: &str, success: bool) -> AttemptResult {
        AttemptResult {
            source_id: source.clone(),
            item_number: number.to_string(),
            item_name: "Plan".to_string(),
            kind: ExportKind::Pdf,
            success,
            output_path: format!("/out/{number}.pdf"),
            skipped: false,
            duration_ms: 3,
            error_kind: (!success).then_some(ExportErrorKind::Locked),
            error_message: (!success).then(|| "locked".to_string()),
            violation: false,
        }
    }

    #[test]
    fn test_five_selected_three_succeed_two_fail() {
        let identity = identity();
        let source = identity.source_id.clone();
        let mut report = SourceReport::new("run-1", identity, &selection(5), &[ExportKind::Pdf]);

        for (number, ok) in [("A-1", true), ("A-2", false), ("A-3", true), ("A-4", true), ("A-5", false)] {
            report.apply(&attempt(&source, number, ok));
        }
        report.finalize(SourceStatus::Completed);

        let totals = report.totals_for(ExportKind::Pdf);
        assert_eq!(totals.selected, 5);
        assert_eq!(totals.success, 3);
        assert_eq!(totals.failure, 2);
        assert_eq!(totals.skip, 0);
        assert_eq!(totals.not_attempted, 0);
        assert!(totals.reconciles());
    }

    #[test]
    fn test_interrupted_report_counts_not_attempted() {
        let identity = identity();
        let source = identity.source_id.clone();
        let mut report = SourceReport::new("run-1", identity, &selection(3), &[ExportKind::Pdf]);
        report.apply(&AttemptResult::skipped(source, "A-1", "Plan", ExportKind::Pdf, "/out/A-1.pdf"));
        report.finalize(SourceStatus::Interrupted);

        let totals = report.totals_for(ExportKind::Pdf);
        assert_eq!(totals.skip, 1);
        assert_eq!(totals.not_attempted, 2);
        assert!(totals.reconciles());
    }

    #[test]
    fn test_results_outside_selection_are_ignored() {
        let identity = identity();
        let source = identity.source_id.clone();
        let mut report = SourceReport::new("run-1", identity, &selection(1), &[ExportKind::Pdf]);
        report.apply(&attempt(&source, "Z-9", true));
        assert_eq!(report.totals_for(ExportKind::Pdf).not_attempted, 1);
    }

    #[test]
    fn test_open_failed_report() {
        let report = SourceReport::open_failed("run-1", identity(), "locked", &[ExportKind::Pdf]);
        assert_eq!(report.status, SourceStatus::OpenFailed);
        assert_eq!(report.totals_for(ExportKind::Pdf).selected, 0);
        assert_eq!(report.open_error.as_deref(), Some("locked"));
    }
}
