//! Group and subgroup rollups

use crate::core::report::source::{KindTotals, SourceReport, SourceStatus};
use crate::domain::ExportKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Totals for one subgroup of a group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubgroupRollup {
    pub sources: Vec<String>,
    pub open_failures: usize,
    pub totals: BTreeMap<ExportKind, KindTotals>,
}

/// Totals for one group, per subgroup and overall
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRollup {
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub group_id: String,
    pub subgroups: BTreeMap<String, SubgroupRollup>,
    pub overall: BTreeMap<ExportKind, KindTotals>,
}

impl GroupRollup {
    pub fn new(run_id: &str, group_id: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            generated_at: Utc::now(),
            group_id: group_id.to_string(),
            subgroups: BTreeMap::new(),
            overall: BTreeMap::new(),
        }
    }

    /// Adds one source report to its subgroup and to the overall totals
    pub fn add(&mut self, report: &SourceReport) {
        let subgroup = self
            .subgroups
            .entry(report.source.subgroup_id.clone())
            .or_default();
        subgroup.sources.push(report.source.source_id.to_string());
        if report.status == SourceStatus::OpenFailed {
            subgroup.open_failures += 1;
        }
        for (kind, totals) in &report.totals {
            subgroup.totals.entry(*kind).or_default().add(totals);
            self.overall.entry(*kind).or_default().add(totals);
        }
        self.generated_at = Utc::now();
    }

    pub fn overall_for(&self, kind: ExportKind) -> KindTotals {
        self.overall.get(&kind).copied().unwrap_or_default()
    }
}

/// Builds one rollup per group, keyed by group id
pub fn rollup_by_group<'a>(run_id: &str, reports: impl IntoIterator<Item = &'a SourceReport>) -> BTreeMap<String, GroupRollup> {
    let mut groups: BTreeMap<String, GroupRollup> = BTreeMap::new();
    for report in reports {
        groups
            .entry(report.source.group_id.clone())
            .or_insert_with(|| GroupRollup::new(run_id, &report.source.group_id))
            .add(report);
    }
    groups
}
