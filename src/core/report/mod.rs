//! Audit reports
//!
//! Reports live under `<output root>/<reports dir>/`:
//!
//! - `sources/<source_id>.json`: one [`SourceReport`] per source, rewritten
//!   after every item
//! - `groups/<group>.json`: one [`GroupRollup`] per group, written when the
//!   run ends
//!
//! Every write is an atomic replace. [`regenerate_reports`] rebuilds both
//! from the checkpoint.

pub mod group;
pub mod regenerate;
pub mod source;

pub use group::{rollup_by_group, GroupRollup, SubgroupRollup};
pub use regenerate::regenerate_reports;
pub use source::{KindCell, KindTotals, ReportRow, SourceReport, SourceStatus};

use crate::core::atomic::write_json_atomic;
use crate::core::export::naming::sanitize_component;
use crate::domain::{Result, SourceId};
use std::path::{Path, PathBuf};

/// Writes reports below one reports directory
#[derive(Debug, Clone)]
pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn source_path(&self, source_id: &SourceId) -> PathBuf {
        self.dir
            .join("sources")
            .join(format!("{}.json", source_id.as_str()))
    }

    pub fn group_path(&self, group_id: &str) -> PathBuf {
        self.dir
            .join("groups")
            .join(format!("{}.json", sanitize_component(group_id)))
    }

    /// Replaces the report of one source
    pub fn write_source(&self, report: &SourceReport) -> Result<PathBuf> {
        let path = self.source_path(&report.source.source_id);
        write_json_atomic(&path, report)?;
        Ok(path)
    }

    /// Replaces the rollup of one group
    pub fn write_group(&self, rollup: &GroupRollup) -> Result<PathBuf> {
        let path = self.group_path(&rollup.group_id);
        write_json_atomic(&path, rollup)?;
        Ok(path)
    }
}
