//! Report regeneration from the checkpoint
//!
//! Rebuilds every source report and group rollup of a model list from the
//! checkpoint records alone. Sources are opened only to list and select
//! their items; nothing is exported and the checkpoint is not modified.

use super::{rollup_by_group, ReportWriter, SourceReport};
use crate::adapters::traits::{DocumentProvider, ItemProvider};
use crate::config::{CorruptionPolicy, RunConfig};
use crate::core::model_list::ModelList;
use crate::core::selection::SelectionEngine;
use crate::core::state::CheckpointStore;
use crate::domain::{DocumentMeta, Result, SourceIdentity};
use crate::logging::ErrorCapture;
use uuid::Uuid;

/// Rebuilds and writes the reports of every listed source
///
/// # Errors
///
/// Fails when selection inputs cannot be loaded or the checkpoint cannot be
/// read. An unreadable checkpoint is never moved aside here, whatever the
/// configured corruption policy. Sources that fail to open or list get an
/// `open_failed` report.
pub async fn regenerate_reports(
    config: &RunConfig,
    model_list: &ModelList,
    documents: &dyn DocumentProvider,
    items: &dyn ItemProvider,
    capture: &ErrorCapture,
) -> Result<Vec<SourceReport>> {
    let engine = SelectionEngine::prepare(config)?;
    let store = CheckpointStore::open(
        config.output.checkpoint_path(),
        config.export.policy,
        CorruptionPolicy::Fail,
        capture,
    )?;
    let writer = ReportWriter::new(config.output.reports_path());
    let enabled = config.export.enabled_kinds();
    let pattern = config.identity.group_pattern.as_ref();
    let run_id = Uuid::new_v4().to_string();
    let mut reports = Vec::with_capacity(model_list.paths.len());

    for path in &model_list.paths {
        let opened = match documents.open(path).await {
            Ok(opened) => opened,
            Err(e) => {
                let identity = SourceIdentity::infer(path, &DocumentMeta::default(), pattern);
                reports.push(SourceReport::open_failed(&run_id, identity, &e.to_string(), &enabled));
                continue;
            }
        };

        let identity = SourceIdentity::infer(path, &opened.meta, pattern);
        let listed = items.list_items(&opened.handle).await;
        if let Err(e) = documents.close(&opened.handle).await {
            capture.warn(
                Some(identity.source_id.as_str()),
                None,
                "Source close failed",
                Some(&e.to_string()),
            );
        }

        let report = match listed {
            Ok(descriptors) => {
                let selection =
                    engine.select_with(&descriptors, |item, attribute| items.lookup(item, attribute));
                SourceReport::from_checkpoint(&run_id, identity, &selection, &enabled, &store)
            }
            Err(e) => SourceReport::open_failed(&run_id, identity, &e.to_string(), &enabled),
        };
        reports.push(report);
    }

    for report in &reports {
        writer.write_source(report)?;
    }
    for rollup in rollup_by_group(&run_id, reports.iter()).values() {
        writer.write_group(rollup)?;
    }

    tracing::info!(
        sources = reports.len(),
        checkpoint_records = store.len(),
        "Reports regenerated from checkpoint"
    );
    Ok(reports)
}
