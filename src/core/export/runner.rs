//! Batch runner - the orchestrating state machine
//!
//! Sources are processed strictly in model-list order, one at a time. For
//! every selected item, in ordering-key order, each requested kind goes
//! through `PENDING -> {SKIPPED | ATTEMPTING} -> {SUCCEEDED | FAILED}`.
//!
//! Every attempt result is recorded in the checkpoint store, the failure
//! surface, and the source report before the next attempt starts. A source
//! handle obtained from the document provider is always closed, whatever
//! happened to its items.
//!
//! Cancellation is polled only between items, so the run always stops with
//! consistent state on disk.

use crate::adapters::traits::{
    export_guarded, DocumentHandle, DocumentProvider, ExportRequest, Exporter, ItemProvider,
    KindOptions,
};
use crate::config::RunConfig;
use crate::core::atomic::write_json_atomic;
use crate::core::export::naming::artifact_path;
use crate::core::export::summary::{RunError, RunErrorType, RunSummary};
use crate::core::export::verify::{check_artifact, exceeds_artifact_bound};
use crate::core::model_list::ModelList;
use crate::core::report::{rollup_by_group, ReportWriter, SourceReport, SourceStatus};
use crate::core::selection::{SelectedItem, SelectionEngine};
use crate::core::state::{CheckpointStore, Decision};
use crate::core::status::{FailureSurface, ProgressWriter, RunState};
use crate::domain::{
    AttemptResult, BatchError, DocumentMeta, ExportErrorKind, ExportKind, Result, SourceIdentity,
};
use crate::logging::ErrorCapture;
use crate::{log_item_progress, log_source_start};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use uuid::Uuid;

/// File name of the run summary inside the reports directory
pub const RUN_SUMMARY_FILE: &str = "run_summary.json";

/// Mutable state owned by one run
struct RunContext {
    run_id: String,
    enabled: Vec<ExportKind>,
    selection: SelectionEngine,
    checkpoint: CheckpointStore,
    progress: ProgressWriter,
    failures: FailureSurface,
    reports: ReportWriter,
    summary: RunSummary,
    finished: Vec<SourceReport>,
}

/// Batch runner
pub struct BatchRunner {
    config: RunConfig,
    documents: Arc<dyn DocumentProvider>,
    items: Arc<dyn ItemProvider>,
    exporter: Arc<dyn Exporter>,
    capture: Arc<ErrorCapture>,
    shutdown_signal: watch::Receiver<bool>,
}

impl BatchRunner {
    /// Create a new batch runner
    pub fn new(
        config: RunConfig,
        documents: Arc<dyn DocumentProvider>,
        items: Arc<dyn ItemProvider>,
        exporter: Arc<dyn Exporter>,
        capture: Arc<ErrorCapture>,
        shutdown_signal: watch::Receiver<bool>,
    ) -> Self {
        Self {
            config,
            documents,
            items,
            exporter,
            capture,
            shutdown_signal,
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Runs every source of the model list
    ///
    /// # Errors
    ///
    /// Only failures before the first source is opened abort the run:
    /// unloadable selection inputs, an output root that cannot be created,
    /// or a corrupt checkpoint under the `fail` policy. Everything after
    /// that is recorded and the loop moves on.
    pub async fn run(&self, model_list: &ModelList) -> Result<RunSummary> {
        let start_time = Instant::now();
        let run_id = Uuid::new_v4().to_string();
        let output = &self.config.output;

        for invalid in &model_list.report.invalid_lines {
            self.capture.warn(
                None,
                None,
                format!("Model list line {} ignored", invalid.line_no),
                Some(&invalid.content),
            );
        }

        let selection = SelectionEngine::prepare(&self.config)?;
        std::fs::create_dir_all(&output.root).map_err(|e| {
            BatchError::Io(format!(
                "Cannot create output root {}: {}",
                output.root.display(),
                e
            ))
        })?;
        let checkpoint = CheckpointStore::open(
            output.checkpoint_path(),
            self.config.export.policy,
            self.config.state.corruption_policy,
            &self.capture,
        )?;

        tracing::info!(
            run_id = %run_id,
            sources = model_list.paths.len(),
            mode = ?self.config.selection.mode,
            policy = ?self.config.export.policy,
            checkpoint_records = checkpoint.len(),
            "Starting batch run"
        );

        let failures = FailureSurface::start(
            output.failures_path(),
            &run_id,
            checkpoint.records(),
            &self.capture,
        );
        let mut ctx = RunContext {
            enabled: self.config.export.enabled_kinds(),
            selection,
            checkpoint,
            progress: ProgressWriter::start(
                output.progress_path(),
                &run_id,
                model_list.paths.len(),
                &self.capture,
            ),
            failures,
            reports: ReportWriter::new(output.reports_path()),
            summary: RunSummary::new(&run_id, model_list.paths.len()),
            finished: Vec::new(),
            run_id,
        };

        let mut cancelled = false;
        for path in &model_list.paths {
            if self.is_cancelled() {
                cancelled = true;
                break;
            }

            let report = self.process_source(path, &mut ctx).await;
            cancelled = report.status == SourceStatus::Interrupted;
            ctx.summary.add_source(&report);
            ctx.finished.push(report);

            if cancelled {
                break;
            }
            ctx.progress.finish_source(&self.capture);
        }

        if cancelled {
            tracing::warn!(run_id = %ctx.run_id, "Run cancelled, state persisted");
        }

        self.write_rollups(&ctx);

        let state = if cancelled {
            RunState::Cancelled
        } else {
            RunState::Completed
        };
        ctx.progress.finish(state, &self.capture);
        ctx.summary.finish(state, start_time.elapsed());

        let summary_path = ctx.reports.dir().join(RUN_SUMMARY_FILE);
        if let Err(e) = write_json_atomic(&summary_path, &ctx.summary) {
            self.capture
                .error(None, None, "Run summary write failed", Some(&e.to_string()));
        }

        ctx.summary.log_summary();
        Ok(ctx.summary)
    }

    fn is_cancelled(&self) -> bool {
        *self.shutdown_signal.borrow()
    }

    /// Opens one source, processes it, and closes it
    async fn process_source(&self, path: &str, ctx: &mut RunContext) -> SourceReport {
        let pattern = self.config.identity.group_pattern.as_ref();

        let opened = match self.documents.open(path).await {
            Ok(opened) => opened,
            Err(e) => {
                let identity = SourceIdentity::infer(path, &DocumentMeta::default(), pattern);
                let message = e.to_string();
                self.capture.error(
                    Some(identity.source_id.as_str()),
                    None,
                    "Source could not be opened",
                    Some(&message),
                );
                ctx.summary
                    .add_error(RunError::new(RunErrorType::SourceOpen, path, &message));
                ctx.progress.begin_source(&identity, 0, &self.capture);

                let report = SourceReport::open_failed(&ctx.run_id, identity, &message, &ctx.enabled);
                self.write_report(&report, ctx);
                return report;
            }
        };

        let identity = SourceIdentity::infer(path, &opened.meta, pattern);
        log_source_start!(identity.source_id, identity.path);
        tracing::debug!(
            source_id = %identity.source_id,
            group = %identity.group_id,
            subgroup = %identity.subgroup_id,
            reason = %identity.inference_reason,
            "Source identity inferred"
        );

        let report = self.process_items(path, &opened.handle, identity, ctx).await;

        if let Err(e) = self.documents.close(&opened.handle).await {
            self.capture.warn(
                Some(report.source.source_id.as_str()),
                None,
                "Source close failed",
                Some(&e.to_string()),
            );
        }

        report
    }

    /// Lists, selects, and exports the items of an opened source
    async fn process_items(
        &self,
        path: &str,
        handle: &DocumentHandle,
        identity: SourceIdentity,
        ctx: &mut RunContext,
    ) -> SourceReport {
        let source_id = identity.source_id.clone();

        let descriptors = match self.items.list_items(handle).await {
            Ok(descriptors) => descriptors,
            Err(e) => {
                let message = e.to_string();
                self.capture.error(
                    Some(source_id.as_str()),
                    None,
                    "Item listing failed",
                    Some(&message),
                );
                ctx.summary
                    .add_error(RunError::new(RunErrorType::ItemListing, path, &message));
                ctx.progress.begin_source(&identity, 0, &self.capture);

                let report = SourceReport::open_failed(&ctx.run_id, identity, &message, &ctx.enabled);
                self.write_report(&report, ctx);
                return report;
            }
        };

        let selection = ctx
            .selection
            .select_with(&descriptors, |item, attribute| self.items.lookup(item, attribute));

        tracing::info!(
            source_id = %source_id,
            total = selection.stats.total,
            placeholders = selection.stats.excluded_placeholder,
            matched = selection.stats.matched,
            missing_attribute = selection.stats.missing_attribute,
            empty_attribute = selection.stats.empty_attribute,
            excluded = selection.stats.excluded,
            duplicates = selection.stats.excluded_duplicate,
            "Selection computed"
        );
        for item in &selection.duplicate_items {
            self.capture.warn(
                Some(source_id.as_str()),
                Some(item),
                "Item number repeats an earlier selected item; excluded",
                None,
            );
        }
        for key in &selection.missing_reference_keys {
            self.capture.warn(
                Some(source_id.as_str()),
                Some(key),
                "Selection file entry has no matching item in this source",
                None,
            );
        }
        for item in &selection.missing_attribute_items {
            self.capture.warn(
                Some(source_id.as_str()),
                Some(item),
                format!(
                    "Item has no '{}' attribute",
                    self.config.selection.code_parameter
                ),
                None,
            );
        }

        let mut report = SourceReport::new(&ctx.run_id, identity.clone(), &selection, &ctx.enabled);
        self.write_report(&report, ctx);

        let total = selection.ordered_items.len();
        ctx.progress.begin_source(&identity, total, &self.capture);

        for (index, selected) in selection.ordered_items.iter().enumerate() {
            if self.is_cancelled() {
                tracing::warn!(
                    source_id = %source_id,
                    remaining = total - index,
                    "Cancellation requested, stopping before next item"
                );
                report.finalize(SourceStatus::Interrupted);
                self.write_report(&report, ctx);
                return report;
            }

            let item_id = selected.descriptor.display_id();
            let position = index + 1;
            log_item_progress!(position, total, item_id);
            ctx.progress.begin_item(item_id, &self.capture);

            for kind in &selected.kinds {
                let result = self
                    .attempt(path, handle, &identity, selected, *kind, &ctx.checkpoint)
                    .await;
                self.record(&result, &identity, &mut report, ctx);
            }
            self.write_report(&report, ctx);
        }

        report.finalize(SourceStatus::Completed);
        self.write_report(&report, ctx);
        tracing::info!(
            source_id = %source_id,
            items = total,
            "Source completed"
        );
        report
    }

    /// Decides, exports, and verifies one item-kind
    async fn attempt(
        &self,
        path: &str,
        handle: &DocumentHandle,
        identity: &SourceIdentity,
        selected: &SelectedItem,
        kind: ExportKind,
        checkpoint: &CheckpointStore,
    ) -> AttemptResult {
        let item = &selected.descriptor;
        let item_number = item.display_id();
        let settings = self.config.export.kind(kind);
        let expected = artifact_path(&self.config.output.root, identity, kind, item);

        match checkpoint.decide(
            &identity.source_id,
            item_number,
            kind,
            &expected,
            settings.min_size_bytes,
        ) {
            Decision::Skip => {
                tracing::debug!(
                    source_id = %identity.source_id,
                    item = %item_number,
                    kind = %kind,
                    "Verified artifact present, skipping"
                );
                return AttemptResult::skipped(
                    identity.source_id.clone(),
                    item_number,
                    item.name.clone(),
                    kind,
                    expected.to_string_lossy(),
                );
            }
            Decision::Attempt(reason) => {
                tracing::debug!(
                    source_id = %identity.source_id,
                    item = %item_number,
                    kind = %kind,
                    reason = reason.as_str(),
                    "Exporting"
                );
            }
        }

        let options = KindOptions::from_settings(settings, self.config.export.policy);
        let request = ExportRequest {
            handle,
            source_path: path,
            item,
            kind,
            output_path: &expected,
            options: &options,
        };
        let (outcome, elapsed) = export_guarded(self.exporter.as_ref(), request).await;

        let mut result = AttemptResult {
            source_id: identity.source_id.clone(),
            item_number: item_number.to_string(),
            item_name: item.name.clone(),
            kind,
            success: outcome.success,
            output_path: outcome.output_path.to_string_lossy().into_owned(),
            skipped: false,
            duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            error_kind: outcome.error_kind,
            error_message: outcome.error_message,
            violation: outcome.violation,
        };

        if result.success {
            let check = check_artifact(&outcome.output_path, settings.min_size_bytes);
            if !check.is_ok() {
                result.success = false;
                result.error_kind = Some(ExportErrorKind::VerificationFailure);
                result.error_message = Some(check.describe(&outcome.output_path));
            } else if exceeds_artifact_bound(&outcome.output_path, settings.max_artifacts) {
                result.violation = true;
            }
        } else if result.error_kind.is_none() {
            result.error_kind = Some(ExportErrorKind::Unknown);
        }

        result
    }

    /// Routes one result to checkpoint, failure surface, report, and log
    fn record(
        &self,
        result: &AttemptResult,
        identity: &SourceIdentity,
        report: &mut SourceReport,
        ctx: &mut RunContext,
    ) {
        let source_id = result.source_id.as_str();

        if let Err(e) = ctx.checkpoint.record(result, &identity.path) {
            self.capture.error(
                Some(source_id),
                Some(&result.item_number),
                "Checkpoint write failed",
                Some(&e.to_string()),
            );
        }
        ctx.failures.observe(result, &identity.path, &self.capture);
        report.apply(result);

        if result.is_failure() {
            let kind = result.error_kind.unwrap_or(ExportErrorKind::Unknown);
            self.capture.error(
                Some(source_id),
                Some(&result.item_number),
                format!("{} export failed ({})", result.kind, kind),
                result.error_message.as_deref(),
            );
        } else if result.violation {
            self.capture.warn(
                Some(source_id),
                Some(&result.item_number),
                format!("{} export produced more artifacts than expected", result.kind),
                Some(&result.output_path),
            );
        } else if !result.skipped {
            tracing::info!(
                source_id = %source_id,
                item = %result.item_number,
                kind = %result.kind,
                duration_ms = result.duration_ms,
                "Exported"
            );
        }
    }

    fn write_report(&self, report: &SourceReport, ctx: &RunContext) {
        if let Err(e) = ctx.reports.write_source(report) {
            self.capture.error(
                Some(report.source.source_id.as_str()),
                None,
                "Source report write failed",
                Some(&e.to_string()),
            );
        }
    }

    fn write_rollups(&self, ctx: &RunContext) {
        for rollup in rollup_by_group(&ctx.run_id, ctx.finished.iter()).values() {
            if let Err(e) = ctx.reports.write_group(rollup) {
                self.capture.error(
                    None,
                    None,
                    format!("Group report write failed for '{}'", rollup.group_id),
                    Some(&e.to_string()),
                );
            }
        }
    }
}
