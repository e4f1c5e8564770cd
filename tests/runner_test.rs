//! End-to-end tests of the batch runner over in-memory collaborators

mod common;

use common::{
    config, config_with, models, no_shutdown, runner, sheet, Behavior, FakeExporter, FakeProvider,
    FakeSource,
};
use sheetbatch::core::export::{
    artifact_path, RunErrorType, EXIT_INTERRUPTED, EXIT_PARTIAL_FAILURE, EXIT_SUCCESS,
    RUN_SUMMARY_FILE,
};
use sheetbatch::core::report::{regenerate_reports, SourceReport, SourceStatus};
use sheetbatch::core::status::{read_failures, read_progress, RunState};
use sheetbatch::domain::{
    BatchError, DocumentMeta, ExportErrorKind, ExportKind, SourceErrorKind, SourceId,
    SourceIdentity,
};
use sheetbatch::logging::capture::read_entries;
use sheetbatch::logging::ErrorCapture;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::watch;

const TOWER: &str = "/models/Tower.json";
const ANNEX: &str = "/models/Annex.json";

fn tower_items() -> Vec<sheetbatch::domain::ItemDescriptor> {
    vec![
        sheet("A-10", "Sections"),
        sheet("A-2", "Level 1"),
        sheet("A-1", "Ground"),
        sheet("A-3", "Roof"),
        sheet("A-2A", "Level 1 Part"),
    ]
}

fn read_report(root: &std::path::Path, path: &str) -> SourceReport {
    let id = SourceId::from_path(path);
    let file = root
        .join("reports")
        .join("sources")
        .join(format!("{}.json", id.as_str()));
    serde_json::from_str(&std::fs::read_to_string(file).unwrap()).unwrap()
}

#[tokio::test]
async fn test_exports_selected_items_in_natural_order() {
    let out = TempDir::new().unwrap();
    let mut items = tower_items();
    items.push(sheet("B-1", "Skipped").with_attribute(common::FOLDER, "Archive"));
    items.push(sheet("Z-1", "Placeholder").placeholder());
    let provider = Arc::new(FakeProvider::new().with_source(TOWER, FakeSource::with_items(items)));
    let exporter = Arc::new(FakeExporter::new());

    let summary = runner(config(out.path(), true, false), &provider, &exporter, no_shutdown())
        .run(&models(&[TOWER]))
        .await
        .unwrap();

    let order: Vec<String> = exporter.calls().into_iter().map(|(item, _)| item).collect();
    assert_eq!(order, vec!["A-1", "A-2", "A-2A", "A-3", "A-10"]);
    assert_eq!(summary.state, RunState::Completed);
    assert_eq!(summary.exit_code(), EXIT_SUCCESS);

    let report = read_report(out.path(), TOWER);
    assert_eq!(report.status, SourceStatus::Completed);
    assert_eq!(report.selection.total, 6);
    assert_eq!(report.selection.excluded_placeholder, 1);
    assert_eq!(report.selection.matched, 5);
    assert_eq!(report.totals_for(ExportKind::Pdf).success, 5);
}

#[tokio::test]
async fn test_second_run_skips_verified_artifacts() {
    let out = TempDir::new().unwrap();
    let provider = Arc::new(
        FakeProvider::new().with_source(TOWER, FakeSource::with_items(tower_items())),
    );

    let first = Arc::new(FakeExporter::new());
    runner(config(out.path(), true, true), &provider, &first, no_shutdown())
        .run(&models(&[TOWER]))
        .await
        .unwrap();
    assert_eq!(first.call_count(), 10);

    let second = Arc::new(FakeExporter::new());
    let summary = runner(config(out.path(), true, true), &provider, &second, no_shutdown())
        .run(&models(&[TOWER]))
        .await
        .unwrap();

    assert_eq!(second.call_count(), 0);
    let pdf = summary.totals_for(ExportKind::Pdf);
    assert_eq!(pdf.skip, 5);
    assert_eq!(pdf.success, 0);
    assert!(pdf.reconciles());
    assert_eq!(summary.exit_code(), EXIT_SUCCESS);
}

#[tokio::test]
async fn test_deleted_artifact_is_attempted_again() {
    let out = TempDir::new().unwrap();
    let provider = Arc::new(
        FakeProvider::new().with_source(TOWER, FakeSource::with_items(tower_items())),
    );
    let cfg = config(out.path(), true, false);

    runner(cfg.clone(), &provider, &Arc::new(FakeExporter::new()), no_shutdown())
        .run(&models(&[TOWER]))
        .await
        .unwrap();

    let identity = SourceIdentity::infer(TOWER, &DocumentMeta::default(), None);
    let removed = artifact_path(out.path(), &identity, ExportKind::Pdf, &sheet("A-3", "Roof"));
    std::fs::remove_file(&removed).unwrap();

    let exporter = Arc::new(FakeExporter::new());
    runner(cfg, &provider, &exporter, no_shutdown())
        .run(&models(&[TOWER]))
        .await
        .unwrap();

    assert_eq!(exporter.calls(), vec![("A-3".to_string(), ExportKind::Pdf)]);
    assert!(removed.exists());
}

#[tokio::test]
async fn test_overwrite_policy_attempts_everything() {
    let out = TempDir::new().unwrap();
    let provider = Arc::new(
        FakeProvider::new().with_source(TOWER, FakeSource::with_items(tower_items())),
    );

    runner(config(out.path(), true, false), &provider, &Arc::new(FakeExporter::new()), no_shutdown())
        .run(&models(&[TOWER]))
        .await
        .unwrap();

    let exporter = Arc::new(FakeExporter::new());
    runner(
        config_with(out.path(), true, false, "overwrite", "fail"),
        &provider,
        &exporter,
        no_shutdown(),
    )
    .run(&models(&[TOWER]))
    .await
    .unwrap();

    assert_eq!(exporter.call_count(), 5);
    assert!(exporter.seen_overwrite.lock().unwrap().contains(&true));
}

#[tokio::test]
async fn test_partial_failures_reconcile() {
    let out = TempDir::new().unwrap();
    let provider = Arc::new(
        FakeProvider::new().with_source(TOWER, FakeSource::with_items(tower_items())),
    );
    let exporter = Arc::new(
        FakeExporter::new()
            .with("A-2", Behavior::Fail(ExportErrorKind::Locked))
            .with("A-10", Behavior::Fail(ExportErrorKind::AccessDenied)),
    );

    let summary = runner(config(out.path(), true, false), &provider, &exporter, no_shutdown())
        .run(&models(&[TOWER]))
        .await
        .unwrap();

    let pdf = summary.totals_for(ExportKind::Pdf);
    assert_eq!(pdf.selected, 5);
    assert_eq!(pdf.success, 3);
    assert_eq!(pdf.failure, 2);
    assert!(pdf.reconciles());
    assert_eq!(summary.exit_code(), EXIT_PARTIAL_FAILURE);

    let failures = read_failures(&out.path().join("failures.json")).unwrap();
    let rows: Vec<(&str, ExportErrorKind)> = failures
        .rows
        .iter()
        .map(|r| (r.item_number.as_str(), r.error_kind))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("A-2", ExportErrorKind::Locked),
            ("A-10", ExportErrorKind::AccessDenied)
        ]
    );

    let log = read_entries(&out.path().join("errors.jsonl")).unwrap();
    assert!(log.iter().any(|e| e.item_id.as_deref() == Some("A-2")));
}

#[tokio::test]
async fn test_failure_surface_is_cleared_by_success() {
    let out = TempDir::new().unwrap();
    let provider = Arc::new(
        FakeProvider::new().with_source(TOWER, FakeSource::with_items(tower_items())),
    );
    let cfg = config(out.path(), true, false);

    let failing = Arc::new(FakeExporter::new().with("A-1", Behavior::Fail(ExportErrorKind::Locked)));
    runner(cfg.clone(), &provider, &failing, no_shutdown())
        .run(&models(&[TOWER]))
        .await
        .unwrap();
    assert_eq!(read_failures(&out.path().join("failures.json")).unwrap().rows.len(), 1);

    let healthy = Arc::new(FakeExporter::new());
    let summary = runner(cfg, &provider, &healthy, no_shutdown())
        .run(&models(&[TOWER]))
        .await
        .unwrap();

    assert_eq!(healthy.calls(), vec![("A-1".to_string(), ExportKind::Pdf)]);
    assert!(read_failures(&out.path().join("failures.json")).unwrap().rows.is_empty());
    assert_eq!(summary.exit_code(), EXIT_SUCCESS);
}

#[tokio::test]
async fn test_open_failure_is_recorded_and_run_continues() {
    let out = TempDir::new().unwrap();
    let locked = FakeSource {
        open_error: Some(SourceErrorKind::Locked),
        ..FakeSource::default()
    };
    let provider = Arc::new(
        FakeProvider::new()
            .with_source(ANNEX, locked)
            .with_source(TOWER, FakeSource::with_items(tower_items())),
    );
    let exporter = Arc::new(FakeExporter::new());

    let summary = runner(config(out.path(), true, false), &provider, &exporter, no_shutdown())
        .run(&models(&[ANNEX, TOWER]))
        .await
        .unwrap();

    assert_eq!(summary.sources_processed, 2);
    assert_eq!(summary.sources_failed, 1);
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].error_type, RunErrorType::SourceOpen);
    assert_eq!(summary.exit_code(), EXIT_PARTIAL_FAILURE);
    assert_eq!(exporter.call_count(), 5);

    let annex = read_report(out.path(), ANNEX);
    assert_eq!(annex.status, SourceStatus::OpenFailed);
    assert!(annex.open_error.is_some());
    assert!(provider.closed().iter().all(|p| p.as_str() != ANNEX));
}

#[tokio::test]
async fn test_every_opened_source_is_closed() {
    let out = TempDir::new().unwrap();
    let broken = FakeSource {
        list_error: true,
        ..FakeSource::default()
    };
    let provider = Arc::new(
        FakeProvider::new()
            .with_source(ANNEX, broken)
            .with_source(TOWER, FakeSource::with_items(tower_items())),
    );
    let exporter = Arc::new(FakeExporter::new().with("A-1", Behavior::Panic));

    let summary = runner(config(out.path(), true, false), &provider, &exporter, no_shutdown())
        .run(&models(&[ANNEX, TOWER]))
        .await
        .unwrap();

    assert_eq!(provider.opened(), vec![ANNEX, TOWER]);
    assert_eq!(provider.closed(), provider.opened());
    assert!(summary
        .errors
        .iter()
        .any(|e| e.error_type == RunErrorType::ItemListing && e.source_path == ANNEX));
}

#[tokio::test]
async fn test_panicking_exporter_is_contained() {
    let out = TempDir::new().unwrap();
    let provider = Arc::new(
        FakeProvider::new().with_source(TOWER, FakeSource::with_items(tower_items())),
    );
    let exporter = Arc::new(FakeExporter::new().with("A-2", Behavior::Panic));

    let summary = runner(config(out.path(), true, false), &provider, &exporter, no_shutdown())
        .run(&models(&[TOWER]))
        .await
        .unwrap();

    assert_eq!(exporter.call_count(), 5);
    let pdf = summary.totals_for(ExportKind::Pdf);
    assert_eq!(pdf.failure, 1);
    assert_eq!(pdf.success, 4);

    let failures = read_failures(&out.path().join("failures.json")).unwrap();
    assert_eq!(failures.rows[0].item_number, "A-2");
    assert_eq!(failures.rows[0].error_kind, ExportErrorKind::Unknown);
    assert!(failures.rows[0].error_message.contains("panicked"));
}

#[tokio::test]
async fn test_cancellation_stops_between_items() {
    let out = TempDir::new().unwrap();
    let provider = Arc::new(
        FakeProvider::new()
            .with_source(TOWER, FakeSource::with_items(tower_items()))
            .with_source(ANNEX, FakeSource::with_items(vec![sheet("S-1", "Site")])),
    );
    let (tx, rx) = watch::channel(false);
    let exporter = Arc::new(FakeExporter::new().cancel_after(1, tx));
    let cfg = config(out.path(), true, false);

    let summary = runner(cfg.clone(), &provider, &exporter, rx)
        .run(&models(&[TOWER, ANNEX]))
        .await
        .unwrap();

    assert_eq!(exporter.call_count(), 1);
    assert_eq!(summary.state, RunState::Cancelled);
    assert_eq!(summary.exit_code(), EXIT_INTERRUPTED);
    assert_eq!(summary.sources_processed, 1);
    assert_eq!(provider.closed(), vec![TOWER]);

    let report = read_report(out.path(), TOWER);
    assert_eq!(report.status, SourceStatus::Interrupted);
    let pdf = report.totals_for(ExportKind::Pdf);
    assert_eq!(pdf.success, 1);
    assert_eq!(pdf.not_attempted, 4);
    assert!(pdf.reconciles());

    let progress = read_progress(&out.path().join("progress.json")).unwrap();
    assert_eq!(progress.state, RunState::Cancelled);

    let resumed = Arc::new(FakeExporter::new());
    let summary = runner(cfg, &provider, &resumed, no_shutdown())
        .run(&models(&[TOWER, ANNEX]))
        .await
        .unwrap();

    assert_eq!(resumed.call_count(), 5);
    assert_eq!(summary.totals_for(ExportKind::Pdf).skip, 1);
    assert_eq!(summary.state, RunState::Completed);
}

#[tokio::test]
async fn test_undersized_artifact_fails_verification() {
    let out = TempDir::new().unwrap();
    let provider = Arc::new(
        FakeProvider::new().with_source(TOWER, FakeSource::with_items(vec![sheet("A-1", "Ground")])),
    );
    let exporter = Arc::new(FakeExporter::new().with("A-1", Behavior::TooSmall));

    let summary = runner(config(out.path(), true, false), &provider, &exporter, no_shutdown())
        .run(&models(&[TOWER]))
        .await
        .unwrap();

    assert_eq!(summary.totals_for(ExportKind::Pdf).failure, 1);
    let failures = read_failures(&out.path().join("failures.json")).unwrap();
    assert_eq!(failures.rows[0].error_kind, ExportErrorKind::VerificationFailure);
}

#[tokio::test]
async fn test_extra_artifacts_flag_a_violation() {
    let out = TempDir::new().unwrap();
    let provider = Arc::new(
        FakeProvider::new().with_source(TOWER, FakeSource::with_items(vec![sheet("A-1", "Ground")])),
    );
    let exporter = Arc::new(FakeExporter::new().with("A-1", Behavior::ExtraArtifacts));

    let summary = runner(config(out.path(), true, false), &provider, &exporter, no_shutdown())
        .run(&models(&[TOWER]))
        .await
        .unwrap();

    let pdf = summary.totals_for(ExportKind::Pdf);
    assert_eq!(pdf.success, 1);
    assert_eq!(pdf.violations, 1);
    assert_eq!(summary.exit_code(), EXIT_SUCCESS);
}

#[tokio::test]
async fn test_surfaces_and_rollups_are_written() {
    let out = TempDir::new().unwrap();
    let provider = Arc::new(
        FakeProvider::new()
            .with_source(TOWER, FakeSource::with_items(tower_items()).in_group("TWR", "ARCH"))
            .with_source(
                ANNEX,
                FakeSource::with_items(vec![sheet("S-1", "Site")]).in_group("TWR", "STR"),
            ),
    );
    let exporter = Arc::new(FakeExporter::new());

    runner(config(out.path(), true, false), &provider, &exporter, no_shutdown())
        .run(&models(&[TOWER, ANNEX]))
        .await
        .unwrap();

    let progress = read_progress(&out.path().join("progress.json")).unwrap();
    assert_eq!(progress.state, RunState::Completed);
    assert_eq!(progress.sources_done, 2);
    assert!((progress.overall_percent - 100.0).abs() < f64::EPSILON);

    let rollup: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(out.path().join("reports/groups/TWR.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(rollup["overall"]["pdf"]["success"], 6);
    assert_eq!(rollup["subgroups"]["STR"]["totals"]["pdf"]["selected"], 1);

    assert!(out.path().join("reports").join(RUN_SUMMARY_FILE).exists());
    assert!(out
        .path()
        .join("TWR/ARCH/pdf/Tower/A-1 - Ground.pdf")
        .exists());
}

#[tokio::test]
async fn test_corrupt_checkpoint_aborts_under_fail_policy() {
    let out = TempDir::new().unwrap();
    std::fs::write(out.path().join("checkpoint.json"), "{ not json").unwrap();
    let provider = Arc::new(
        FakeProvider::new().with_source(TOWER, FakeSource::with_items(tower_items())),
    );
    let exporter = Arc::new(FakeExporter::new());

    let result = runner(config(out.path(), true, false), &provider, &exporter, no_shutdown())
        .run(&models(&[TOWER]))
        .await;

    assert!(matches!(result, Err(BatchError::CheckpointCorruption { .. })));
    assert!(provider.opened().is_empty());
    assert_eq!(exporter.call_count(), 0);
}

#[tokio::test]
async fn test_corrupt_checkpoint_is_backed_up_when_configured() {
    let out = TempDir::new().unwrap();
    std::fs::write(out.path().join("checkpoint.json"), "{ not json").unwrap();
    let provider = Arc::new(
        FakeProvider::new().with_source(TOWER, FakeSource::with_items(tower_items())),
    );
    let exporter = Arc::new(FakeExporter::new());

    let summary = runner(
        config_with(out.path(), true, false, "resume", "backup_and_restart"),
        &provider,
        &exporter,
        no_shutdown(),
    )
    .run(&models(&[TOWER]))
    .await
    .unwrap();

    assert_eq!(exporter.call_count(), 5);
    assert_eq!(summary.exit_code(), EXIT_SUCCESS);
    let backups = std::fs::read_dir(out.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().contains(".corrupt-"))
        .count();
    assert_eq!(backups, 1);
}

#[tokio::test]
async fn test_reports_regenerate_from_checkpoint() {
    let out = TempDir::new().unwrap();
    let provider = Arc::new(
        FakeProvider::new()
            .with_source(TOWER, FakeSource::with_items(tower_items()).in_group("TWR", "ARCH"))
            .with_source(
                ANNEX,
                FakeSource {
                    open_error: Some(SourceErrorKind::Locked),
                    ..FakeSource::default()
                },
            ),
    );
    let exporter = Arc::new(FakeExporter::new().with("A-2", Behavior::Fail(ExportErrorKind::Locked)));
    let cfg = config(out.path(), true, false);

    runner(cfg.clone(), &provider, &exporter, no_shutdown())
        .run(&models(&[TOWER, ANNEX]))
        .await
        .unwrap();
    let live = read_report(out.path(), TOWER);
    std::fs::remove_dir_all(cfg.output.reports_path()).unwrap();

    let capture = ErrorCapture::tracing_only();
    let reports = regenerate_reports(&cfg, &models(&[TOWER, ANNEX]), provider.as_ref(), provider.as_ref(), &capture)
        .await
        .unwrap();

    assert_eq!(reports.len(), 2);
    assert_eq!(reports[1].status, SourceStatus::OpenFailed);
    let regenerated = read_report(out.path(), TOWER);
    assert_eq!(regenerated.status, SourceStatus::Regenerated);
    let pdf = regenerated.totals_for(ExportKind::Pdf);
    assert_eq!(pdf, live.totals_for(ExportKind::Pdf));
    assert_eq!(pdf.success, 4);
    assert_eq!(pdf.failure, 1);
    assert_eq!(regenerated.rows.len(), live.rows.len());
    assert!(cfg.output.reports_path().join("groups").join("TWR.json").exists());
    assert_eq!(exporter.call_count(), 5);
}

#[tokio::test]
async fn test_items_with_same_trimmed_number_export_once() {
    let out = TempDir::new().unwrap();
    let provider = Arc::new(FakeProvider::new().with_source(
        TOWER,
        FakeSource::with_items(vec![sheet("A-1", "Ground"), sheet(" A-1", "Ground")]),
    ));
    let exporter = Arc::new(FakeExporter::new());

    let summary = runner(config(out.path(), true, false), &provider, &exporter, no_shutdown())
        .run(&models(&[TOWER]))
        .await
        .unwrap();

    assert_eq!(exporter.call_count(), 1);
    let report = read_report(out.path(), TOWER);
    assert_eq!(report.status, SourceStatus::Completed);
    assert_eq!(report.selection.matched, 1);
    assert_eq!(report.selection.excluded_duplicate, 1);
    assert!(report.selection.is_consistent());
    let pdf = report.totals_for(ExportKind::Pdf);
    assert_eq!(pdf.selected, 1);
    assert_eq!(pdf.success, 1);
    assert_eq!(pdf.not_attempted, 0);
    assert!(pdf.reconciles());
    assert_eq!(summary.exit_code(), EXIT_SUCCESS);

    let log = read_entries(&out.path().join("errors.jsonl")).unwrap();
    assert!(log
        .iter()
        .any(|e| e.item_id.as_deref() == Some("A-1") && e.message.contains("repeats")));
}

#[tokio::test]
async fn test_unnamed_items_do_not_claim_each_others_artifacts() {
    let out = TempDir::new().unwrap();
    let provider = Arc::new(FakeProvider::new().with_source(
        TOWER,
        FakeSource::with_items(vec![sheet("A-1", ""), sheet("A-10", ""), sheet("A-11", "")]),
    ));
    let overwrite = config_with(out.path(), true, false, "overwrite", "fail");

    for _ in 0..2 {
        let summary = runner(overwrite.clone(), &provider, &Arc::new(FakeExporter::new()), no_shutdown())
            .run(&models(&[TOWER]))
            .await
            .unwrap();
        let pdf = summary.totals_for(ExportKind::Pdf);
        assert_eq!(pdf.success, 3);
        assert_eq!(pdf.violations, 0);
    }
}

#[tokio::test]
async fn test_failure_surface_carries_earlier_failures_into_next_run() {
    let out = TempDir::new().unwrap();
    let provider = Arc::new(
        FakeProvider::new().with_source(TOWER, FakeSource::with_items(tower_items())),
    );
    let cfg = config(out.path(), true, false);

    let failing = Arc::new(FakeExporter::new().with("A-2", Behavior::Fail(ExportErrorKind::Locked)));
    runner(cfg.clone(), &provider, &failing, no_shutdown())
        .run(&models(&[TOWER]))
        .await
        .unwrap();

    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();
    let idle = Arc::new(FakeExporter::new());
    let summary = runner(cfg, &provider, &idle, rx)
        .run(&models(&[TOWER]))
        .await
        .unwrap();

    assert_eq!(idle.call_count(), 0);
    assert_eq!(summary.state, RunState::Cancelled);
    let failures = read_failures(&out.path().join("failures.json")).unwrap();
    assert_eq!(failures.rows.len(), 1);
    assert_eq!(failures.rows[0].item_number, "A-2");
    assert_eq!(failures.rows[0].source_path, TOWER);
    assert_eq!(failures.rows[0].error_kind, ExportErrorKind::Locked);
    assert_eq!(failures.rows[0].failures, 0);
}
