//! Integration tests for logging functionality

use sheetbatch::config::LoggingConfig;
use sheetbatch::domain::SourceId;
use sheetbatch::logging::capture::read_entries;
use sheetbatch::logging::{CaptureLevel, ErrorCapture};
use tempfile::TempDir;

#[test]
fn test_logging_config_default() {
    let config = LoggingConfig::default();
    assert!(!config.local_enabled);
    assert_eq!(config.local_path, "logs");
    assert_eq!(config.local_rotation, "daily");
}

#[test]
fn test_error_log_is_append_only_across_runs() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("out").join("errors.jsonl");

    let first = ErrorCapture::new(&log_path);
    first.error(Some("tower-1a2b"), Some("A-101"), "pdf export failed (locked)", Some("file in use"));
    first.warn(Some("tower-1a2b"), None, "Source close failed", None);

    let second = ErrorCapture::new(&log_path);
    second.error(None, None, "Run summary write failed", Some("disk full"));

    let entries = read_entries(&log_path).unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].level, CaptureLevel::Error);
    assert_eq!(entries[0].item_id.as_deref(), Some("A-101"));
    assert_eq!(entries[0].error_detail.as_deref(), Some("file in use"));
    assert_eq!(entries[1].level, CaptureLevel::Warn);
    assert_eq!(entries[2].message, "Run summary write failed");
    assert_eq!(first.entries(), 2);
    assert_eq!(second.sink_failures(), 0);
}

#[test]
fn test_unwritable_error_log_falls_back() {
    let temp_dir = TempDir::new().unwrap();
    // A directory cannot be opened for appending
    let capture = ErrorCapture::new(temp_dir.path());

    capture.error(None, Some("A-1"), "pdf export failed (unknown)", None);

    assert_eq!(capture.entries(), 1);
    assert_eq!(capture.sink_failures(), 1);
}

#[test]
fn test_logging_macros_usage() {
    // The subscriber can only be installed once per process, so this only
    // checks that the macros expand against real types
    let source_id = SourceId::from_path("/models/Tower.json");
    let path = "/models/Tower.json";
    let item = "A-101";

    sheetbatch::log_source_start!(source_id, path);
    sheetbatch::log_item_progress!(3usize, 10usize, item);

    assert!(source_id.as_str().starts_with("tower-"));
}
