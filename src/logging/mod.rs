//! Logging and error capture
//!
//! - [`init_logging`] installs the `tracing` subscriber (console plus
//!   optional rotating JSON file)
//! - [`ErrorCapture`] is the structured failure log shared by every
//!   component of a run
//!
//! # Example
//!
//! ```no_run
//! use sheetbatch::logging::{init_logging, ErrorCapture};
//! use sheetbatch::config::LoggingConfig;
//!
//! let _guard = init_logging("info", &LoggingConfig::default()).expect("logging");
//! let capture = ErrorCapture::new("out/errors.jsonl");
//! capture.error(Some("tower-1a2b3c4d5e"), Some("A-101"), "Export failed", Some("locked"));
//! ```

pub mod capture;
pub mod structured;

pub use capture::{CaptureLevel, ErrorCapture, ErrorEntry, SECONDARY_SINK_PREFIX};
pub use structured::{init_logging, LoggingGuard};

/// Log the start of a source
#[macro_export]
macro_rules! log_source_start {
    ($source_id:expr, $path:expr) => {
        tracing::info!(
            source_id = %$source_id,
            path = %$path,
            "Opening source"
        );
    };
}

/// Log one item progress step
#[macro_export]
macro_rules! log_item_progress {
    ($current:expr, $total:expr, $item:expr) => {
        tracing::debug!(
            current = $current,
            total = $total,
            item = %$item,
            progress_pct = if $total == 0 { 100.0 } else { $current as f64 / $total as f64 * 100.0 },
            "Processing item"
        );
    };
}
