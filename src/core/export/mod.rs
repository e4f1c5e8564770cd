//! Export orchestration
//!
//! This module provides the batch export loop for Sheetbatch:
//! - Deterministic artifact naming
//! - Post-export artifact verification
//! - The batch runner state machine
//! - Run summary and exit codes

pub mod naming;
pub mod runner;
pub mod summary;
pub mod verify;

pub use naming::{artifact_dir, artifact_path, artifact_stem, sanitize_component};
pub use runner::{BatchRunner, RUN_SUMMARY_FILE};
pub use summary::{
    RunError, RunErrorType, RunSummary, EXIT_FATAL, EXIT_INTERRUPTED, EXIT_PARTIAL_FAILURE,
    EXIT_SUCCESS,
};
pub use verify::{check_artifact, count_related, exceeds_artifact_bound, ArtifactCheck};
