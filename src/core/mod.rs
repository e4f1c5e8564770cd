//! Core business logic for Sheetbatch.
//!
//! This module contains the batch export orchestration and everything it
//! depends on. Nothing here references a host application; documents, items,
//! and exports are reached through [`crate::adapters::traits`].
//!
//! # Modules
//!
//! - [`model_list`] - Ordered list of source paths
//! - [`ordering`] - Canonical comparator for item numbers
//! - [`selection`] - Ordered work set per source
//! - [`state`] - Checkpoint store for resumable runs
//! - [`status`] - Live progress and failure surfaces
//! - [`report`] - Per-source reports and per-group rollups
//! - [`export`] - Batch runner, naming, verification, and run summary
//! - [`inventory`] - Dry listing of what a run would export
//! - [`prerequisites`] - Pre-run environment checks
//!
//! # Export Workflow
//!
//! 1. **Prepare**: load selection inputs, open the checkpoint store
//! 2. **Open**: open each source in model-list order
//! 3. **Select**: compute the ordered work set
//! 4. **Export**: per item and kind, skip or attempt, then verify
//! 5. **Record**: checkpoint, failure surface, source report
//! 6. **Close**: release the source, whatever happened
//! 7. **Report**: group rollups and run summary
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sheetbatch::adapters::{CommandExporter, ManifestProvider};
//! use sheetbatch::config::load_config;
//! use sheetbatch::core::export::BatchRunner;
//! use sheetbatch::core::model_list::read_model_list;
//! use sheetbatch::logging::ErrorCapture;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("sheetbatch.toml")?;
//! let models = read_model_list(std::path::Path::new("models.txt"))?;
//!
//! let provider = Arc::new(ManifestProvider::new());
//! let exporter = Arc::new(CommandExporter::from_settings(&config.exporter)?);
//! let capture = Arc::new(ErrorCapture::new(config.output.error_log_path()));
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!
//! let runner = BatchRunner::new(config, provider.clone(), provider, exporter, capture, shutdown_rx);
//! let summary = runner.run(&models).await?;
//!
//! println!("Failures: {}", summary.failures());
//! # Ok(())
//! # }
//! ```

pub mod atomic;
pub mod export;
pub mod inventory;
pub mod model_list;
pub mod ordering;
pub mod prerequisites;
pub mod report;
pub mod selection;
pub mod state;
pub mod status;
