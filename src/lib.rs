// Sheetbatch - Resumable Batch Sheet Export
// Copyright (c) 2025 Sheetbatch Contributors
// Licensed under the MIT License

//! # Sheetbatch - Resumable Batch Sheet Export
//!
//! Sheetbatch drives an external document exporter over a list of source
//! models, producing one PDF and/or DWG artifact per selected sheet. Runs are
//! resumable, observable while they execute, and audited after they finish.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Selecting** sheets per source by folder attribute, selection file, or code list
//! - **Ordering** sheets deterministically by a natural item-number key
//! - **Exporting** each sheet-kind through an injected exporter, with verification
//! - **Resuming** interrupted runs from a durable checkpoint store
//! - **Reporting** per source and per group, reconciled against the selection
//!
//! ## Architecture
//!
//! Sheetbatch follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (selection, checkpoint, status, reports, runner)
//! - [`adapters`] - Document, item, and exporter collaborators
//! - [`domain`] - Core domain types and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and error capture
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sheetbatch::adapters::{CommandExporter, ManifestProvider};
//! use sheetbatch::config::load_config;
//! use sheetbatch::core::export::BatchRunner;
//! use sheetbatch::core::model_list::read_model_list;
//! use sheetbatch::logging::ErrorCapture;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("sheetbatch.toml")?;
//!     let models = read_model_list(std::path::Path::new("models.txt"))?;
//!
//!     let provider = Arc::new(ManifestProvider::new());
//!     let exporter = Arc::new(CommandExporter::from_settings(&config.exporter)?);
//!     let capture = Arc::new(ErrorCapture::new(config.output.error_log_path()));
//!     let (_tx, shutdown) = tokio::sync::watch::channel(false);
//!
//!     let runner = BatchRunner::new(config, provider.clone(), provider, exporter, capture, shutdown);
//!     let summary = runner.run(&models).await?;
//!
//!     println!("Exit code: {}", summary.exit_code());
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! ### Resumable Runs
//!
//! Every attempt is recorded in a checkpoint store keyed by source, item, and
//! kind. A resumed run skips an item-kind only when its record says success
//! **and** the artifact is still on disk above the size threshold:
//!
//! ```rust,no_run
//! use sheetbatch::config::{CorruptionPolicy, ResumePolicy};
//! use sheetbatch::core::state::CheckpointStore;
//! use sheetbatch::domain::{ExportKind, SourceId};
//! use sheetbatch::logging::ErrorCapture;
//! use std::path::Path;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let capture = ErrorCapture::tracing_only();
//! let store = CheckpointStore::open(
//!     "out/checkpoint.json",
//!     ResumePolicy::Resume,
//!     CorruptionPolicy::Fail,
//!     &capture,
//! )?;
//! let source = SourceId::from_path("C:/Models/Arch.rvt");
//! let decision = store.decide(&source, "A-101", ExportKind::Pdf, Path::new("out/A-101.pdf"), 1024);
//! println!("skip: {}", decision.is_skip());
//! # Ok(())
//! # }
//! ```
//!
//! ### Natural Ordering
//!
//! ```rust
//! use sheetbatch::core::ordering::sort_numbers;
//!
//! let mut numbers = vec!["A-10", "", "A-2A", "01", "A-2", "1"];
//! sort_numbers(&mut numbers);
//! assert_eq!(numbers, vec!["1", "01", "A-2", "A-2A", "A-10", ""]);
//! ```
//!
//! ## Error Handling
//!
//! Sheetbatch uses the [`domain::BatchError`] type for all errors. Only
//! configuration problems and checkpoint corruption abort a run; every
//! per-item failure becomes a classified attempt result.
//!
//! ## Logging
//!
//! Sheetbatch uses structured logging with the `tracing` crate. Non-fatal
//! failures additionally go through [`logging::ErrorCapture`], which appends
//! one JSON line per entry to the run's error log.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
