//! Collaborator adapters
//!
//! - [`traits`] - the document, item, and export contracts the runner uses
//! - [`manifest`] - JSON manifest document and item provider
//! - [`command`] - exporter that runs an external command per artifact
//!
//! # Design Pattern
//!
//! Adapters isolate host-specific behavior behind traits so the runner can be
//! driven by real integrations or by in-memory fakes in tests. Every failure
//! is classified at this boundary.
//!
//! ```rust,no_run
//! use sheetbatch::adapters::{CommandExporter, ManifestProvider};
//! use sheetbatch::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("sheetbatch.toml")?;
//! let provider = ManifestProvider::new();
//! let exporter = CommandExporter::from_settings(&config.exporter)?;
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod manifest;
pub mod traits;

pub use command::CommandExporter;
pub use manifest::{Manifest, ManifestProvider, ManifestSheet};
pub use traits::{
    export_guarded, DocumentHandle, DocumentProvider, ExportOutcome, ExportRequest, Exporter,
    ItemProvider, KindOptions, OpenedDocument,
};
