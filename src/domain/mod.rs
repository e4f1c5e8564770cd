//! Domain models and types for sheetbatch.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Identifiers** ([`SourceId`]) derived deterministically from source paths
//! - **Work items** ([`ItemDescriptor`]) handed over by the item provider
//! - **Source identity** ([`SourceIdentity`]) with `Unknown` fallbacks
//! - **Attempt results** ([`AttemptResult`]) and their classification
//! - **Error types** ([`BatchError`], [`ConfigError`], [`ParseError`])
//! - **Result type alias** ([`Result`])
//!
//! # Example
//!
//! ```rust
//! use sheetbatch::domain::{ItemDescriptor, SourceId};
//!
//! let source = SourceId::from_path("/models/Tower.json");
//! let item = ItemDescriptor::new("A-101", "Ground Floor Plan", "sheet-1")
//!     .with_attribute("Sheet Folder", "Issue");
//! assert_eq!(item.display_id(), "A-101");
//! assert!(source.as_str().starts_with("tower-"));
//! ```

pub mod attempt;
pub mod errors;
pub mod ids;
pub mod item;
pub mod result;
pub mod source;

pub use attempt::{AttemptResult, ExportErrorKind, ExportKind};
pub use errors::{
    BatchError, ConfigError, ConfigIssue, ParseError, SourceError, SourceErrorKind,
};
pub use ids::{SourceId, UNKNOWN};
pub use item::ItemDescriptor;
pub use result::Result;
pub use source::{DocumentMeta, InferenceReason, SourceIdentity};
