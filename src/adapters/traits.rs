//! Collaborator traits
//!
//! The batch runner only talks to the outside world through these three
//! traits. Implementations own every host-specific type; the core sees an
//! opaque [`DocumentHandle`] and [`ItemDescriptor`]s.

use crate::config::{KindSettings, ResumePolicy};
use crate::domain::{DocumentMeta, ExportErrorKind, ExportKind, ItemDescriptor, SourceError};
use async_trait::async_trait;
use futures::FutureExt;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Opaque reference to an opened document, minted by the provider
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentHandle(String);

impl DocumentHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A successfully opened document
#[derive(Debug, Clone)]
pub struct OpenedDocument {
    pub handle: DocumentHandle,
    pub meta: DocumentMeta,
}

/// Opens and closes source documents
///
/// Once `open` has returned a handle, the runner calls `close` for it exactly
/// once, whatever happens in between.
#[async_trait]
pub trait DocumentProvider: Send + Sync {
    /// Open the document at `path`
    ///
    /// # Errors
    ///
    /// Returns a classified [`SourceError`] carrying the path.
    async fn open(&self, path: &str) -> Result<OpenedDocument, SourceError>;

    /// Release an opened document
    ///
    /// # Errors
    ///
    /// A close failure is logged by the runner and never stops the run.
    async fn close(&self, handle: &DocumentHandle) -> Result<(), SourceError>;
}

/// Enumerates the items of an opened document
#[async_trait]
pub trait ItemProvider: Send + Sync {
    /// List every item of the document, placeholders included
    ///
    /// # Errors
    ///
    /// Returns a classified [`SourceError`] when enumeration fails.
    async fn list_items(&self, handle: &DocumentHandle) -> Result<Vec<ItemDescriptor>, SourceError>;

    /// Look up one selection attribute of an item
    ///
    /// Defaults to the descriptor's own attribute map.
    fn lookup(&self, item: &ItemDescriptor, attribute: &str) -> Option<String> {
        item.selection_attributes.get(attribute).cloned()
    }
}

/// Kind-specific options handed to the exporter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KindOptions {
    pub paper_size: Option<String>,
    pub setup_name: Option<String>,
    /// Existing artifacts are to be replaced
    pub overwrite: bool,
}

impl KindOptions {
    pub fn from_settings(settings: &KindSettings, policy: ResumePolicy) -> Self {
        Self {
            paper_size: settings.paper_size.clone(),
            setup_name: settings.setup_name.clone(),
            overwrite: policy == ResumePolicy::Overwrite,
        }
    }

    /// `key=value` pairs joined with `;`, for command-line exporters
    pub fn to_arg_string(&self) -> String {
        let mut parts = Vec::new();
        if let Some(paper) = &self.paper_size {
            parts.push(format!("paper_size={paper}"));
        }
        if let Some(setup) = &self.setup_name {
            parts.push(format!("setup_name={setup}"));
        }
        parts.push(format!("overwrite={}", self.overwrite));
        parts.join(";")
    }
}

/// One export request
#[derive(Debug, Clone, Copy)]
pub struct ExportRequest<'a> {
    pub handle: &'a DocumentHandle,
    pub source_path: &'a str,
    pub item: &'a ItemDescriptor,
    pub kind: ExportKind,
    pub output_path: &'a Path,
    pub options: &'a KindOptions,
}

/// Classified outcome of one export call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutcome {
    pub success: bool,
    pub output_path: PathBuf,
    pub error_kind: Option<ExportErrorKind>,
    pub error_message: Option<String>,
    pub violation: bool,
}

impl ExportOutcome {
    pub fn succeeded(output_path: impl Into<PathBuf>) -> Self {
        Self {
            success: true,
            output_path: output_path.into(),
            error_kind: None,
            error_message: None,
            violation: false,
        }
    }

    pub fn failed(output_path: impl Into<PathBuf>, kind: ExportErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            output_path: output_path.into(),
            error_kind: Some(kind),
            error_message: Some(message.into()),
            violation: false,
        }
    }

    pub fn from_io(output_path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        Self::failed(output_path, ExportErrorKind::from_io(err), err.to_string())
    }
}

/// Produces one artifact per call
///
/// Implementations classify their own failures into [`ExportOutcome`];
/// nothing is expected to escape. [`export_guarded`] still contains panics.
#[async_trait]
pub trait Exporter: Send + Sync {
    async fn export(&self, request: ExportRequest<'_>) -> ExportOutcome;
}

/// Calls the exporter, timing it and turning a panic into a failed outcome
pub async fn export_guarded(exporter: &dyn Exporter, request: ExportRequest<'_>) -> (ExportOutcome, Duration) {
    let started = Instant::now();
    let outcome = match AssertUnwindSafe(exporter.export(request)).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic payload".to_string());
            ExportOutcome::failed(
                request.output_path,
                ExportErrorKind::Unknown,
                format!("exporter panicked: {message}"),
            )
        }
    };
    (outcome, started.elapsed())
}
