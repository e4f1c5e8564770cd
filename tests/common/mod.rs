//! Shared fakes for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use sheetbatch::adapters::{
    DocumentHandle, DocumentProvider, ExportOutcome, ExportRequest, Exporter, ItemProvider,
    OpenedDocument,
};
use sheetbatch::config::{load_config_str, RunConfig};
use sheetbatch::core::export::BatchRunner;
use sheetbatch::core::model_list::{parse_model_list, ModelList};
use sheetbatch::domain::{
    DocumentMeta, ExportErrorKind, ExportKind, ItemDescriptor, SourceError, SourceErrorKind,
};
use sheetbatch::logging::ErrorCapture;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

pub const FOLDER: &str = "Sheet Folder";
pub const ISSUE: &str = "Issue";

/// A sheet selected by the default folder filter
pub fn sheet(number: &str, name: &str) -> ItemDescriptor {
    ItemDescriptor::new(number, name, format!("id-{number}")).with_attribute(FOLDER, ISSUE)
}

/// Configuration with the folder filter, resume policy, and `fail` on
/// checkpoint corruption
pub fn config(root: &Path, pdf: bool, dwg: bool) -> RunConfig {
    config_with(root, pdf, dwg, "resume", "fail")
}

pub fn config_with(root: &Path, pdf: bool, dwg: bool, policy: &str, corruption: &str) -> RunConfig {
    load_config_str(&format!(
        r#"
schema_version = 1

[selection]
mode = "folder_filter"
filter_parameter = "{FOLDER}"
filter_value = "{ISSUE}"

[export]
policy = "{policy}"

[export.pdf]
enabled = {pdf}
paper_size = "A1"
min_size_bytes = 4

[export.dwg]
enabled = {dwg}
min_size_bytes = 4

[output]
root = "{}"

[state]
corruption_policy = "{corruption}"
"#,
        root.display().to_string().replace('\\', "/")
    ))
    .expect("test configuration must validate")
}

pub fn models(paths: &[&str]) -> ModelList {
    parse_model_list(&paths.join("\n"))
}

/// In-memory source definition
#[derive(Debug, Clone, Default)]
pub struct FakeSource {
    pub meta: DocumentMeta,
    pub items: Vec<ItemDescriptor>,
    pub open_error: Option<SourceErrorKind>,
    pub list_error: bool,
}

impl FakeSource {
    pub fn with_items(items: Vec<ItemDescriptor>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    pub fn in_group(mut self, group: &str, subgroup: &str) -> Self {
        self.meta.group_id = Some(group.to_string());
        self.meta.subgroup_id = Some(subgroup.to_string());
        self
    }
}

/// Document and item provider over in-memory sources
#[derive(Debug, Default)]
pub struct FakeProvider {
    sources: HashMap<String, FakeSource>,
    pub opened: Mutex<Vec<String>>,
    pub closed: Mutex<Vec<String>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, path: &str, source: FakeSource) -> Self {
        self.sources.insert(path.to_string(), source);
        self
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }

    pub fn closed(&self) -> Vec<String> {
        self.closed.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentProvider for FakeProvider {
    async fn open(&self, path: &str) -> Result<OpenedDocument, SourceError> {
        let Some(source) = self.sources.get(path) else {
            return Err(SourceError::new(SourceErrorKind::NotFound, "no such model", path));
        };
        if let Some(kind) = source.open_error {
            return Err(SourceError::new(kind, "model cannot be opened", path));
        }
        self.opened.lock().unwrap().push(path.to_string());
        Ok(OpenedDocument {
            handle: DocumentHandle::new(path),
            meta: source.meta.clone(),
        })
    }

    async fn close(&self, handle: &DocumentHandle) -> Result<(), SourceError> {
        self.closed.lock().unwrap().push(handle.as_str().to_string());
        Ok(())
    }
}

#[async_trait]
impl ItemProvider for FakeProvider {
    async fn list_items(&self, handle: &DocumentHandle) -> Result<Vec<ItemDescriptor>, SourceError> {
        match self.sources.get(handle.as_str()) {
            Some(source) if source.list_error => Err(SourceError::new(
                SourceErrorKind::Unknown,
                "sheet enumeration failed",
                handle.as_str(),
            )),
            Some(source) => Ok(source.items.clone()),
            None => Err(SourceError::new(SourceErrorKind::NotFound, "not open", handle.as_str())),
        }
    }
}

/// How the fake exporter treats one item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Fail(ExportErrorKind),
    Panic,
    TooSmall,
    ExtraArtifacts,
}

/// Exporter that writes small files and records every call
#[derive(Debug, Default)]
pub struct FakeExporter {
    behaviors: HashMap<String, Behavior>,
    pub calls: Mutex<Vec<(String, ExportKind)>>,
    cancel_after: Option<(usize, watch::Sender<bool>)>,
    pub seen_overwrite: Mutex<HashSet<bool>>,
}

impl FakeExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, item: &str, behavior: Behavior) -> Self {
        self.behaviors.insert(item.to_string(), behavior);
        self
    }

    /// Requests cancellation once `calls` exports have been made
    pub fn cancel_after(mut self, calls: usize, sender: watch::Sender<bool>) -> Self {
        self.cancel_after = Some((calls, sender));
        self
    }

    pub fn calls(&self) -> Vec<(String, ExportKind)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Exporter for FakeExporter {
    async fn export(&self, request: ExportRequest<'_>) -> ExportOutcome {
        let item = request.item.display_id().to_string();
        let count = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((item.clone(), request.kind));
            calls.len()
        };
        self.seen_overwrite
            .lock()
            .unwrap()
            .insert(request.options.overwrite);
        if let Some((after, sender)) = &self.cancel_after {
            if count >= *after {
                let _ = sender.send(true);
            }
        }

        let output = request.output_path;
        if let Some(parent) = output.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                return ExportOutcome::from_io(output, &e);
            }
        }

        match self.behaviors.get(&item) {
            Some(Behavior::Fail(kind)) => ExportOutcome::failed(output, *kind, format!("{item} refused")),
            Some(Behavior::Panic) => panic!("exporter crashed on {item}"),
            Some(Behavior::TooSmall) => match std::fs::write(output, b"x") {
                Ok(()) => ExportOutcome::succeeded(output),
                Err(e) => ExportOutcome::from_io(output, &e),
            },
            Some(Behavior::ExtraArtifacts) => {
                let extra = output.with_file_name(format!(
                    "{} (sheet 2).{}",
                    output.file_stem().unwrap().to_string_lossy(),
                    request.kind.extension()
                ));
                let written = std::fs::write(output, b"artifact-bytes")
                    .and_then(|()| std::fs::write(extra, b"artifact-bytes"));
                match written {
                    Ok(()) => ExportOutcome::succeeded(output),
                    Err(e) => ExportOutcome::from_io(output, &e),
                }
            }
            None => match std::fs::write(output, b"artifact-bytes") {
                Ok(()) => ExportOutcome::succeeded(output),
                Err(e) => ExportOutcome::from_io(output, &e),
            },
        }
    }
}

/// Builds a runner over shared fakes
pub fn runner(
    config: RunConfig,
    provider: &Arc<FakeProvider>,
    exporter: &Arc<FakeExporter>,
    shutdown: watch::Receiver<bool>,
) -> BatchRunner {
    let capture = Arc::new(ErrorCapture::new(config.output.error_log_path()));
    BatchRunner::new(
        config,
        provider.clone(),
        provider.clone(),
        exporter.clone(),
        capture,
        shutdown,
    )
}

/// A shutdown receiver that never fires
pub fn no_shutdown() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    std::mem::forget(tx);
    rx
}
