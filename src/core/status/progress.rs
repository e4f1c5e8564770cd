//! Progress surface
//!
//! A single JSON document describing where the run is. It is replaced
//! atomically on every update so readers always parse a complete document.

use crate::core::atomic::write_json_atomic;
use crate::domain::{BatchError, Result, SourceIdentity};
use crate::logging::ErrorCapture;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Lifecycle of a run as seen by readers of the progress surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Running,
    Completed,
    Cancelled,
}

/// Contents of the progress surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressState {
    pub run_id: String,
    pub state: RunState,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub current_source: Option<String>,
    pub current_source_id: Option<String>,
    pub current_item: Option<String>,
    pub sources_done: usize,
    pub sources_total: usize,
    /// Items started in the current source
    pub items_done: usize,
    /// Selected items in the current source
    pub items_total: usize,
    /// Completion of the current source, 0-100
    pub percent: f64,
    /// Completion of the whole run, 0-100
    pub overall_percent: f64,
}

impl ProgressState {
    fn new(run_id: &str, sources_total: usize) -> Self {
        let now = Utc::now();
        Self {
            run_id: run_id.to_string(),
            state: RunState::Running,
            started_at: now,
            updated_at: now,
            current_source: None,
            current_source_id: None,
            current_item: None,
            sources_done: 0,
            sources_total,
            items_done: 0,
            items_total: 0,
            percent: 0.0,
            overall_percent: 0.0,
        }
    }

    fn recompute(&mut self) {
        self.percent = percentage(self.items_done, self.items_total);
        let source_fraction = if self.items_total == 0 {
            0.0
        } else {
            self.items_done as f64 / self.items_total as f64
        };
        self.overall_percent = if self.sources_total == 0 {
            100.0
        } else {
            ((self.sources_done as f64 + source_fraction) / self.sources_total as f64 * 100.0)
                .min(100.0)
        };
        self.updated_at = Utc::now();
    }
}

fn percentage(done: usize, total: usize) -> f64 {
    if total == 0 {
        100.0
    } else {
        (done as f64 / total as f64 * 100.0).min(100.0)
    }
}

/// Writer for the progress surface
///
/// Owned by the batch runner; write failures go to the error capture and
/// never stop the run.
#[derive(Debug)]
pub struct ProgressWriter {
    path: PathBuf,
    state: ProgressState,
}

impl ProgressWriter {
    /// Starts a run and writes the initial document
    pub fn start(path: impl Into<PathBuf>, run_id: &str, sources_total: usize, capture: &ErrorCapture) -> Self {
        let writer = Self {
            path: path.into(),
            state: ProgressState::new(run_id, sources_total),
        };
        writer.write(capture);
        writer
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    /// Moves to a new source
    pub fn begin_source(&mut self, identity: &SourceIdentity, items_total: usize, capture: &ErrorCapture) {
        self.state.current_source = Some(identity.path.clone());
        self.state.current_source_id = Some(identity.source_id.to_string());
        self.state.current_item = None;
        self.state.items_done = 0;
        self.state.items_total = items_total;
        self.state.recompute();
        self.write(capture);
    }

    /// Records that an item is being processed
    pub fn begin_item(&mut self, item_id: &str, capture: &ErrorCapture) {
        self.state.current_item = Some(item_id.to_string());
        self.state.items_done = (self.state.items_done + 1).min(self.state.items_total);
        self.state.recompute();
        self.write(capture);
    }

    /// Marks the current source as finished, whatever its outcome
    pub fn finish_source(&mut self, capture: &ErrorCapture) {
        self.state.sources_done = (self.state.sources_done + 1).min(self.state.sources_total);
        self.state.current_item = None;
        self.state.items_done = self.state.items_total;
        self.state.recompute();
        self.write(capture);
    }

    /// Writes the terminal state
    pub fn finish(&mut self, state: RunState, capture: &ErrorCapture) {
        self.state.state = state;
        self.state.current_item = None;
        if state == RunState::Completed {
            self.state.current_source = None;
            self.state.current_source_id = None;
        }
        self.state.recompute();
        self.write(capture);
    }

    fn write(&self, capture: &ErrorCapture) {
        if let Err(e) = write_json_atomic(&self.path, &self.state) {
            capture.error(
                self.state.current_source_id.as_deref(),
                self.state.current_item.as_deref(),
                "Progress surface write failed",
                Some(&e.to_string()),
            );
        }
    }
}

/// Reads a progress surface
pub fn read_progress(path: &Path) -> Result<ProgressState> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| BatchError::StatusWrite(format!("Cannot read {}: {}", path.display(), e)))?;
    Ok(serde_json::from_str(&text)?)
}
