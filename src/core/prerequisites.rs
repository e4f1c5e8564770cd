//! Prerequisite validation
//!
//! Checks everything an export run needs before any source is opened. Each
//! check is independent; a failing check never stops the others.

use crate::config::{RunConfig, SelectionMode};
use crate::core::model_list::ModelList;
use crate::core::selection::SelectionEngine;
use crate::core::state::CheckpointStore;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Outcome of one prerequisite check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrerequisiteCheck {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

impl PrerequisiteCheck {
    fn pass(name: &str, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            detail: detail.into(),
        }
    }

    fn fail(name: &str, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            detail: detail.into(),
        }
    }
}

/// True when every check passed
pub fn all_passed(checks: &[PrerequisiteCheck]) -> bool {
    checks.iter().all(|check| check.passed)
}

/// Runs every prerequisite check
pub fn check_prerequisites(config: &RunConfig, model_list: &ModelList) -> Vec<PrerequisiteCheck> {
    let mut checks = vec![check_model_list(model_list)];
    checks.extend(model_list.paths.iter().map(|path| check_source(path)));
    checks.push(check_output_root(&config.output.root));
    checks.push(check_selection_inputs(config));
    checks.push(check_checkpoint(&config.output.checkpoint_path()));
    checks.push(check_exporter(&config.exporter.command));
    checks
}

fn check_model_list(model_list: &ModelList) -> PrerequisiteCheck {
    let report = &model_list.report;
    if model_list.is_empty() {
        return PrerequisiteCheck::fail("model_list", "model list contains no source paths");
    }
    let mut detail = format!("{} source path(s)", report.paths_count);
    if !report.invalid_lines.is_empty() {
        let lines: Vec<String> = report
            .invalid_lines
            .iter()
            .map(|line| line.line_no.to_string())
            .collect();
        detail.push_str(&format!("; ignored invalid line(s) {}", lines.join(", ")));
    }
    PrerequisiteCheck::pass("model_list", detail)
}

fn check_source(path: &str) -> PrerequisiteCheck {
    let name = format!("source:{path}");
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => PrerequisiteCheck::pass(&name, format!("{} bytes", meta.len())),
        Ok(_) => PrerequisiteCheck::fail(&name, "not a regular file"),
        Err(e) => PrerequisiteCheck::fail(&name, e.to_string()),
    }
}

fn check_output_root(root: &Path) -> PrerequisiteCheck {
    const NAME: &str = "output_root";
    if let Err(e) = std::fs::create_dir_all(root) {
        return PrerequisiteCheck::fail(NAME, format!("cannot create {}: {}", root.display(), e));
    }
    let marker = root.join(format!(".sheetbatch-write-check-{}", std::process::id()));
    match std::fs::write(&marker, b"ok") {
        Ok(()) => {
            let _ = std::fs::remove_file(&marker);
            PrerequisiteCheck::pass(NAME, format!("{} is writable", root.display()))
        }
        Err(e) => PrerequisiteCheck::fail(NAME, format!("{} is not writable: {}", root.display(), e)),
    }
}

fn check_selection_inputs(config: &RunConfig) -> PrerequisiteCheck {
    const NAME: &str = "selection_inputs";
    match SelectionEngine::prepare(config) {
        Ok(engine) => {
            let detail = match config.selection.mode {
                SelectionMode::FolderFilter => format!(
                    "folder filter {} = {}",
                    config.selection.filter_parameter, config.selection.filter_value
                ),
                SelectionMode::SelectionFile => format!(
                    "selection file with {} entr(ies)",
                    engine.markup().map_or(0, |m| m.entries.len())
                ),
                SelectionMode::Codes => format!("codes on {}", config.selection.code_parameter),
            };
            PrerequisiteCheck::pass(NAME, detail)
        }
        Err(e) => PrerequisiteCheck::fail(NAME, e.to_string()),
    }
}

fn check_checkpoint(path: &Path) -> PrerequisiteCheck {
    const NAME: &str = "checkpoint";
    match CheckpointStore::inspect(path) {
        Ok(0) => PrerequisiteCheck::pass(NAME, "no prior records"),
        Ok(count) => PrerequisiteCheck::pass(NAME, format!("{count} prior record(s)")),
        Err(reason) => PrerequisiteCheck::fail(NAME, format!("{}: {}", path.display(), reason)),
    }
}

fn check_exporter(command: &[String]) -> PrerequisiteCheck {
    const NAME: &str = "exporter";
    let Some(program) = command.first() else {
        return PrerequisiteCheck::fail(NAME, "no export command configured");
    };
    match resolve_program(program) {
        Some(path) => PrerequisiteCheck::pass(NAME, path.display().to_string()),
        None => PrerequisiteCheck::fail(NAME, format!("'{program}' not found")),
    }
}

/// Resolves a program name the way a shell would, via `PATH`
fn resolve_program(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 || candidate.is_absolute() {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }

    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths).find_map(|dir| {
        let full = dir.join(program);
        if full.is_file() {
            return Some(full);
        }
        if cfg!(windows) {
            let exe = dir.join(format!("{program}.exe"));
            if exe.is_file() {
                return Some(exe);
            }
        }
        None
    })
}
