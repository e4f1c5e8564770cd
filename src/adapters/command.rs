//! Exporter that delegates each artifact to an external command
//!
//! The configured command is a program followed by arguments. These
//! placeholders are substituted in every argument:
//!
//! | Placeholder | Value |
//! |-------------|-------|
//! | `{source}`  | source path |
//! | `{item}`    | item number (or opaque id when unnumbered) |
//! | `{name}`    | item name |
//! | `{id}`      | item opaque id |
//! | `{kind}`    | `pdf` or `dwg` |
//! | `{output}`  | expected artifact path |
//! | `{options}` | `key=value;...` kind options |
//!
//! Exit status 0 means the command believes it produced the artifact; the
//! runner still verifies it. Any other status is classified from stderr.

use crate::adapters::traits::{ExportOutcome, ExportRequest, Exporter};
use crate::config::ExporterSettings;
use crate::domain::{ConfigError, ExportErrorKind, Result};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

/// Runs one external process per export
#[derive(Debug, Clone)]
pub struct CommandExporter {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl CommandExporter {
    /// Builds the exporter from configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error when no command is configured.
    pub fn from_settings(settings: &ExporterSettings) -> Result<Self> {
        let Some((program, args)) = settings.command.split_first() else {
            return Err(ConfigError::single(
                "exporter.command",
                "program and arguments of the export command",
            )
            .into());
        };
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            timeout: settings.timeout_seconds.map(Duration::from_secs),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn render_args(&self, request: &ExportRequest<'_>) -> Vec<String> {
        let output = request.output_path.to_string_lossy();
        let options = request.options.to_arg_string();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{source}", request.source_path)
                    .replace("{item}", request.item.display_id())
                    .replace("{name}", request.item.name.trim())
                    .replace("{id}", &request.item.opaque_id)
                    .replace("{kind}", request.kind.as_str())
                    .replace("{output}", &output)
                    .replace("{options}", &options)
            })
            .collect()
    }
}

#[async_trait]
impl Exporter for CommandExporter {
    async fn export(&self, request: ExportRequest<'_>) -> ExportOutcome {
        let output_path = request.output_path;

        if let Some(parent) = output_path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return ExportOutcome::from_io(output_path, &e);
            }
        }

        let args = self.render_args(&request);
        tracing::debug!(program = %self.program, args = ?args, "Running export command");

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();
        let child = match child {
            Ok(child) => child,
            Err(e) => return ExportOutcome::from_io(output_path, &e),
        };

        let output = match self.timeout {
            Some(limit) => match timeout(limit, child.wait_with_output()).await {
                Ok(result) => result,
                Err(_) => {
                    return ExportOutcome::failed(
                        output_path,
                        ExportErrorKind::Unknown,
                        format!("export command timed out after {}s", limit.as_secs()),
                    )
                }
            },
            None => child.wait_with_output().await,
        };

        match output {
            Ok(output) if output.status.success() => ExportOutcome::succeeded(output_path),
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                let code = output
                    .status
                    .code()
                    .map_or_else(|| "signal".to_string(), |c| c.to_string());
                ExportOutcome::failed(
                    output_path,
                    classify_stderr(&stderr),
                    format!("export command exited with {code}: {stderr}"),
                )
            }
            Err(e) => ExportOutcome::from_io(output_path, &e),
        }
    }
}

/// Maps well-known phrases in a command's stderr to an error kind
fn classify_stderr(stderr: &str) -> ExportErrorKind {
    let lower = stderr.to_lowercase();
    if lower.contains("locked") || lower.contains("in use") || lower.contains("sharing violation") {
        ExportErrorKind::Locked
    } else if lower.contains("access denied")
        || lower.contains("permission denied")
        || lower.contains("read-only")
    {
        ExportErrorKind::AccessDenied
    } else if lower.contains("not found") || lower.contains("no such file") {
        ExportErrorKind::NotFound
    } else {
        ExportErrorKind::Unknown
    }
}
