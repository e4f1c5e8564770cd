//! Export command implementation
//!
//! This module implements the `export` command: one resumable batch run over
//! every source of a model list.

use super::{load_config_or_report, load_models_or_report};
use crate::adapters::{CommandExporter, ManifestProvider};
use crate::config::ResumePolicy;
use crate::core::export::{BatchRunner, RunSummary, EXIT_FATAL};
use crate::core::status::RunState;
use crate::logging::ErrorCapture;
use clap::Args;
use std::sync::Arc;
use tokio::sync::watch;

/// Arguments for the export command
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Path to the model list (one source path per line)
    #[arg(short, long)]
    pub models: String,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Re-export everything, ignoring checkpoint records
    #[arg(long)]
    pub overwrite: bool,
}

impl ExportArgs {
    /// Execute the export command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting export command");

        let Some(mut config) = load_config_or_report(config_path) else {
            return Ok(EXIT_FATAL);
        };
        if self.overwrite {
            tracing::info!("Overriding resume policy from CLI");
            config.export.policy = ResumePolicy::Overwrite;
        }

        let Some(models) = load_models_or_report(&self.models) else {
            return Ok(EXIT_FATAL);
        };
        if models.is_empty() {
            eprintln!("❌ Model list {} contains no source paths", self.models);
            return Ok(EXIT_FATAL);
        }

        if !self.yes {
            println!("Export Configuration:");
            println!("  Models: {} source(s) from {}", models.paths.len(), self.models);
            println!("  Selection: {:?}", config.selection.mode);
            println!("  Kinds: {:?}", config.export.enabled_kinds());
            println!("  Policy: {:?}", config.export.policy);
            println!("  Output: {}", config.output.root.display());
            println!();
            print!("Proceed with export? [y/N]: ");
            use std::io::{self, Write};
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;

            if !input.trim().eq_ignore_ascii_case("y") {
                println!("Export cancelled.");
                return Ok(0);
            }
        }

        let exporter = match CommandExporter::from_settings(&config.exporter) {
            Ok(exporter) => Arc::new(exporter),
            Err(e) => {
                eprintln!("❌ Exporter is not configured: {e}");
                return Ok(EXIT_FATAL);
            }
        };
        let provider = Arc::new(ManifestProvider::new());
        let capture = Arc::new(ErrorCapture::new(config.output.error_log_path()));

        let runner = BatchRunner::new(
            config,
            provider.clone(),
            provider,
            exporter,
            capture.clone(),
            shutdown_signal,
        );

        println!("🚀 Starting export...");
        println!();

        let summary = match runner.run(&models).await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::error!(error = %e, "Export aborted");
                eprintln!("❌ Export aborted before any source was processed");
                eprintln!("   {e}");
                return Ok(EXIT_FATAL);
            }
        };

        print_summary(&summary, runner.config().output.root.display(), capture.as_ref());
        Ok(summary.exit_code())
    }
}

fn print_summary(summary: &RunSummary, output_root: impl std::fmt::Display, capture: &ErrorCapture) {
    println!();
    println!("📊 Export Summary:");
    println!(
        "  Sources: {} of {} processed, {} failed to open",
        summary.sources_processed, summary.sources_total, summary.sources_failed
    );
    for (kind, totals) in &summary.totals {
        println!(
            "  {}: selected {}, exported {}, skipped {}, failed {}, not attempted {}, violations {}",
            kind.as_str().to_uppercase(),
            totals.selected,
            totals.success,
            totals.skip,
            totals.failure,
            totals.not_attempted,
            totals.violations
        );
    }
    println!("  Duration: {:.2}s", summary.duration_ms as f64 / 1000.0);
    println!("  Success Rate: {:.2}%", summary.success_rate());
    println!("  Output: {output_root}");
    println!();

    if !summary.errors.is_empty() {
        println!("⚠️  Source errors:");
        for error in &summary.errors {
            println!("  - {:?}: {}", error.error_type, error.source_path);
            println!("    {}", error.message);
        }
        println!();
    }

    if capture.sink_failures() > 0 {
        println!(
            "⚠️  {} log entries could not be written to the error log and went to stderr",
            capture.sink_failures()
        );
    }

    if summary.state == RunState::Cancelled {
        println!("⚠️  Export interrupted gracefully. Progress saved.");
        println!("   Run the same command to resume from checkpoint.");
        tracing::info!("Export interrupted by user signal");
    } else if summary.is_successful() {
        println!("✅ Export completed successfully!");
    } else {
        println!("⚠️  Export completed with failures");
    }
}
