//! Report regeneration command
//!
//! Rebuilds the per-source reports and group rollups from the checkpoint
//! without exporting anything.

use super::{load_config_or_report, load_models_or_report};
use crate::adapters::ManifestProvider;
use crate::core::export::{EXIT_FATAL, EXIT_PARTIAL_FAILURE, EXIT_SUCCESS};
use crate::core::report::{regenerate_reports, SourceStatus};
use crate::logging::ErrorCapture;
use clap::Args;

/// Arguments for the regenerate-reports command
#[derive(Args, Debug)]
pub struct ReportsArgs {
    /// Path to the model list (one source path per line)
    #[arg(short, long)]
    pub models: String,
}

impl ReportsArgs {
    /// Execute the regenerate-reports command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(models = %self.models, "Regenerating reports");

        let Some(config) = load_config_or_report(config_path) else {
            return Ok(EXIT_FATAL);
        };
        let Some(models) = load_models_or_report(&self.models) else {
            return Ok(EXIT_FATAL);
        };

        let provider = ManifestProvider::new();
        let capture = ErrorCapture::new(config.output.error_log_path());

        let reports = match regenerate_reports(&config, &models, &provider, &provider, &capture).await {
            Ok(reports) => reports,
            Err(e) => {
                tracing::error!(error = %e, "Report regeneration failed");
                eprintln!("❌ Report regeneration failed");
                eprintln!("   {e}");
                return Ok(EXIT_FATAL);
            }
        };

        println!("📄 Reports regenerated from checkpoint:");
        let mut failed = 0;
        for report in &reports {
            if report.status == SourceStatus::OpenFailed {
                failed += 1;
                println!(
                    "  ❌ {} ({})",
                    report.source.path,
                    report.open_error.as_deref().unwrap_or("not opened")
                );
                continue;
            }
            let summary: Vec<String> = report
                .totals
                .iter()
                .map(|(kind, t)| {
                    format!(
                        "{kind}: {} ok, {} failed, {} not attempted",
                        t.success, t.failure, t.not_attempted
                    )
                })
                .collect();
            println!("  {} - {}", report.source.title, summary.join(" | "));
        }
        println!();
        println!("  Written to {}", config.output.reports_path().display());

        if failed > 0 {
            Ok(EXIT_PARTIAL_FAILURE)
        } else {
            Ok(EXIT_SUCCESS)
        }
    }
}
