//! Status command implementation
//!
//! This module implements the `status` command for displaying the live
//! progress and failure surfaces of the latest run.

use super::load_config_or_report;
use crate::core::export::{EXIT_FATAL, EXIT_SUCCESS};
use crate::core::status::{read_failures, read_progress, RunState};
use clap::Args;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Maximum number of failure rows to display
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking run status");

        println!("📊 Run Status");
        println!();

        let Some(config) = load_config_or_report(config_path) else {
            return Ok(EXIT_FATAL);
        };

        let progress_path = config.output.progress_path();
        if !progress_path.exists() {
            println!("No run recorded under {}.", config.output.root.display());
            println!("Run 'sheetbatch export' to start exporting.");
            return Ok(EXIT_SUCCESS);
        }

        match read_progress(&progress_path) {
            Ok(progress) => {
                let state = match progress.state {
                    RunState::Running => "🔄 Running",
                    RunState::Completed => "✅ Completed",
                    RunState::Cancelled => "⏸️  Cancelled",
                };
                println!("Run {} - {}", progress.run_id, state);
                println!(
                    "  Started: {}",
                    progress.started_at.format("%Y-%m-%d %H:%M:%S")
                );
                println!(
                    "  Updated: {}",
                    progress.updated_at.format("%Y-%m-%d %H:%M:%S")
                );
                println!(
                    "  Sources: {}/{} ({:.1}% overall)",
                    progress.sources_done, progress.sources_total, progress.overall_percent
                );
                if let Some(source) = &progress.current_source {
                    println!(
                        "  Current source: {} - item {}/{} ({:.1}%)",
                        source, progress.items_done, progress.items_total, progress.percent
                    );
                }
                if let Some(item) = &progress.current_item {
                    println!("  Current item: {item}");
                }
            }
            Err(e) => {
                println!("❌ Progress surface is unreadable: {e}");
            }
        }
        println!();

        let failures_path = config.output.failures_path();
        if !failures_path.exists() {
            println!("No failure surface recorded.");
            return Ok(EXIT_SUCCESS);
        }

        match read_failures(&failures_path) {
            Ok(document) if document.rows.is_empty() => {
                println!("No failing items.");
            }
            Ok(document) => {
                println!("Found {} failing item-kind(s):", document.rows.len());
                println!();
                println!(
                    "{:<28} {:<16} {:<5} {:<22} {:<8} Message",
                    "Source", "Item", "Kind", "Error", "Count"
                );
                println!("{}", "-".repeat(110));
                for row in document.rows.iter().take(self.limit) {
                    println!(
                        "{:<28} {:<16} {:<5} {:<22} {:<8} {}",
                        row.source_id.as_str(),
                        row.item_number,
                        row.kind.as_str(),
                        row.error_kind.to_string(),
                        row.failures,
                        row.error_message
                    );
                }
                if document.rows.len() > self.limit {
                    println!("... and {} more", document.rows.len() - self.limit);
                }
            }
            Err(e) => {
                println!("❌ Failure surface is unreadable: {e}");
            }
        }

        println!();
        Ok(EXIT_SUCCESS)
    }
}
