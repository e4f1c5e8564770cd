//! Inventory command implementation
//!
//! This module implements the `inventory` command: selection for every
//! source without exporting anything.

use super::{load_config_or_report, load_models_or_report};
use crate::adapters::ManifestProvider;
use crate::core::export::{EXIT_FATAL, EXIT_PARTIAL_FAILURE, EXIT_SUCCESS};
use crate::core::inventory::build_inventory;
use crate::logging::ErrorCapture;
use clap::Args;

/// Arguments for the inventory command
#[derive(Args, Debug)]
pub struct InventoryArgs {
    /// Path to the model list (one source path per line)
    #[arg(short, long)]
    pub models: String,
}

impl InventoryArgs {
    /// Execute the inventory command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(models = %self.models, "Generating inventory");

        let Some(config) = load_config_or_report(config_path) else {
            return Ok(EXIT_FATAL);
        };
        let Some(models) = load_models_or_report(&self.models) else {
            return Ok(EXIT_FATAL);
        };
        if !models.report.invalid_lines.is_empty() {
            println!(
                "⚠️  {} model list line(s) ignored",
                models.report.invalid_lines.len()
            );
        }

        let provider = ManifestProvider::new();
        let capture = ErrorCapture::new(config.output.error_log_path());

        let inventory = match build_inventory(&config, &models, &provider, &provider, &capture).await {
            Ok(inventory) => inventory,
            Err(e) => {
                tracing::error!(error = %e, "Inventory failed");
                eprintln!("❌ Inventory failed");
                eprintln!("   {e}");
                return Ok(EXIT_FATAL);
            }
        };

        println!("📋 Inventory:");
        for source in &inventory.sources {
            match &source.open_error {
                Some(error) => println!("  ❌ {} ({})", source.source.path, error),
                None => println!(
                    "  {} [{}/{}]: {} item(s), {} selected, {} placeholder(s), {} missing reference(s)",
                    source.source.title,
                    source.source.group_id,
                    source.source.subgroup_id,
                    source.items.len(),
                    source.items.iter().filter(|i| i.selected).count(),
                    source.selection.excluded_placeholder,
                    source.missing_reference_keys.len()
                ),
            }
        }
        println!();
        println!(
            "  Total selected: {} | Written to {}",
            inventory.selected_items(),
            config.output.inventory_path().display()
        );

        if inventory.failed_sources() > 0 {
            Ok(EXIT_PARTIAL_FAILURE)
        } else {
            Ok(EXIT_SUCCESS)
        }
    }
}
