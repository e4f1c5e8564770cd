//! Validate prerequisites command implementation
//!
//! This module implements the `validate-prerequisites` command: configuration
//! and environment checks that must pass before an export run.

use super::{load_config_or_report, load_models_or_report};
use crate::core::export::{EXIT_FATAL, EXIT_SUCCESS};
use crate::core::prerequisites::{all_passed, check_prerequisites};
use clap::Args;

/// Arguments for the validate-prerequisites command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to the model list (one source path per line)
    #[arg(short, long)]
    pub models: String,
}

impl ValidateArgs {
    /// Execute the validate-prerequisites command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, models = %self.models, "Validating prerequisites");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let Some(config) = load_config_or_report(config_path) else {
            return Ok(EXIT_FATAL);
        };
        println!("✅ Configuration is valid");
        println!("  Selection: {:?}", config.selection.mode);
        println!("  Kinds: {:?}", config.export.enabled_kinds());
        println!("  Policy: {:?}", config.export.policy);
        println!("  Corruption policy: {:?}", config.state.corruption_policy);
        println!("  Output: {}", config.output.root.display());
        println!();

        let Some(models) = load_models_or_report(&self.models) else {
            return Ok(EXIT_FATAL);
        };

        let checks = check_prerequisites(&config, &models);
        for check in &checks {
            let mark = if check.passed { "✅" } else { "❌" };
            println!("{mark} {}: {}", check.name, check.detail);
            if !check.passed {
                tracing::warn!(check = %check.name, detail = %check.detail, "Prerequisite failed");
            }
        }
        println!();

        if all_passed(&checks) {
            println!("✅ All prerequisites satisfied");
            Ok(EXIT_SUCCESS)
        } else {
            let failed = checks.iter().filter(|c| !c.passed).count();
            println!("❌ {failed} prerequisite(s) failed");
            Ok(EXIT_FATAL)
        }
    }
}
