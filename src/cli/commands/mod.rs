//! CLI command implementations
//!
//! Every command loads the configuration and the model list itself and
//! returns a process exit code. Fatal configuration or environment failures
//! map to exit code 2.

pub mod export;
pub mod inventory;
pub mod reports;
pub mod status;
pub mod validate;

use crate::config::{load_config, RunConfig};
use crate::core::model_list::{read_model_list, ModelList};
use std::path::Path;

/// Loads the configuration, printing an actionable message on failure
pub(crate) fn load_config_or_report(config_path: &str) -> Option<RunConfig> {
    match load_config(config_path) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::error!(config_path = %config_path, error = %e, "Configuration failed to load");
            eprintln!("❌ Configuration error in {config_path}");
            eprintln!("   {e}");
            None
        }
    }
}

/// Reads the model list, printing an actionable message on failure
pub(crate) fn load_models_or_report(models_path: &str) -> Option<ModelList> {
    match read_model_list(Path::new(models_path)) {
        Ok(list) => Some(list),
        Err(e) => {
            tracing::error!(models_path = %models_path, error = %e, "Model list failed to load");
            eprintln!("❌ Cannot read model list {models_path}");
            eprintln!("   {e}");
            None
        }
    }
}
