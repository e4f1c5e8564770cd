//! Configuration management for sheetbatch.
//!
//! # Overview
//!
//! Sheetbatch uses a versioned TOML configuration document with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `SHEETBATCH_<SECTION>_<KEY>` environment overrides
//! - Aggregated validation: every failing key is reported at once
//! - Normalization of strings, path separators, and enumerated values
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use sheetbatch::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("sheetbatch.toml")?;
//! println!("Output root: {}", config.output.root.display());
//! println!("Kinds: {:?}", config.export.enabled_kinds());
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - log level
//! - [`SelectionSettings`] - selection mode and its parameters
//! - [`ExportSettings`] - resume policy and per-kind settings
//! - [`OutputSettings`] - output root and status/report file names
//! - [`StateSettings`] - checkpoint corruption policy
//! - [`IdentitySettings`] - group/subgroup path pattern
//! - [`ExporterSettings`] - external export command
//! - [`LoggingConfig`] - local file logging
//!
//! # Example Configuration
//!
//! ```toml
//! schema_version = 1
//!
//! [selection]
//! mode = "folder_filter"
//! filter_parameter = "Sheet Folder"
//! filter_value = "Issue"
//!
//! [export]
//! policy = "resume"
//!
//! [export.pdf]
//! enabled = true
//! paper_size = "A1"
//!
//! [output]
//! root = "${SHEETBATCH_OUT}"
//!
//! [state]
//! corruption_policy = "fail"
//! ```

pub mod loader;
pub mod schema;

pub use loader::{load_config, load_config_str};
pub use schema::{
    ApplicationConfig, CorruptionPolicy, ExportSettings, ExporterSettings, IdentitySettings,
    KindSettings, LoggingConfig, OutputSettings, RawConfig, ResumePolicy, RunConfig,
    SelectionMode, SelectionSettings, StateSettings, SCHEMA_VERSION,
};
