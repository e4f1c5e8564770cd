//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Sheetbatch using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Sheetbatch - resumable batch sheet export
#[derive(Parser, Debug)]
#[command(name = "sheetbatch")]
#[command(version, about, long_about = None)]
#[command(author = "Sheetbatch Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "sheetbatch.toml", env = "SHEETBATCH_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "SHEETBATCH_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export every selected sheet of every listed model
    Export(commands::export::ExportArgs),

    /// Check configuration, model list, and environment before a run
    ValidatePrerequisites(commands::validate::ValidateArgs),

    /// List what an export run would do, without exporting
    Inventory(commands::inventory::InventoryArgs),

    /// Show the live progress and failure surfaces
    Status(commands::status::StatusArgs),

    /// Rebuild source and group reports from the checkpoint
    RegenerateReports(commands::reports::ReportsArgs),
}
