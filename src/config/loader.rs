//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{strip_mistyped, RawConfig, RunConfig};
use crate::domain::errors::{BatchError, ConfigError, ConfigIssue};
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (`${VAR}` syntax)
/// 3. Parses the TOML, sets aside values of the wrong type, and reads the
///    rest into a [`RawConfig`]
/// 4. Applies environment variable overrides (`SHEETBATCH_*` prefix)
/// 5. Validates and normalizes into a [`RunConfig`]
///
/// # Errors
///
/// Returns [`BatchError::Configuration`] if the file cannot be read, is not
/// valid TOML, references unset environment variables, or fails validation.
///
/// # Examples
///
/// ```no_run
/// use sheetbatch::config::loader::load_config;
///
/// let config = load_config("sheetbatch.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<RunConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ConfigError::single(
            "config",
            format!("existing configuration file at {}", path.display()),
        )
        .into());
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        BatchError::Configuration(ConfigError::single(
            "config",
            format!("readable configuration file at {} ({})", path.display(), e),
        ))
    })?;

    load_config_str(&contents)
}

/// Parses and validates configuration text
///
/// Same pipeline as [`load_config`] minus the file read.
pub fn load_config_str(contents: &str) -> Result<RunConfig> {
    let contents = substitute_env_vars(contents)?;
    let mut document: toml::Table = toml::from_str(&contents)?;
    let type_issues = strip_mistyped(&mut document);
    let mut raw: RawConfig = toml::Value::Table(document).try_into()?;
    apply_env_overrides(&mut raw);

    match raw.validate() {
        Ok(config) if type_issues.is_empty() => Ok(config),
        Ok(_) => Err(ConfigError::new(type_issues).into()),
        Err(err) => Err(merge_issues(type_issues, err.issues).into()),
    }
}

/// Type issues first; validation issues for the same keys are dropped
fn merge_issues(mut issues: Vec<ConfigIssue>, validation: Vec<ConfigIssue>) -> ConfigError {
    let typed: Vec<String> = issues.iter().map(|issue| issue.key.clone()).collect();
    issues.extend(
        validation
            .into_iter()
            .filter(|issue| !typed.contains(&issue.key)),
    );
    ConfigError::new(issues)
}

/// Substitutes environment variables in the format `${VAR_NAME}`
///
/// Comment lines are left untouched. All unset variables are reported
/// together.
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| {
        BatchError::Configuration(ConfigError::single("<env>", format!("valid pattern ({e})")))
    })?;
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let processed = re.replace_all(line, |caps: &regex::Captures| {
            let var_name = &caps[1];
            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                    String::new()
                }
            }
        });
        result.push_str(&processed);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        let issues = missing_vars
            .into_iter()
            .map(|var| crate::domain::ConfigIssue::new(format!("${{{var}}}"), "environment variable to be set"))
            .collect();
        return Err(ConfigError::new(issues).into());
    }

    Ok(result)
}

/// Applies environment variable overrides using the `SHEETBATCH_*` prefix
///
/// Variables follow the pattern `SHEETBATCH_<SECTION>_<KEY>`, for example
/// `SHEETBATCH_OUTPUT_ROOT` or `SHEETBATCH_EXPORT_POLICY`. Overrides land on
/// the raw document so they go through the same validation as file values.
fn apply_env_overrides(config: &mut RawConfig) {
    if let Ok(val) = std::env::var("SHEETBATCH_APPLICATION_LOG_LEVEL") {
        config.application.log_level = Some(val);
    }

    if let Ok(val) = std::env::var("SHEETBATCH_SELECTION_MODE") {
        config.selection.mode = Some(val);
    }
    if let Ok(val) = std::env::var("SHEETBATCH_SELECTION_FILTER_VALUE") {
        config.selection.filter_value = Some(val);
    }
    if let Ok(val) = std::env::var("SHEETBATCH_SELECTION_SELECTION_FILE") {
        config.selection.selection_file = Some(val);
    }
    if let Ok(val) = std::env::var("SHEETBATCH_SELECTION_CODES_FILE") {
        config.selection.codes_file = Some(val);
    }

    if let Ok(val) = std::env::var("SHEETBATCH_EXPORT_POLICY") {
        config.export.policy = Some(val);
    }
    if let Ok(val) = std::env::var("SHEETBATCH_EXPORT_PDF_ENABLED") {
        if let Ok(enabled) = val.trim().parse() {
            config.export.pdf.enabled = Some(enabled);
        }
    }
    if let Ok(val) = std::env::var("SHEETBATCH_EXPORT_DWG_ENABLED") {
        if let Ok(enabled) = val.trim().parse() {
            config.export.dwg.enabled = Some(enabled);
        }
    }

    if let Ok(val) = std::env::var("SHEETBATCH_OUTPUT_ROOT") {
        config.output.root = Some(val);
    }

    if let Ok(val) = std::env::var("SHEETBATCH_STATE_CORRUPTION_POLICY") {
        config.state.corruption_policy = Some(val);
    }

    if let Ok(val) = std::env::var("SHEETBATCH_EXPORTER_TIMEOUT_SECONDS") {
        if let Ok(timeout) = val.trim().parse() {
            config.exporter.timeout_seconds = Some(timeout);
        }
    }

    if let Ok(val) = std::env::var("SHEETBATCH_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.trim().parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("SHEETBATCH_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
}
