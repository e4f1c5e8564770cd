//! Configuration schema types
//!
//! The TOML document is first checked against [`RAW_SHAPES`]; values of the
//! wrong type are removed and reported. What remains is deserialized into
//! loosely-typed `Raw*` structs in which every key is optional. [`RawConfig::validate`] then checks every
//! required key, enumerated value, and cross-field constraint in one pass and
//! produces the immutable, normalized [`RunConfig`]. Any violation yields a
//! single [`ConfigError`] listing every failing key.

use crate::domain::errors::{ConfigError, ConfigIssue};
use crate::domain::ids::normalize_path;
use crate::domain::ExportKind;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The only configuration schema version this build understands
pub const SCHEMA_VERSION: u32 = 1;

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const VALID_ROTATIONS: [&str; 3] = ["daily", "hourly", "never"];

/// Item selection mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Match one attribute against one required value
    FolderFilter,
    /// Coordinator-maintained markup keyed by item number
    SelectionFile,
    /// Membership of an attribute value in a code set
    Codes,
}

impl SelectionMode {
    fn parse(s: &str) -> Option<Self> {
        match normalize_enum(s).as_str() {
            "folder_filter" => Some(Self::FolderFilter),
            "selection_file" => Some(Self::SelectionFile),
            "codes" => Some(Self::Codes),
            _ => None,
        }
    }
}

/// What to do with items that already have a verified artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumePolicy {
    /// Skip items whose checkpoint and artifact both confirm success
    Resume,
    /// Attempt every item and replace existing artifacts
    Overwrite,
}

impl ResumePolicy {
    fn parse(s: &str) -> Option<Self> {
        match normalize_enum(s).as_str() {
            "resume" => Some(Self::Resume),
            "overwrite" => Some(Self::Overwrite),
            _ => None,
        }
    }
}

/// What to do when the checkpoint file cannot be parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorruptionPolicy {
    /// Abort the run with `CheckpointCorruption`
    Fail,
    /// Rename the unreadable file aside and start an empty store
    BackupAndRestart,
}

impl CorruptionPolicy {
    fn parse(s: &str) -> Option<Self> {
        match normalize_enum(s).as_str() {
            "fail" => Some(Self::Fail),
            "backup_and_restart" => Some(Self::BackupAndRestart),
            _ => None,
        }
    }
}

/// Validated, normalized run configuration
///
/// Created once at run start and read-only afterwards.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub schema_version: u32,
    pub application: ApplicationConfig,
    pub selection: SelectionSettings,
    pub export: ExportSettings,
    pub output: OutputSettings,
    pub state: StateSettings,
    pub identity: IdentitySettings,
    pub exporter: ExporterSettings,
    pub logging: LoggingConfig,
}

/// Application-level settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationConfig {
    pub log_level: String,
}

/// Selection engine settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionSettings {
    pub mode: SelectionMode,
    /// Attribute compared in folder-filter mode
    pub filter_parameter: String,
    /// Required value in folder-filter mode (exact, case-sensitive)
    pub filter_value: String,
    /// Markup file used in selection-file mode
    pub selection_file: Option<PathBuf>,
    /// Attribute tested for membership in codes mode
    pub code_parameter: String,
    /// Inline codes, trimmed
    pub codes: Vec<String>,
    /// Optional codes list file
    pub codes_file: Option<PathBuf>,
    pub case_insensitive_codes: bool,
}

/// Per-kind export settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindSettings {
    pub enabled: bool,
    /// Artifacts smaller than this are not trusted
    pub min_size_bytes: u64,
    /// Upper bound of files sharing the artifact stem before a violation
    /// is flagged
    pub max_artifacts: usize,
    /// Paper size name, required for PDF
    pub paper_size: Option<String>,
    /// Export setup name, used by DWG
    pub setup_name: Option<String>,
}

/// Export settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSettings {
    pub policy: ResumePolicy,
    pub pdf: KindSettings,
    pub dwg: KindSettings,
}

impl ExportSettings {
    /// Settings for one kind
    pub fn kind(&self, kind: ExportKind) -> &KindSettings {
        match kind {
            ExportKind::Pdf => &self.pdf,
            ExportKind::Dwg => &self.dwg,
        }
    }

    /// Enabled kinds in canonical order
    pub fn enabled_kinds(&self) -> Vec<ExportKind> {
        ExportKind::ALL
            .into_iter()
            .filter(|k| self.kind(*k).enabled)
            .collect()
    }
}

/// Output locations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSettings {
    pub root: PathBuf,
    pub progress_file: String,
    pub failures_file: String,
    pub checkpoint_file: String,
    pub reports_dir: String,
    pub error_log_file: String,
    pub inventory_file: String,
}

impl OutputSettings {
    pub fn progress_path(&self) -> PathBuf {
        self.root.join(&self.progress_file)
    }

    pub fn failures_path(&self) -> PathBuf {
        self.root.join(&self.failures_file)
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        self.root.join(&self.checkpoint_file)
    }

    pub fn reports_path(&self) -> PathBuf {
        self.root.join(&self.reports_dir)
    }

    pub fn error_log_path(&self) -> PathBuf {
        self.root.join(&self.error_log_file)
    }

    pub fn inventory_path(&self) -> PathBuf {
        self.root.join(&self.inventory_file)
    }
}

/// Checkpoint state settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSettings {
    pub corruption_policy: CorruptionPolicy,
}

/// Source identity inference settings
#[derive(Debug, Clone, Default)]
pub struct IdentitySettings {
    /// Pattern with named captures `group` and `subgroup`, matched against
    /// the normalized source path
    pub group_pattern: Option<Regex>,
}

/// Settings for the command exporter used by the binary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExporterSettings {
    /// Program and arguments; placeholders are substituted per attempt
    pub command: Vec<String>,
    pub timeout_seconds: Option<u64>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy (daily, hourly, never)
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

impl LoggingConfig {
    fn validate(&self, issues: &mut Vec<ConfigIssue>) {
        let rotation = normalize_enum(&self.local_rotation);
        if !VALID_ROTATIONS.contains(&rotation.as_str()) {
            issues.push(ConfigIssue::new(
                "logging.local_rotation",
                format!("one of: {}", VALID_ROTATIONS.join(", ")),
            ));
        }
        if self.local_enabled && self.local_path.trim().is_empty() {
            issues.push(ConfigIssue::new(
                "logging.local_path",
                "non-empty directory path when logging.local_enabled = true",
            ));
        }
    }
}

// ---------------------------------------------------------------------------
// Raw document
// ---------------------------------------------------------------------------

/// TOML value type expected at a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Table,
    String,
    Bool,
    Integer,
    Unsigned,
    StringArray,
}

impl Shape {
    fn accepts(self, value: &toml::Value) -> bool {
        use toml::Value;
        match (self, value) {
            (Self::Table, Value::Table(_)) => true,
            (Self::String, Value::String(_)) => true,
            (Self::Bool, Value::Boolean(_)) => true,
            (Self::Integer, Value::Integer(_)) => true,
            (Self::Unsigned, Value::Integer(i)) => *i >= 0,
            (Self::StringArray, Value::Array(items)) => items.iter().all(|v| v.is_str()),
            _ => false,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Self::Table => "a table",
            Self::String => "a string",
            Self::Bool => "a boolean",
            Self::Integer => "an integer",
            Self::Unsigned => "a non-negative integer",
            Self::StringArray => "an array of strings",
        }
    }
}

/// Expected type of every known key; sections come before their keys
pub const RAW_SHAPES: &[(&str, Shape)] = &[
    ("schema_version", Shape::Integer),
    ("application", Shape::Table),
    ("application.log_level", Shape::String),
    ("selection", Shape::Table),
    ("selection.mode", Shape::String),
    ("selection.filter_parameter", Shape::String),
    ("selection.filter_value", Shape::String),
    ("selection.selection_file", Shape::String),
    ("selection.code_parameter", Shape::String),
    ("selection.codes", Shape::StringArray),
    ("selection.codes_file", Shape::String),
    ("selection.case_insensitive_codes", Shape::Bool),
    ("export", Shape::Table),
    ("export.policy", Shape::String),
    ("export.pdf", Shape::Table),
    ("export.pdf.enabled", Shape::Bool),
    ("export.pdf.min_size_bytes", Shape::Unsigned),
    ("export.pdf.max_artifacts", Shape::Unsigned),
    ("export.pdf.paper_size", Shape::String),
    ("export.pdf.setup_name", Shape::String),
    ("export.dwg", Shape::Table),
    ("export.dwg.enabled", Shape::Bool),
    ("export.dwg.min_size_bytes", Shape::Unsigned),
    ("export.dwg.max_artifacts", Shape::Unsigned),
    ("export.dwg.paper_size", Shape::String),
    ("export.dwg.setup_name", Shape::String),
    ("output", Shape::Table),
    ("output.root", Shape::String),
    ("output.progress_file", Shape::String),
    ("output.failures_file", Shape::String),
    ("output.checkpoint_file", Shape::String),
    ("output.reports_dir", Shape::String),
    ("output.error_log_file", Shape::String),
    ("output.inventory_file", Shape::String),
    ("state", Shape::Table),
    ("state.corruption_policy", Shape::String),
    ("identity", Shape::Table),
    ("identity.group_pattern", Shape::String),
    ("exporter", Shape::Table),
    ("exporter.command", Shape::StringArray),
    ("exporter.timeout_seconds", Shape::Unsigned),
    ("logging", Shape::Table),
    ("logging.local_enabled", Shape::Bool),
    ("logging.local_path", Shape::String),
    ("logging.local_rotation", Shape::String),
];

/// Removes every value whose type does not match [`RAW_SHAPES`]
///
/// Returns one issue per removed key, so type errors are reported together
/// with the validation issues of the rest of the document.
pub fn strip_mistyped(document: &mut toml::Table) -> Vec<ConfigIssue> {
    let mut issues = Vec::new();
    for &(key, shape) in RAW_SHAPES {
        let (parent, leaf) = key.rsplit_once('.').unwrap_or(("", key));
        let Some(table) = table_at(document, parent) else {
            continue;
        };
        if let Some(value) = table.get(leaf) {
            if !shape.accepts(value) {
                issues.push(ConfigIssue::new(
                    key,
                    format!("{} (got {})", shape.describe(), value.type_str()),
                ));
                table.remove(leaf);
            }
        }
    }
    issues
}

fn table_at<'a>(mut table: &'a mut toml::Table, path: &str) -> Option<&'a mut toml::Table> {
    for part in path.split('.').filter(|p| !p.is_empty()) {
        table = match table.get_mut(part) {
            Some(toml::Value::Table(inner)) => inner,
            _ => return None,
        };
    }
    Some(table)
}

/// Configuration document as written; every key optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub schema_version: Option<i64>,
    pub application: RawApplication,
    pub selection: RawSelection,
    pub export: RawExport,
    pub output: RawOutput,
    pub state: RawState,
    pub identity: RawIdentity,
    pub exporter: RawExporter,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawApplication {
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSelection {
    pub mode: Option<String>,
    pub filter_parameter: Option<String>,
    pub filter_value: Option<String>,
    pub selection_file: Option<String>,
    pub code_parameter: Option<String>,
    pub codes: Option<Vec<String>>,
    pub codes_file: Option<String>,
    pub case_insensitive_codes: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawExport {
    pub policy: Option<String>,
    pub pdf: RawKind,
    pub dwg: RawKind,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawKind {
    pub enabled: Option<bool>,
    pub min_size_bytes: Option<u64>,
    pub max_artifacts: Option<usize>,
    pub paper_size: Option<String>,
    pub setup_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawOutput {
    pub root: Option<String>,
    pub progress_file: Option<String>,
    pub failures_file: Option<String>,
    pub checkpoint_file: Option<String>,
    pub reports_dir: Option<String>,
    pub error_log_file: Option<String>,
    pub inventory_file: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawState {
    pub corruption_policy: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawIdentity {
    pub group_pattern: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawExporter {
    pub command: Option<Vec<String>>,
    pub timeout_seconds: Option<u64>,
}

impl RawConfig {
    /// Validates and normalizes the document
    ///
    /// # Errors
    ///
    /// Returns a single [`ConfigError`] listing every failing key.
    pub fn validate(self) -> Result<RunConfig, ConfigError> {
        let mut issues = Vec::new();

        let schema_version = match self.schema_version {
            Some(v) if v == i64::from(SCHEMA_VERSION) => SCHEMA_VERSION,
            Some(v) => {
                issues.push(ConfigIssue::new(
                    "schema_version",
                    format!("integer {SCHEMA_VERSION} (got {v})"),
                ));
                SCHEMA_VERSION
            }
            None => {
                issues.push(ConfigIssue::new(
                    "schema_version",
                    format!("integer {SCHEMA_VERSION} (required)"),
                ));
                SCHEMA_VERSION
            }
        };

        let application = self.application.validate(&mut issues);
        let selection = self.selection.validate(&mut issues);
        let export = self.export.validate(&mut issues);
        let output = self.output.validate(&mut issues);
        let state = self.state.validate(&mut issues);
        let identity = self.identity.validate(&mut issues);
        let exporter = self.exporter.validate(&mut issues);
        self.logging.validate(&mut issues);

        if !issues.is_empty() {
            return Err(ConfigError::new(issues));
        }

        let mut logging = self.logging;
        logging.local_rotation = normalize_enum(&logging.local_rotation);
        logging.local_path = normalize_path(&logging.local_path);

        // Every branch above pushed an issue when it returned None.
        match (selection, export, output, state) {
            (Some(selection), Some(export), Some(output), Some(state)) => Ok(RunConfig {
                schema_version,
                application,
                selection,
                export,
                output,
                state,
                identity,
                exporter,
                logging,
            }),
            _ => Err(ConfigError::single("<document>", "a complete configuration")),
        }
    }
}

impl RawApplication {
    fn validate(self, issues: &mut Vec<ConfigIssue>) -> ApplicationConfig {
        let log_level = self
            .log_level
            .map(|l| normalize_enum(&l))
            .unwrap_or_else(default_log_level);
        if !VALID_LOG_LEVELS.contains(&log_level.as_str()) {
            issues.push(ConfigIssue::new(
                "application.log_level",
                format!("one of: {}", VALID_LOG_LEVELS.join(", ")),
            ));
        }
        ApplicationConfig { log_level }
    }
}

impl RawSelection {
    fn validate(self, issues: &mut Vec<ConfigIssue>) -> Option<SelectionSettings> {
        let mode = match self.mode.as_deref().map(str::trim) {
            None | Some("") => Some(SelectionMode::FolderFilter),
            Some(m) => {
                let parsed = SelectionMode::parse(m);
                if parsed.is_none() {
                    issues.push(ConfigIssue::new(
                        "selection.mode",
                        "one of: folder_filter, selection_file, codes",
                    ));
                }
                parsed
            }
        };

        let filter_parameter = trimmed(self.filter_parameter);
        let filter_value = trimmed(self.filter_value);
        let selection_file = trimmed(self.selection_file).map(|p| PathBuf::from(normalize_path(&p)));
        let code_parameter = trimmed(self.code_parameter);
        let codes: Vec<String> = self
            .codes
            .unwrap_or_default()
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        let codes_file = trimmed(self.codes_file).map(|p| PathBuf::from(normalize_path(&p)));

        match mode {
            Some(SelectionMode::FolderFilter) => {
                if filter_parameter.is_none() {
                    issues.push(ConfigIssue::new(
                        "selection.filter_parameter",
                        "non-empty attribute name in folder_filter mode",
                    ));
                }
                if filter_value.is_none() {
                    issues.push(ConfigIssue::new(
                        "selection.filter_value",
                        "non-empty required value in folder_filter mode",
                    ));
                }
            }
            Some(SelectionMode::SelectionFile) => {
                if selection_file.is_none() {
                    issues.push(ConfigIssue::new(
                        "selection.selection_file",
                        "path to a selection markup file in selection_file mode",
                    ));
                }
            }
            Some(SelectionMode::Codes) => {
                if code_parameter.is_none() {
                    issues.push(ConfigIssue::new(
                        "selection.code_parameter",
                        "non-empty attribute name in codes mode",
                    ));
                }
                if codes.is_empty() && codes_file.is_none() {
                    issues.push(ConfigIssue::new(
                        "selection.codes",
                        "at least one code (or selection.codes_file) in codes mode",
                    ));
                }
            }
            None => {}
        }

        Some(SelectionSettings {
            mode: mode?,
            filter_parameter: filter_parameter.unwrap_or_default(),
            filter_value: filter_value.unwrap_or_default(),
            selection_file,
            code_parameter: code_parameter.unwrap_or_default(),
            codes,
            codes_file,
            case_insensitive_codes: self.case_insensitive_codes.unwrap_or(false),
        })
    }
}

impl RawExport {
    fn validate(self, issues: &mut Vec<ConfigIssue>) -> Option<ExportSettings> {
        let policy = match self.policy.as_deref().map(str::trim) {
            None | Some("") => Some(ResumePolicy::Resume),
            Some(p) => {
                let parsed = ResumePolicy::parse(p);
                if parsed.is_none() {
                    issues.push(ConfigIssue::new(
                        "export.policy",
                        "one of: resume, overwrite",
                    ));
                }
                parsed
            }
        };

        let pdf = self.pdf.into_settings(1);
        let dwg = self.dwg.into_settings(default_dwg_max_artifacts());

        if !pdf.enabled && !dwg.enabled {
            issues.push(ConfigIssue::new(
                "export.pdf.enabled",
                "at least one export kind enabled (export.pdf.enabled or export.dwg.enabled)",
            ));
        }
        if pdf.enabled && pdf.paper_size.is_none() {
            issues.push(ConfigIssue::new(
                "export.pdf.paper_size",
                "paper size name when export.pdf.enabled = true",
            ));
        }
        for (key, kind) in [("export.pdf", &pdf), ("export.dwg", &dwg)] {
            if kind.max_artifacts == 0 {
                issues.push(ConfigIssue::new(
                    format!("{key}.max_artifacts"),
                    "integer >= 1",
                ));
            }
        }

        Some(ExportSettings {
            policy: policy?,
            pdf,
            dwg,
        })
    }
}

impl RawKind {
    fn into_settings(self, default_max_artifacts: usize) -> KindSettings {
        KindSettings {
            enabled: self.enabled.unwrap_or(false),
            min_size_bytes: self.min_size_bytes.unwrap_or_else(default_min_size_bytes),
            max_artifacts: self.max_artifacts.unwrap_or(default_max_artifacts),
            paper_size: trimmed(self.paper_size),
            setup_name: trimmed(self.setup_name),
        }
    }
}

impl RawOutput {
    fn validate(self, issues: &mut Vec<ConfigIssue>) -> Option<OutputSettings> {
        let root = trimmed(self.root).map(|r| PathBuf::from(normalize_path(&r)));
        if root.is_none() {
            issues.push(ConfigIssue::new(
                "output.root",
                "non-empty output directory path (required)",
            ));
        }

        let mut file_name = |key: &str, value: Option<String>, default: &str| {
            let value = trimmed(value).unwrap_or_else(|| default.to_string());
            if is_plain_name(&value) {
                value
            } else {
                issues.push(ConfigIssue::new(
                    format!("output.{key}"),
                    "plain file or directory name relative to output.root",
                ));
                default.to_string()
            }
        };

        let progress_file = file_name("progress_file", self.progress_file, "progress.json");
        let failures_file = file_name("failures_file", self.failures_file, "failures.json");
        let checkpoint_file = file_name("checkpoint_file", self.checkpoint_file, "checkpoint.json");
        let reports_dir = file_name("reports_dir", self.reports_dir, "reports");
        let error_log_file = file_name("error_log_file", self.error_log_file, "errors.jsonl");
        let inventory_file = file_name("inventory_file", self.inventory_file, "inventory.json");

        Some(OutputSettings {
            root: root?,
            progress_file,
            failures_file,
            checkpoint_file,
            reports_dir,
            error_log_file,
            inventory_file,
        })
    }
}

impl RawState {
    fn validate(self, issues: &mut Vec<ConfigIssue>) -> Option<StateSettings> {
        let policy = match trimmed(self.corruption_policy) {
            Some(p) => CorruptionPolicy::parse(&p),
            None => None,
        };
        if policy.is_none() {
            issues.push(ConfigIssue::new(
                "state.corruption_policy",
                "one of: fail, backup_and_restart (required)",
            ));
        }
        Some(StateSettings {
            corruption_policy: policy?,
        })
    }
}

impl RawIdentity {
    fn validate(self, issues: &mut Vec<ConfigIssue>) -> IdentitySettings {
        let group_pattern = match trimmed(self.group_pattern) {
            Some(pattern) => match Regex::new(&pattern) {
                Ok(re) => {
                    let names: Vec<&str> = re.capture_names().flatten().collect();
                    if !names.contains(&"group") && !names.contains(&"subgroup") {
                        issues.push(ConfigIssue::new(
                            "identity.group_pattern",
                            "regex with a named capture `group` or `subgroup`",
                        ));
                    }
                    Some(re)
                }
                Err(e) => {
                    issues.push(ConfigIssue::new(
                        "identity.group_pattern",
                        format!("valid regular expression ({e})"),
                    ));
                    None
                }
            },
            None => None,
        };
        IdentitySettings { group_pattern }
    }
}

impl RawExporter {
    fn validate(self, issues: &mut Vec<ConfigIssue>) -> ExporterSettings {
        let command: Vec<String> = self
            .command
            .unwrap_or_default()
            .into_iter()
            .map(|part| part.trim().to_string())
            .collect();
        if command.first().is_some_and(|program| program.is_empty()) {
            issues.push(ConfigIssue::new(
                "exporter.command",
                "program name as the first element",
            ));
        }
        if self.timeout_seconds == Some(0) {
            issues.push(ConfigIssue::new("exporter.timeout_seconds", "integer >= 1"));
        }
        ExporterSettings {
            command,
            timeout_seconds: self.timeout_seconds,
        }
    }
}

/// Lower-cases an enum value and accepts `-` or spaces for `_`
fn normalize_enum(value: &str) -> String {
    value.trim().to_lowercase().replace(['-', ' '], "_")
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn is_plain_name(name: &str) -> bool {
    !name.contains(['/', '\\']) && name != "." && name != ".." && !Path::new(name).is_absolute()
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_min_size_bytes() -> u64 {
    1024
}

fn default_dwg_max_artifacts() -> usize {
    5
}

fn default_local_path() -> String {
    "logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> RawConfig {
        toml::from_str(
            r#"
schema_version = 1

[selection]
mode = "folder_filter"
filter_parameter = "Sheet Folder"
filter_value = "Issue"

[export.pdf]
enabled = true
paper_size = "A1"

[output]
root = "out"

[state]
corruption_policy = "fail"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_strip_mistyped_removes_and_reports() {
        let mut document: toml::Table = toml::from_str(
            r#"
schema_version = "1"
state = "fail"

[export.pdf]
enabled = "yes"
paper_size = "A1"
max_artifacts = -2

[exporter]
command = ["tool", 3]
"#,
        )
        .unwrap();

        let issues = strip_mistyped(&mut document);

        let keys: Vec<&str> = issues.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "schema_version",
                "export.pdf.enabled",
                "export.pdf.max_artifacts",
                "state",
                "exporter.command",
            ]
        );
        assert_eq!(issues[1].expected, "a boolean (got string)");
        let raw: RawConfig = toml::Value::Table(document).try_into().unwrap();
        assert_eq!(raw.export.pdf.paper_size.as_deref(), Some("A1"));
        assert_eq!(raw.export.pdf.enabled, None);
        assert_eq!(raw.schema_version, None);
    }

    #[test]
    fn test_minimal_config_validates() {
        let config = minimal().validate().unwrap();
        assert_eq!(config.schema_version, 1);
        assert_eq!(config.selection.mode, SelectionMode::FolderFilter);
        assert_eq!(config.export.policy, ResumePolicy::Resume);
        assert_eq!(config.export.enabled_kinds(), vec![ExportKind::Pdf]);
        assert_eq!(config.export.pdf.min_size_bytes, 1024);
        assert_eq!(config.output.progress_path(), PathBuf::from("out/progress.json"));
        assert_eq!(config.state.corruption_policy, CorruptionPolicy::Fail);
        assert_eq!(config.application.log_level, "info");
    }

    #[test]
    fn test_all_missing_keys_are_aggregated() {
        let err = RawConfig::default().validate().unwrap_err();
        assert!(err.mentions("schema_version"));
        assert!(err.mentions("selection.filter_parameter"));
        assert!(err.mentions("selection.filter_value"));
        assert!(err.mentions("export.pdf.enabled"));
        assert!(err.mentions("output.root"));
        assert!(err.mentions("state.corruption_policy"));
    }

    #[test]
    fn test_pdf_requires_paper_size() {
        let mut raw = minimal();
        raw.export.pdf.paper_size = Some("   ".to_string());
        let err = raw.validate().unwrap_err();
        assert_eq!(err.issues.len(), 1);
        assert!(err.mentions("export.pdf.paper_size"));
    }

    #[test]
    fn test_enums_are_normalized() {
        let mut raw = minimal();
        raw.selection.mode = Some(" Selection-File ".to_string());
        raw.selection.selection_file = Some("C:\\coord\\markup.json".to_string());
        raw.export.policy = Some("OVERWRITE".to_string());
        raw.state.corruption_policy = Some("Backup-And-Restart".to_string());
        let config = raw.validate().unwrap();
        assert_eq!(config.selection.mode, SelectionMode::SelectionFile);
        assert_eq!(
            config.selection.selection_file,
            Some(PathBuf::from("C:/coord/markup.json"))
        );
        assert_eq!(config.export.policy, ResumePolicy::Overwrite);
        assert_eq!(
            config.state.corruption_policy,
            CorruptionPolicy::BackupAndRestart
        );
    }

    #[test]
    fn test_invalid_enums_reported() {
        let mut raw = minimal();
        raw.selection.mode = Some("random".to_string());
        raw.export.policy = Some("sometimes".to_string());
        raw.application.log_level = Some("loud".to_string());
        let err = raw.validate().unwrap_err();
        assert!(err.mentions("selection.mode"));
        assert!(err.mentions("export.policy"));
        assert!(err.mentions("application.log_level"));
    }

    #[test]
    fn test_codes_mode_requires_codes() {
        let mut raw = minimal();
        raw.selection.mode = Some("codes".to_string());
        raw.selection.codes = Some(vec!["  ".to_string()]);
        let err = raw.validate().unwrap_err();
        assert!(err.mentions("selection.code_parameter"));
        assert!(err.mentions("selection.codes"));
    }

    #[test]
    fn test_output_names_must_be_plain() {
        let mut raw = minimal();
        raw.output.progress_file = Some("../progress.json".to_string());
        let err = raw.validate().unwrap_err();
        assert!(err.mentions("output.progress_file"));
    }

    #[test]
    fn test_group_pattern_requires_named_capture() {
        let mut raw = minimal();
        raw.identity.group_pattern = Some("(\\w+)_".to_string());
        assert!(raw.validate().unwrap_err().mentions("identity.group_pattern"));

        let mut raw = minimal();
        raw.identity.group_pattern = Some("(?P<group>\\w+".to_string());
        assert!(raw.validate().unwrap_err().mentions("identity.group_pattern"));
    }

    #[test]
    fn test_strings_are_trimmed() {
        let mut raw = minimal();
        raw.selection.filter_value = Some("  Issue ".to_string());
        raw.output.root = Some(" C:\\exports ".to_string());
        let config = raw.validate().unwrap();
        assert_eq!(config.selection.filter_value, "Issue");
        assert_eq!(config.output.root, PathBuf::from("C:/exports"));
    }
}
