//! Selection engine
//!
//! Computes the ordered work set for one source. Placeholders are always
//! excluded first; then exactly one mode applies:
//!
//! - **folder filter**: one attribute compared to one required value
//! - **selection file**: coordinator markup keyed by item number
//! - **codes**: attribute membership in a code set
//!
//! Missing or empty attributes are counted, never raised. Selected items
//! must have distinct display ids, since checkpoint records, report rows and
//! artifact names are keyed by them; later duplicates in ordering-key order
//! are excluded and listed. Inputs that can fail (markup file, codes file)
//! are loaded by [`SelectionEngine::prepare`] before any source is opened.

pub mod codes;
pub mod markup;

pub use codes::CodeSet;
pub use markup::{MarkupAnomaly, MarkupEntry, SelectionMarkup};

use crate::config::{RunConfig, SelectionMode, SelectionSettings};
use crate::core::ordering::{compare_items, sort_numbers};
use crate::domain::{ExportKind, ItemDescriptor, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Selection counters for one source
///
/// `total` counts non-placeholder items. For every mode,
/// `matched + missing_attribute + empty_attribute + excluded == total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionStats {
    pub total: usize,
    pub excluded_placeholder: usize,
    pub matched: usize,
    pub missing_attribute: usize,
    pub empty_attribute: usize,
    pub excluded: usize,
    /// Matching items dropped for repeating a display id; part of `excluded`
    #[serde(default)]
    pub excluded_duplicate: usize,
}

impl SelectionStats {
    /// True when the mode counters add up to `total`
    pub fn is_consistent(&self) -> bool {
        self.matched + self.missing_attribute + self.empty_attribute + self.excluded == self.total
    }
}

/// One selected item and the kinds to export for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedItem {
    pub descriptor: ItemDescriptor,
    /// Requested kinds intersected with enabled kinds, canonical order
    pub kinds: Vec<ExportKind>,
    pub priority: Option<i64>,
    pub notes: Option<String>,
}

/// Ordered work set for one source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionResult {
    pub ordered_items: Vec<SelectedItem>,
    pub stats: SelectionStats,
    /// Markup keys with no matching item in this source
    pub missing_reference_keys: Vec<String>,
    /// Items whose code attribute was absent (codes mode)
    pub missing_attribute_items: Vec<String>,
    /// Display ids of selected items dropped as duplicates
    #[serde(default)]
    pub duplicate_items: Vec<String>,
}

impl SelectionResult {
    /// Number of (item, kind) pairs selected for `kind`
    pub fn selected_for(&self, kind: ExportKind) -> usize {
        self.ordered_items
            .iter()
            .filter(|item| item.kinds.contains(&kind))
            .count()
    }
}

/// Prepared selection engine for one run
#[derive(Debug, Clone)]
pub struct SelectionEngine {
    settings: SelectionSettings,
    enabled_kinds: Vec<ExportKind>,
    markup: Option<SelectionMarkup>,
    codes: Option<CodeSet>,
}

impl SelectionEngine {
    /// Loads mode-specific inputs
    ///
    /// # Errors
    ///
    /// Fails on an unreadable or structurally invalid selection file, an
    /// unreadable codes file, or an empty code set.
    pub fn prepare(config: &RunConfig) -> Result<Self> {
        let settings = config.selection.clone();
        let mut engine = Self {
            enabled_kinds: config.export.enabled_kinds(),
            markup: None,
            codes: None,
            settings,
        };

        match engine.settings.mode {
            SelectionMode::FolderFilter => {}
            SelectionMode::SelectionFile => {
                if let Some(path) = &engine.settings.selection_file {
                    let markup = SelectionMarkup::load(path)?;
                    for anomaly in &markup.anomalies {
                        tracing::warn!(
                            key = %anomaly.key,
                            reason = %anomaly.message,
                            "Selection markup entry ignored or suspicious"
                        );
                    }
                    engine.markup = Some(markup);
                }
            }
            SelectionMode::Codes => {
                engine.codes = Some(CodeSet::from_settings(&engine.settings)?);
            }
        }
        Ok(engine)
    }

    /// Builds an engine from already-loaded parts
    pub fn from_parts(
        settings: SelectionSettings,
        enabled_kinds: Vec<ExportKind>,
        markup: Option<SelectionMarkup>,
        codes: Option<CodeSet>,
    ) -> Self {
        Self {
            settings,
            enabled_kinds,
            markup,
            codes,
        }
    }

    pub fn mode(&self) -> SelectionMode {
        self.settings.mode
    }

    pub fn markup(&self) -> Option<&SelectionMarkup> {
        self.markup.as_ref()
    }

    /// Selects using each descriptor's own attribute map
    pub fn select(&self, descriptors: &[ItemDescriptor]) -> SelectionResult {
        self.select_with(descriptors, |item, name| {
            item.selection_attributes.get(name).cloned()
        })
    }

    /// Selects using an external attribute lookup
    pub fn select_with<F>(&self, descriptors: &[ItemDescriptor], lookup: F) -> SelectionResult
    where
        F: Fn(&ItemDescriptor, &str) -> Option<String>,
    {
        let mut result = SelectionResult::default();
        let mut seen_numbers = BTreeSet::new();

        for item in descriptors {
            if item.is_placeholder {
                result.stats.excluded_placeholder += 1;
                continue;
            }
            result.stats.total += 1;
            seen_numbers.insert(item.normalized_number().to_string());

            match self.settings.mode {
                SelectionMode::FolderFilter => self.apply_folder_filter(item, &lookup, &mut result),
                SelectionMode::SelectionFile => self.apply_markup(item, &mut result),
                SelectionMode::Codes => self.apply_codes(item, &lookup, &mut result),
            }
        }

        if let Some(markup) = &self.markup {
            result.missing_reference_keys = markup
                .entries
                .keys()
                .filter(|key| !seen_numbers.contains(key.as_str()))
                .cloned()
                .collect();
            sort_numbers(&mut result.missing_reference_keys);
        }

        result
            .ordered_items
            .sort_by(|a, b| compare_items(&a.descriptor, &b.descriptor));
        drop_duplicate_ids(&mut result);
        result
    }

    fn apply_folder_filter<F>(&self, item: &ItemDescriptor, lookup: &F, result: &mut SelectionResult)
    where
        F: Fn(&ItemDescriptor, &str) -> Option<String>,
    {
        match lookup(item, &self.settings.filter_parameter) {
            None => result.stats.missing_attribute += 1,
            Some(value) if value.trim().is_empty() => result.stats.empty_attribute += 1,
            Some(value) if value.trim() == self.settings.filter_value => {
                result.stats.matched += 1;
                result.ordered_items.push(self.selected(item, self.enabled_kinds.clone(), None));
            }
            Some(_) => result.stats.excluded += 1,
        }
    }

    fn apply_markup(&self, item: &ItemDescriptor, result: &mut SelectionResult) {
        let entry = self
            .markup
            .as_ref()
            .and_then(|markup| markup.get(item.normalized_number()))
            .filter(|_| !item.normalized_number().is_empty());

        let kinds: Vec<ExportKind> = match entry {
            Some(entry) => self
                .enabled_kinds
                .iter()
                .copied()
                .filter(|kind| entry.requests(*kind))
                .collect(),
            None => Vec::new(),
        };

        if kinds.is_empty() {
            result.stats.excluded += 1;
        } else {
            result.stats.matched += 1;
            result.ordered_items.push(self.selected(item, kinds, entry));
        }
    }

    fn apply_codes<F>(&self, item: &ItemDescriptor, lookup: &F, result: &mut SelectionResult)
    where
        F: Fn(&ItemDescriptor, &str) -> Option<String>,
    {
        let value = lookup(item, &self.settings.code_parameter);
        if value.is_none() {
            result.missing_attribute_items.push(item.display_id().to_string());
        }
        let is_member = match (&value, &self.codes) {
            (Some(v), Some(codes)) => !v.trim().is_empty() && codes.contains(v),
            _ => false,
        };
        if is_member {
            result.stats.matched += 1;
            result.ordered_items.push(self.selected(item, self.enabled_kinds.clone(), None));
        } else {
            result.stats.excluded += 1;
        }
    }

    fn selected(
        &self,
        item: &ItemDescriptor,
        kinds: Vec<ExportKind>,
        entry: Option<&MarkupEntry>,
    ) -> SelectedItem {
        SelectedItem {
            descriptor: item.clone(),
            kinds,
            priority: entry.and_then(|e| e.priority),
            notes: entry.and_then(|e| e.notes.clone()),
        }
    }
}

/// Keeps the first selected item per display id
fn drop_duplicate_ids(result: &mut SelectionResult) {
    let mut seen = BTreeSet::new();
    let items = std::mem::take(&mut result.ordered_items);
    for item in items {
        let id = item.descriptor.display_id().to_string();
        if seen.insert(id.clone()) {
            result.ordered_items.push(item);
        } else {
            result.stats.matched -= 1;
            result.stats.excluded += 1;
            result.stats.excluded_duplicate += 1;
            result.duplicate_items.push(id);
        }
    }
}
