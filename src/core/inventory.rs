//! Inventory generation
//!
//! Opens every source of a model list, lists and selects its items, and
//! records what an export run would do. Nothing is exported. The inventory
//! document is written with an atomic replace.

use crate::adapters::traits::{DocumentProvider, ItemProvider};
use crate::config::RunConfig;
use crate::core::atomic::write_json_atomic;
use crate::core::export::naming::artifact_path;
use crate::core::model_list::ModelList;
use crate::core::ordering::sort_items;
use crate::core::selection::{SelectionEngine, SelectionStats};
use crate::domain::{DocumentMeta, ExportKind, Result, SourceIdentity};
use crate::logging::ErrorCapture;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One item of an inventoried source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub number: String,
    pub name: String,
    pub opaque_id: String,
    pub is_placeholder: bool,
    pub selected: bool,
    /// Kinds an export run would attempt
    pub kinds: Vec<ExportKind>,
    /// Expected artifact path per selected kind
    pub outputs: BTreeMap<ExportKind, String>,
}

/// Inventory of one source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInventory {
    pub source: SourceIdentity,
    pub open_error: Option<String>,
    pub selection: SelectionStats,
    pub missing_reference_keys: Vec<String>,
    /// Every item in ordering-key order, placeholders included
    pub items: Vec<InventoryItem>,
}

/// Inventory of a whole model list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub generated_at: DateTime<Utc>,
    pub sources: Vec<SourceInventory>,
}

impl Inventory {
    /// Sources the provider could not open or enumerate
    pub fn failed_sources(&self) -> usize {
        self.sources.iter().filter(|s| s.open_error.is_some()).count()
    }

    /// Total selected items across all sources
    pub fn selected_items(&self) -> usize {
        self.sources
            .iter()
            .flat_map(|s| s.items.iter())
            .filter(|item| item.selected)
            .count()
    }
}

/// Builds the inventory and writes it to the configured inventory file
///
/// # Errors
///
/// Fails when selection inputs cannot be loaded or the inventory cannot be
/// written. Sources that fail to open are recorded in the inventory.
pub async fn build_inventory(
    config: &RunConfig,
    model_list: &ModelList,
    documents: &dyn DocumentProvider,
    items: &dyn ItemProvider,
    capture: &ErrorCapture,
) -> Result<Inventory> {
    let engine = SelectionEngine::prepare(config)?;
    let pattern = config.identity.group_pattern.as_ref();
    let mut inventory = Inventory {
        generated_at: Utc::now(),
        sources: Vec::with_capacity(model_list.paths.len()),
    };

    for path in &model_list.paths {
        let opened = match documents.open(path).await {
            Ok(opened) => opened,
            Err(e) => {
                let identity = SourceIdentity::infer(path, &DocumentMeta::default(), pattern);
                capture.error(
                    Some(identity.source_id.as_str()),
                    None,
                    "Source could not be opened",
                    Some(&e.to_string()),
                );
                inventory.sources.push(failed_source(identity, e.to_string()));
                continue;
            }
        };

        let identity = SourceIdentity::infer(path, &opened.meta, pattern);
        let listed = items.list_items(&opened.handle).await;
        if let Err(e) = documents.close(&opened.handle).await {
            capture.warn(
                Some(identity.source_id.as_str()),
                None,
                "Source close failed",
                Some(&e.to_string()),
            );
        }

        let mut descriptors = match listed {
            Ok(descriptors) => descriptors,
            Err(e) => {
                capture.error(
                    Some(identity.source_id.as_str()),
                    None,
                    "Item listing failed",
                    Some(&e.to_string()),
                );
                inventory.sources.push(failed_source(identity, e.to_string()));
                continue;
            }
        };

        let selection = engine.select_with(&descriptors, |item, attribute| items.lookup(item, attribute));
        sort_items(&mut descriptors);

        let selected: BTreeMap<&str, &[ExportKind]> = selection
            .ordered_items
            .iter()
            .map(|s| (s.descriptor.opaque_id.as_str(), s.kinds.as_slice()))
            .collect();

        let entries = descriptors
            .iter()
            .map(|item| {
                let kinds = selected.get(item.opaque_id.as_str()).map(|k| k.to_vec());
                let outputs = kinds
                    .iter()
                    .flatten()
                    .map(|kind| {
                        let path = artifact_path(&config.output.root, &identity, *kind, item);
                        (*kind, path.to_string_lossy().into_owned())
                    })
                    .collect();
                InventoryItem {
                    number: item.number.clone(),
                    name: item.name.clone(),
                    opaque_id: item.opaque_id.clone(),
                    is_placeholder: item.is_placeholder,
                    selected: kinds.is_some(),
                    kinds: kinds.unwrap_or_default(),
                    outputs,
                }
            })
            .collect();

        tracing::info!(
            source_id = %identity.source_id,
            items = descriptors.len(),
            selected = selection.ordered_items.len(),
            "Source inventoried"
        );

        inventory.sources.push(SourceInventory {
            source: identity,
            open_error: None,
            selection: selection.stats,
            missing_reference_keys: selection.missing_reference_keys,
            items: entries,
        });
    }

    write_json_atomic(&config.output.inventory_path(), &inventory)?;
    Ok(inventory)
}

fn failed_source(source: SourceIdentity, error: String) -> SourceInventory {
    SourceInventory {
        source,
        open_error: Some(error),
        selection: SelectionStats::default(),
        missing_reference_keys: Vec::new(),
        items: Vec::new(),
    }
}
