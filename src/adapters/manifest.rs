//! JSON manifest document and item provider
//!
//! Reads sources that are plain JSON manifests describing a document and its
//! sheets. Useful for dry runs, inventories of exported snapshots, and tests.
//!
//! ```json
//! {
//!   "title": "Tower A",
//!   "group": "TWR",
//!   "subgroup": "ARCH",
//!   "sheets": [
//!     { "number": "A-101", "name": "Ground Floor Plan", "id": "4f2c",
//!       "attributes": { "Sheet Folder": "Issue" } },
//!     { "number": "", "name": "Stub", "id": "9a10", "placeholder": true }
//!   ]
//! }
//! ```

use crate::adapters::traits::{DocumentHandle, DocumentProvider, ItemProvider, OpenedDocument};
use crate::domain::{DocumentMeta, ItemDescriptor, SourceError, SourceErrorKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use uuid::Uuid;

/// On-disk manifest format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub subgroup: Option<String>,
    #[serde(default)]
    pub sheets: Vec<ManifestSheet>,
}

/// One sheet entry of a manifest
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManifestSheet {
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub name: String,
    pub id: String,
    #[serde(default)]
    pub placeholder: bool,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl From<&ManifestSheet> for ItemDescriptor {
    fn from(sheet: &ManifestSheet) -> Self {
        ItemDescriptor {
            number: sheet.number.clone(),
            name: sheet.name.clone(),
            opaque_id: sheet.id.clone(),
            is_placeholder: sheet.placeholder,
            selection_attributes: sheet.attributes.clone(),
        }
    }
}

/// Provider backed by JSON manifest files
#[derive(Debug, Default)]
pub struct ManifestProvider {
    open: Mutex<HashMap<DocumentHandle, (String, Manifest)>>,
}

impl ManifestProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently open
    pub fn open_count(&self) -> usize {
        self.open.lock().map(|open| open.len()).unwrap_or(0)
    }

    fn poisoned(path: &str) -> SourceError {
        SourceError::new(SourceErrorKind::Unknown, "provider state lock poisoned", path)
    }
}

#[async_trait]
impl DocumentProvider for ManifestProvider {
    async fn open(&self, path: &str) -> Result<OpenedDocument, SourceError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SourceError::from_io(&e, path))?;
        let manifest: Manifest = serde_json::from_str(&text).map_err(|e| {
            SourceError::new(
                SourceErrorKind::Unsupported,
                format!("not a sheet manifest: {e}"),
                path,
            )
        })?;

        let meta = DocumentMeta {
            title: manifest.title.clone(),
            group_id: manifest.group.clone(),
            subgroup_id: manifest.subgroup.clone(),
        };
        let handle = DocumentHandle::new(Uuid::new_v4().to_string());
        self.open
            .lock()
            .map_err(|_| Self::poisoned(path))?
            .insert(handle.clone(), (path.to_string(), manifest));

        Ok(OpenedDocument { handle, meta })
    }

    async fn close(&self, handle: &DocumentHandle) -> Result<(), SourceError> {
        let removed = self
            .open
            .lock()
            .map_err(|_| Self::poisoned(handle.as_str()))?
            .remove(handle);
        match removed {
            Some(_) => Ok(()),
            None => Err(SourceError::new(
                SourceErrorKind::Unknown,
                "document is not open",
                handle.as_str(),
            )),
        }
    }
}

#[async_trait]
impl ItemProvider for ManifestProvider {
    async fn list_items(&self, handle: &DocumentHandle) -> Result<Vec<ItemDescriptor>, SourceError> {
        let open = self.open.lock().map_err(|_| Self::poisoned(handle.as_str()))?;
        match open.get(handle) {
            Some((_, manifest)) => Ok(manifest.sheets.iter().map(ItemDescriptor::from).collect()),
            None => Err(SourceError::new(
                SourceErrorKind::Unknown,
                "document is not open",
                handle.as_str(),
            )),
        }
    }
}
