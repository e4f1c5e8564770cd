//! Work item descriptors supplied by the item provider

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One exportable item (a sheet) inside a source
///
/// Supplied by the external item provider and immutable for the duration of
/// one run against one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDescriptor {
    /// Item number as shown to users, e.g. `A-101`; may be empty
    pub number: String,

    /// Item name, e.g. `Ground Floor Plan`
    pub name: String,

    /// Provider-specific stable identifier
    pub opaque_id: String,

    /// Placeholder items never produce artifacts
    #[serde(default)]
    pub is_placeholder: bool,

    /// Attribute values used by the selection engine
    #[serde(default)]
    pub selection_attributes: BTreeMap<String, String>,
}

impl ItemDescriptor {
    pub fn new(
        number: impl Into<String>,
        name: impl Into<String>,
        opaque_id: impl Into<String>,
    ) -> Self {
        Self {
            number: number.into(),
            name: name.into(),
            opaque_id: opaque_id.into(),
            is_placeholder: false,
            selection_attributes: BTreeMap::new(),
        }
    }

    /// Sets a selection attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.selection_attributes.insert(name.into(), value.into());
        self
    }

    /// Marks the item as a placeholder
    pub fn placeholder(mut self) -> Self {
        self.is_placeholder = true;
        self
    }

    /// Item number with surrounding whitespace removed
    pub fn normalized_number(&self) -> &str {
        self.number.trim()
    }

    /// Identifier used in logs and surfaces: the number, or the opaque id
    /// when the number is empty
    pub fn display_id(&self) -> &str {
        let number = self.normalized_number();
        if number.is_empty() {
            &self.opaque_id
        } else {
            number
        }
    }
}
