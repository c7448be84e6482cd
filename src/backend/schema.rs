//! Introspected backend data model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Collections whose name starts with this prefix belong to the backend itself.
const SYSTEM_COLLECTION_PREFIX: &str = "directus_";

/// Read-only description of the caller's collections and fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Schema {
    pub collections: BTreeMap<String, CollectionSchema>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CollectionSchema {
    pub fields: BTreeMap<String, FieldSchema>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSchema {
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub special: Vec<String>,
}

/// One entry of the backend's `/fields` listing.
#[derive(Debug, Deserialize)]
pub struct RawField {
    pub collection: String,
    pub field: String,
    #[serde(rename = "type", default)]
    pub field_type: Option<String>,
    #[serde(default)]
    pub meta: Option<RawFieldMeta>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawFieldMeta {
    #[serde(default)]
    pub interface: Option<String>,
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub special: Option<Vec<String>>,
    #[serde(default)]
    pub hidden: Option<bool>,
}

impl Schema {
    /// Builds the schema from the raw `/fields` payload, dropping system
    /// collections and hidden fields.
    pub fn from_fields(fields: Vec<RawField>) -> Self {
        let mut collections: BTreeMap<String, CollectionSchema> = BTreeMap::new();

        for raw in fields {
            if raw.collection.starts_with(SYSTEM_COLLECTION_PREFIX) {
                continue;
            }
            let meta = raw.meta.unwrap_or_default();
            if meta.hidden.unwrap_or(false) {
                continue;
            }

            let field = FieldSchema {
                field_type: raw.field_type.unwrap_or_else(|| "unknown".to_string()),
                interface: meta.interface,
                required: meta.required.unwrap_or(false),
                note: meta.note.filter(|n| !n.is_empty()),
                special: meta.special.unwrap_or_default(),
            };

            collections
                .entry(raw.collection)
                .or_default()
                .fields
                .insert(raw.field, field);
        }

        Self { collections }
    }

    /// Parses the `data` array returned by `/fields`.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let fields: Vec<RawField> = serde_json::from_value(value)?;
        Ok(Self::from_fields(fields))
    }

    pub fn has_collection(&self, name: &str) -> bool {
        self.collections.contains_key(name)
    }

    pub fn collection(&self, name: &str) -> Option<&CollectionSchema> {
        self.collections.get(name)
    }

    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}
