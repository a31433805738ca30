//! Resource types (user defined record schemas) and their entries.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::field::FieldSchema;
use crate::workflow::null_as_empty;

/// Search and catalog hints stored alongside a resource type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTypeMetainfo {
    #[serde(default)]
    pub searchable_fields: Vec<String>,
    #[serde(default)]
    pub filterable_fields: Vec<String>,
    #[serde(default)]
    pub default_sort_field: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceType {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub fields: Vec<FieldSchema>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub metainfo: ResourceTypeMetainfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Default for ResourceType {
    fn default() -> Self {
        Self {
            id: None,
            name: String::new(),
            description: String::new(),
            version: default_version(),
            fields: Vec::new(),
            metainfo: ResourceTypeMetainfo::default(),
            created_at: None,
            updated_at: None,
        }
    }
}

fn default_version() -> String {
    "1".to_string()
}

/// One record of a resource type. `data` is keyed by field id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub resource_type_id: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub data: Map<String, JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl ResourceEntry {
    /// Label for option lists: `data[display_key]`, falling back to the id.
    pub fn label(&self, display_key: &str) -> String {
        match self.data.get(display_key) {
            Some(JsonValue::String(text)) => text.clone(),
            Some(JsonValue::Null) | None => {
                if display_key == "id" {
                    self.id.map(|id| id.to_string()).unwrap_or_default()
                } else {
                    String::new()
                }
            }
            Some(other) => other.to_string(),
        }
    }

    /// Value submitted when the entry is chosen: the entry id as text.
    pub fn option_value(&self) -> String {
        self.id.map(|id| id.to_string()).unwrap_or_default()
    }
}

/// Payload for `POST /resources/entries`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceEntryCreate {
    pub resource_type_id: i64,
    pub data: Map<String, JsonValue>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resource_type_defaults_version_and_metainfo() {
        let resource_type: ResourceType = serde_json::from_value(json!({
            "name": "Server",
            "fields": [],
            "metainfo": null
        }))
        .expect("deserialize resource type");
        assert_eq!(resource_type.version, "1");
        assert!(resource_type.metainfo.tags.is_empty());
    }

    #[test]
    fn entry_label_uses_display_key_then_id() {
        let entry: ResourceEntry = serde_json::from_value(json!({
            "id": 12,
            "resource_type_id": 1,
            "data": { "hostname": "db-01", "cores": 8 }
        }))
        .expect("deserialize entry");
        assert_eq!(entry.label("hostname"), "db-01");
        assert_eq!(entry.label("cores"), "8");
        assert_eq!(entry.label("id"), "12");
        assert_eq!(entry.option_value(), "12");
    }
}
