//! Resource type authoring.

use std::fmt;

use flowdesk_types::{FieldSchema, ResourceType, ResourceTypeMetainfo};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::builder::form::FormBuilder;
use crate::builder::template::normalize_field;

pub const RESOURCE_NAME_REQUIRED: &str = "Resource name is required";
pub const VERSION_REQUIRED: &str = "Version is required";
pub const FIELDS_REQUIRED: &str = "At least one field is required";
pub const FIELDS_INVALID: &str = "Fix the field errors before saving";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceErrorKey {
    Name,
    Version,
    Fields,
}

impl fmt::Display for ResourceErrorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = match self {
            ResourceErrorKey::Name => "resourceName",
            ResourceErrorKey::Version => "version",
            ResourceErrorKey::Fields => "fields",
        };
        f.write_str(key)
    }
}

pub type ResourceErrors = IndexMap<ResourceErrorKey, String>;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ResourceSuggestion {
    name: String,
    description: Option<String>,
    version: Option<String>,
    fields: Vec<FieldSchema>,
    metainfo: Option<ResourceTypeMetainfo>,
}

#[derive(Debug, Clone)]
pub struct ResourceBuilder {
    pub id: Option<i64>,
    pub name: String,
    pub description: String,
    pub version: String,
    pub metainfo: ResourceTypeMetainfo,
    pub form: FormBuilder,
    errors: ResourceErrors,
}

impl Default for ResourceBuilder {
    fn default() -> Self {
        Self::from_resource_type(&ResourceType::default())
    }
}

impl ResourceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_resource_type(resource_type: &ResourceType) -> Self {
        Self {
            id: resource_type.id,
            name: resource_type.name.clone(),
            description: resource_type.description.clone(),
            version: resource_type.version.clone(),
            metainfo: resource_type.metainfo.clone(),
            form: FormBuilder::new(resource_type.fields.clone()),
            errors: ResourceErrors::new(),
        }
    }

    /// Start from an assistant suggestion; missing members take the defaults
    /// of a new resource type.
    pub fn from_suggestion(suggestion: &Value) -> Result<Self, serde_json::Error> {
        let suggestion: ResourceSuggestion = serde_json::from_value(suggestion.clone())?;
        debug!(name = %suggestion.name, fields = suggestion.fields.len(), "loading resource suggestion");
        let defaults = ResourceType::default();
        Ok(Self::from_resource_type(&ResourceType {
            name: suggestion.name,
            description: suggestion.description.unwrap_or_default(),
            version: suggestion.version.unwrap_or_else(|| defaults.version.clone()),
            fields: suggestion.fields,
            metainfo: suggestion.metainfo.unwrap_or_default(),
            ..defaults
        }))
    }

    pub fn is_update(&self) -> bool {
        self.id.is_some()
    }

    pub fn errors(&self) -> &ResourceErrors {
        &self.errors
    }

    pub fn error(&self, key: ResourceErrorKey) -> Option<&str> {
        self.errors.get(&key).map(String::as_str)
    }

    pub fn clear_error(&mut self, key: ResourceErrorKey) {
        self.errors.shift_remove(&key);
    }

    pub fn validate(&mut self) -> bool {
        let mut errors = ResourceErrors::new();
        if self.name.trim().is_empty() {
            errors.insert(ResourceErrorKey::Name, RESOURCE_NAME_REQUIRED.to_string());
        }
        if self.version.trim().is_empty() {
            errors.insert(ResourceErrorKey::Version, VERSION_REQUIRED.to_string());
        }
        if self.form.fields().is_empty() {
            errors.insert(ResourceErrorKey::Fields, FIELDS_REQUIRED.to_string());
        } else if !self.form.validate_all() {
            errors.insert(ResourceErrorKey::Fields, FIELDS_INVALID.to_string());
        }
        self.errors = errors;
        self.errors.is_empty()
    }

    pub fn save(&mut self) -> Result<ResourceType, ResourceErrors> {
        if !self.validate() {
            return Err(self.errors.clone());
        }
        Ok(ResourceType {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            version: self.version.clone(),
            fields: self.form.fields().iter().cloned().map(normalize_field).collect(),
            metainfo: self.metainfo.clone(),
            created_at: None,
            updated_at: None,
        })
    }
}
