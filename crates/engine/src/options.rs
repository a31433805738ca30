//! Option lists for choice fields.
//!
//! Inline kinds read their options from the schema. Resource-bound kinds read
//! them from the entries of the bound resource type, which arrive
//! asynchronously; until they do, the list is empty and the field is still
//! usable.

use std::collections::HashMap;

use flowdesk_api::{ApiError, ResourceEntrySource};
use flowdesk_types::{FieldSchema, ResourceEntry};
use tracing::{debug, warn};

use crate::kind::{OptionSource, kind_spec};

/// One selectable option: the submitted value and its display label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceOption {
    pub value: String,
    pub label: String,
}

impl ChoiceOption {
    fn inline(option: &str) -> Self {
        Self {
            value: option.to_string(),
            label: option.to_string(),
        }
    }
}

/// Options for entries of a resource type, labelled by `display_key`.
pub fn resource_options(entries: &[ResourceEntry], display_key: &str) -> Vec<ChoiceOption> {
    entries
        .iter()
        .map(|entry| ChoiceOption {
            value: entry.option_value(),
            label: entry.label(display_key),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LoadState {
    /// A fetch is in flight; entries from an earlier load stay visible.
    Loading(Option<Vec<ResourceEntry>>),
    Loaded(Vec<ResourceEntry>),
    /// Loaded earlier and due for a refetch.
    Stale(Vec<ResourceEntry>),
    Failed,
}

impl LoadState {
    fn entries(&self) -> Option<&[ResourceEntry]> {
        match self {
            LoadState::Loading(Some(entries)) | LoadState::Loaded(entries) | LoadState::Stale(entries) => Some(entries),
            LoadState::Loading(None) | LoadState::Failed => None,
        }
    }
}

/// Cache of resource entries per resource type id.
#[derive(Debug, Default)]
pub struct ResourceOptionsCache {
    by_type: HashMap<i64, LoadState>,
}

impl ResourceOptionsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resource type ids referenced by `fields` that need a fetch: never
    /// requested, failed, or marked stale.
    pub fn missing_types(&self, fields: &[FieldSchema]) -> Vec<i64> {
        let mut missing = Vec::new();
        for field in fields {
            if kind_spec(&field.kind).options != OptionSource::Resource {
                continue;
            }
            let Some(type_id) = field.resource_type_id else {
                continue;
            };
            let needs_fetch = matches!(self.by_type.get(&type_id), None | Some(LoadState::Failed | LoadState::Stale(_)));
            if needs_fetch && !missing.contains(&type_id) {
                missing.push(type_id);
            }
        }
        missing
    }

    pub fn mark_loading(&mut self, resource_type_id: i64) {
        let previous = match self.by_type.remove(&resource_type_id) {
            Some(LoadState::Loaded(entries) | LoadState::Stale(entries) | LoadState::Loading(Some(entries))) => Some(entries),
            _ => None,
        };
        self.by_type.insert(resource_type_id, LoadState::Loading(previous));
    }

    /// Mark every settled type for a refetch. Loaded entries stay visible
    /// until the new list arrives.
    pub fn invalidate(&mut self) {
        for state in self.by_type.values_mut() {
            if let LoadState::Loaded(entries) = state {
                *state = LoadState::Stale(std::mem::take(entries));
            }
        }
    }

    /// Record the outcome of a fetch. Failures are logged and leave the list empty.
    pub fn store(&mut self, resource_type_id: i64, result: Result<Vec<ResourceEntry>, ApiError>) {
        let state = match result {
            Ok(entries) => {
                debug!(resource_type_id, count = entries.len(), "loaded resource options");
                LoadState::Loaded(entries)
            }
            Err(error) => {
                warn!(resource_type_id, error = %error, "failed to fetch resources");
                LoadState::Failed
            }
        };
        self.by_type.insert(resource_type_id, state);
    }

    /// Fetch every missing resource type referenced by `fields`.
    pub async fn load_for(&mut self, fields: &[FieldSchema], source: &dyn ResourceEntrySource) {
        for type_id in self.missing_types(fields) {
            self.mark_loading(type_id);
            let result = source.entries_for_type(type_id).await;
            self.store(type_id, result);
        }
    }

    pub fn is_loading(&self, resource_type_id: i64) -> bool {
        matches!(self.by_type.get(&resource_type_id), Some(LoadState::Loading(_)))
    }

    /// Options for `field`. Resource-bound fields yield an empty list until loaded.
    pub fn options_for(&self, field: &FieldSchema) -> Vec<ChoiceOption> {
        match kind_spec(&field.kind).options {
            OptionSource::None => Vec::new(),
            OptionSource::Inline => field.options().iter().map(|option| ChoiceOption::inline(option)).collect(),
            OptionSource::Resource => field
                .resource_type_id
                .and_then(|type_id| self.by_type.get(&type_id))
                .and_then(LoadState::entries)
                .map(|entries| resource_options(entries, field.display_key()))
                .unwrap_or_default(),
        }
    }
}
