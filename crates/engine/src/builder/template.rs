//! Ticket template authoring.
//!
//! The builder holds the template's metadata, its [`StepList`], and the
//! notification rules. [`TemplateBuilder::save`] validates everything,
//! normalises every form field, and yields the template to persist. It never
//! fails with an exception: problems come back as a [`TemplateErrors`] map
//! keyed by the input that needs attention.

use std::collections::{HashMap, HashSet};
use std::fmt;

use flowdesk_types::{FieldSchema, Priority, TicketTemplate, WorkflowConfig, WorkflowStep, validate_field_definition};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::builder::form::FormBuilder;
use crate::builder::notifications::NotificationRules;
use crate::workflow::StepList;

pub const NAME_REQUIRED: &str = "Template name is required";
pub const TITLE_FORMAT_REQUIRED: &str = "Default title format is required";
pub const STEP_REQUIRED: &str = "At least one step is required";
pub const STEP_NAME_REQUIRED: &str = "Step name is required";
pub const STEP_DESCRIPTION_REQUIRED: &str = "Step description is required";
pub const STEP_NAME_DUPLICATE: &str = "Step name must be unique";
pub const STEP_FORM_INVALID: &str = "Fix the field errors in this step's form";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TemplateErrorKey {
    Name,
    TitleFormat,
    /// Problems with the workflow as a whole.
    Workflow,
    StepName(String),
    StepDescription(String),
    StepForm(String),
}

impl fmt::Display for TemplateErrorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateErrorKey::Name => f.write_str("templateName"),
            TemplateErrorKey::TitleFormat => f.write_str("titleFormat"),
            TemplateErrorKey::Workflow => f.write_str("workflow.general"),
            TemplateErrorKey::StepName(id) => write!(f, "workflow.{id}.name"),
            TemplateErrorKey::StepDescription(id) => write!(f, "workflow.{id}.description"),
            TemplateErrorKey::StepForm(id) => write!(f, "workflow.{id}.form"),
        }
    }
}

pub type TemplateErrors = IndexMap<TemplateErrorKey, String>;

/// Template payload proposed by the assistant. Every member is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct TemplateSuggestion {
    name: String,
    description: Option<String>,
    title_format: String,
    default_priority: Option<Priority>,
    workflow: Vec<WorkflowStep>,
    workflow_config: Option<WorkflowConfig>,
}

#[derive(Debug, Clone, Default)]
pub struct TemplateBuilder {
    /// Set when editing an existing template.
    pub id: Option<i64>,
    pub name: String,
    pub description: String,
    pub title_format: String,
    pub default_priority: Priority,
    pub parallel_execution: bool,
    pub auto_assignment: bool,
    pub notifications: NotificationRules,
    steps: StepList,
    form_errors: HashMap<String, bool>,
    errors: TemplateErrors,
}

impl TemplateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing template (update mode).
    pub fn from_template(template: &TicketTemplate) -> Self {
        Self {
            id: template.id,
            name: template.name.clone(),
            description: template.description.clone(),
            title_format: template.title_format.clone(),
            default_priority: template.default_priority,
            parallel_execution: template.workflow_config.parallel_execution,
            auto_assignment: template.workflow_config.auto_assignment,
            notifications: NotificationRules::new(template.workflow_config.notification_rules.clone()),
            steps: StepList::new(template.workflow.clone()),
            ..Self::default()
        }
    }

    /// Start from an assistant suggestion. The result is a new template.
    pub fn from_suggestion(suggestion: &Value) -> Result<Self, serde_json::Error> {
        let suggestion: TemplateSuggestion = serde_json::from_value(suggestion.clone())?;
        let config = suggestion.workflow_config.unwrap_or_default();
        debug!(name = %suggestion.name, steps = suggestion.workflow.len(), "loading template suggestion");
        Ok(Self {
            name: suggestion.name,
            description: suggestion.description.unwrap_or_default(),
            title_format: suggestion.title_format,
            default_priority: suggestion.default_priority.unwrap_or_default(),
            parallel_execution: config.parallel_execution,
            auto_assignment: config.auto_assignment,
            notifications: NotificationRules::new(config.notification_rules),
            steps: StepList::new(suggestion.workflow),
            ..Self::default()
        })
    }

    pub fn is_update(&self) -> bool {
        self.id.is_some()
    }

    pub fn steps(&self) -> &StepList {
        &self.steps
    }

    pub fn steps_mut(&mut self) -> &mut StepList {
        &mut self.steps
    }

    pub fn remove_step(&mut self, step_id: &str) -> Option<WorkflowStep> {
        self.form_errors.remove(step_id);
        self.errors.retain(|key, _| !key_mentions_step(key, step_id));
        self.steps.remove_step(step_id)
    }

    /// Field editor for a step's form.
    pub fn form_builder(&self, step_id: &str) -> Option<FormBuilder> {
        self.steps.get(step_id).map(|step| FormBuilder::new(step.form.clone()))
    }

    /// Write an edited form back into its step and record its error flag.
    pub fn commit_form(&mut self, step_id: &str, form: FormBuilder) -> bool {
        let has_errors = form.has_errors();
        if !self.steps.set_form(step_id, form.into_fields()) {
            return false;
        }
        self.form_errors.insert(step_id.to_string(), has_errors);
        true
    }

    pub fn errors(&self) -> &TemplateErrors {
        &self.errors
    }

    pub fn error(&self, key: &TemplateErrorKey) -> Option<&str> {
        self.errors.get(key).map(String::as_str)
    }

    /// Drop the error shown for one input, as when the user edits it.
    pub fn clear_error(&mut self, key: &TemplateErrorKey) {
        self.errors.shift_remove(key);
    }

    pub fn workflow_config(&self) -> WorkflowConfig {
        WorkflowConfig {
            parallel_execution: self.parallel_execution,
            auto_assignment: self.auto_assignment,
            notification_rules: self.notifications.rules().to_vec(),
        }
    }

    /// Check everything that gates saving. The error map is replaced.
    pub fn validate(&mut self) -> bool {
        let mut errors = TemplateErrors::new();

        if self.name.trim().is_empty() {
            errors.insert(TemplateErrorKey::Name, NAME_REQUIRED.to_string());
        }
        if self.title_format.trim().is_empty() {
            errors.insert(TemplateErrorKey::TitleFormat, TITLE_FORMAT_REQUIRED.to_string());
        }

        if self.steps.is_empty() {
            errors.insert(TemplateErrorKey::Workflow, STEP_REQUIRED.to_string());
        }

        let mut seen_names: HashSet<String> = HashSet::new();
        for step in self.steps.steps() {
            let name = step.name.trim();
            if name.is_empty() {
                errors.insert(TemplateErrorKey::StepName(step.id.clone()), STEP_NAME_REQUIRED.to_string());
            } else if !seen_names.insert(name.to_lowercase()) {
                errors.insert(TemplateErrorKey::StepName(step.id.clone()), STEP_NAME_DUPLICATE.to_string());
            }
            if step.description.trim().is_empty() {
                errors.insert(TemplateErrorKey::StepDescription(step.id.clone()), STEP_DESCRIPTION_REQUIRED.to_string());
            }
            let flagged = self.form_errors.get(&step.id).copied().unwrap_or(false);
            if flagged || form_has_errors(&step.form) {
                errors.insert(TemplateErrorKey::StepForm(step.id.clone()), STEP_FORM_INVALID.to_string());
            }
        }

        self.errors = errors;
        self.errors.is_empty()
    }

    /// Validate and produce the template to persist.
    pub fn save(&mut self) -> Result<TicketTemplate, TemplateErrors> {
        if !self.validate() {
            debug!(errors = self.errors.len(), "template save blocked by validation");
            return Err(self.errors.clone());
        }

        let workflow = self
            .steps
            .steps()
            .iter()
            .cloned()
            .map(|mut step| {
                step.form = step.form.into_iter().map(normalize_field).collect();
                step
            })
            .collect();

        Ok(TicketTemplate {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            title_format: self.title_format.clone(),
            default_priority: self.default_priority,
            workflow,
            workflow_config: self.workflow_config(),
            created_by: None,
            created_at: None,
            updated_at: None,
        })
    }
}

fn form_has_errors(fields: &[FieldSchema]) -> bool {
    fields.iter().any(|field| !validate_field_definition(field, fields).is_empty())
}

fn key_mentions_step(key: &TemplateErrorKey, step_id: &str) -> bool {
    match key {
        TemplateErrorKey::StepName(id) | TemplateErrorKey::StepDescription(id) | TemplateErrorKey::StepForm(id) => id == step_id,
        _ => false,
    }
}

/// Fill the attributes every persisted field carries.
pub fn normalize_field(mut field: FieldSchema) -> FieldSchema {
    if field.label.trim().is_empty() {
        field.label = field.name.clone();
    }
    if field.placeholder.is_none() {
        field.placeholder = Some(String::new());
    }
    field
}
