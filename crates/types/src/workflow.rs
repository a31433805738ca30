//! Ticket template and workflow step definitions.
//!
//! A template owns an ordered list of [`WorkflowStep`]s, and every step owns
//! its own form (a list of [`FieldSchema`]). Steps and fields have no identity
//! outside their template. Authoring order is preserved everywhere because the
//! builders and the graph layout render in list order.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::field::FieldSchema;

/// Events a notification rule can subscribe to.
pub const NOTIFICATION_EVENTS: [&str; 8] = [
    "step_started",
    "step_completed",
    "step_overdue",
    "step_skipped",
    "ticket_created",
    "ticket_assigned",
    "ticket_updated",
    "ticket_completed",
];

/// Delivery channels a notification rule can target.
pub const NOTIFICATION_CHANNELS: [&str; 2] = ["email", "slack"];

/// One stage of a ticket's lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Generated identifier, stable for the lifetime of the template.
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Role names allowed to take this step.
    #[serde(default)]
    pub assignable_roles: Vec<String>,
    /// Data collection form for this step.
    #[serde(default)]
    pub form: Vec<FieldSchema>,
    /// Ids of steps that must complete before this one.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub dependencies: Vec<String>,
}

impl WorkflowStep {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            description: String::new(),
            assignable_roles: Vec::new(),
            form: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    /// Replaces the dependency list, dropping self references and duplicates.
    pub fn set_dependencies<I, S>(&mut self, dependencies: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut cleaned: Vec<String> = Vec::new();
        for dependency in dependencies.into_iter().map(Into::into) {
            if dependency != self.id && !cleaned.contains(&dependency) {
                cleaned.push(dependency);
            }
        }
        self.dependencies = cleaned;
    }
}

/// Subscription of a set of roles to a workflow event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRule {
    pub event: String,
    #[serde(default)]
    pub notify_roles: Vec<String>,
    #[serde(default)]
    pub channels: Vec<String>,
}

impl Default for NotificationRule {
    fn default() -> Self {
        Self {
            event: NOTIFICATION_EVENTS[0].to_string(),
            notify_roles: Vec::new(),
            channels: vec!["email".to_string()],
        }
    }
}

/// Execution flags and notification rules for a workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    #[serde(default)]
    pub parallel_execution: bool,
    #[serde(default)]
    pub auto_assignment: bool,
    #[serde(default)]
    pub notification_rules: Vec<NotificationRule>,
}

/// Default priority assigned to tickets created from a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(format!("unknown priority '{other}'; expected low, medium, or high")),
        }
    }
}

/// Blueprint for tickets: metadata plus the ordered workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketTemplate {
    /// Server assigned identifier; absent until the template is created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default)]
    pub title_format: String,
    #[serde(default)]
    pub default_priority: Priority,
    #[serde(default)]
    pub workflow: Vec<WorkflowStep>,
    #[serde(default)]
    pub workflow_config: WorkflowConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl TicketTemplate {
    pub fn step(&self, step_id: &str) -> Option<&WorkflowStep> {
        self.workflow.iter().find(|step| step.id == step_id)
    }

    /// Step ids in workflow order.
    pub fn step_order(&self) -> Vec<String> {
        self.workflow.iter().map(|step| step.id.clone()).collect()
    }

    /// Expands `title_format` placeholders of the form `{field_name}`.
    ///
    /// Unknown placeholders are left untouched.
    pub fn render_title(&self, values: &serde_json::Map<String, serde_json::Value>) -> String {
        let mut title = self.title_format.clone();
        for (key, value) in values {
            let needle = format!("{{{key}}}");
            if title.contains(&needle) {
                let replacement = match value {
                    serde_json::Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                title = title.replace(&needle, &replacement);
            }
        }
        title
    }
}

pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn template_deserializes_with_null_dependencies() {
        let template: TicketTemplate = serde_json::from_value(json!({
            "id": 4,
            "name": "Onboarding",
            "description": null,
            "title_format": "Onboard {employee}",
            "default_priority": "high",
            "workflow": [
                { "id": "s1", "name": "Request", "description": "Collect details", "assignable_roles": ["hr"], "form": [], "dependencies": null }
            ],
            "workflow_config": { "parallel_execution": false, "auto_assignment": true, "notification_rules": [] }
        }))
        .expect("deserialize template");

        assert_eq!(template.default_priority, Priority::High);
        assert!(template.workflow[0].dependencies.is_empty());
        assert!(template.description.is_empty());
        assert_eq!(template.step_order(), vec!["s1".to_string()]);
    }

    #[test]
    fn set_dependencies_filters_self_and_duplicates() {
        let mut step = WorkflowStep::new("s2");
        step.set_dependencies(["s1", "s2", "s1", "s3"]);
        assert_eq!(step.dependencies, vec!["s1".to_string(), "s3".to_string()]);
    }

    #[test]
    fn renders_title_placeholders() {
        let template: TicketTemplate = serde_json::from_value(json!({
            "name": "Access",
            "title_format": "Access for {user} ({level})"
        }))
        .expect("deserialize template");
        let values = json!({ "user": "ada", "level": 2 });
        let title = template.render_title(values.as_object().expect("object"));
        assert_eq!(title, "Access for ada (2)");
    }

    #[test]
    fn notification_rule_defaults_match_builder() {
        let rule = NotificationRule::default();
        assert_eq!(rule.event, "step_started");
        assert!(rule.notify_roles.is_empty());
        assert_eq!(rule.channels, vec!["email".to_string()]);
    }
}
