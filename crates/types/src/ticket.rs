//! Ticket records and the per-step runtime state carried in `workflow_data`.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::field::FieldSchema;
use crate::workflow::{WorkflowConfig, null_as_empty};

/// Version stamped into the metadata of every ticket created by this client.
pub const TEMPLATE_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    #[default]
    Opened,
    InProgress,
    Completed,
    Closed,
    Deleted,
}

impl TicketStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TicketStatus::Opened => "opened",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Completed => "completed",
            TicketStatus::Closed => "closed",
            TicketStatus::Deleted => "deleted",
        }
    }

    /// True for statuses listed under the "open" filter.
    pub fn is_open(self) -> bool {
        matches!(self, TicketStatus::Opened)
    }

    /// True for statuses listed under the "closed" filter.
    pub fn is_closed(self) -> bool {
        matches!(self, TicketStatus::Completed | TicketStatus::Closed | TicketStatus::Deleted)
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Rejected,
}

impl StepStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::InProgress => "in_progress",
            StepStatus::Completed => "completed",
            StepStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit entry appended whenever a step changes state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, alias = "from_status", skip_serializing_if = "Option::is_none")]
    pub from: Option<StepStatus>,
    #[serde(default, alias = "to_status", skip_serializing_if = "Option::is_none")]
    pub to: Option<StepStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Runtime progress of a single workflow step on a ticket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepRuntimeState {
    #[serde(default)]
    pub status: StepStatus,
    #[serde(default)]
    pub assignee_id: Option<i64>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
    /// Submitted values keyed by field id.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub form_data: Map<String, JsonValue>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub history: Vec<HistoryEntry>,
}

/// Snapshot taken from the template when the ticket is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowMetadata {
    pub template_version: String,
    pub created_at: String,
    #[serde(default)]
    pub workflow_config: WorkflowConfig,
    /// Field definitions per step id, decoupled from later template edits.
    #[serde(default)]
    pub form_definitions: IndexMap<String, Vec<FieldSchema>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowData {
    pub metadata: WorkflowMetadata,
    #[serde(default)]
    pub steps: IndexMap<String, StepRuntimeState>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub status: TicketStatus,
    pub template_id: i64,
    #[serde(default)]
    pub created_by: Option<i64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub workflow_data: Option<WorkflowData>,
}

/// Payload for `POST /tickets`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketCreate {
    pub title: String,
    pub description: String,
    pub priority: String,
    pub status: TicketStatus,
    pub template_id: i64,
    pub workflow_data: WorkflowData,
}

/// Payload for `PUT /tickets/{id}`; absent members are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TicketStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_data: Option<WorkflowData>,
}
