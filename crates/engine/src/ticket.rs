//! Ticket lifecycle: creation from a template, step assignment, step
//! submission, and progress summaries.
//!
//! Every transition works on a copy of the ticket's `workflow_data` and
//! returns the [`TicketUpdate`] to send; the ticket itself is never mutated
//! here. Field definitions always come from the snapshot taken at creation,
//! so later template edits do not affect existing tickets.

use std::fmt;

use chrono::{DateTime, Utc};
use flowdesk_types::{
    HistoryEntry, Priority, StepRuntimeState, StepStatus, TEMPLATE_VERSION, Ticket, TicketCreate, TicketStatus, TicketTemplate, TicketUpdate,
    WorkflowData, WorkflowMetadata,
};
use flowdesk_util::iso_timestamp;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::form_state::FormState;

pub const STATUS_CHANGE: &str = "status_change";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TicketError {
    #[error("template '{0}' has not been saved yet")]
    UnsavedTemplate(String),
    #[error("template '{0}' has no workflow steps")]
    EmptyWorkflow(String),
    #[error("ticket {0} has no workflow data")]
    MissingWorkflowData(i64),
    #[error("step '{0}' is not part of this ticket")]
    UnknownStep(String),
    #[error("step '{0}' is already completed")]
    StepCompleted(String),
}

/// Build the create payload for a ticket of `template`.
///
/// A blank `title` falls back to the template's title format and a missing
/// `priority` to its default priority.
pub fn ticket_from_template(
    template: &TicketTemplate,
    title: &str,
    priority: Option<Priority>,
    now: DateTime<Utc>,
) -> Result<TicketCreate, TicketError> {
    let template_id = template.id.ok_or_else(|| TicketError::UnsavedTemplate(template.name.clone()))?;
    if template.workflow.is_empty() {
        return Err(TicketError::EmptyWorkflow(template.name.clone()));
    }

    let metadata = WorkflowMetadata {
        template_version: TEMPLATE_VERSION.to_string(),
        created_at: iso_timestamp(now),
        workflow_config: template.workflow_config.clone(),
        form_definitions: template.workflow.iter().map(|step| (step.id.clone(), step.form.clone())).collect(),
    };
    let steps = template
        .workflow
        .iter()
        .map(|step| (step.id.clone(), StepRuntimeState::default()))
        .collect();

    let title = if title.trim().is_empty() { template.title_format.clone() } else { title.to_string() };
    debug!(template_id, steps = template.workflow.len(), "building ticket payload");
    Ok(TicketCreate {
        title,
        description: String::new(),
        priority: priority.unwrap_or(template.default_priority).to_string(),
        status: TicketStatus::Opened,
        template_id,
        workflow_data: WorkflowData { metadata, steps },
    })
}

fn workflow_data(ticket: &Ticket) -> Result<WorkflowData, TicketError> {
    ticket.workflow_data.clone().ok_or(TicketError::MissingWorkflowData(ticket.id))
}

fn status_change(from: StepStatus, to: StepStatus, user_id: Option<i64>, now: DateTime<Utc>) -> HistoryEntry {
    HistoryEntry {
        timestamp: iso_timestamp(now),
        kind: STATUS_CHANGE.to_string(),
        from: Some(from),
        to: Some(to),
        user_id,
        content: None,
    }
}

/// Take a step: assign it to `user_id` and move it to `in_progress`.
pub fn assign_step(ticket: &Ticket, step_id: &str, user_id: i64, now: DateTime<Utc>) -> Result<TicketUpdate, TicketError> {
    let mut data = workflow_data(ticket)?;
    let step = data.steps.get_mut(step_id).ok_or_else(|| TicketError::UnknownStep(step_id.to_string()))?;
    if step.status == StepStatus::Completed {
        return Err(TicketError::StepCompleted(step_id.to_string()));
    }

    let from = step.status;
    step.assignee_id = Some(user_id);
    step.status = StepStatus::InProgress;
    step.started_at = Some(iso_timestamp(now));
    step.history.push(status_change(from, StepStatus::InProgress, Some(user_id), now));
    debug!(ticket_id = ticket.id, step_id, user_id, "assigned step");

    Ok(TicketUpdate {
        workflow_data: Some(data),
        ..TicketUpdate::default()
    })
}

/// Store a step's form data. A draft keeps the step in progress; otherwise
/// the step completes, and the ticket completes once every step has.
pub fn submit_step(
    ticket: &Ticket,
    step_id: &str,
    form_data: Map<String, Value>,
    draft: bool,
    user_id: Option<i64>,
    now: DateTime<Utc>,
) -> Result<TicketUpdate, TicketError> {
    let mut data = workflow_data(ticket)?;
    let step = data.steps.get_mut(step_id).ok_or_else(|| TicketError::UnknownStep(step_id.to_string()))?;

    let from = step.status;
    let to = if draft { StepStatus::InProgress } else { StepStatus::Completed };
    step.form_data = form_data;
    step.status = to;
    step.completed_at = if draft { None } else { Some(iso_timestamp(now)) };
    step.history.push(status_change(from, to, user_id, now));

    let all_completed = data.steps.values().all(|state| state.status == StepStatus::Completed);
    let status = if all_completed { TicketStatus::Completed } else { TicketStatus::Opened };
    debug!(ticket_id = ticket.id, step_id, draft, status = %status, "submitted step");

    Ok(TicketUpdate {
        status: Some(status),
        workflow_data: Some(data),
        ..TicketUpdate::default()
    })
}

/// Step ids in workflow order, as recorded in the snapshot.
pub fn step_order(data: &WorkflowData) -> Vec<String> {
    if data.metadata.form_definitions.is_empty() {
        data.steps.keys().cloned().collect()
    } else {
        data.metadata.form_definitions.keys().cloned().collect()
    }
}

/// First step in `order` that is not completed, else the last step.
pub fn current_step<'a>(data: &WorkflowData, order: &'a [String]) -> Option<&'a str> {
    order
        .iter()
        .find(|step_id| data.steps.get(step_id.as_str()).is_some_and(|state| state.status != StepStatus::Completed))
        .or_else(|| order.last())
        .map(String::as_str)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionRate {
    pub percent: u32,
    pub done: usize,
    pub total: usize,
}

impl fmt::Display for CompletionRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}% ({}/{})", self.percent, self.done, self.total)
    }
}

pub fn completion_rate(data: &WorkflowData, order: &[String]) -> CompletionRate {
    let total = order.len();
    let done = order
        .iter()
        .filter(|step_id| data.steps.get(step_id.as_str()).is_some_and(|state| state.status == StepStatus::Completed))
        .count();
    let percent = if total == 0 { 0 } else { ((done as f64 / total as f64) * 100.0).round() as u32 };
    CompletionRate { percent, done, total }
}

/// Form for one step, built from the snapshot and seeded with saved data.
pub fn step_form(ticket: &Ticket, step_id: &str) -> Result<FormState, TicketError> {
    let data = ticket.workflow_data.as_ref().ok_or(TicketError::MissingWorkflowData(ticket.id))?;
    let fields = data
        .metadata
        .form_definitions
        .get(step_id)
        .cloned()
        .ok_or_else(|| TicketError::UnknownStep(step_id.to_string()))?;
    let initial = data.steps.get(step_id).map(|state| state.form_data.clone()).unwrap_or_default();
    Ok(FormState::new(fields, &initial))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TicketFilter {
    #[default]
    Open,
    Closed,
    All,
}

impl TicketFilter {
    pub fn matches(self, status: TicketStatus) -> bool {
        match self {
            TicketFilter::Open => status.is_open(),
            TicketFilter::Closed => status.is_closed(),
            TicketFilter::All => true,
        }
    }

    pub fn apply(self, tickets: Vec<Ticket>) -> Vec<Ticket> {
        tickets.into_iter().filter(|ticket| self.matches(ticket.status)).collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use flowdesk_types::{FieldKind, FieldSchema, WorkflowStep};
    use serde_json::json;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).single().expect("valid time")
    }

    fn template() -> TicketTemplate {
        let mut request = WorkflowStep::new("request");
        request.name = "Request".into();
        let mut reason = FieldSchema::new("reason", "reason", FieldKind::Text);
        reason.label = "Reason".into();
        reason.required = true;
        request.form = vec![reason];
        let mut approve = WorkflowStep::new("approve");
        approve.name = "Approve".into();
        approve.dependencies = vec!["request".into()];
        TicketTemplate {
            id: Some(7),
            name: "Laptop".into(),
            description: String::new(),
            title_format: "Laptop request".into(),
            default_priority: Priority::High,
            workflow: vec![request, approve],
            workflow_config: Default::default(),
            created_by: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn ticket() -> Ticket {
        let create = ticket_from_template(&template(), "", None, now()).expect("payload");
        Ticket {
            id: 11,
            title: create.title,
            description: create.description,
            priority: create.priority,
            status: create.status,
            template_id: create.template_id,
            created_by: Some(1),
            created_at: None,
            updated_at: None,
            workflow_data: Some(create.workflow_data),
        }
    }

    #[test]
    fn creation_snapshots_forms_and_starts_every_step_pending() {
        let create = ticket_from_template(&template(), "", None, now()).expect("payload");
        assert_eq!(create.title, "Laptop request");
        assert_eq!(create.priority, "high");
        assert_eq!(create.status, TicketStatus::Opened);

        let data = &create.workflow_data;
        assert_eq!(data.metadata.template_version, "1.0.0");
        assert_eq!(data.metadata.created_at, "2024-05-01T10:00:00.000Z");
        assert_eq!(data.metadata.form_definitions["request"][0].name, "reason");
        assert_eq!(step_order(data), vec!["request".to_string(), "approve".to_string()]);
        for state in data.steps.values() {
            assert_eq!(state.status, StepStatus::Pending);
            assert!(state.assignee_id.is_none());
            assert!(state.form_data.is_empty());
            assert!(state.history.is_empty());
        }

        let serialized = serde_json::to_value(&create).expect("json");
        assert_eq!(serialized["workflow_data"]["steps"]["request"]["status"], json!("pending"));
    }

    #[test]
    fn unsaved_templates_cannot_create_tickets() {
        let mut unsaved = template();
        unsaved.id = None;
        assert_eq!(
            ticket_from_template(&unsaved, "x", None, now()),
            Err(TicketError::UnsavedTemplate("Laptop".into()))
        );
    }

    #[test]
    fn assignment_moves_step_into_progress() {
        let update = assign_step(&ticket(), "request", 3, now()).expect("assign");
        assert!(update.status.is_none());
        let data = update.workflow_data.expect("data");
        let state = &data.steps["request"];
        assert_eq!(state.assignee_id, Some(3));
        assert_eq!(state.status, StepStatus::InProgress);
        assert_eq!(state.started_at.as_deref(), Some("2024-05-01T10:00:00.000Z"));
        let entry = &state.history[0];
        assert_eq!(entry.kind, "status_change");
        assert_eq!((entry.from, entry.to), (Some(StepStatus::Pending), Some(StepStatus::InProgress)));
        assert_eq!(entry.user_id, Some(3));
    }

    #[test]
    fn drafts_stay_in_progress_and_final_submit_completes_ticket() {
        let mut ticket = ticket();
        let form_data = json!({"reason": "old one broke"}).as_object().cloned().expect("object");

        let draft = submit_step(&ticket, "request", form_data.clone(), true, Some(3), now()).expect("draft");
        assert_eq!(draft.status, Some(TicketStatus::Opened));
        let state = &draft.workflow_data.as_ref().expect("data").steps["request"];
        assert_eq!(state.status, StepStatus::InProgress);
        assert!(state.completed_at.is_none());

        ticket.workflow_data = draft.workflow_data;
        let done = submit_step(&ticket, "request", form_data, false, Some(3), now()).expect("submit");
        assert_eq!(done.status, Some(TicketStatus::Opened));
        ticket.workflow_data = done.workflow_data;

        let data = ticket.workflow_data.as_ref().expect("data");
        let order = step_order(data);
        assert_eq!(current_step(data, &order), Some("approve"));
        assert_eq!(completion_rate(data, &order).to_string(), "50% (1/2)");
        let history = &data.steps["request"].history;
        assert_eq!(history[0].from, Some(StepStatus::Pending));
        assert_eq!(history[1].from, Some(StepStatus::InProgress));
        assert_eq!(history[1].to, Some(StepStatus::Completed));

        let last = submit_step(&ticket, "approve", Map::new(), false, Some(4), now()).expect("submit");
        assert_eq!(last.status, Some(TicketStatus::Completed));
        let data = last.workflow_data.expect("data");
        assert_eq!(current_step(&data, &order), Some("approve"));
        assert_eq!(completion_rate(&data, &order).percent, 100);
    }

    #[test]
    fn completed_steps_cannot_be_reassigned() {
        let mut ticket = ticket();
        let update = submit_step(&ticket, "request", Map::new(), false, None, now()).expect("submit");
        ticket.workflow_data = update.workflow_data;
        assert_eq!(assign_step(&ticket, "request", 2, now()), Err(TicketError::StepCompleted("request".into())));
        assert_eq!(assign_step(&ticket, "ghost", 2, now()), Err(TicketError::UnknownStep("ghost".into())));
    }

    #[test]
    fn step_form_uses_snapshot_and_saved_data() {
        let mut ticket = ticket();
        let form_data = json!({"reason": "new hire"}).as_object().cloned().expect("object");
        ticket.workflow_data = submit_step(&ticket, "request", form_data, true, None, now()).expect("draft").workflow_data;

        let form = step_form(&ticket, "request").expect("form");
        assert_eq!(form.fields().len(), 1);
        assert_eq!(form.value("reason").and_then(|value| value.as_str()), Some("new hire"));
    }

    #[test]
    fn filters_split_open_and_closed() {
        let mut open = ticket();
        let mut closed = ticket();
        closed.status = TicketStatus::Deleted;
        open.status = TicketStatus::Opened;
        assert_eq!(TicketFilter::Open.apply(vec![open.clone(), closed.clone()]).len(), 1);
        assert_eq!(TicketFilter::Closed.apply(vec![open.clone(), closed.clone()])[0].status, TicketStatus::Deleted);
        assert_eq!(TicketFilter::All.apply(vec![open, closed]).len(), 2);
    }
}
