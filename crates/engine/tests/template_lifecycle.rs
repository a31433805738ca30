use chrono::{TimeZone, Utc};
use flowdesk_engine::ticket::{assign_step, current_step, step_form, step_order, submit_step};
use flowdesk_engine::{FieldValue, TemplateBuilder, WorkflowGraph, ticket_from_template};
use flowdesk_types::{FieldKind, Ticket, TicketStatus};
use serde_json::{Map, json};

fn build_template() -> flowdesk_types::TicketTemplate {
    let mut builder = TemplateBuilder::new();
    builder.name = "Equipment".into();
    builder.title_format = "Equipment for {employee}".into();

    let request = builder.steps_mut().add_step();
    builder.steps_mut().set_name(&request, "Request");
    builder.steps_mut().set_description(&request, "Describe the equipment");
    let approve = builder.steps_mut().add_step();
    builder.steps_mut().set_name(&approve, "Approve");
    builder.steps_mut().set_description(&approve, "Manager approval");
    builder.steps_mut().set_dependencies(&approve, vec![request.clone()]);

    let mut form = builder.form_builder(&request).expect("form");
    let item = form.add_field(FieldKind::Text);
    form.update_field(&item, |field| {
        field.name = "item".into();
        field.label = "Item".into();
        field.required = true;
    });
    let quantity = form.add_field(FieldKind::Number);
    form.update_field(&quantity, |field| {
        field.name = "quantity".into();
        field.label = "Quantity".into();
        field.validation.get_or_insert_with(Default::default).min = Some(1.0);
        field.validation.get_or_insert_with(Default::default).max = Some(5.0);
    });
    assert!(builder.commit_form(&request, form));

    let mut template = builder.save().expect("valid template");
    template.id = Some(42);
    template
}

fn as_ticket(template: &flowdesk_types::TicketTemplate) -> Ticket {
    let now = Utc.with_ymd_and_hms(2024, 6, 3, 9, 30, 0).single().expect("time");
    let create = ticket_from_template(template, "", None, now).expect("payload");
    Ticket {
        id: 1,
        title: create.title,
        description: create.description,
        priority: create.priority,
        status: create.status,
        template_id: create.template_id,
        created_by: None,
        created_at: None,
        updated_at: None,
        workflow_data: Some(create.workflow_data),
    }
}

#[test]
fn ticket_snapshot_is_decoupled_from_later_template_edits() {
    let mut template = build_template();
    let ticket = as_ticket(&template);
    let request_id = template.workflow[0].id.clone();

    template.workflow[0].form.clear();
    template.workflow[0].name = "Renamed".into();

    let snapshot = &ticket.workflow_data.as_ref().expect("data").metadata.form_definitions[&request_id];
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot[0].name, "item");
    assert_eq!(step_form(&ticket, &request_id).expect("form").fields().len(), 2);
}

#[test]
fn step_form_enforces_number_range_through_the_whole_flow() {
    let template = build_template();
    let mut ticket = as_ticket(&template);
    let request_id = template.workflow[0].id.clone();
    let approve_id = template.workflow[1].id.clone();
    let now = Utc.with_ymd_and_hms(2024, 6, 3, 10, 0, 0).single().expect("time");

    ticket.workflow_data = assign_step(&ticket, &request_id, 9, now).expect("assign").workflow_data;

    let mut form = step_form(&ticket, &request_id).expect("form");
    let field_ids: Vec<String> = form.fields().iter().map(|field| field.id.clone()).collect();
    form.set_value(&field_ids[0], FieldValue::text("Monitor"));

    for (raw, expected) in [("0", Some("Minimum value is 1")), ("4", None), ("11", Some("Maximum value is 5")), ("", None)] {
        form.set_value(&field_ids[1], FieldValue::text(raw));
        assert_eq!(form.error(&field_ids[1]), expected, "value {raw:?}");
    }

    form.set_value(&field_ids[1], FieldValue::text("3"));
    let accepted = form.submit().expect("valid");
    let form_data = flowdesk_engine::value::to_json_map(&accepted).expect("json");
    assert_eq!(form_data.get(&field_ids[1]), Some(&json!(3)));

    let update = submit_step(&ticket, &request_id, form_data, false, Some(9), now).expect("submit");
    assert_eq!(update.status, Some(TicketStatus::Opened));
    ticket.workflow_data = update.workflow_data;

    let data = ticket.workflow_data.as_ref().expect("data");
    let order = step_order(data);
    assert_eq!(current_step(data, &order), Some(approve_id.as_str()));

    let update = submit_step(&ticket, &approve_id, Map::new(), false, Some(2), now).expect("approve");
    assert_eq!(update.status, Some(TicketStatus::Completed));
}

#[test]
fn removing_a_step_leaves_no_dangling_dependencies() {
    let template = build_template();
    let mut builder = TemplateBuilder::from_template(&template);
    let request_id = template.workflow[0].id.clone();

    let graph = WorkflowGraph::from_steps(builder.steps().steps());
    assert_eq!(graph.edges.len(), 1);

    builder.remove_step(&request_id);
    for step in builder.steps().steps() {
        assert!(!step.dependencies.contains(&request_id));
    }
    assert!(WorkflowGraph::from_steps(builder.steps().steps()).edges.is_empty());
}
