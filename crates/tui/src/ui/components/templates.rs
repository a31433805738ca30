//! Template list with a read-only preview.
//!
//! The left pane lists templates with their optimistic status. The right
//! pane previews the selection, or the assistant's unsaved draft when one
//! exists: metadata, the ordered steps, and either the selected step's form
//! in preview mode or the dependency graph.

use crossterm::event::{KeyCode, KeyEvent};
use flowdesk_engine::{EntryStatus, UploadMode, WorkflowGraph};
use flowdesk_types::{TicketTemplate, permissions};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{List, ListItem, ListState, Paragraph, Wrap},
};

use crate::app::{App, Effect, Route, StatusLevel};
use crate::ui::components::component::Component;
use crate::ui::components::field::{FieldMode, FieldView, field_options};
use crate::ui::components::form::StepFormState;
use crate::ui::components::graph::GraphWidget;
use crate::ui::theme::{Theme, helpers::block};

#[derive(Debug, Default)]
pub struct TemplatesComponent {
    list_state: ListState,
}

impl TemplatesComponent {
    fn open_step_form(app: &mut App) -> Vec<Effect> {
        let Some(template) = app.previewed_template() else {
            return Vec::new();
        };
        let Some(step) = template.workflow.get(app.templates.selected_step) else {
            app.set_status(StatusLevel::Warning, "This template has no steps");
            return Vec::new();
        };
        app.options.invalidate();
        let mut effects: Vec<Effect> = app.request_options(&step.form).into_iter().collect();
        app.step_form = Some(StepFormState::new(&template, step, UploadMode::Server));
        effects.push(Effect::SwitchTo(Route::StepForm));
        effects
    }

    fn save_draft(app: &mut App) -> Vec<Effect> {
        if !app.ctx.has_permission(permissions::TICKET_TEMPLATE_CREATE) {
            app.set_status(StatusLevel::Warning, "You do not have permission to create templates");
            return Vec::new();
        }
        app.save_draft()
    }

    fn delete_selected(app: &mut App) -> Vec<Effect> {
        if !app.ctx.has_permission(permissions::TICKET_TEMPLATE_DELETE) {
            app.set_status(StatusLevel::Warning, "You do not have permission to delete templates");
            return Vec::new();
        }
        let Some(key) = app.templates.selected_key() else {
            return Vec::new();
        };
        let Some(id) = app.templates.list.get(key).and_then(|template| template.id) else {
            app.set_status(StatusLevel::Warning, "This template has not been saved yet");
            return Vec::new();
        };
        if !app.templates.list.remove_pending(key) {
            app.set_status(StatusLevel::Warning, "A change to this template is still being saved");
            return Vec::new();
        }
        app.templates.move_selection(0);
        vec![Effect::DeleteTemplate { key, id }]
    }
}

impl Component for TemplatesComponent {
    fn handle_key_events(&mut self, app: &mut App, key: KeyEvent) -> Vec<Effect> {
        match key.code {
            KeyCode::Char('q') => vec![Effect::Quit],
            KeyCode::Up | KeyCode::Char('k') => {
                app.templates.move_selection(-1);
                Vec::new()
            }
            KeyCode::Down | KeyCode::Char('j') => {
                app.templates.move_selection(1);
                Vec::new()
            }
            KeyCode::Left | KeyCode::Char('h') => {
                app.templates.selected_step = app.templates.selected_step.saturating_sub(1);
                Vec::new()
            }
            KeyCode::Right | KeyCode::Char('l') => {
                let steps = app.previewed_template().map(|template| template.workflow.len()).unwrap_or(0);
                if app.templates.selected_step + 1 < steps {
                    app.templates.selected_step += 1;
                }
                Vec::new()
            }
            KeyCode::Char('g') => {
                app.templates.graph.toggle();
                Vec::new()
            }
            KeyCode::Char('r') => {
                app.templates.loading = true;
                app.templates.list.clear_failures();
                vec![Effect::LoadTemplates]
            }
            KeyCode::Char('a') => vec![Effect::SwitchTo(Route::Assistant)],
            KeyCode::Char('f') | KeyCode::Enter => Self::open_step_form(app),
            KeyCode::Char('s') => Self::save_draft(app),
            KeyCode::Char('d') => Self::delete_selected(app),
            KeyCode::Char('x') if app.draft.is_some() => {
                app.discard_draft();
                app.set_status(StatusLevel::Info, "Discarded the suggested template");
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn render(&mut self, frame: &mut Frame, rect: Rect, app: &mut App) {
        let theme = app.theme.as_ref();
        let [list_area, preview_area] = Layout::horizontal([Constraint::Percentage(35), Constraint::Percentage(65)]).areas(rect);

        let items: Vec<ListItem> = app
            .templates
            .list
            .visible()
            .map(|(_, template, status)| {
                let (marker, style) = match status {
                    EntryStatus::Confirmed => ("  ", theme.text_primary_style()),
                    EntryStatus::Pending => ("… ", theme.text_muted_style()),
                    EntryStatus::Failed(_) => ("! ", theme.status_error()),
                };
                let mut lines = vec![Line::from(vec![Span::styled(marker, style), Span::styled(template.name.clone(), style)])];
                if let EntryStatus::Failed(message) = status {
                    lines.push(Line::from(Span::styled(format!("  {message}"), theme.status_error())));
                }
                ListItem::new(lines)
            })
            .collect();
        let title = if app.templates.loading { "Templates (loading)" } else { "Templates" };
        let empty = items.is_empty();
        let list = List::new(items)
            .block(block(theme, Some(title), app.draft.is_none()))
            .highlight_style(theme.selection_style());
        self.list_state.select(if empty { None } else { Some(app.templates.selected) });
        frame.render_stateful_widget(list, list_area, &mut self.list_state);

        let preview_title = match (app.draft.is_some(), app.is_saving_draft()) {
            (true, true) => "Suggested template (saving)",
            (true, false) => "Suggested template (unsaved)",
            (false, _) => "Preview",
        };
        let preview_block = block(theme, Some(preview_title), app.draft.is_some());
        let inner = preview_block.inner(preview_area);
        frame.render_widget(preview_block, preview_area);

        let Some(template) = app.previewed_template() else {
            let hint = if empty { "No templates yet. Press a to ask the assistant for one." } else { "" };
            frame.render_widget(Paragraph::new(Span::styled(hint, theme.text_muted_style())), inner);
            return;
        };

        let header = summary_lines(&template, app.templates.selected_step, theme);
        let header_height = u16::try_from(header.len()).unwrap_or(u16::MAX);
        let [header_area, detail_area] = Layout::vertical([Constraint::Length(header_height), Constraint::Min(0)]).areas(inner);
        frame.render_widget(Paragraph::new(header).wrap(Wrap { trim: false }), header_area);

        if app.templates.graph.is_visible() {
            let graph = WorkflowGraph::from_steps(&template.workflow);
            frame.render_widget(GraphWidget::new(&graph, theme).selected(app.templates.selected_step), detail_area);
            return;
        }

        let Some(step) = template.workflow.get(app.templates.selected_step) else {
            return;
        };
        let mut lines = Vec::new();
        if step.form.is_empty() {
            lines.push(Line::from(Span::styled("No form fields", theme.text_muted_style())));
        }
        for field in &step.form {
            let mode = FieldMode::Preview { value: field.default_value.as_ref() };
            lines.extend(FieldView::new(field, mode, field_options(&app.options, field), theme).lines());
            lines.push(Line::default());
        }
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), detail_area);
    }
}

/// Metadata and the step strip for a template.
pub fn summary_lines(template: &TicketTemplate, selected_step: usize, theme: &dyn Theme) -> Vec<Line<'static>> {
    let label = |text: &str| Span::styled(format!("{text}: "), theme.text_secondary_style());
    let mut lines = vec![
        Line::from(Span::styled(template.name.clone(), theme.text_primary_style().add_modifier(Modifier::BOLD))),
        Line::from(vec![label("Title"), Span::styled(template.title_format.clone(), theme.text_primary_style())]),
        Line::from(vec![
            label("Priority"),
            Span::styled(template.default_priority.to_string(), theme.text_primary_style()),
            Span::raw("  "),
            label("Parallel"),
            Span::styled(if template.workflow_config.parallel_execution { "yes" } else { "no" }, theme.text_primary_style()),
        ]),
    ];
    if !template.description.trim().is_empty() {
        lines.push(Line::from(Span::styled(template.description.clone(), theme.text_muted_style())));
    }

    let mut strip = vec![label("Steps")];
    if template.workflow.is_empty() {
        strip.push(Span::styled("none", theme.text_muted_style()));
    }
    for (index, step) in template.workflow.iter().enumerate() {
        if index > 0 {
            strip.push(Span::styled(" > ", theme.text_muted_style()));
        }
        let name = if step.name.trim().is_empty() { step.id.clone() } else { step.name.clone() };
        let style = if index == selected_step { theme.selection_style() } else { theme.accent_primary_style() };
        strip.push(Span::styled(name, style));
    }
    lines.push(Line::from(strip));
    lines.push(Line::default());
    lines
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::ui::theme::palette::FlowdeskTheme;

    #[test]
    fn summary_highlights_the_selected_step() {
        let theme = FlowdeskTheme::new();
        let template: TicketTemplate = serde_json::from_value(json!({
            "id": 3,
            "name": "Access request",
            "title_format": "Access for {user}",
            "default_priority": "high",
            "workflow": [
                {"id": "s1", "name": "Request"},
                {"id": "s2", "name": ""}
            ]
        }))
        .expect("template");
        let lines = summary_lines(&template, 1, &theme);
        let strip: String = lines[3].spans.iter().map(|span| span.content.as_ref()).collect();
        assert_eq!(strip, "Steps: Request > s2");
        assert_eq!(lines[3].spans[3].style, theme.selection_style());
    }
}
