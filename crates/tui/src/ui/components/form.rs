//! Step form: fills one workflow step's form in edit mode.
//!
//! Every keystroke writes the control's value into [`FormState`], which
//! revalidates that field before the next frame is drawn.

use std::collections::HashMap;
use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use flowdesk_api::FileStore;
use flowdesk_engine::value::to_json_map;
use flowdesk_engine::{Control, FieldValue, FileUploadState, FormState, ResourceOptionsCache, UploadMode, kind_spec};
use flowdesk_types::{FieldSchema, LocalFile, TicketTemplate, WorkflowStep};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    text::{Line, Span},
    widgets::Paragraph,
};
use serde_json::{Map, Value};
use tracing::debug;

use crate::app::{App, Effect, Route, StatusLevel};
use crate::ui::components::common::TextInputState;
use crate::ui::components::component::Component;
use crate::ui::components::field::{EditorView, FieldMode, FieldView, field_options};
use crate::ui::theme::helpers::block;

/// Editing state for one step's form.
#[derive(Debug)]
pub struct StepFormState {
    pub template_name: String,
    pub step_name: String,
    form: FormState,
    focus: usize,
    cursor: usize,
    inputs: HashMap<String, TextInputState>,
    files: HashMap<String, FileUploadState>,
    submitted: Option<Map<String, Value>>,
}

impl StepFormState {
    pub fn new(template: &TicketTemplate, step: &WorkflowStep, mode: UploadMode) -> Self {
        let form = FormState::new(step.form.clone(), &Map::new());
        let mut inputs = HashMap::new();
        let mut files = HashMap::new();
        for field in form.fields() {
            match kind_spec(&field.kind).control {
                Control::FileDrop => {
                    files.insert(field.id.clone(), FileUploadState::from_value(mode, form.value(&field.id)));
                    inputs.insert(field.id.clone(), TextInputState::new());
                }
                control if is_text_control(control) => {
                    let text = form.value(&field.id).map(FieldValue::display).unwrap_or_default();
                    inputs.insert(field.id.clone(), TextInputState::with_text(text));
                }
                _ => {}
            }
        }
        Self {
            template_name: template.name.clone(),
            step_name: step.name.clone(),
            form,
            focus: 0,
            cursor: 0,
            inputs,
            files,
            submitted: None,
        }
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn focused_field(&self) -> Option<&FieldSchema> {
        self.form.fields().get(self.focus)
    }

    /// Accepted data from the last successful submit.
    pub fn submitted(&self) -> Option<&Map<String, Value>> {
        self.submitted.as_ref()
    }

    fn move_focus(&mut self, delta: isize, options: &ResourceOptionsCache) {
        let count = self.form.fields().len();
        if count == 0 {
            return;
        }
        self.focus = (self.focus as isize + delta).rem_euclid(count as isize) as usize;
        self.cursor = self.initial_cursor(options);
    }

    /// Put the option cursor on the current selection.
    fn initial_cursor(&self, options: &ResourceOptionsCache) -> usize {
        let Some(field) = self.focused_field() else {
            return 0;
        };
        let current = self.form.value(&field.id).and_then(FieldValue::as_str).unwrap_or_default();
        field_options(options, field).iter().position(|option| option.value == current).unwrap_or(0)
    }

    /// Apply a key to the focused control.
    pub fn handle_key(&mut self, key: KeyEvent, options: &ResourceOptionsCache) -> Vec<Effect> {
        match key.code {
            KeyCode::Tab => {
                self.move_focus(1, options);
                return Vec::new();
            }
            KeyCode::BackTab => {
                self.move_focus(-1, options);
                return Vec::new();
            }
            KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.submit();
                return Vec::new();
            }
            _ => {}
        }

        let Some(field) = self.focused_field().cloned() else {
            return Vec::new();
        };
        let control = kind_spec(&field.kind).control;
        match control {
            Control::FileDrop => return self.handle_file_key(&field, key),
            Control::Checkbox => {
                if matches!(key.code, KeyCode::Char(' ') | KeyCode::Enter) {
                    let checked = matches!(self.form.value(&field.id), Some(FieldValue::Json(Value::Bool(true))));
                    self.form.set_value(&field.id, FieldValue::Json(Value::Bool(!checked)));
                }
            }
            Control::Dropdown | Control::RadioGroup | Control::MultiSelect => {
                let choices = field_options(options, &field);
                match key.code {
                    KeyCode::Up => self.cursor = self.cursor.saturating_sub(1),
                    KeyCode::Down if !choices.is_empty() => self.cursor = (self.cursor + 1).min(choices.len() - 1),
                    KeyCode::Backspace => self.form.set_value(&field.id, clear_value(control)),
                    KeyCode::Char(' ') | KeyCode::Enter => {
                        if let Some(choice) = choices.get(self.cursor) {
                            let value = if control == Control::MultiSelect {
                                toggle_membership(self.form.value(&field.id), &choice.value)
                            } else {
                                FieldValue::text(choice.value.clone())
                            };
                            self.form.set_value(&field.id, value);
                        }
                    }
                    _ => {}
                }
            }
            control => {
                let step = match key.code {
                    KeyCode::Up => Some(-1),
                    KeyCode::Down => Some(1),
                    KeyCode::Enter if control != Control::TextArea => Some(1),
                    _ => None,
                };
                if let Some(delta) = step {
                    self.move_focus(delta, options);
                    return Vec::new();
                }
                let Some(input) = self.inputs.get_mut(&field.id) else {
                    return Vec::new();
                };
                let edited = match key.code {
                    KeyCode::Char(character) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                        input.insert_char(character);
                        true
                    }
                    KeyCode::Enter if control == Control::TextArea => {
                        input.insert_char('\n');
                        true
                    }
                    KeyCode::Backspace => {
                        input.backspace();
                        true
                    }
                    KeyCode::Delete => {
                        input.delete();
                        true
                    }
                    KeyCode::Left => {
                        input.move_left();
                        false
                    }
                    KeyCode::Right => {
                        input.move_right();
                        false
                    }
                    KeyCode::Home => {
                        input.move_home();
                        false
                    }
                    KeyCode::End => {
                        input.move_end();
                        false
                    }
                    _ => false,
                };
                if edited {
                    let text = input.input().to_string();
                    self.form.set_value(&field.id, FieldValue::text(text));
                }
            }
        }
        Vec::new()
    }

    fn handle_file_key(&mut self, field: &FieldSchema, key: KeyEvent) -> Vec<Effect> {
        let entry_count = self.files.get(&field.id).map(|files| files.entries().len()).unwrap_or(0);
        let Some(input) = self.inputs.get_mut(&field.id) else {
            return Vec::new();
        };
        match key.code {
            KeyCode::Char(character) => input.insert_char(character),
            KeyCode::Backspace => input.backspace(),
            KeyCode::Up => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Down if entry_count > 0 => self.cursor = (self.cursor + 1).min(entry_count - 1),
            KeyCode::Enter if !input.is_blank() => {
                let path = PathBuf::from(input.take().trim());
                return vec![Effect::AttachFile {
                    field_id: field.id.clone(),
                    path,
                }];
            }
            KeyCode::Delete if entry_count > 0 => {
                return vec![Effect::RemoveFile {
                    field_id: field.id.clone(),
                    index: self.cursor.min(entry_count - 1),
                }];
            }
            _ => {}
        }
        Vec::new()
    }

    /// Add a file to a file field and bind the new list into the form.
    pub async fn attach(&mut self, field_id: &str, path: PathBuf, store: &dyn FileStore) {
        let Some(files) = self.files.get_mut(field_id) else {
            return;
        };
        if files.drop_files(vec![LocalFile::from_path(path)], store).await.is_ok() {
            let value = files.value();
            self.form.set_value(field_id, value);
        }
    }

    pub async fn remove_file(&mut self, field_id: &str, index: usize, store: &dyn FileStore) {
        let Some(files) = self.files.get_mut(field_id) else {
            return;
        };
        if files.delete(index, store).await.is_ok() {
            let value = files.value();
            self.form.set_value(field_id, value);
            self.cursor = self.cursor.min(files.entries().len().saturating_sub(1));
        }
    }

    /// Validate everything. Returns the number of fields needing attention.
    pub fn submit(&mut self) -> usize {
        match self.form.submit() {
            Ok(accepted) => match to_json_map(&accepted) {
                Ok(data) => {
                    debug!(fields = data.len(), "step form accepted");
                    self.form.mark_saved();
                    self.submitted = Some(data);
                    0
                }
                Err(error) => {
                    debug!(%error, "step form holds files that were never uploaded");
                    self.submitted = None;
                    1
                }
            },
            Err(errors) => {
                self.submitted = None;
                errors.len()
            }
        }
    }

    fn editor_for(&self, field: &FieldSchema, focused: bool) -> EditorView<'_> {
        EditorView {
            input: self.inputs.get(&field.id),
            cursor: if focused { self.cursor } else { 0 },
            files: self.files.get(&field.id),
        }
    }
}

fn is_text_control(control: Control) -> bool {
    matches!(
        control,
        Control::TextInput | Control::TextArea | Control::NumberInput | Control::DateInput | Control::TimeInput | Control::DateTimeInput | Control::Freeform
    )
}

fn clear_value(control: Control) -> FieldValue {
    if control == Control::MultiSelect { FieldValue::Json(Value::Array(Vec::new())) } else { FieldValue::empty_text() }
}

fn toggle_membership(current: Option<&FieldValue>, option: &str) -> FieldValue {
    let mut selected: Vec<Value> = match current {
        Some(FieldValue::Json(Value::Array(items))) => items.clone(),
        _ => Vec::new(),
    };
    match selected.iter().position(|item| item.as_str() == Some(option)) {
        Some(index) => {
            selected.remove(index);
        }
        None => selected.push(Value::String(option.to_string())),
    }
    FieldValue::Json(Value::Array(selected))
}

/// Screen wrapping [`StepFormState`].
#[derive(Debug, Default)]
pub struct StepFormComponent;

impl Component for StepFormComponent {
    fn handle_key_events(&mut self, app: &mut App, key: KeyEvent) -> Vec<Effect> {
        if key.code == KeyCode::Esc {
            return vec![Effect::SwitchTo(Route::Templates)];
        }
        let Some(state) = app.step_form.as_mut() else {
            return vec![Effect::SwitchTo(Route::Templates)];
        };
        let submitting = key.code == KeyCode::Char('s') && key.modifiers.contains(KeyModifiers::CONTROL);
        let effects = state.handle_key(key, &app.options);
        if submitting {
            let status = match state.submitted() {
                Some(data) => (StatusLevel::Success, format!("Step form is valid: {}", serde_json::to_string(data).unwrap_or_default())),
                None => (StatusLevel::Error, format!("{} field(s) need attention", state.form().errors().len().max(1))),
            };
            app.set_status(status.0, status.1);
        }
        effects
    }

    fn render(&mut self, frame: &mut Frame, rect: Rect, app: &mut App) {
        let theme = app.theme.as_ref();
        let Some(state) = app.step_form.as_ref() else {
            return;
        };
        let title = format!("{} / {}", state.template_name, state.step_name);
        let outer = block(theme, Some(title.as_str()), true);
        let inner = outer.inner(rect);
        frame.render_widget(outer, rect);

        let fields = state.form.fields();
        if fields.is_empty() {
            frame.render_widget(Paragraph::new(Line::from(Span::styled("This step has no form fields", theme.text_muted_style()))), inner);
            return;
        }

        let views: Vec<FieldView<'_>> = fields
            .iter()
            .enumerate()
            .map(|(index, field)| {
                let focused = index == state.focus;
                let mode = FieldMode::Edit {
                    value: state.form.value(&field.id),
                    error: state.form.error(&field.id),
                    focused,
                    editor: state.editor_for(field, focused),
                };
                let loading = field.resource_type_id.is_some_and(|type_id| app.options.is_loading(type_id));
                FieldView::new(field, mode, field_options(&app.options, field), theme).loading(loading)
            })
            .collect();

        // Keep the focused field on screen by skipping fields above it.
        let mut first = 0;
        let mut used: u16 = views[..=state.focus.min(views.len() - 1)].iter().map(|view| view.height() + 1).sum();
        while used > inner.height && first < state.focus {
            used -= views[first].height() + 1;
            first += 1;
        }

        let visible = &views[first..];
        let constraints: Vec<Constraint> = visible.iter().map(|view| Constraint::Length(view.height() + 1)).collect();
        let areas = Layout::vertical(constraints).split(inner);
        for (view, area) in visible.iter().zip(areas.iter()) {
            frame.render_widget(Paragraph::new(view.lines()), *area);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use flowdesk_api::{ApiError, UploadedFile};
    use flowdesk_types::FieldKind;
    use serde_json::json;

    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(state: &mut StepFormState, text: &str, options: &ResourceOptionsCache) {
        for character in text.chars() {
            state.handle_key(key(KeyCode::Char(character)), options);
        }
    }

    fn step() -> (TicketTemplate, WorkflowStep) {
        let mut quantity = FieldSchema::new("quantity", "quantity", FieldKind::Number);
        quantity.label = "Quantity".into();
        quantity.required = true;
        quantity.validation.get_or_insert_default().max = Some(5.0);
        let mut size = FieldSchema::new("size", "size", FieldKind::Select);
        size.label = "Size".into();
        size.options = Some(vec!["S".into(), "M".into()]);
        let mut tags = FieldSchema::new("tags", "tags", FieldKind::Multiselect);
        tags.label = "Tags".into();
        tags.options = Some(vec!["red".into(), "blue".into()]);
        let attachment = FieldSchema::new("attachment", "attachment", FieldKind::File);

        let mut step = WorkflowStep::new("request");
        step.name = "Request".into();
        step.form = vec![quantity, size, tags, attachment];
        let template: TicketTemplate = serde_json::from_value(json!({"id": 1, "name": "Laptop"})).expect("template");
        (template, step)
    }

    #[test]
    fn typing_revalidates_and_submit_collects_values() {
        let (template, step) = step();
        let options = ResourceOptionsCache::new();
        let mut state = StepFormState::new(&template, &step, UploadMode::Server);

        type_text(&mut state, "9", &options);
        assert_eq!(state.form().error("quantity"), Some("Maximum value is 5"));
        state.handle_key(key(KeyCode::Backspace), &options);
        type_text(&mut state, "3", &options);
        assert_eq!(state.form().error("quantity"), None);

        state.handle_key(key(KeyCode::Tab), &options);
        state.handle_key(key(KeyCode::Down), &options);
        state.handle_key(key(KeyCode::Enter), &options);

        state.handle_key(key(KeyCode::Tab), &options);
        state.handle_key(key(KeyCode::Char(' ')), &options);
        state.handle_key(key(KeyCode::Down), &options);
        state.handle_key(key(KeyCode::Char(' ')), &options);
        state.handle_key(key(KeyCode::Up), &options);
        state.handle_key(key(KeyCode::Char(' ')), &options);

        assert_eq!(state.submit(), 0);
        let data = state.submitted().expect("submitted");
        assert_eq!(data.get("quantity"), Some(&json!(3)));
        assert_eq!(data.get("size"), Some(&json!("M")));
        assert_eq!(data.get("tags"), Some(&json!(["blue"])));
    }

    #[test]
    fn submit_reports_missing_required_values() {
        let (template, step) = step();
        let mut state = StepFormState::new(&template, &step, UploadMode::Server);
        assert_eq!(state.submit(), 1);
        assert!(state.submitted().is_none());
        assert_eq!(state.form().error("quantity"), Some("Required"));
    }

    struct FakeStore {
        deletes: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl FileStore for FakeStore {
        async fn upload(&self, files: &[LocalFile]) -> Result<Vec<UploadedFile>, ApiError> {
            Ok(files
                .iter()
                .map(|file| UploadedFile {
                    original_name: file.name.clone(),
                    saved_name: format!("saved-{}", file.name),
                    content_type: String::new(),
                    size: file.size,
                })
                .collect())
        }

        async fn delete(&self, saved_name: &str) -> Result<(), ApiError> {
            self.deletes.lock().expect("deletes").push(saved_name.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn file_paths_become_uploaded_references() {
        let (template, step) = step();
        let options = ResourceOptionsCache::new();
        let store = FakeStore { deletes: Mutex::new(Vec::new()) };
        let mut state = StepFormState::new(&template, &step, UploadMode::Server);
        for _ in 0..3 {
            state.handle_key(key(KeyCode::Tab), &options);
        }
        type_text(&mut state, "/tmp/photo.png", &options);
        let effects = state.handle_key(key(KeyCode::Enter), &options);
        let Some(Effect::AttachFile { field_id, path }) = effects.into_iter().next() else {
            panic!("expected an attach effect");
        };

        state.attach(&field_id, path, &store).await;
        assert_eq!(
            state.form().value("attachment").and_then(FieldValue::as_json),
            Some(&json!([{"original_name": "photo.png", "saved_name": "saved-photo.png"}]))
        );

        state.remove_file(&field_id, 0, &store).await;
        assert_eq!(store.deletes.lock().expect("deletes").as_slice(), ["saved-photo.png".to_string()]);
        assert_eq!(state.form().value("attachment").and_then(FieldValue::as_json), Some(&json!([])));
    }
}
