//! Renders one field schema as an editable control or a read-only preview.
//!
//! The control is chosen by the kind table in the engine, so every kind the
//! compiler validates also has a rendering here. Preview mode draws from a
//! snapshot value and never touches form state.

use flowdesk_engine::{ChoiceOption, Control, FieldValue, FileEntry, FileUploadState, ResourceOptionsCache, kind_spec};
use flowdesk_types::FieldSchema;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget, Wrap},
};
use serde_json::Value;

use crate::ui::components::common::TextInputState;
use crate::ui::theme::Theme;

const TEXTAREA_ROWS: usize = 3;

/// Edit-mode handles into the owning form.
#[derive(Debug, Clone, Copy, Default)]
pub struct EditorView<'a> {
    /// Text being typed, for text-like controls and file paths.
    pub input: Option<&'a TextInputState>,
    /// Highlighted option or file entry.
    pub cursor: usize,
    pub files: Option<&'a FileUploadState>,
}

#[derive(Debug, Clone, Copy)]
pub enum FieldMode<'a> {
    Edit {
        value: Option<&'a FieldValue>,
        error: Option<&'a str>,
        focused: bool,
        editor: EditorView<'a>,
    },
    Preview {
        value: Option<&'a Value>,
    },
}

/// Options offered by a choice field, without blank authored entries.
pub fn field_options(cache: &ResourceOptionsCache, field: &FieldSchema) -> Vec<ChoiceOption> {
    cache.options_for(field).into_iter().filter(|option| !option.value.is_empty()).collect()
}

pub struct FieldView<'a> {
    field: &'a FieldSchema,
    mode: FieldMode<'a>,
    options: Vec<ChoiceOption>,
    loading: bool,
    theme: &'a dyn Theme,
}

impl<'a> FieldView<'a> {
    pub fn new(field: &'a FieldSchema, mode: FieldMode<'a>, options: Vec<ChoiceOption>, theme: &'a dyn Theme) -> Self {
        Self {
            field,
            mode,
            options,
            loading: false,
            theme,
        }
    }

    /// Options are still being fetched.
    pub fn loading(mut self, loading: bool) -> Self {
        self.loading = loading;
        self
    }

    pub fn height(&self) -> u16 {
        u16::try_from(self.lines().len()).unwrap_or(u16::MAX)
    }

    fn focused(&self) -> bool {
        matches!(self.mode, FieldMode::Edit { focused: true, .. })
    }

    fn editor(&self) -> EditorView<'a> {
        match self.mode {
            FieldMode::Edit { editor, .. } => editor,
            FieldMode::Preview { .. } => EditorView::default(),
        }
    }

    fn value(&self) -> Option<FieldValue> {
        match self.mode {
            FieldMode::Edit { value, .. } => value.cloned(),
            FieldMode::Preview { value } => value.cloned().map(FieldValue::Json),
        }
    }

    fn value_style(&self) -> Style {
        match self.mode {
            FieldMode::Edit { .. } => self.theme.text_primary_style(),
            FieldMode::Preview { .. } => self.theme.disabled_style(),
        }
    }

    pub fn lines(&self) -> Vec<Line<'static>> {
        let label_style = if self.focused() { self.theme.accent_emphasis_style() } else { self.theme.text_secondary_style().add_modifier(Modifier::BOLD) };
        let mut lines = vec![Line::from(Span::styled(self.field.decorated_label(), label_style))];

        let control = kind_spec(&self.field.kind).control;
        match control {
            Control::TextInput | Control::NumberInput | Control::DateInput | Control::TimeInput | Control::DateTimeInput | Control::Freeform => {
                lines.push(self.text_line(control));
            }
            Control::TextArea => lines.extend(self.text_area_lines()),
            Control::Dropdown => lines.extend(self.dropdown_lines()),
            Control::RadioGroup => lines.extend(self.choice_lines("(•)", "( )")),
            Control::MultiSelect => lines.extend(self.choice_lines("[x]", "[ ]")),
            Control::Checkbox => lines.push(self.checkbox_line()),
            Control::FileDrop => lines.extend(self.file_lines()),
        }

        if let Some(help) = self.field.help_text.as_deref().filter(|help| !help.trim().is_empty()) {
            lines.push(Line::from(Span::styled(help.to_string(), self.theme.text_muted_style())));
        }
        if let FieldMode::Edit { error: Some(error), .. } = self.mode {
            lines.push(Line::from(Span::styled(error.to_string(), self.theme.status_error())));
        }
        lines
    }

    fn placeholder(&self, control: Control) -> String {
        let authored = self.field.placeholder.as_deref().unwrap_or_default();
        if !authored.is_empty() {
            return authored.to_string();
        }
        match control {
            Control::DateInput => "YYYY-MM-DD",
            Control::TimeInput => "HH:MM",
            Control::DateTimeInput => "YYYY-MM-DDTHH:MM",
            _ => "",
        }
        .to_string()
    }

    fn text_line(&self, control: Control) -> Line<'static> {
        let editor = self.editor();
        if self.focused()
            && let Some(input) = editor.input
        {
            let (before, after) = input.input().split_at(input.cursor());
            return Line::from(vec![
                Span::styled("> ", self.theme.accent_primary_style()),
                Span::styled(before.to_string(), self.value_style()),
                Span::styled("▏", self.theme.accent_primary_style()),
                Span::styled(after.to_string(), self.value_style()),
            ]);
        }
        let text = self.value().map(|value| value.display()).unwrap_or_default();
        if text.is_empty() {
            Line::from(vec![Span::raw("  "), Span::styled(self.placeholder(control), self.theme.text_muted_style())])
        } else {
            Line::from(vec![Span::raw("  "), Span::styled(text, self.value_style())])
        }
    }

    fn text_area_lines(&self) -> Vec<Line<'static>> {
        let editor = self.editor();
        let text = match (self.focused(), editor.input) {
            (true, Some(input)) => {
                let (before, after) = input.input().split_at(input.cursor());
                format!("{before}▏{after}")
            }
            _ => self.value().map(|value| value.display()).unwrap_or_default(),
        };
        let mut lines: Vec<Line<'static>> = if text.is_empty() {
            vec![Line::from(vec![Span::raw("  "), Span::styled(self.placeholder(Control::TextArea), self.theme.text_muted_style())])]
        } else {
            text.lines().map(|line| Line::from(vec![Span::raw("  "), Span::styled(line.to_string(), self.value_style())])).collect()
        };
        while lines.len() < TEXTAREA_ROWS {
            lines.push(Line::from(""));
        }
        lines
    }

    fn selected_values(&self) -> Vec<String> {
        match self.value() {
            Some(FieldValue::Json(Value::String(text))) if !text.is_empty() => vec![text],
            Some(FieldValue::Json(Value::Array(items))) => items
                .iter()
                .map(|item| match item {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                })
                .collect(),
            Some(FieldValue::Json(Value::Number(number))) => vec![number.to_string()],
            _ => Vec::new(),
        }
    }

    fn label_for(&self, value: &str) -> String {
        self.options
            .iter()
            .find(|option| option.value == value)
            .map(|option| option.label.clone())
            .unwrap_or_else(|| value.to_string())
    }

    fn empty_options_line(&self) -> Option<Line<'static>> {
        if !self.options.is_empty() {
            return None;
        }
        let text = if self.loading { "Loading options..." } else { "No options available" };
        Some(Line::from(vec![Span::raw("  "), Span::styled(text, self.theme.text_muted_style())]))
    }

    fn dropdown_lines(&self) -> Vec<Line<'static>> {
        let selected = self.selected_values();
        let current = selected.first().map(|value| self.label_for(value));
        let mut lines = vec![match current {
            Some(label) => Line::from(vec![Span::styled("▾ ", self.theme.accent_primary_style()), Span::styled(label, self.value_style())]),
            None => Line::from(vec![Span::styled("▾ ", self.theme.accent_primary_style()), Span::styled("Select...", self.theme.text_muted_style())]),
        }];
        if self.focused() {
            lines.extend(self.choice_lines("●", " "));
        } else if let Some(empty) = self.empty_options_line() {
            lines.push(empty);
        }
        lines
    }

    fn choice_lines(&self, on: &str, off: &str) -> Vec<Line<'static>> {
        if let Some(empty) = self.empty_options_line() {
            return vec![empty];
        }
        let selected = self.selected_values();
        let cursor = self.editor().cursor;
        self.options
            .iter()
            .enumerate()
            .map(|(index, option)| {
                let marker = if selected.contains(&option.value) { on } else { off };
                let style = if self.focused() && index == cursor { self.theme.selection_style() } else { self.value_style() };
                Line::from(Span::styled(format!("  {marker} {}", option.label), style))
            })
            .collect()
    }

    fn checkbox_line(&self) -> Line<'static> {
        let checked = matches!(self.value(), Some(FieldValue::Json(Value::Bool(true))));
        let marker = if checked { "[x]" } else { "[ ]" };
        let style = if self.focused() { self.theme.selection_style() } else { self.value_style() };
        Line::from(Span::styled(format!("  {marker} {}", if checked { "Yes" } else { "No" }), style))
    }

    fn file_lines(&self) -> Vec<Line<'static>> {
        let editor = self.editor();
        let names: Vec<(String, bool)> = match editor.files {
            Some(files) => files
                .entries()
                .iter()
                .map(|entry| match entry {
                    FileEntry::Stored(reference) => (entry.name().to_string(), reference.is_image()),
                    FileEntry::Local(_) => (entry.name().to_string(), false),
                })
                .collect(),
            None => self
                .value()
                .map(|value| value.file_references().into_iter().map(|reference| (reference.original_name.clone(), reference.is_image())).collect())
                .unwrap_or_default(),
        };

        let mut lines: Vec<Line<'static>> = names
            .into_iter()
            .enumerate()
            .map(|(index, (name, image))| {
                let style = if self.focused() && index == editor.cursor { self.theme.selection_style() } else { self.value_style() };
                let suffix = if image { " (image)" } else { "" };
                Line::from(Span::styled(format!("  - {name}{suffix}"), style))
            })
            .collect();
        if lines.is_empty() {
            lines.push(Line::from(vec![Span::raw("  "), Span::styled("No files", self.theme.text_muted_style())]));
        }

        if let Some(files) = editor.files {
            if files.is_uploading() {
                lines.push(Line::from(Span::styled("  Uploading...", self.theme.status_info())));
            }
            if let Some(error) = files.error() {
                lines.push(Line::from(Span::styled(format!("  {error}"), self.theme.status_error())));
            }
        }
        if self.focused() {
            let path = editor.input.map(|input| input.input().to_string()).unwrap_or_default();
            lines.push(Line::from(vec![
                Span::styled("  Attach path: ", self.theme.text_muted_style()),
                Span::styled(format!("{path}▏"), self.value_style()),
            ]));
        }
        lines
    }
}

impl Widget for FieldView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Paragraph::new(self.lines()).wrap(Wrap { trim: false }).render(area, buf);
    }
}
