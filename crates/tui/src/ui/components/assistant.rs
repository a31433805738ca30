//! Assistant chat screen.
//!
//! Shows the conversation with collapsible sections per assistant reply and
//! an input line. Sending a message hands the outgoing history to the
//! runtime as [`Effect::SendChat`]; the streamed reply arrives as chat
//! events that `App` folds into the session.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use flowdesk_agent::{AssistantMessage, SessionError, THINKING_SECTION};
use flowdesk_api::ChatRole;
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
};

use crate::app::{App, Effect, Route, StatusLevel};
use crate::ui::components::component::Component;
use crate::ui::theme::{Theme, helpers::block};

#[derive(Debug, Default)]
pub struct AssistantComponent;

impl AssistantComponent {
    fn last_assistant_index(app: &App) -> Option<usize> {
        app.assistant.session.messages().iter().rposition(|message| message.role == ChatRole::Assistant)
    }

    fn toggle_last(app: &mut App, section: &str) {
        if let Some(index) = Self::last_assistant_index(app) {
            app.assistant.session.toggle_section(index, section);
        }
    }
}

impl Component for AssistantComponent {
    fn handle_key_events(&mut self, app: &mut App, key: KeyEvent) -> Vec<Effect> {
        let control = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => return vec![Effect::SwitchTo(Route::Templates)],
            KeyCode::Char('n') if control => {
                if !app.assistant.session.new_chat() {
                    app.set_status(StatusLevel::Warning, "Wait for the current reply before starting a new chat");
                }
                app.assistant.scroll = 0;
            }
            KeyCode::Char('t') if control => Self::toggle_last(app, THINKING_SECTION),
            KeyCode::Char('s') if control => {
                if let Some(section) = app.assistant.session.config().sections.first().cloned() {
                    Self::toggle_last(app, &section);
                }
            }
            KeyCode::PageUp => app.assistant.scroll = app.assistant.scroll.saturating_add(5),
            KeyCode::PageDown => app.assistant.scroll = app.assistant.scroll.saturating_sub(5),
            KeyCode::Enter => {
                let input = app.assistant.input.input().to_string();
                match app.assistant.session.begin(&input) {
                    Ok(outgoing) => {
                        app.assistant.input.clear();
                        app.assistant.scroll = 0;
                        return vec![Effect::SendChat(outgoing)];
                    }
                    Err(SessionError::Busy) => app.set_status(StatusLevel::Warning, "The assistant is still replying"),
                    Err(_) => {}
                }
            }
            KeyCode::Char(character) if !control => app.assistant.input.insert_char(character),
            KeyCode::Backspace => app.assistant.input.backspace(),
            KeyCode::Delete => app.assistant.input.delete(),
            KeyCode::Left => app.assistant.input.move_left(),
            KeyCode::Right => app.assistant.input.move_right(),
            KeyCode::Home => app.assistant.input.move_home(),
            KeyCode::End => app.assistant.input.move_end(),
            _ => {}
        }
        Vec::new()
    }

    fn render(&mut self, frame: &mut Frame, rect: Rect, app: &mut App) {
        let theme = app.theme.as_ref();
        let [conversation_area, input_area] = Layout::vertical([Constraint::Min(3), Constraint::Length(3)]).areas(rect);

        let session = &app.assistant.session;
        let mut lines = Vec::new();
        if session.messages().is_empty() {
            lines.push(Line::from(Span::styled(
                "Describe the workflow you need and the assistant will draft a template.",
                theme.text_muted_style(),
            )));
        }
        for message in session.messages() {
            lines.extend(message_lines(message, &session.config().sections, theme));
            lines.push(Line::default());
        }
        if session.is_loading() {
            lines.push(Line::from(Span::styled("Assistant is typing...", theme.text_muted_style())));
        }

        let conversation_block = block(theme, Some("Assistant"), false);
        let visible_rows = conversation_block.inner(conversation_area).height;
        let total = wrapped_height(&lines, conversation_area.width.saturating_sub(2));
        let wrapped = Paragraph::new(lines).wrap(Wrap { trim: false });
        let bottom = total.saturating_sub(visible_rows);
        let offset = bottom.saturating_sub(app.assistant.scroll);
        frame.render_widget(wrapped.block(conversation_block).scroll((offset, 0)), conversation_area);

        let input = &app.assistant.input;
        let title = if session.is_loading() { "Message (waiting for reply)" } else { "Message" };
        let input_block = block(theme, Some(title), true);
        let text_area = input_block.inner(input_area);
        let column = input.cursor_column();
        let scroll = column.saturating_sub(text_area.width.saturating_sub(1));
        let input_line = Paragraph::new(Span::styled(input.input().to_string(), theme.text_primary_style())).scroll((0, scroll));
        frame.render_widget(input_line.block(input_block), input_area);
        if text_area.width > 0 && text_area.height > 0 {
            frame.set_cursor_position((text_area.x + column - scroll, text_area.y));
        }
    }
}

/// Rows the lines occupy once wrapped to `width` columns.
fn wrapped_height(lines: &[Line<'_>], width: u16) -> u16 {
    let width = usize::from(width.max(1));
    let rows: usize = lines.iter().map(|line| line.width().div_ceil(width).max(1)).sum();
    u16::try_from(rows).unwrap_or(u16::MAX)
}

/// Lines for one message; assistant sections render as collapsible blocks.
pub fn message_lines(message: &AssistantMessage, sections: &[String], theme: &dyn Theme) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    match message.role {
        ChatRole::User => {
            lines.push(Line::from(Span::styled("You", theme.accent_emphasis_style().add_modifier(Modifier::BOLD))));
            lines.extend(message.content.lines().map(|line| Line::from(Span::styled(line.to_string(), theme.text_primary_style()))));
        }
        ChatRole::Assistant => {
            lines.push(Line::from(Span::styled("Assistant", theme.accent_primary_style().add_modifier(Modifier::BOLD))));
            let names = std::iter::once(THINKING_SECTION).chain(sections.iter().map(String::as_str));
            for name in names {
                let Some(text) = message.section(name) else {
                    continue;
                };
                let collapsed = message.is_collapsed(name);
                let marker = if collapsed { "▸" } else { "▾" };
                lines.push(Line::from(Span::styled(format!("{marker} {name}"), theme.text_secondary_style())));
                if !collapsed {
                    lines.extend(text.lines().map(|line| Line::from(Span::styled(format!("  {line}"), theme.text_muted_style()))));
                }
            }
            lines.extend(message.content.lines().map(|line| Line::from(Span::styled(line.to_string(), theme.text_primary_style()))));
        }
    }
    lines
}
