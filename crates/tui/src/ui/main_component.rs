//! Top-level view: route tabs, the active screen, the status line and key
//! hints.

use crossterm::event::KeyEvent;
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::Paragraph,
};

use crate::app::{App, Effect, Route, StatusLevel};
use crate::ui::components::{AssistantComponent, Component, StepFormComponent, TemplatesComponent};
use crate::ui::theme::{Theme, helpers::panel_style};

#[derive(Debug, Default)]
pub struct MainView {
    templates: TemplatesComponent,
    step_form: StepFormComponent,
    assistant: AssistantComponent,
}

impl MainView {
    fn active(&mut self, route: Route) -> &mut dyn Component {
        match route {
            Route::Templates => &mut self.templates,
            Route::StepForm => &mut self.step_form,
            Route::Assistant => &mut self.assistant,
        }
    }

    pub fn handle_key_events(&mut self, app: &mut App, key: KeyEvent) -> Vec<Effect> {
        self.active(app.route).handle_key_events(app, key)
    }

    pub fn render(&mut self, frame: &mut Frame, rect: Rect, app: &mut App) {
        frame.render_widget(Paragraph::new("").style(panel_style(app.theme.as_ref())), rect);
        let [tabs_area, content_area, status_area, hints_area] =
            Layout::vertical([Constraint::Length(1), Constraint::Min(3), Constraint::Length(1), Constraint::Length(1)]).areas(rect);

        frame.render_widget(Paragraph::new(tab_line(app.route, app.theme.as_ref())), tabs_area);
        self.active(app.route).render(frame, content_area, app);

        let theme = app.theme.as_ref();
        if let Some(status) = &app.status {
            let style = match status.level {
                StatusLevel::Info => theme.status_info(),
                StatusLevel::Success => theme.status_success(),
                StatusLevel::Warning => theme.status_warning(),
                StatusLevel::Error => theme.status_error(),
            };
            frame.render_widget(Paragraph::new(Span::styled(status.text.clone(), style)), status_area);
        }
        frame.render_widget(Paragraph::new(Span::styled(key_hints(app.route), theme.text_muted_style())), hints_area);
    }
}

fn tab_line(route: Route, theme: &dyn Theme) -> Line<'static> {
    let tabs = [(Route::Templates, "Templates"), (Route::StepForm, "Step form"), (Route::Assistant, "Assistant")];
    let mut spans = vec![Span::styled(" Flowdesk ", theme.accent_emphasis_style().add_modifier(Modifier::BOLD))];
    for (tab, title) in tabs {
        let style = if tab == route { theme.selection_style() } else { theme.text_muted_style() };
        spans.push(Span::raw(" "));
        spans.push(Span::styled(format!(" {title} "), style));
    }
    Line::from(spans)
}

pub fn key_hints(route: Route) -> &'static str {
    match route {
        Route::Templates => "↑/↓ template  ←/→ step  f fill form  g graph  a assistant  s save suggestion  x discard  d delete  r reload  q quit",
        Route::StepForm => "Tab next field  Space/Enter choose  Enter attach path  Del remove file  Ctrl+S validate  Esc back",
        Route::Assistant => "Enter send  Ctrl+T thinking  Ctrl+S suggestion  Ctrl+N new chat  PgUp/PgDn scroll  Esc back",
    }
}
