use std::fmt::Debug;

use ratatui::style::{Color, Modifier, Style};

/// Colors by purpose. Screens ask for a style through [`Theme`] and never
/// pick colors directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeRoles {
    /// Panel fill.
    pub surface: Color,
    pub border: Color,
    /// Border of the panel that receives keys.
    pub focus: Color,

    /// Values the user typed or the server returned.
    pub text: Color,
    /// Field labels and metadata captions.
    pub label: Color,
    /// Placeholders, hints, and read-only previews.
    pub hint: Color,

    /// Control markers, cursors, and step names.
    pub accent: Color,
    pub highlight_bg: Color,
    pub highlight_fg: Color,

    pub info: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
}

pub trait Theme: Send + Sync + Debug {
    fn roles(&self) -> &ThemeRoles;

    fn text_primary_style(&self) -> Style {
        Style::default().fg(self.roles().text)
    }

    fn text_secondary_style(&self) -> Style {
        Style::default().fg(self.roles().label)
    }

    fn text_muted_style(&self) -> Style {
        Style::default().fg(self.roles().hint)
    }

    fn border_style(&self, focused: bool) -> Style {
        let roles = self.roles();
        Style::default().fg(if focused { roles.focus } else { roles.border })
    }

    /// Highlighted list row, option under the cursor, or selected step.
    fn selection_style(&self) -> Style {
        let roles = self.roles();
        Style::default().fg(roles.highlight_fg).bg(roles.highlight_bg)
    }

    fn accent_primary_style(&self) -> Style {
        Style::default().fg(self.roles().accent)
    }

    /// Focused field labels and headings.
    fn accent_emphasis_style(&self) -> Style {
        self.accent_primary_style().add_modifier(Modifier::BOLD)
    }

    /// Values in preview mode, which cannot be edited.
    fn disabled_style(&self) -> Style {
        self.text_muted_style().add_modifier(Modifier::DIM)
    }

    fn status_info(&self) -> Style {
        Style::default().fg(self.roles().info)
    }

    fn status_success(&self) -> Style {
        Style::default().fg(self.roles().success)
    }

    fn status_warning(&self) -> Style {
        Style::default().fg(self.roles().warning)
    }

    fn status_error(&self) -> Style {
        Style::default().fg(self.roles().error).add_modifier(Modifier::BOLD)
    }
}
