use ratatui::style::Color;

use super::roles::{Theme, ThemeRoles};

pub const PANEL: Color = Color::Rgb(0x23, 0x28, 0x31);
pub const LINE: Color = Color::Rgb(0x3B, 0x42, 0x52);
pub const FOREGROUND: Color = Color::Rgb(0xE5, 0xE9, 0xF0);
pub const MUTED: Color = Color::Rgb(0x7B, 0x88, 0xA1);
pub const SECONDARY: Color = Color::Rgb(0xA3, 0xB1, 0xC6);

pub const BLUE: Color = Color::Rgb(0x5E, 0x81, 0xAC);
pub const CYAN: Color = Color::Rgb(0x88, 0xC0, 0xD0);
pub const GREEN: Color = Color::Rgb(0xA3, 0xBE, 0x8C);
pub const YELLOW: Color = Color::Rgb(0xEB, 0xCB, 0x8B);
pub const RED: Color = Color::Rgb(0xBF, 0x61, 0x6A);

/// Built-in Flowdesk palette.
#[derive(Debug, Clone)]
pub struct FlowdeskTheme {
    roles: ThemeRoles,
}

impl FlowdeskTheme {
    pub fn new() -> Self {
        Self {
            roles: ThemeRoles {
                surface: PANEL,
                border: LINE,
                focus: CYAN,

                text: FOREGROUND,
                label: SECONDARY,
                hint: MUTED,

                accent: BLUE,
                highlight_bg: LINE,
                highlight_fg: FOREGROUND,

                info: CYAN,
                success: GREEN,
                warning: YELLOW,
                error: RED,
            },
        }
    }
}

impl Default for FlowdeskTheme {
    fn default() -> Self {
        Self::new()
    }
}

impl Theme for FlowdeskTheme {
    fn roles(&self) -> &ThemeRoles {
        &self.roles
    }
}
