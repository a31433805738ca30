//! Per-user notification and display preferences.
//!
//! The server stores these in camelCase; missing members fall back to the
//! defaults below rather than failing the whole payload.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationSettings {
    pub email_notifications: bool,
    pub in_app_notifications: bool,
    pub ticket_updates: bool,
    pub system_announcements: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            email_notifications: true,
            in_app_notifications: true,
            ticket_updates: true,
            system_announcements: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DisplaySettings {
    pub timezone: String,
    pub date_format: String,
    pub number_format: String,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            timezone: "auto".to_string(),
            date_format: "24h".to_string(),
            number_format: "standard".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub notification_settings: NotificationSettings,
    #[serde(default)]
    pub display_settings: DisplaySettings,
}
