use flowdesk_types::Preferences;
use reqwest::Method;
use tracing::debug;

use crate::{ApiError, FlowdeskClient};

impl FlowdeskClient {
    /// Preferences of the signed-in user; a user without saved preferences gets the defaults.
    pub async fn get_preferences(&self) -> Result<Preferences, ApiError> {
        match self.send_json(self.request(Method::GET, "/preferences")).await {
            Ok(preferences) => Ok(preferences),
            Err(error) if error.is_not_found() => {
                debug!("no stored preferences; using defaults");
                Ok(Preferences::default())
            }
            Err(error) => Err(error),
        }
    }

    /// Save preferences, creating the record when the server has none yet.
    pub async fn save_preferences(&self, preferences: &Preferences) -> Result<Preferences, ApiError> {
        match self.send_json(self.request(Method::PUT, "/preferences").json(preferences)).await {
            Ok(saved) => Ok(saved),
            Err(error) if error.is_not_found() => self.send_json(self.request(Method::POST, "/preferences").json(preferences)).await,
            Err(error) => Err(error),
        }
    }
}
