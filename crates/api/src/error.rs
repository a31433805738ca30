use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Failures surfaced by the REST client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response (DNS, refused connection, timeout).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The server answered with a non-success status.
    #[error("server returned {status}: {}", detail.as_deref().unwrap_or("no detail"))]
    Status { status: StatusCode, detail: Option<String> },
    /// The response body did not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    /// An authenticated call was attempted without a session.
    #[error("not signed in")]
    MissingSession,
    /// Client configuration is invalid (base URL, timeout).
    #[error("invalid configuration: {0}")]
    Config(String),
    /// A local file could not be read for upload.
    #[error("local file error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
}

impl ApiError {
    /// Builds a status error from a response body, extracting FastAPI style `detail`.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let detail = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|parsed| parsed.detail)
            .map(|detail| match detail {
                serde_json::Value::String(text) => text,
                other => other.to_string(),
            })
            .or_else(|| {
                let trimmed = body.trim();
                (!trimmed.is_empty() && trimmed.len() <= 200).then(|| trimmed.to_string())
            });
        ApiError::Status { status, detail }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(error) => error.status(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    /// Message suitable for showing to the person signing in.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Status { status, detail } => match status.as_u16() {
                401 => "Incorrect username or password".to_string(),
                403 => "Account is locked or disabled".to_string(),
                404 => "User not found".to_string(),
                429 => "Too many login attempts. Please try again later".to_string(),
                500 => "Server error. Please try again later".to_string(),
                _ => detail.clone().unwrap_or_else(|| "An error occurred during login".to_string()),
            },
            ApiError::Transport(_) => "Failed to connect to the server".to_string(),
            ApiError::MissingSession => "Session expired, please login again".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_individual_messages() {
        let cases = [
            (401, "Incorrect username or password"),
            (403, "Account is locked or disabled"),
            (404, "User not found"),
            (429, "Too many login attempts. Please try again later"),
            (500, "Server error. Please try again later"),
        ];
        for (code, expected) in cases {
            let status = StatusCode::from_u16(code).expect("status");
            assert_eq!(ApiError::from_status(status, r#"{"detail":"ignored"}"#).user_message(), expected);
        }
    }

    #[test]
    fn other_statuses_prefer_server_detail() {
        let error = ApiError::from_status(StatusCode::BAD_REQUEST, r#"{"detail":"Username already registered"}"#);
        assert_eq!(error.user_message(), "Username already registered");

        let error = ApiError::from_status(StatusCode::BAD_GATEWAY, "");
        assert_eq!(error.user_message(), "An error occurred during login");
    }

    #[test]
    fn structured_detail_is_rendered_as_json() {
        let error = ApiError::from_status(StatusCode::UNPROCESSABLE_ENTITY, r#"{"detail":[{"loc":["body","name"]}]}"#);
        let ApiError::Status { detail, .. } = error else {
            panic!("expected status error");
        };
        assert!(detail.expect("detail").contains("\"loc\""));
    }
}
