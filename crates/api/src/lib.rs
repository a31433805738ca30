//! Flowdesk REST client.
//!
//! This crate provides a thin client for the Flowdesk backend. It focuses on:
//!
//! - Constructing an HTTP client with sensible defaults
//! - Validating `FLOWDESK_API_BASE` for safety
//! - Attaching the session's bearer token to every request
//! - Typed endpoint helpers for users, roles, templates, tickets, resources,
//!   files, preferences, and the streaming chat endpoint
//!
//! The primary entry point is [`FlowdeskClient`]. Session handling and
//! permission checks live in [`AppContext`].

use std::env;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, Url, header};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

pub mod chat;
pub mod context;
pub mod endpoints;
pub mod error;
pub mod seams;

pub use chat::{ChatMessage, ChatRole, ChatStream, Utf8ChunkDecoder};
pub use context::{AppContext, Session};
pub use endpoints::files::UploadedFile;
pub use error::ApiError;
pub use seams::{ChatTransport, FileStore, ResourceEntrySource};

/// Environment variable selecting the backend base URL.
pub const API_BASE_ENV: &str = "FLOWDESK_API_BASE";
/// Environment variable overriding the request timeout in seconds.
pub const HTTP_TIMEOUT_ENV: &str = "FLOWDESK_HTTP_TIMEOUT_SECS";
/// Backend used when no override is configured.
pub const DEFAULT_API_BASE: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Hostnames allowed for local development regardless of scheme.
const LOCALHOST_DOMAINS: &[&str] = &["localhost", "127.0.0.1", "[::1]"];

#[derive(Debug, Clone)]
/// Thin wrapper around a configured `reqwest::Client` for the Flowdesk API.
///
/// Clones share the same access token slot, so signing in through one handle
/// authenticates every clone.
pub struct FlowdeskClient {
    pub base_url: String,
    pub http: Client,
    pub user_agent: String,
    access_token: Arc<RwLock<Option<String>>>,
}

impl FlowdeskClient {
    /// Construct a client from `FLOWDESK_API_BASE` and `FLOWDESK_HTTP_TIMEOUT_SECS`.
    pub fn new_from_env() -> Result<Self, ApiError> {
        let base_url = env::var(API_BASE_ENV)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let timeout_secs = match env::var(HTTP_TIMEOUT_ENV) {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ApiError::Config(format!("{HTTP_TIMEOUT_ENV} must be a whole number of seconds; got '{raw}'")))?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };
        Self::new(&base_url, Duration::from_secs(timeout_secs))
    }

    /// Construct a client for an explicit base URL.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        validate_base_url(base_url)?;

        let mut default_headers = header::HeaderMap::new();
        default_headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let http = Client::builder().default_headers(default_headers).timeout(timeout).build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            user_agent: format!("flowdesk/{}; {}", env!("CARGO_PKG_VERSION"), env::consts::OS),
            access_token: Arc::new(RwLock::new(None)),
        })
    }

    /// Replace the bearer token attached to outgoing requests.
    pub fn set_access_token(&self, token: Option<String>) {
        *self.access_token.write().expect("token lock poisoned") = token;
    }

    pub fn access_token(&self) -> Option<String> {
        self.access_token.read().expect("token lock poisoned").clone()
    }

    /// Absolute URL for an API-relative path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Build a `reqwest::RequestBuilder` for a method and API-relative path.
    ///
    /// The request carries the User-Agent and, when signed in, the bearer token.
    pub fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        let url = self.url(path);
        debug!(%method, %url, "building request");

        let builder = self.http.request(method, url).header(header::USER_AGENT, &self.user_agent);
        match self.access_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request and decode a JSON body.
    pub async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self.send(request).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Send a request whose response body is not needed.
    pub async fn send_empty(&self, request: RequestBuilder) -> Result<(), ApiError> {
        self.send(request).await?;
        Ok(())
    }

    /// Send a request and turn non-success statuses into [`ApiError::Status`].
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();
        warn!(%status, %url, "request failed");
        Err(ApiError::from_status(status, &body))
    }
}

/// Validate that a base URL is acceptable for use by the client.
///
/// Rules:
/// - `localhost`, `127.0.0.1`, or `[::1]`: any scheme is allowed
/// - otherwise: scheme must be HTTPS
pub fn validate_base_url(base: &str) -> Result<(), ApiError> {
    let parsed = Url::parse(base).map_err(|error| ApiError::Config(format!("invalid {API_BASE_ENV} URL '{base}': {error}")))?;

    let host_name = parsed
        .host_str()
        .ok_or_else(|| ApiError::Config(format!("{API_BASE_ENV} must include a host")))?;

    if LOCALHOST_DOMAINS.iter().any(|&allowed| host_name.eq_ignore_ascii_case(allowed)) {
        return Ok(());
    }

    if parsed.scheme() != "https" {
        return Err(ApiError::Config(format!(
            "{API_BASE_ENV} must use https for non-localhost hosts; got '{}://'",
            parsed.scheme()
        )));
    }

    Ok(())
}
