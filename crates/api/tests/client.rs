//! End-to-end client tests against a canned HTTP server on localhost.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use flowdesk_api::{AppContext, ChatMessage, FlowdeskClient};
use flowdesk_types::Preferences;
use flowdesk_util::{InMemoryLocalStore, LocalStore};
use futures_util::StreamExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

#[derive(Debug, Clone)]
struct RecordedRequest {
    method: String,
    path: String,
    headers: HashMap<String, String>,
    body: String,
}

#[derive(Clone)]
struct CannedResponse {
    status: u16,
    body: Vec<String>,
}

impl CannedResponse {
    fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            body: vec![body.to_string()],
        }
    }

    fn chunks(parts: &[&str]) -> Self {
        Self {
            status: 200,
            body: parts.iter().map(|part| part.to_string()).collect(),
        }
    }
}

struct MockServer {
    base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockServer {
    async fn start(routes: Vec<(&str, CannedResponse)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("address");
        let routes: Arc<HashMap<String, CannedResponse>> =
            Arc::new(routes.into_iter().map(|(route, response)| (route.to_string(), response)).collect());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = requests.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let routes = routes.clone();
                let recorded = recorded.clone();
                tokio::spawn(async move {
                    let Some(request) = read_request(&mut socket).await else {
                        return;
                    };
                    let key = format!("{} {}", request.method, request.path);
                    recorded.lock().expect("requests lock").push(request);
                    let response = routes.get(&key).cloned().unwrap_or(CannedResponse::json(404, serde_json::json!({"detail": "Not Found"})));
                    let head = format!("HTTP/1.1 {} Canned\r\nContent-Type: application/json\r\nConnection: close\r\n\r\n", response.status);
                    let _ = socket.write_all(head.as_bytes()).await;
                    for part in response.body {
                        let _ = socket.write_all(part.as_bytes()).await;
                        let _ = socket.flush().await;
                        tokio::time::sleep(Duration::from_millis(5)).await;
                    }
                    let _ = socket.shutdown().await;
                });
            }
        });

        Self {
            base_url: format!("http://127.0.0.1:{}", address.port()),
            requests,
        }
    }

    fn client(&self) -> FlowdeskClient {
        FlowdeskClient::new(&self.base_url, Duration::from_secs(5)).expect("client")
    }

    fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<RecordedRequest> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let read = socket.read(&mut chunk).await.ok()?;
        if read == 0 {
            return None;
        }
        buffer.extend_from_slice(&chunk[..read]);
        if let Some(position) = buffer.windows(4).position(|window| window == b"\r\n\r\n") {
            break position + 4;
        }
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).into_owned();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();

    let content_length = headers.get("content-length").and_then(|value| value.parse::<usize>().ok()).unwrap_or(0);
    while buffer.len() < header_end + content_length {
        let read = socket.read(&mut chunk).await.ok()?;
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);
    }
    let body = String::from_utf8_lossy(&buffer[header_end..]).into_owned();

    Some(RecordedRequest { method, path, headers, body })
}

fn user_json() -> serde_json::Value {
    serde_json::json!({"id": 7, "email": "ada@example.com", "username": "ada", "full_name": "Ada", "is_active": true, "is_superuser": false})
}

#[tokio::test]
async fn login_loads_user_and_union_of_role_permissions() {
    let server = MockServer::start(vec![
        ("POST /users/login", CannedResponse::json(200, serde_json::json!({"access_token": "acc", "refresh_token": "ref", "token_type": "bearer"}))),
        ("GET /users/me", CannedResponse::json(200, user_json())),
        (
            "GET /users/7/roles",
            CannedResponse::json(200, serde_json::json!([{"id": 1, "user_id": 7, "role_id": 10}, {"id": 2, "user_id": 7, "role_id": 11}])),
        ),
        ("GET /roles/10", CannedResponse::json(200, serde_json::json!({"id": 10, "name": "agent", "permissions": ["ticket.read", "ticket.update"]}))),
        ("GET /roles/11", CannedResponse::json(200, serde_json::json!({"id": 11, "name": "author", "permissions": ["ticket.read", "ticket_template.create"]}))),
    ])
    .await;

    let store: Arc<dyn LocalStore> = Arc::new(InMemoryLocalStore::new());
    let context = AppContext::new(server.client(), store);
    let user = context.login("ada", "s3cret&more").await.expect("login");

    assert_eq!(user.username, "ada");
    assert!(context.is_authenticated());
    assert!(context.has_permission("ticket_template.create"));
    assert!(context.has_permission("ticket.update"));
    assert!(!context.has_permission("user.delete"));
    assert_eq!(context.permissions().len(), 3);

    let requests = server.requests();
    let login = requests.iter().find(|request| request.path == "/users/login").expect("login request");
    assert_eq!(login.headers.get("content-type").map(String::as_str), Some("application/x-www-form-urlencoded"));
    assert_eq!(login.body, "username=ada&password=s3cret%26more");
    let me = requests.iter().find(|request| request.path == "/users/me").expect("me request");
    assert_eq!(me.headers.get("authorization").map(String::as_str), Some("Bearer acc"));
}

#[tokio::test]
async fn failed_login_maps_status_to_user_message() {
    let server = MockServer::start(vec![("POST /users/login", CannedResponse::json(401, serde_json::json!({"detail": "bad"})))]).await;
    let store: Arc<dyn LocalStore> = Arc::new(InMemoryLocalStore::new());
    let context = AppContext::new(server.client(), store);

    let error = context.login("ada", "wrong").await.expect_err("login should fail");
    assert_eq!(error.user_message(), "Incorrect username or password");
    assert!(!context.is_authenticated());
}

#[tokio::test]
async fn refresh_without_both_tokens_clears_session() {
    let server = MockServer::start(vec![("POST /users/refresh", CannedResponse::json(200, serde_json::json!({"access_token": "new"})))]).await;
    let store: Arc<dyn LocalStore> = Arc::new(InMemoryLocalStore::new());
    flowdesk_util::LocalStoreExt::save(store.as_ref(), flowdesk_util::AUTH_STORAGE_KEY, &serde_json::json!({"token": "old", "refreshToken": "r1"}))
        .expect("seed");
    let context = AppContext::new(server.client(), store);

    assert!(context.refresh().await.is_err());
    assert!(!context.is_authenticated());
    let refresh = server.requests().into_iter().find(|request| request.path == "/users/refresh").expect("refresh request");
    assert_eq!(refresh.headers.get("authorization").map(String::as_str), Some("Bearer r1"));
}

#[tokio::test]
async fn missing_preferences_fall_back_to_defaults() {
    let server = MockServer::start(Vec::new()).await;
    let preferences = server.client().get_preferences().await.expect("preferences");
    assert_eq!(preferences, Preferences::default());
}

#[tokio::test]
async fn chat_stream_yields_body_text() {
    let server = MockServer::start(vec![("POST /ai/template-suggest", CannedResponse::chunks(&["<think>ana", "lyzing</think>Here is", " a plan"]))]).await;
    let client = server.client();

    let mut stream = client
        .open_chat("/ai/template-suggest", &[ChatMessage::user("build me an onboarding flow")])
        .await
        .expect("open chat");
    let mut text = String::new();
    while let Some(chunk) = stream.next().await {
        text.push_str(&chunk.expect("chunk"));
    }
    assert_eq!(text, "<think>analyzing</think>Here is a plan");

    let request = server.requests().into_iter().next().expect("chat request");
    let body: serde_json::Value = serde_json::from_str(&request.body).expect("json body");
    assert_eq!(body["messages"][0]["content"], "build me an onboarding flow");
}
