//! Mock downstream API shared by the integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

/// Maximum time any test is allowed to run before we consider it hung.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Hostname routed to the mock via `ClientBuilder::resolve`.
pub const MOCK_DOMAIN: &str = "api.relay-mock.test";

/// One request seen by the mock.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub user_agent: Option<String>,
    pub body: Value,
}

/// How the mock answers.
#[derive(Debug, Clone)]
pub struct MockBehavior {
    pub emails_status: StatusCode,
    pub emails_delay: Duration,
    pub health_status: StatusCode,
    pub health_delay: Duration,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            emails_status: StatusCode::OK,
            emails_delay: Duration::ZERO,
            health_status: StatusCode::OK,
            health_delay: Duration::ZERO,
        }
    }
}

#[derive(Clone)]
struct MockState {
    behavior: MockBehavior,
    emails: Arc<Mutex<Vec<Recorded>>>,
    probes: Arc<Mutex<Vec<Recorded>>>,
}

/// Handle to a running mock.
pub struct MockApi {
    pub addr: SocketAddr,
    emails: Arc<Mutex<Vec<Recorded>>>,
    probes: Arc<Mutex<Vec<Recorded>>>,
}

impl MockApi {
    /// Start the mock on a random loopback port.
    pub async fn start(behavior: MockBehavior) -> Self {
        let state = MockState {
            behavior,
            emails: Arc::new(Mutex::new(Vec::new())),
            probes: Arc::new(Mutex::new(Vec::new())),
        };
        let emails = Arc::clone(&state.emails);
        let probes = Arc::clone(&state.probes);

        let app = Router::new()
            .route("/api/v1/emails", post(receive_email))
            .route("/health", get(health))
            .layer(DefaultBodyLimit::disable())
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start accepting connections.
        tokio::time::sleep(Duration::from_millis(50)).await;

        Self {
            addr,
            emails,
            probes,
        }
    }

    /// Loopback URL of the mock.
    pub fn ip_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.addr.port())
    }

    /// Domain URL of the mock; only reachable through `domain_client()`.
    pub fn domain_url(&self) -> String {
        format!("http://{MOCK_DOMAIN}:{}", self.addr.port())
    }

    /// Client that resolves `MOCK_DOMAIN` to the mock.
    pub fn domain_client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .resolve(MOCK_DOMAIN, self.addr)
            .build()
            .unwrap()
    }

    pub async fn emails(&self) -> Vec<Recorded> {
        self.emails.lock().await.clone()
    }

    pub async fn probes(&self) -> Vec<Recorded> {
        self.probes.lock().await.clone()
    }
}

/// A port with nothing listening on it.
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn record(headers: &HeaderMap, body: Value) -> Recorded {
    Recorded {
        authorization: header(headers, "authorization"),
        content_type: header(headers, "content-type"),
        user_agent: header(headers, "user-agent"),
        body,
    }
}

async fn receive_email(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, &'static str) {
    state.emails.lock().await.push(record(&headers, body));
    tokio::time::sleep(state.behavior.emails_delay).await;
    let text = if state.behavior.emails_status.is_success() {
        r#"{"status":"stored"}"#
    } else {
        r#"{"error":"storage failed"}"#
    };
    (state.behavior.emails_status, text)
}

async fn health(State(state): State<MockState>, headers: HeaderMap) -> (StatusCode, &'static str) {
    state.probes.lock().await.push(record(&headers, Value::Null));
    tokio::time::sleep(state.behavior.health_delay).await;
    (state.behavior.health_status, r#"{"status":"ok"}"#)
}
