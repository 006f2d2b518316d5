//! Common test setup functions.
//!
//! `StubServer` is a local HTTP server standing in for the remote dataset
//! and result endpoints, so tests exercise the real HTTP source and sink.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Router,
};
use parking_lot::Mutex;
use session_core::{Event, SessionsPayload};
use tokio::task::JoinHandle;
use transport::EndpointConfig;

/// A request body received on the result endpoint.
#[derive(Debug, Clone)]
pub struct ReceivedPost {
    pub content_type: Option<String>,
    pub body: String,
}

impl ReceivedPost {
    /// Decode the body as a sessions payload.
    pub fn payload(&self) -> SessionsPayload {
        serde_json::from_str(&self.body).expect("posted body is not a sessions payload")
    }
}

#[derive(Clone, Default)]
struct StubState {
    dataset_status: Arc<Mutex<u16>>,
    dataset_body: Arc<Mutex<String>>,
    result_statuses: Arc<Mutex<VecDeque<u16>>>,
    received: Arc<Mutex<Vec<ReceivedPost>>>,
}

/// Local stand-in for the dataset (GET) and result (POST) endpoints.
pub struct StubServer {
    addr: SocketAddr,
    state: StubState,
    handle: JoinHandle<()>,
}

impl StubServer {
    /// Start a stub server serving `events` on `/dataset`.
    pub async fn start(events: &[Event]) -> Self {
        Self::start_with_body(200, crate::fixtures::dataset_json(events)).await
    }

    /// Start a stub server serving a raw body and status on `/dataset`.
    pub async fn start_with_body(status: u16, body: impl Into<String>) -> Self {
        let state = StubState::default();
        *state.dataset_status.lock() = status;
        *state.dataset_body.lock() = body.into();

        let app = Router::new()
            .route("/dataset", get(dataset))
            .route("/result", post(result))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind stub server");
        let addr = listener.local_addr().expect("Failed to read stub address");

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("Stub server error: {}", e);
            }
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    pub fn dataset_url(&self) -> String {
        format!("http://{}/dataset", self.addr)
    }

    pub fn result_url(&self) -> String {
        format!("http://{}/result", self.addr)
    }

    pub fn source_config(&self) -> EndpointConfig {
        EndpointConfig::http(self.dataset_url()).with_timeout_secs(5)
    }

    pub fn sink_config(&self) -> EndpointConfig {
        EndpointConfig::http(self.result_url()).with_timeout_secs(5)
    }

    /// Answer the next posts to `/result` with these statuses, then 200.
    pub fn script_result_statuses(&self, statuses: &[u16]) {
        self.state.result_statuses.lock().extend(statuses.iter().copied());
    }

    /// All bodies posted to `/result`, rejected ones included.
    pub fn received(&self) -> Vec<ReceivedPost> {
        self.state.received.lock().clone()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn dataset(State(state): State<StubState>) -> (StatusCode, String) {
    let status = StatusCode::from_u16(*state.dataset_status.lock())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, state.dataset_body.lock().clone())
}

async fn result(
    State(state): State<StubState>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.received.lock().push(ReceivedPost { content_type, body });

    let status = state.result_statuses.lock().pop_front().unwrap_or(200);
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::OK);
    let reply = if status.is_success() {
        "Success".to_string()
    } else {
        format!("stub rejected with {}", status.as_u16())
    };
    (status, reply)
}
