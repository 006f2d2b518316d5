//! Session sinks.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use session_core::{Error, Result, SessionsPayload, SinkErrorCode};
use tracing::{debug, warn};
use url::Url;

use crate::config::{Endpoint, EndpointConfig};

/// Acknowledgement of a successful delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    /// HTTP status, if the sink speaks HTTP
    pub status: Option<u16>,
    /// Response body or a short description of where the payload went
    pub body: String,
    pub bytes_sent: usize,
}

/// Accepts the computed sessions of a run.
///
/// Delivering the same payload twice must be safe: the pipeline retries
/// failed deliveries without recomputing.
#[async_trait]
pub trait SessionSink: Send + Sync {
    async fn deliver(&self, payload: &SessionsPayload) -> Result<DeliveryReceipt>;

    /// Human readable location, for logs.
    fn describe(&self) -> String;
}

/// Posts the sessions payload as JSON.
#[derive(Clone)]
pub struct HttpSessionSink {
    url: Url,
    http_client: reqwest::Client,
}

impl HttpSessionSink {
    /// Creates a new HTTP sink.
    pub fn new(url: Url, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { url, http_client })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl SessionSink for HttpSessionSink {
    async fn deliver(&self, payload: &SessionsPayload) -> Result<DeliveryReceipt> {
        let body = payload.to_json().map_err(|e| {
            Error::delivery(SinkErrorCode::Encode, format!("failed to encode sessions: {}", e))
        })?;
        let bytes_sent = body.len();

        debug!(url = %self.url, bytes = bytes_sent, "Posting sessions");

        let response = self
            .http_client
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Session sink request failed");
                Error::delivery(
                    SinkErrorCode::Unreachable,
                    format!("failed to post sessions: {}", e),
                )
            })?;

        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %text, "Session sink rejected payload");
            return Err(Error::rejected(
                status.as_u16(),
                format!("session sink returned {}: {}", status, text),
            ));
        }

        // An unreadable acknowledgement fails the attempt
        let text = response.text().await.map_err(|e| {
            warn!(status = %status, error = %e, "Failed to read session sink response");
            Error::delivery(
                SinkErrorCode::Unreachable,
                format!("failed to read session sink response: {}", e),
            )
        })?;

        Ok(DeliveryReceipt {
            status: Some(status.as_u16()),
            body: text,
            bytes_sent,
        })
    }

    fn describe(&self) -> String {
        format!("POST {}", self.url)
    }
}

/// Writes the sessions payload to a JSON file, replacing any previous run.
#[derive(Debug, Clone)]
pub struct FileSessionSink {
    path: PathBuf,
}

impl FileSessionSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl SessionSink for FileSessionSink {
    async fn deliver(&self, payload: &SessionsPayload) -> Result<DeliveryReceipt> {
        let body = serde_json::to_vec_pretty(payload).map_err(|e| {
            Error::delivery(SinkErrorCode::Encode, format!("failed to encode sessions: {}", e))
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Stage beside the target, then rename over it
        let staging = self.staging_path();
        let written = match tokio::fs::write(&staging, &body).await {
            Ok(()) => tokio::fs::rename(&staging, &self.path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            warn!(path = %self.path.display(), error = %e, "Failed to write sessions");
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(e.into());
        }

        debug!(path = %self.path.display(), bytes = body.len(), "Wrote sessions");

        Ok(DeliveryReceipt {
            status: None,
            body: format!("wrote {}", self.path.display()),
            bytes_sent: body.len(),
        })
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

/// Builds the session sink for a configured endpoint.
pub fn build_sink(config: &EndpointConfig) -> Result<Arc<dyn SessionSink>> {
    match config.endpoint()? {
        Endpoint::Http { url, timeout } => Ok(Arc::new(HttpSessionSink::new(url, timeout)?)),
        Endpoint::File(path) => Ok(Arc::new(FileSessionSink::new(path))),
    }
}
