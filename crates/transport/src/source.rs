//! Event sources.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use session_core::{Error, Event, EventBatch, Result, SourceErrorCode};
use tracing::{debug, warn};
use url::Url;

use crate::config::{Endpoint, EndpointConfig};

/// Provides the raw, unordered event batch for a run.
///
/// Implementations must either return a fully decoded batch or an error;
/// the sessionizer never sees partially decoded input.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Fetches and decodes all events.
    async fn fetch(&self) -> Result<Vec<Event>>;

    /// Human readable location, for logs.
    fn describe(&self) -> String;
}

/// Fetches the event batch with an HTTP GET.
#[derive(Clone)]
pub struct HttpEventSource {
    url: Url,
    http_client: reqwest::Client,
}

impl HttpEventSource {
    /// Creates a new HTTP source.
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
impl EventSource for HttpEventSource {
    async fn fetch(&self) -> Result<Vec<Event>> {
        debug!(url = %self.url, "Fetching events");

        let response = self
            .http_client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Event source request failed");
                Error::fetch(
                    SourceErrorCode::Unreachable,
                    format!("failed to fetch events: {}", e),
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Event source returned error");
            return Err(Error::fetch(
                SourceErrorCode::BadStatus,
                format!("event source returned {}: {}", status, body),
            ));
        }

        let bytes = response.bytes().await.map_err(|e| {
            Error::fetch(
                SourceErrorCode::Unreachable,
                format!("failed to read event source body: {}", e),
            )
        })?;

        let batch = EventBatch::parse(&bytes).map_err(|e| {
            warn!(error = %e, "Failed to decode event batch");
            Error::fetch(
                SourceErrorCode::Decode,
                format!("invalid event batch: {}", e),
            )
        })?;

        debug!(events = batch.len(), "Fetched events");
        Ok(batch.events)
    }

    fn describe(&self) -> String {
        format!("GET {}", self.url)
    }
}

/// Reads the event batch from a JSON file.
#[derive(Debug, Clone)]
pub struct FileEventSource {
    path: PathBuf,
}

impl FileEventSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl EventSource for FileEventSource {
    async fn fetch(&self) -> Result<Vec<Event>> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            Error::fetch(
                SourceErrorCode::Unreachable,
                format!("failed to read {}: {}", self.path.display(), e),
            )
        })?;

        let batch = EventBatch::parse(&bytes).map_err(|e| {
            Error::fetch(
                SourceErrorCode::Decode,
                format!("invalid event batch in {}: {}", self.path.display(), e),
            )
        })?;

        debug!(path = %self.path.display(), events = batch.len(), "Read events");
        Ok(batch.events)
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

/// Builds the event source for a configured endpoint.
pub fn build_source(config: &EndpointConfig) -> Result<Arc<dyn EventSource>> {
    match config.endpoint()? {
        Endpoint::Http { url, timeout } => Ok(Arc::new(HttpEventSource::new(url, timeout)?)),
        Endpoint::File(path) => Ok(Arc::new(FileEventSource::new(path))),
    }
}
