//! Endpoint configuration for sources and sinks.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use session_core::{Error, Result};
use url::Url;
use validator::{Validate, ValidationError};

/// Where events are read from or sessions are written to.
///
/// Exactly one of `url` and `path` must be set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_endpoint_config"))]
pub struct EndpointConfig {
    /// HTTP(S) URL
    pub url: Option<String>,
    /// Local JSON file
    pub path: Option<PathBuf>,
    /// Request timeout in seconds (HTTP only)
    #[serde(default = "default_timeout_secs")]
    #[validate(range(min = 1, max = 600))]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: None,
            path: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// A resolved, validated endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Http { url: Url, timeout: Duration },
    File(PathBuf),
}

fn validate_endpoint_config(config: &EndpointConfig) -> std::result::Result<(), ValidationError> {
    match (&config.url, &config.path) {
        (Some(_), Some(_)) => Err(endpoint_error(
            "ambiguous_endpoint",
            "set either url or path, not both",
        )),
        (None, None) => Err(endpoint_error("missing_endpoint", "url or path is required")),
        (Some(raw), None) => parse_http_url(raw)
            .map(|_| ())
            .map_err(|msg| endpoint_error("invalid_url", msg)),
        (None, Some(_)) => Ok(()),
    }
}

fn endpoint_error(code: &'static str, msg: impl Into<String>) -> ValidationError {
    let msg: String = msg.into();
    let mut err = ValidationError::new(code);
    err.message = Some(msg.into());
    err
}

fn parse_http_url(raw: &str) -> std::result::Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| format!("invalid url {}: {}", raw, e))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("unsupported url scheme: {}", other)),
    }
}

impl EndpointConfig {
    pub fn http(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            path: None,
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            url: None,
            path: Some(path.into()),
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Validates the configuration and resolves it to an endpoint.
    pub fn endpoint(&self) -> Result<Endpoint> {
        self.validate()
            .map_err(|e| Error::config(format!("invalid endpoint: {}", e)))?;

        match (&self.url, &self.path) {
            (Some(raw), None) => {
                let url = parse_http_url(raw).map_err(Error::config)?;
                Ok(Endpoint::Http {
                    url,
                    timeout: Duration::from_secs(self.timeout_secs),
                })
            }
            (None, Some(path)) => Ok(Endpoint::File(path.clone())),
            _ => Err(Error::config("url or path is required")),
        }
    }
}
