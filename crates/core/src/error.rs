//! Unified error types for the sessionizer.
//!
//! The sessionization core is total and never fails; every error here comes
//! from the I/O boundary or from configuration.
//!
//! Error codes:
//! - SOURCE_001-003: Event source errors
//! - SINK_001-003: Session sink errors

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Event source error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorCode {
    /// SOURCE_001: Source could not be reached
    Unreachable,
    /// SOURCE_002: Source answered with a non-success status
    BadStatus,
    /// SOURCE_003: Source payload could not be decoded
    Decode,
}

impl SourceErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unreachable => "SOURCE_001",
            Self::BadStatus => "SOURCE_002",
            Self::Decode => "SOURCE_003",
        }
    }
}

/// Session sink error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkErrorCode {
    /// SINK_001: Sink could not be reached
    Unreachable,
    /// SINK_002: Sink rejected the payload
    Rejected,
    /// SINK_003: Payload could not be encoded
    Encode,
}

impl SinkErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unreachable => "SINK_001",
            Self::Rejected => "SINK_002",
            Self::Encode => "SINK_003",
        }
    }
}

/// Unified error type for the sessionizer.
#[derive(Debug, Error)]
pub enum Error {
    /// Input acquisition error with code.
    #[error("[{code}] {message}")]
    Source {
        code: &'static str,
        message: String,
    },

    /// Output delivery error with code.
    #[error("[{code}] {message}")]
    Sink {
        code: &'static str,
        message: String,
        /// HTTP status returned by the sink, if any
        status: Option<u16>,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an event source error.
    pub fn fetch(code: SourceErrorCode, msg: impl Into<String>) -> Self {
        Self::Source {
            code: code.code(),
            message: msg.into(),
        }
    }

    /// Create a session sink error.
    pub fn delivery(code: SinkErrorCode, msg: impl Into<String>) -> Self {
        Self::Sink {
            code: code.code(),
            message: msg.into(),
            status: None,
        }
    }

    /// Create a session sink error carrying the status the sink answered with.
    pub fn rejected(status: u16, msg: impl Into<String>) -> Self {
        Self::Sink {
            code: SinkErrorCode::Rejected.code(),
            message: msg.into(),
            status: Some(status),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get the error code if this is a coded error.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::Source { code, .. } => Some(*code),
            Self::Sink { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether repeating the same delivery may succeed.
    ///
    /// Encoding failures and 4xx rejections (other than 408/429) are permanent.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Sink { code, status, .. } => {
                if *code == SinkErrorCode::Encode.code() {
                    return false;
                }
                match status {
                    Some(s) => *s >= 500 || *s == 408 || *s == 429,
                    None => true,
                }
            }
            Self::Io(_) => true,
            _ => false,
        }
    }
}
