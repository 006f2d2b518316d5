//! Page-view event definitions.

use serde::{Deserialize, Serialize};

/// A single page view by a visitor.
///
/// Timestamps are milliseconds since an arbitrary epoch; only their relative
/// order and differences matter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Page URL (opaque)
    pub url: String,
    /// Visitor identifier, the grouping key
    pub visitor_id: String,
    /// Milliseconds since epoch
    pub timestamp: i64,
}

impl Event {
    pub fn new(visitor_id: impl Into<String>, url: impl Into<String>, timestamp: i64) -> Self {
        Self {
            url: url.into(),
            visitor_id: visitor_id.into(),
            timestamp,
        }
    }
}

/// Input document delivered by an event source.
///
/// Wire format: `{"events": [{"url": ..., "visitorId": ..., "timestamp": ...}]}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventBatch {
    #[serde(default)]
    pub events: Vec<Event>,
}

impl EventBatch {
    /// Parses an event batch from raw JSON bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
