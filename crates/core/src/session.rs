//! Session output types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::events::Event;

/// A bounded browsing session of one visitor.
///
/// Field order matches the wire format consumed downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Last event timestamp minus `start_time` (0 for single-event sessions)
    pub duration: i64,
    /// Page URLs in the order their events were assigned
    pub pages: Vec<String>,
    /// Timestamp of the first event
    pub start_time: i64,
}

impl Session {
    /// Opens a session with its first event.
    pub fn open(event: &Event) -> Self {
        Self {
            duration: 0,
            pages: vec![event.url.clone()],
            start_time: event.timestamp,
        }
    }

    /// Appends an event to this session.
    pub fn absorb(&mut self, event: &Event) {
        self.pages.push(event.url.clone());
        self.duration = event.timestamp.saturating_sub(self.start_time);
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Sessions keyed by visitor id, ordered by visitor id.
pub type SessionsByVisitor = BTreeMap<String, Vec<Session>>;

/// Output document handed to a session sink.
///
/// Wire format: `{"sessionsByUser": {"<visitorId>": [{"duration", "pages", "startTime"}]}}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionsPayload {
    #[serde(rename = "sessionsByUser")]
    pub sessions_by_user: SessionsByVisitor,
}

impl SessionsPayload {
    pub fn new(sessions_by_user: SessionsByVisitor) -> Self {
        Self { sessions_by_user }
    }

    pub fn visitor_count(&self) -> usize {
        self.sessions_by_user.len()
    }

    /// Total number of sessions across all visitors.
    pub fn session_count(&self) -> usize {
        self.sessions_by_user.values().map(Vec::len).sum()
    }

    /// Serializes the payload to JSON bytes.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
