//! Sessionization: grouping, ordering and windowing of page-view events.
//!
//! Events are grouped by visitor, stably sorted by timestamp, and then cut
//! into sessions wherever the gap between consecutive events exceeds the
//! inactivity threshold. A gap exactly equal to the threshold continues the
//! current session.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::events::Event;
use crate::session::{Session, SessionsByVisitor};

/// Default inactivity threshold (10 minutes, in milliseconds).
pub const DEFAULT_INACTIVITY_THRESHOLD_MS: u64 = 600_000;

/// Sessionization configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Largest gap in milliseconds that still continues a session
    #[serde(default = "default_inactivity_threshold_ms")]
    pub inactivity_threshold_ms: u64,
}

fn default_inactivity_threshold_ms() -> u64 {
    DEFAULT_INACTIVITY_THRESHOLD_MS
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            inactivity_threshold_ms: default_inactivity_threshold_ms(),
        }
    }
}

impl SessionConfig {
    pub fn with_threshold_ms(inactivity_threshold_ms: u64) -> Self {
        Self {
            inactivity_threshold_ms,
        }
    }

    /// Threshold in timestamp units, saturated to the timestamp range.
    fn threshold(&self) -> i64 {
        i64::try_from(self.inactivity_threshold_ms).unwrap_or(i64::MAX)
    }
}

/// Partitions events by visitor id.
///
/// Each group keeps the input order of its events. Visitors only appear if
/// they have at least one event.
pub fn group_by_visitor(events: impl IntoIterator<Item = Event>) -> BTreeMap<String, Vec<Event>> {
    let mut groups: BTreeMap<String, Vec<Event>> = BTreeMap::new();
    for event in events {
        match groups.get_mut(&event.visitor_id) {
            Some(group) => group.push(event),
            None => {
                groups.insert(event.visitor_id.clone(), vec![event]);
            }
        }
    }
    groups
}

/// Sorts one visitor's events by ascending timestamp.
///
/// The sort is stable: events with equal timestamps keep their relative order.
pub fn order_by_timestamp(events: &mut [Event]) {
    events.sort_by_key(|e| e.timestamp);
}

/// Cuts a timestamp-ordered event sequence into sessions.
///
/// Every event lands in exactly one session and sessions come out ordered by
/// start time. An empty sequence yields no sessions.
pub fn window_sessions(ordered: &[Event], config: &SessionConfig) -> Vec<Session> {
    let Some((first, rest)) = ordered.split_first() else {
        return Vec::new();
    };

    let threshold = config.threshold();
    let mut sessions = Vec::new();
    let mut current = Session::open(first);
    let mut cursor = first.timestamp;

    for event in rest {
        let gap = event.timestamp.saturating_sub(cursor);
        if gap <= threshold {
            current.absorb(event);
        } else {
            sessions.push(std::mem::replace(&mut current, Session::open(event)));
        }
        cursor = event.timestamp;
    }

    sessions.push(current);
    sessions
}

/// Computes sessions for a batch of events.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sessionizer {
    config: SessionConfig,
}

impl Sessionizer {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Orders and windows the events of a single visitor.
    pub fn sessionize_visitor(&self, mut events: Vec<Event>) -> Vec<Session> {
        order_by_timestamp(&mut events);
        window_sessions(&events, &self.config)
    }

    /// Computes the sessions of every visitor present in `events`.
    pub fn compute(&self, events: impl IntoIterator<Item = Event>) -> SessionsByVisitor {
        group_by_visitor(events)
            .into_iter()
            .map(|(visitor_id, group)| (visitor_id, self.sessionize_visitor(group)))
            .collect()
    }
}

/// Computes sessions with the default 10 minute inactivity threshold.
pub fn compute_sessions(events: impl IntoIterator<Item = Event>) -> SessionsByVisitor {
    Sessionizer::default().compute(events)
}
