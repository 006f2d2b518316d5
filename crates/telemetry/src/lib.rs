//! Internal telemetry for the sessionizer.
//!
//! Structured logging through `tracing`, plus in-process run metrics that are
//! logged as a snapshot when a run finishes.

pub mod metrics;
pub mod tracing_setup;

pub use metrics::*;
pub use tracing_setup::*;
