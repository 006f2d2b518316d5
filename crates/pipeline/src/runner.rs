//! Pipeline runner: fetch events, compute sessions, deliver results.
//!
//! A run proceeds in three steps:
//! 1. Fetch the event batch from the source (any failure aborts the run)
//! 2. Sessionize all visitors
//! 3. Deliver the payload to the sink, retrying transient failures
//!
//! Retries re-send the payload computed in step 2; nothing is recomputed.

use std::sync::Arc;
use std::time::Instant;

use session_core::{Error, Result, Sessionizer, SessionsPayload};
use telemetry::metrics;
use tracing::{error, info, warn};
use transport::{DeliveryReceipt, EventSource, SessionSink};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::parallel::compute_parallel;

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub events: usize,
    pub visitors: usize,
    pub sessions: usize,
    /// Number of delivery attempts, including the successful one
    pub delivery_attempts: u32,
    pub receipt: DeliveryReceipt,
}

/// One-shot sessionization pipeline.
pub struct Pipeline {
    source: Arc<dyn EventSource>,
    sink: Arc<dyn SessionSink>,
    sessionizer: Sessionizer,
    config: PipelineConfig,
}

impl Pipeline {
    /// Creates a new pipeline with default run settings.
    pub fn new(
        source: Arc<dyn EventSource>,
        sink: Arc<dyn SessionSink>,
        sessionizer: Sessionizer,
    ) -> Self {
        Self {
            source,
            sink,
            sessionizer,
            config: PipelineConfig::default(),
        }
    }

    /// Creates a new pipeline with custom run settings.
    pub fn with_config(
        source: Arc<dyn EventSource>,
        sink: Arc<dyn SessionSink>,
        sessionizer: Sessionizer,
        config: PipelineConfig,
    ) -> Self {
        Self {
            source,
            sink,
            sessionizer,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs fetch → compute → deliver once.
    pub async fn run(&self) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        info!(
            run_id = %run_id,
            source = %self.source.describe(),
            sink = %self.sink.describe(),
            inactivity_threshold_ms = self.sessionizer.config().inactivity_threshold_ms,
            "Sessionizer run starting"
        );

        let payload = self.compute().await?;
        let events: usize = payload
            .sessions_by_user
            .values()
            .flatten()
            .map(|s| s.page_count())
            .sum();

        let (receipt, delivery_attempts) = self.deliver_with_retry(&payload).await?;

        metrics().runs_completed.inc();
        info!(
            run_id = %run_id,
            events = events,
            visitors = payload.visitor_count(),
            sessions = payload.session_count(),
            attempts = delivery_attempts,
            status = ?receipt.status,
            response = %receipt.body,
            "Sessionizer run complete"
        );

        Ok(RunReport {
            run_id,
            events,
            visitors: payload.visitor_count(),
            sessions: payload.session_count(),
            delivery_attempts,
            receipt,
        })
    }

    /// Fetches events and sessionizes them without delivering.
    pub async fn compute(&self) -> Result<SessionsPayload> {
        let start = Instant::now();
        let events = match self.source.fetch().await {
            Ok(events) => events,
            Err(e) => {
                metrics().fetch_errors.inc();
                error!(error = %e, "Failed to fetch events, aborting run");
                return Err(e);
            }
        };
        metrics().fetch_latency_ms.observe(start.elapsed().as_millis() as u64);
        metrics().events_fetched.inc_by(events.len() as u64);
        info!(events = events.len(), "Fetched events");

        let start = Instant::now();
        let sessions_by_user = if self.config.workers > 1 {
            compute_parallel(self.sessionizer, events, self.config.workers).await?
        } else {
            self.sessionizer.compute(events)
        };
        let payload = SessionsPayload::new(sessions_by_user);

        let elapsed = start.elapsed();
        metrics().compute_latency_ms.observe(elapsed.as_millis() as u64);
        metrics().visitors_processed.inc_by(payload.visitor_count() as u64);
        metrics().sessions_computed.inc_by(payload.session_count() as u64);
        info!(
            visitors = payload.visitor_count(),
            sessions = payload.session_count(),
            latency_ms = %elapsed.as_millis(),
            "Computed sessions"
        );

        Ok(payload)
    }

    /// Delivers the payload, retrying retryable failures with linear backoff.
    ///
    /// Returns the receipt and the number of attempts made.
    pub async fn deliver_with_retry(
        &self,
        payload: &SessionsPayload,
    ) -> Result<(DeliveryReceipt, u32)> {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let backoff = self.config.retry_backoff() * attempt;
                warn!(
                    attempt = attempt,
                    backoff_ms = %backoff.as_millis(),
                    "Retrying session delivery"
                );
                tokio::time::sleep(backoff).await;
            }

            metrics().delivery_attempts.inc();
            let start = Instant::now();

            match self.sink.deliver(payload).await {
                Ok(receipt) => {
                    metrics()
                        .delivery_latency_ms
                        .observe(start.elapsed().as_millis() as u64);
                    return Ok((receipt, attempt + 1));
                }
                Err(e) => {
                    metrics().delivery_errors.inc();
                    let retryable = e.is_retryable();
                    error!(
                        attempt = attempt + 1,
                        retryable = retryable,
                        error = %e,
                        "Session delivery failed"
                    );
                    if !retryable {
                        return Err(e);
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::internal("delivery failed with unknown error")))
    }
}
