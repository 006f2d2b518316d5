//! Error handling tests at the source and sink boundaries.
//!
//! Fetch failures must abort a run before sessionization; delivery failures
//! are retried with the same payload when they are transient.

use std::sync::Arc;

use integration_tests::{
    fixtures,
    mocks::{MockEventSource, MockSessionSink},
    setup::StubServer,
};
use pipeline::{Pipeline, PipelineConfig};
use session_core::Sessionizer;
use transport::{build_sink, build_source};

fn fast_config(max_retries: u32) -> PipelineConfig {
    PipelineConfig {
        workers: 1,
        max_retries,
        retry_backoff_ms: 1,
    }
}

/// Source failure aborts the run; nothing is delivered.
#[tokio::test]
async fn test_source_failure_aborts_run() {
    let source = MockEventSource::new(fixtures::mixed_batch());
    source.set_should_fail(true);
    let sink = MockSessionSink::new();

    let pipeline = Pipeline::new(
        Arc::new(source),
        Arc::new(sink.clone()),
        Sessionizer::default(),
    );

    let err = pipeline.run().await.unwrap_err();
    assert_eq!(err.error_code(), Some("SOURCE_001"));
    assert_eq!(sink.attempt_count(), 0);
}

/// Non-success status from the dataset endpoint is reported with its code.
#[tokio::test]
async fn test_dataset_error_status() {
    let server = StubServer::start_with_body(500, "boom").await;

    let pipeline = Pipeline::new(
        build_source(&server.source_config()).unwrap(),
        build_sink(&server.sink_config()).unwrap(),
        Sessionizer::default(),
    );

    let err = pipeline.run().await.unwrap_err();
    assert_eq!(err.error_code(), Some("SOURCE_002"));
    assert!(err.to_string().contains("boom"));
    assert!(server.received().is_empty());
}

/// Malformed dataset never reaches the sessionizer.
#[tokio::test]
async fn test_malformed_dataset() {
    let server =
        StubServer::start_with_body(200, r#"{"events":[{"url":"/a","visitorId":7}]}"#).await;

    let pipeline = Pipeline::new(
        build_source(&server.source_config()).unwrap(),
        build_sink(&server.sink_config()).unwrap(),
        Sessionizer::default(),
    );

    let err = pipeline.run().await.unwrap_err();
    assert_eq!(err.error_code(), Some("SOURCE_003"));
    assert!(server.received().is_empty());
}

/// Transient sink failures are retried and the same payload is delivered.
#[tokio::test]
async fn test_transient_rejections_retried() {
    let server = StubServer::start(&fixtures::mixed_batch()).await;
    server.script_result_statuses(&[503, 502]);

    let pipeline = Pipeline::with_config(
        build_source(&server.source_config()).unwrap(),
        build_sink(&server.sink_config()).unwrap(),
        Sessionizer::default(),
        fast_config(3),
    );

    let report = pipeline.run().await.expect("run failed");
    assert_eq!(report.delivery_attempts, 3);

    let received = server.received();
    assert_eq!(received.len(), 3);
    assert!(received.iter().all(|r| r.body == received[0].body));
}

/// Client errors are permanent and not retried.
#[tokio::test]
async fn test_client_rejection_not_retried() {
    let server = StubServer::start(&fixtures::mixed_batch()).await;
    server.script_result_statuses(&[400]);

    let pipeline = Pipeline::with_config(
        build_source(&server.source_config()).unwrap(),
        build_sink(&server.sink_config()).unwrap(),
        Sessionizer::default(),
        fast_config(3),
    );

    let err = pipeline.run().await.unwrap_err();
    assert_eq!(err.error_code(), Some("SINK_002"));
    assert_eq!(server.received().len(), 1);
}

/// Retries stop after the configured number of attempts.
#[tokio::test]
async fn test_retries_exhausted() {
    let sink = MockSessionSink::new();
    sink.fail_next(10);

    let pipeline = Pipeline::with_config(
        Arc::new(MockEventSource::new(fixtures::mixed_batch())),
        Arc::new(sink.clone()),
        Sessionizer::default(),
        fast_config(2),
    );

    let err = pipeline.run().await.unwrap_err();
    assert_eq!(err.error_code(), Some("SINK_001"));
    assert_eq!(sink.attempt_count(), 3);
    assert!(sink.captured_payloads().is_empty());
}

/// Unreachable result endpoint surfaces as SINK_001.
#[tokio::test]
async fn test_unreachable_sink() {
    let server = StubServer::start(&fixtures::mixed_batch()).await;
    let source = build_source(&server.source_config()).unwrap();

    // Bind and release a port so nothing is listening on it
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let dead = format!("http://{}/result", listener.local_addr().unwrap());
    drop(listener);

    let pipeline = Pipeline::with_config(
        source,
        build_sink(&transport::EndpointConfig::http(dead).with_timeout_secs(2)).unwrap(),
        Sessionizer::default(),
        fast_config(1),
    );

    let err = pipeline.run().await.unwrap_err();
    assert_eq!(err.error_code(), Some("SINK_001"));
}
