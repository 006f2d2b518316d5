//! HTTP source and sink against the local stub server.

use std::time::Duration;

use integration_tests::{fixtures, setup::StubServer};
use session_core::{compute_sessions, SessionsPayload};
use transport::{EventSource, HttpEventSource, HttpSessionSink, SessionSink};
use url::Url;

fn url(raw: &str) -> Url {
    Url::parse(raw).expect("invalid test url")
}

#[tokio::test]
async fn test_http_source_decodes_events_in_order() {
    let events = fixtures::mixed_batch();
    let server = StubServer::start(&events).await;

    let source = HttpEventSource::new(url(&server.dataset_url()), Duration::from_secs(5)).unwrap();
    let fetched = source.fetch().await.expect("fetch failed");

    assert_eq!(fetched, events);
    assert_eq!(source.describe(), format!("GET {}", server.dataset_url()));
}

#[tokio::test]
async fn test_http_source_rejects_non_success() {
    let server = StubServer::start_with_body(404, "not found").await;

    let source = HttpEventSource::new(url(&server.dataset_url()), Duration::from_secs(5)).unwrap();
    let err = source.fetch().await.unwrap_err();
    assert_eq!(err.error_code(), Some("SOURCE_002"));
}

#[tokio::test]
async fn test_http_source_rejects_garbage() {
    let server = StubServer::start_with_body(200, "<html>maintenance</html>").await;

    let source = HttpEventSource::new(url(&server.dataset_url()), Duration::from_secs(5)).unwrap();
    let err = source.fetch().await.unwrap_err();
    assert_eq!(err.error_code(), Some("SOURCE_003"));
}

#[tokio::test]
async fn test_http_sink_posts_json_payload() {
    let server = StubServer::start(&[]).await;
    let payload = SessionsPayload::new(compute_sessions(fixtures::mixed_batch()));

    let sink = HttpSessionSink::new(url(&server.result_url()), Duration::from_secs(5)).unwrap();
    let receipt = sink.deliver(&payload).await.expect("delivery failed");

    assert_eq!(receipt.status, Some(200));
    assert_eq!(receipt.body, "Success");
    assert_eq!(receipt.bytes_sent, payload.to_json().unwrap().len());

    let received = server.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].content_type.as_deref(), Some("application/json"));
    assert_eq!(received[0].payload(), payload);
}

#[tokio::test]
async fn test_http_sink_reports_rejection_status() {
    let server = StubServer::start(&[]).await;
    server.script_result_statuses(&[422]);

    let sink = HttpSessionSink::new(url(&server.result_url()), Duration::from_secs(5)).unwrap();
    let err = sink.deliver(&SessionsPayload::default()).await.unwrap_err();

    assert_eq!(err.error_code(), Some("SINK_002"));
    assert!(!err.is_retryable());
    assert!(err.to_string().contains("422"));
}

#[tokio::test]
async fn test_http_sink_accepts_any_success_status() {
    let server = StubServer::start(&[]).await;
    server.script_result_statuses(&[204]);

    let sink = HttpSessionSink::new(url(&server.result_url()), Duration::from_secs(5)).unwrap();
    let receipt = sink.deliver(&SessionsPayload::default()).await.expect("delivery failed");

    assert_eq!(receipt.status, Some(204));
    assert_eq!(server.received().len(), 1);
}

#[tokio::test]
async fn test_http_sink_fails_on_truncated_acknowledgement() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    // Promises a 64 byte body, sends 7 bytes, then hangs up
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 64 * 1024];
        let _ = stream.read(&mut buf).await;
        stream
            .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 64\r\n\r\nSuccess")
            .await
            .unwrap();
        stream.shutdown().await.unwrap();
    });

    let sink = HttpSessionSink::new(
        url(&format!("http://{}/result", addr)),
        Duration::from_secs(5),
    )
    .unwrap();
    let err = sink.deliver(&SessionsPayload::default()).await.unwrap_err();

    assert_eq!(err.error_code(), Some("SINK_001"));
    assert!(err.to_string().contains("failed to read session sink response"));
    server.await.unwrap();
}
