//! Integration tests for error categorization of dispatch outcomes.
//!
//! These tests validate that responses and transport failures are sorted into
//! client errors, server errors, network errors and timeouts.

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use event_loadgen::client::{build_client, ClientConfig};
use event_loadgen::dispatch::{DispatchOutcome, EventDispatcher, HttpDispatcher, Job};
use event_loadgen::errors::ErrorCategory;
use event_loadgen::event::EventSynthesizer;

fn dispatcher(timeout: Duration) -> HttpDispatcher {
    let client = build_client(&ClientConfig {
        request_timeout: timeout,
        max_connections_per_host: 4,
        skip_tls_verify: false,
        resolve_target_addr: None,
    })
    .expect("Failed to create HTTP client");
    HttpDispatcher::new(client)
}

fn job(url: String) -> Job {
    Job {
        target: 0,
        target_url: Arc::from(url),
        event: EventSynthesizer::with_seed(1).synthesize(),
    }
}

async fn outcome_for_status(status: u16) -> DispatchOutcome {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/kafka"))
        .respond_with(ResponseTemplate::new(status))
        .mount(&server)
        .await;

    dispatcher(Duration::from_secs(3))
        .dispatch(&job(format!("{}/kafka", server.uri())))
        .await
}

#[test]
fn test_categorize_2xx_and_3xx_success() {
    for code in [200, 201, 202, 204, 301, 304, 399] {
        assert_eq!(ErrorCategory::from_status_code(code), None, "status {}", code);
    }
    println!("✅ 2xx and 3xx codes not categorized as errors");
}

#[test]
fn test_categorize_4xx_and_5xx() {
    for code in [400, 401, 404, 413, 429, 499] {
        assert_eq!(
            ErrorCategory::from_status_code(code),
            Some(ErrorCategory::ClientError)
        );
    }
    for code in [500, 502, 503, 504, 599] {
        assert_eq!(
            ErrorCategory::from_status_code(code),
            Some(ErrorCategory::ServerError)
        );
    }
    assert_eq!(
        ErrorCategory::from_status_code(600),
        Some(ErrorCategory::OtherError)
    );
    println!("✅ 4xx/5xx codes categorized");
}

#[test]
fn test_category_labels_are_unique() {
    let labels: std::collections::HashSet<_> =
        ErrorCategory::all().iter().map(|c| c.label()).collect();
    assert_eq!(labels.len(), ErrorCategory::all().len());
}

#[tokio::test]
async fn test_accepted_response_is_success() {
    let outcome = outcome_for_status(202).await;
    assert!(outcome.is_success());
    assert_eq!(outcome.status, Some(202));
    assert!(outcome.detail.is_none());
}

#[tokio::test]
async fn test_rate_limited_response_is_client_error() {
    let outcome = outcome_for_status(429).await;
    assert!(!outcome.is_success());
    assert_eq!(outcome.error, Some(ErrorCategory::ClientError));
    println!("✅ 429 counted as client error");
}

#[tokio::test]
async fn test_unavailable_response_is_server_error() {
    let outcome = outcome_for_status(503).await;
    assert_eq!(outcome.error, Some(ErrorCategory::ServerError));
    assert_eq!(outcome.status, Some(503));
}

#[tokio::test]
async fn test_slow_response_is_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let outcome = dispatcher(Duration::from_millis(100))
        .dispatch(&job(format!("{}/eventbridge", server.uri())))
        .await;

    assert_eq!(outcome.status, None);
    assert_eq!(outcome.error, Some(ErrorCategory::TimeoutError));
    println!("✅ Slow response categorized as timeout");
}

#[tokio::test]
async fn test_refused_connection_is_network_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let outcome = dispatcher(Duration::from_secs(3))
        .dispatch(&job(format!("http://127.0.0.1:{}/kafka", port)))
        .await;

    assert_eq!(outcome.status, None);
    assert_eq!(outcome.error, Some(ErrorCategory::NetworkError));
    assert!(outcome.body_bytes > 0);
    println!("✅ Refused connection categorized as network error");
}
