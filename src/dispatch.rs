//! Job dispatch to target endpoints.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use crate::errors::ErrorCategory;
use crate::event::Event;

/// One unit of work: deliver `event` to a target.
#[derive(Debug, Clone)]
pub struct Job {
    /// Index into the selected target set.
    pub target: usize,
    pub target_url: Arc<str>,
    pub event: Event,
}

/// Result of a single dispatch attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    /// HTTP status, when a response arrived.
    pub status: Option<u16>,
    pub latency: Duration,
    /// Size of the serialized request body.
    pub body_bytes: u64,
    /// Set when the dispatch counts as an error.
    pub error: Option<ErrorCategory>,
    /// Transport error text, for logging.
    pub detail: Option<String>,
}

impl DispatchOutcome {
    /// Outcome for a response with `status`.
    pub fn from_status(status: u16, latency: Duration, body_bytes: u64) -> Self {
        Self {
            status: Some(status),
            latency,
            body_bytes,
            error: ErrorCategory::from_status_code(status),
            detail: None,
        }
    }

    /// Outcome for a request that never produced a response.
    pub fn transport_error(
        category: ErrorCategory,
        latency: Duration,
        body_bytes: u64,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            status: None,
            latency,
            body_bytes,
            error: Some(category),
            detail: Some(detail.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Delivers jobs to their target. Implementations must never panic on a
/// failed delivery; failures are reported through the outcome.
#[async_trait]
pub trait EventDispatcher: Send + Sync {
    fn name(&self) -> &'static str;

    async fn dispatch(&self, job: &Job) -> DispatchOutcome;
}

/// POSTs each event as JSON over a shared reqwest client.
#[derive(Clone)]
pub struct HttpDispatcher {
    client: reqwest::Client,
}

impl HttpDispatcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EventDispatcher for HttpDispatcher {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn dispatch(&self, job: &Job) -> DispatchOutcome {
        let body = match serde_json::to_vec(&job.event) {
            Ok(body) => body,
            Err(e) => {
                return DispatchOutcome::transport_error(
                    ErrorCategory::OtherError,
                    Duration::ZERO,
                    0,
                    format!("failed to serialize event: {}", e),
                )
            }
        };
        let body_bytes = body.len() as u64;

        let start = Instant::now();
        let result = self
            .client
            .post(&*job.target_url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await;
        let latency = start.elapsed();

        match result {
            Ok(mut response) => {
                let status = response.status().as_u16();

                // Drain the body so the connection goes back to the pool.
                while let Ok(Some(_chunk)) = response.chunk().await {}

                debug!(
                    url = %job.target_url,
                    event_id = %job.event.event_id,
                    status_code = status,
                    latency_us = latency.as_micros() as u64,
                    "Request completed"
                );
                DispatchOutcome::from_status(status, latency, body_bytes)
            }
            Err(e) => DispatchOutcome::transport_error(
                ErrorCategory::from_reqwest_error(&e),
                latency,
                body_bytes,
                e.to_string(),
            ),
        }
    }
}
