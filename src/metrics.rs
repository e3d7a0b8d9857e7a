use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server};
use prometheus::{
    Encoder, Gauge, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use tracing::{error, info};

use crate::errors::ErrorCategory;

/// Prometheus collectors for one run, registered on a private registry.
pub struct Metrics {
    registry: Registry,
    pub requests_total: IntCounterVec,
    pub request_status_codes: IntCounterVec,
    pub request_errors_by_category: IntCounterVec,
    pub concurrent_requests: Gauge,
    pub request_duration_seconds: HistogramVec,
    pub events_emitted_total: IntCounterVec,
    pub queue_depth: IntGauge,
}

impl Metrics {
    /// Creates and registers every collector under `namespace`.
    pub fn new(namespace: &str) -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("requests_total", "Total number of events dispatched").namespace(namespace),
            &["target"],
        )?;
        let request_status_codes = IntCounterVec::new(
            Opts::new(
                "requests_status_codes_total",
                "Number of dispatches by HTTP status code",
            )
            .namespace(namespace),
            &["status_code"],
        )?;
        let request_errors_by_category = IntCounterVec::new(
            Opts::new(
                "request_errors_by_category_total",
                "Number of failed dispatches by error category",
            )
            .namespace(namespace),
            &["category"],
        )?;
        let concurrent_requests = Gauge::with_opts(
            Opts::new(
                "concurrent_requests",
                "Number of HTTP requests currently in flight",
            )
            .namespace(namespace),
        )?;
        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new("request_duration_seconds", "Dispatch latencies in seconds.")
                .namespace(namespace),
            &["target"],
        )?;
        let events_emitted_total = IntCounterVec::new(
            Opts::new(
                "events_emitted_total",
                "Events enqueued by the rate scheduler",
            )
            .namespace(namespace),
            &["target"],
        )?;
        let queue_depth = IntGauge::with_opts(
            Opts::new("dispatch_queue_depth", "Jobs waiting in the dispatch queue")
                .namespace(namespace),
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_status_codes.clone()))?;
        registry.register(Box::new(request_errors_by_category.clone()))?;
        registry.register(Box::new(concurrent_requests.clone()))?;
        registry.register(Box::new(request_duration_seconds.clone()))?;
        registry.register(Box::new(events_emitted_total.clone()))?;
        registry.register(Box::new(queue_depth.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            request_status_codes,
            request_errors_by_category,
            concurrent_requests,
            request_duration_seconds,
            events_emitted_total,
            queue_depth,
        })
    }

    /// Records a finished dispatch.
    pub fn observe_dispatch(
        &self,
        target: &str,
        status: Option<u16>,
        error: Option<ErrorCategory>,
        latency_secs: f64,
    ) {
        self.requests_total.with_label_values(&[target]).inc();
        let status_label = status.map(status_code_label).unwrap_or("error");
        self.request_status_codes
            .with_label_values(&[status_label])
            .inc();
        if let Some(category) = error {
            self.request_errors_by_category
                .with_label_values(&[category.label()])
                .inc();
        }
        self.request_duration_seconds
            .with_label_values(&[target])
            .observe(latency_secs);
    }

    /// Encodes every registered metric in the text exposition format.
    pub fn gather_string(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            error!(error = %e, "Failed to encode metrics");
            return String::from("# ERROR ENCODING METRICS");
        }
        String::from_utf8(buffer)
            .unwrap_or_else(|_| String::from("# ERROR ENCODING METRICS TO UTF-8"))
    }
}

/// Returns a static string label for common HTTP status codes.
///
/// Uncommon codes fall back to "other" rather than allocating a unique string.
pub fn status_code_label(code: u16) -> &'static str {
    match code {
        200 => "200",
        201 => "201",
        202 => "202",
        204 => "204",
        301 => "301",
        302 => "302",
        304 => "304",
        400 => "400",
        401 => "401",
        403 => "403",
        404 => "404",
        408 => "408",
        409 => "409",
        413 => "413",
        422 => "422",
        429 => "429",
        500 => "500",
        502 => "502",
        503 => "503",
        504 => "504",
        _ => "other",
    }
}

async fn metrics_handler(
    _req: Request<Body>,
    metrics: Arc<Metrics>,
) -> Result<Response<Body>, Infallible> {
    let body = metrics.gather_string();
    let response = Response::builder()
        .status(200)
        .header("Content-Type", TextEncoder::new().format_type())
        .body(Body::from(body))
        .unwrap_or_else(|_| Response::new(Body::from("# ERROR BUILDING RESPONSE")));
    Ok(response)
}

/// Serves the Prometheus metrics endpoint until the task is aborted.
pub async fn start_metrics_server(port: u16, metrics: Arc<Metrics>) {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let make_svc = make_service_fn(move |_conn| {
        let metrics = metrics.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |req| {
                let metrics = metrics.clone();
                async move { metrics_handler(req, metrics).await }
            }))
        }
    });

    let server = match Server::try_bind(&addr) {
        Ok(builder) => builder.serve(make_svc),
        Err(e) => {
            error!(port = port, error = %e, "Failed to bind metrics server");
            return;
        }
    };
    info!(port = port, addr = %addr, "Metrics server listening");

    if let Err(e) = server.await {
        error!(error = %e, "Metrics server error");
    }
}
