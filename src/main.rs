use std::sync::Arc;

use tracing::{error, info};

use event_loadgen::client::build_client;
use event_loadgen::config::RunConfig;
use event_loadgen::dispatch::HttpDispatcher;
use event_loadgen::generator::LoadGenerator;
use event_loadgen::metrics::{start_metrics_server, Metrics};

/// Prints helpful configuration documentation.
fn print_config_help() {
    eprintln!("Required environment variables:");
    eprintln!("  BASE_URL                - Base URL of the target service (http or https)");
    eprintln!();
    eprintln!("Optional environment variables:");
    eprintln!(
        "  TARGET_EPS              - Total events per second across targets (default: {})",
        RunConfig::DEFAULT_EPS
    );
    eprintln!(
        "  TEST_DURATION           - Total test duration: 30s, 10m, 2h (default: {})",
        RunConfig::DEFAULT_DURATION
    );
    eprintln!("  TARGET_TYPE             - kafka, eventbridge or all (default: all)");
    eprintln!(
        "  NUM_CONCURRENT_TASKS    - Number of dispatch workers (default: {})",
        RunConfig::DEFAULT_CONCURRENCY
    );
    eprintln!(
        "  REQUEST_TIMEOUT_MS      - Per-request timeout in milliseconds (default: {})",
        RunConfig::DEFAULT_TIMEOUT_MS
    );
    eprintln!(
        "  RAMP_DURATION           - Linear warm-up from 0 to TARGET_EPS (default: {})",
        RunConfig::DEFAULT_RAMP
    );
    eprintln!("  QUEUE_CAPACITY          - Dispatch queue size (default: 2 x TARGET_EPS)");
    eprintln!("  EVENT_SEED              - Seed for reproducible event content");
    eprintln!();
    eprintln!("TLS configuration:");
    eprintln!("  SKIP_TLS_VERIFY         - Skip TLS certificate verification (default: false)");
    eprintln!();
    eprintln!("Advanced configuration:");
    eprintln!("  RESOLVE_TARGET_ADDR     - DNS override: hostname:ip:port");
    eprintln!("  METRICS_PORT            - Serve Prometheus metrics on this port");
    eprintln!(
        "  METRIC_NAMESPACE        - Prometheus metric namespace (default: {})",
        RunConfig::DEFAULT_NAMESPACE
    );
    eprintln!("  LOG_FORMAT              - text or json (default: text)");
    eprintln!("  RUST_LOG                - Log filter (default: info)");
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.trim().eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_tracing();

    // Load configuration from environment variables
    let config = match RunConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}\n", e);
            print_config_help();
            std::process::exit(1);
        }
    };
    config.print_summary();

    let client = build_client(&config.to_client_config())?;
    let metrics = Arc::new(Metrics::new(&config.metric_namespace)?);

    let metrics_server = config.metrics_port.map(|port| {
        let metrics = metrics.clone();
        tokio::spawn(async move {
            start_metrics_server(port, metrics).await;
        })
    });

    let config = Arc::new(config);
    let generator = LoadGenerator::new(
        config.clone(),
        Arc::new(HttpDispatcher::new(client)),
        metrics.clone(),
    );
    let summary = generator.run().await;

    println!("{}", summary);

    if summary.undelivered() > 0 {
        error!(
            undelivered = summary.undelivered(),
            "Some emitted events were never dispatched"
        );
    }

    if let Some(handle) = metrics_server {
        handle.abort();
        info!("Metrics server stopped");
    }

    Ok(())
}
