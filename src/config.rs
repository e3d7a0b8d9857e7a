use std::env;
use std::str::FromStr;

use thiserror::Error;
use tokio::time::{Duration, Instant};

use crate::client::ClientConfig;
use crate::targets::{TargetSpec, TargetTable};
use crate::utils::parse_duration_string;

/// Fatal configuration problems, reported before any dispatch starts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{var} environment variable must be set")]
    Missing { var: &'static str },

    #[error("{var}: '{value}' is not a valid number ({reason})")]
    InvalidNumber {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("{var} must be greater than 0, got {value}")]
    NonPositive { var: &'static str, value: String },

    #[error("Invalid {var} format: '{value}'. {reason}")]
    InvalidDuration {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("{var} must be greater than 0")]
    ZeroDuration { var: &'static str },

    #[error("{var}: '{value}' is too long to schedule")]
    DurationOutOfRange { var: &'static str, value: String },

    #[error("Unknown target '{value}'. Expected one of: {expected}")]
    UnknownTarget { value: String, expected: String },

    #[error("BASE_URL '{value}' is invalid: {reason}")]
    InvalidBaseUrl { value: String, reason: String },
}

/// Immutable configuration for one run, built once at startup.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub base_url: String,
    pub aggregate_eps: u64,
    pub duration: Duration,
    pub concurrency: usize,
    pub request_timeout: Duration,
    pub ramp_duration: Duration,
    pub selected_targets: Vec<TargetSpec>,
    pub queue_capacity: usize,
    pub skip_tls_verify: bool,
    pub resolve_target_addr: Option<String>,
    pub metrics_port: Option<u16>,
    pub metric_namespace: String,
    pub event_seed: Option<u64>,
}

impl RunConfig {
    pub const DEFAULT_EPS: u64 = 500;
    pub const DEFAULT_DURATION: &'static str = "15m";
    pub const DEFAULT_CONCURRENCY: usize = 200;
    pub const DEFAULT_TIMEOUT_MS: u64 = 3000;
    pub const DEFAULT_RAMP: &'static str = "0s";
    pub const DEFAULT_NAMESPACE: &'static str = "event_loadgen";

    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("BASE_URL")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing { var: "BASE_URL" })?;
        validate_base_url(&base_url)?;

        let aggregate_eps: u64 = parse_positive(&lookup, "TARGET_EPS", Self::DEFAULT_EPS)?;
        let concurrency: usize =
            parse_positive(&lookup, "NUM_CONCURRENT_TASKS", Self::DEFAULT_CONCURRENCY)?;
        let timeout_ms: u64 =
            parse_positive(&lookup, "REQUEST_TIMEOUT_MS", Self::DEFAULT_TIMEOUT_MS)?;

        let duration = parse_duration_var(&lookup, "TEST_DURATION", Self::DEFAULT_DURATION)?;
        if duration.is_zero() {
            return Err(ConfigError::ZeroDuration {
                var: "TEST_DURATION",
            });
        }
        // The scheduler deadline is start + duration.
        if Instant::now().checked_add(duration).is_none() {
            return Err(ConfigError::DurationOutOfRange {
                var: "TEST_DURATION",
                value: lookup("TEST_DURATION").unwrap_or_default(),
            });
        }
        let ramp_duration = parse_duration_var(&lookup, "RAMP_DURATION", Self::DEFAULT_RAMP)?;

        let table = TargetTable::from_base_url(&base_url);
        let selected_targets = table.select(&lookup("TARGET_TYPE").unwrap_or_default())?;

        // Small burst buffer: two seconds' worth of events.
        let default_capacity = usize::try_from(aggregate_eps.saturating_mul(2)).unwrap_or(usize::MAX);
        let queue_capacity: usize = parse_positive(&lookup, "QUEUE_CAPACITY", default_capacity)?;

        let skip_tls_verify = lookup("SKIP_TLS_VERIFY")
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let resolve_target_addr = lookup("RESOLVE_TARGET_ADDR").filter(|s| !s.trim().is_empty());

        let metrics_port = parse_optional::<u16, _>(&lookup, "METRICS_PORT")?;
        let event_seed = parse_optional::<u64, _>(&lookup, "EVENT_SEED")?;

        let metric_namespace = lookup("METRIC_NAMESPACE")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| Self::DEFAULT_NAMESPACE.to_string());

        Ok(RunConfig {
            base_url,
            aggregate_eps,
            duration,
            concurrency,
            request_timeout: Duration::from_millis(timeout_ms),
            ramp_duration,
            selected_targets,
            queue_capacity,
            skip_tls_verify,
            resolve_target_addr,
            metrics_port,
            metric_namespace,
            event_seed,
        })
    }

    /// Events per second owed to each selected target.
    pub fn per_target_eps(&self) -> f64 {
        if self.selected_targets.is_empty() {
            return 0.0;
        }
        self.aggregate_eps as f64 / self.selected_targets.len() as f64
    }

    /// Creates a ClientConfig from this RunConfig.
    pub fn to_client_config(&self) -> ClientConfig {
        ClientConfig {
            request_timeout: self.request_timeout,
            max_connections_per_host: self.concurrency,
            skip_tls_verify: self.skip_tls_verify,
            resolve_target_addr: self.resolve_target_addr.clone(),
        }
    }

    /// Prints the configuration summary.
    pub fn print_summary(&self) {
        println!("Starting event load:");
        println!("  Base URL: {}", self.base_url);
        for target in &self.selected_targets {
            println!("  Target: {} -> {}", target.name, target.url);
        }
        println!("  Total EPS: {}", self.aggregate_eps);
        println!("  Per-target EPS: {:.2}", self.per_target_eps());
        println!("  Duration: {:?}", self.duration);
        println!("  Ramp: {:?}", self.ramp_duration);
        println!("  Concurrency: {} workers", self.concurrency);
        println!("  Request timeout: {:?}", self.request_timeout);
        println!("  Queue capacity: {}", self.queue_capacity);
        println!("  Skip TLS Verify: {}", self.skip_tls_verify);
        match self.metrics_port {
            Some(port) => println!("  Metrics endpoint: 0.0.0.0:{}/metrics", port),
            None => println!("  Metrics endpoint: disabled (METRICS_PORT not set)"),
        }
    }
}

fn validate_base_url(value: &str) -> Result<(), ConfigError> {
    let url = reqwest::Url::parse(value.trim()).map_err(|e| ConfigError::InvalidBaseUrl {
        value: value.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidBaseUrl {
            value: value.to_string(),
            reason: format!("scheme must be http or https, got '{}'", other),
        }),
    }
}

fn parse_positive<T, F>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default + ToString,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let value = match lookup(var) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidNumber {
                    var,
                    value: raw.clone(),
                    reason: e.to_string(),
                })?
        }
        _ => default,
    };

    if value <= T::default() {
        return Err(ConfigError::NonPositive {
            var,
            value: value.to_string(),
        });
    }

    Ok(value)
}

fn parse_optional<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidNumber {
                var,
                value: raw.clone(),
                reason: e.to_string(),
            }),
        _ => Ok(None),
    }
}

fn parse_duration_var<F>(lookup: &F, var: &'static str, default: &str) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(var)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default.to_string());

    parse_duration_string(&raw).map_err(|reason| ConfigError::InvalidDuration {
        var,
        value: raw.clone(),
        reason,
    })
}
