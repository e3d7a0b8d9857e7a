//! Connection pool configuration.
//!
//! reqwest has no hard per-host connection cap, so the pool is bounded in two
//! places: the idle pool is sized to the worker count here, and the number of
//! in-flight requests (and therefore open connections) can never exceed the
//! number of workers, each of which has at most one request outstanding.

use std::time::Duration;

/// Connection pool configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolConfig {
    /// Maximum idle connections to keep per host
    pub max_idle_per_host: usize,

    /// How long idle connections stay in the pool before cleanup
    pub idle_timeout: Duration,

    /// TCP keepalive duration
    pub tcp_keepalive: Option<Duration>,

    /// Upper bound on establishing a single TCP connection
    pub connect_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: 32,
            idle_timeout: Duration::from_secs(90),
            tcp_keepalive: Some(Duration::from_secs(30)),
            connect_timeout: Duration::from_secs(3),
        }
    }
}

impl PoolConfig {
    /// Pool sized for `workers` concurrent dispatchers.
    pub fn for_concurrency(workers: usize) -> Self {
        Self {
            max_idle_per_host: workers.max(1),
            ..Self::default()
        }
    }

    /// Apply this configuration to a reqwest ClientBuilder.
    pub fn apply_to_builder(&self, builder: reqwest::ClientBuilder) -> reqwest::ClientBuilder {
        let mut builder = builder
            .pool_max_idle_per_host(self.max_idle_per_host)
            .pool_idle_timeout(self.idle_timeout)
            .connect_timeout(self.connect_timeout);

        if let Some(keepalive) = self.tcp_keepalive {
            builder = builder.tcp_keepalive(keepalive);
        }

        builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_config_defaults() {
        let config = PoolConfig::default();
        assert_eq!(config.max_idle_per_host, 32);
        assert_eq!(config.idle_timeout, Duration::from_secs(90));
        assert_eq!(config.tcp_keepalive, Some(Duration::from_secs(30)));
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_pool_sized_to_workers() {
        assert_eq!(PoolConfig::for_concurrency(200).max_idle_per_host, 200);
        assert_eq!(PoolConfig::for_concurrency(0).max_idle_per_host, 1);
    }

    #[test]
    fn test_pool_sized_pool_keeps_timeouts() {
        let config = PoolConfig::for_concurrency(8);
        assert_eq!(config.idle_timeout, Duration::from_secs(90));
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert!(config.apply_to_builder(reqwest::Client::builder()).build().is_ok());
    }
}
