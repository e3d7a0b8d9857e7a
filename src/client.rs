use std::net::SocketAddr;
use std::time::Duration;

use tracing::{info, warn};

use crate::connection_pool::PoolConfig;

/// Configuration for building the shared HTTP client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub request_timeout: Duration,
    pub max_connections_per_host: usize,
    pub skip_tls_verify: bool,
    pub resolve_target_addr: Option<String>,
}

/// Builds the reqwest client shared by every worker.
pub fn build_client(
    config: &ClientConfig,
) -> Result<reqwest::Client, Box<dyn std::error::Error + Send + Sync>> {
    let mut client_builder = reqwest::Client::builder().timeout(config.request_timeout);

    if let Some(ref resolve_str) = config.resolve_target_addr {
        let (hostname, addr) = parse_resolve_override(resolve_str)?;
        client_builder = client_builder.resolve(&hostname, addr);
        info!(hostname = %hostname, addr = %addr, "DNS override configured");
    }

    let pool_config = PoolConfig::for_concurrency(config.max_connections_per_host);
    client_builder = pool_config.apply_to_builder(client_builder);
    info!(
        max_idle_per_host = pool_config.max_idle_per_host,
        idle_timeout = ?pool_config.idle_timeout,
        connect_timeout = ?pool_config.connect_timeout,
        request_timeout = ?config.request_timeout,
        "Connection pool configured"
    );

    if config.skip_tls_verify {
        warn!("Skipping TLS certificate verification");
        client_builder = client_builder.danger_accept_invalid_certs(true);
    }

    Ok(client_builder.build()?)
}

/// Parses a `hostname:ip:port` DNS override.
pub fn parse_resolve_override(
    resolve_str: &str,
) -> Result<(String, SocketAddr), Box<dyn std::error::Error + Send + Sync>> {
    let parts: Vec<&str> = resolve_str.split(':').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(format!(
            "RESOLVE_TARGET_ADDR ('{}') is not in the expected format 'hostname:ip:port'",
            resolve_str
        )
        .into());
    }

    let (hostname, ip, port) = (parts[0], parts[1], parts[2]);
    if hostname.is_empty() || ip.is_empty() || port.is_empty() {
        return Err(format!(
            "RESOLVE_TARGET_ADDR ('{}'): hostname, ip and port must all be non-empty",
            resolve_str
        )
        .into());
    }

    let port: u16 = port.parse().map_err(|e| {
        format!(
            "Failed to parse port '{}' in RESOLVE_TARGET_ADDR: {}",
            port, e
        )
    })?;
    let addr: SocketAddr = format!("{}:{}", ip, port).parse().map_err(|e| {
        format!(
            "Failed to parse '{}:{}' as a socket address in RESOLVE_TARGET_ADDR: {}",
            ip, port, e
        )
    })?;

    Ok((hostname.to_string(), addr))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> ClientConfig {
        ClientConfig {
            request_timeout: Duration::from_millis(3000),
            max_connections_per_host: 10,
            skip_tls_verify: false,
            resolve_target_addr: None,
        }
    }

    #[test]
    fn builds_default_client() {
        assert!(build_client(&base_config()).is_ok());
    }

    #[test]
    fn builds_client_with_overrides() {
        let config = ClientConfig {
            skip_tls_verify: true,
            resolve_target_addr: Some("ingest.local:127.0.0.1:8080".to_string()),
            ..base_config()
        };
        assert!(build_client(&config).is_ok());
    }

    #[test]
    fn parses_resolve_override() {
        let (host, addr) = parse_resolve_override("ingest.local:10.0.0.5:443").unwrap();
        assert_eq!(host, "ingest.local");
        assert_eq!(addr, "10.0.0.5:443".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn rejects_malformed_resolve_override() {
        assert!(parse_resolve_override("ingest.local:10.0.0.5").is_err());
        assert!(parse_resolve_override(":10.0.0.5:443").is_err());
        assert!(parse_resolve_override("ingest.local:10.0.0.5:http").is_err());
        assert!(parse_resolve_override("ingest.local:not-an-ip:443").is_err());
    }
}
