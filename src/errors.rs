//! Classification of failed dispatches.
//!
//! Every failed request lands in exactly one category. Categories feed the
//! error log lines and the `request_errors_by_category_total` metric; they
//! never change whether a request counts as an error.

use std::fmt;

/// Why a dispatch counted as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// HTTP 4xx responses
    ClientError,

    /// HTTP 5xx responses
    ServerError,

    /// DNS, connection refused, reset, body read failures
    NetworkError,

    /// Request exceeded the per-request timeout
    TimeoutError,

    /// TLS/SSL handshake or certificate failures
    TlsError,

    /// Anything else, including status codes >= 600
    OtherError,
}

impl ErrorCategory {
    /// Categorize an HTTP status code. `None` means the status is a success.
    pub fn from_status_code(status_code: u16) -> Option<Self> {
        match status_code {
            0..=399 => None,
            400..=499 => Some(ErrorCategory::ClientError),
            500..=599 => Some(ErrorCategory::ServerError),
            _ => Some(ErrorCategory::OtherError),
        }
    }

    /// Categorize a transport-level reqwest error.
    pub fn from_reqwest_error(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            return ErrorCategory::TimeoutError;
        }

        // TLS failures surface as connect errors; tell them apart by message.
        let message = full_error_chain(error).to_lowercase();
        if message.contains("certificate") || message.contains("tls") || message.contains("ssl") {
            return ErrorCategory::TlsError;
        }

        if error.is_connect() || error.is_request() || error.is_body() || error.is_decode() {
            ErrorCategory::NetworkError
        } else if error.is_redirect() || error.is_builder() {
            ErrorCategory::ClientError
        } else if message.contains("timed out") || message.contains("timeout") {
            ErrorCategory::TimeoutError
        } else if message.contains("dns")
            || message.contains("resolve")
            || message.contains("connection")
        {
            ErrorCategory::NetworkError
        } else {
            ErrorCategory::OtherError
        }
    }

    /// Get the Prometheus label for this error category.
    pub fn label(&self) -> &'static str {
        match self {
            ErrorCategory::ClientError => "client_error",
            ErrorCategory::ServerError => "server_error",
            ErrorCategory::NetworkError => "network_error",
            ErrorCategory::TimeoutError => "timeout_error",
            ErrorCategory::TlsError => "tls_error",
            ErrorCategory::OtherError => "other_error",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ErrorCategory::ClientError => "HTTP 4xx Client Errors",
            ErrorCategory::ServerError => "HTTP 5xx Server Errors",
            ErrorCategory::NetworkError => "Network/Connection Errors",
            ErrorCategory::TimeoutError => "Request Timeout Errors",
            ErrorCategory::TlsError => "TLS/SSL Certificate Errors",
            ErrorCategory::OtherError => "Other/Unknown Errors",
        }
    }

    /// All error categories in a consistent order.
    pub fn all() -> [ErrorCategory; 6] {
        [
            ErrorCategory::ClientError,
            ErrorCategory::ServerError,
            ErrorCategory::NetworkError,
            ErrorCategory::TimeoutError,
            ErrorCategory::TlsError,
            ErrorCategory::OtherError,
        ]
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Joins an error with all of its sources; reqwest hides the interesting
/// part (hyper / rustls) a few levels down.
fn full_error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}
