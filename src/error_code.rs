//! 错误分类：数据访问层唯一的错误类型体系及其重试/降级语义。
//!
//! Classified error kinds for the data-access layer.
//!
//! Every transport failure is normalized into one of five kinds before any
//! policy code (retry, circuit breaker, fallback) looks at it.
//!
//! | Code  | Kind                   | Retried | Counts toward degradation |
//! |-------|------------------------|---------|---------------------------|
//! | E1001 | `NETWORK_ERROR`        | yes     | yes                       |
//! | E1002 | `TIMEOUT_ERROR`        | yes     | yes                       |
//! | E2001 | `SERVER_ERROR`         | yes     | yes                       |
//! | E3001 | `CLIENT_ERROR`         | no      | no (excluded by default)  |
//! | E4001 | `CIRCUIT_BREAKER_OPEN` | no      | yes                       |
//!
//! ## Example
//!
//! ```rust
//! use annals_data::error_code::ErrorKind;
//!
//! let kind = ErrorKind::from_http_status(503);
//! assert_eq!(kind, ErrorKind::ServerError);
//! assert!(kind.retryable());
//! assert_eq!(kind.to_string(), "SERVER_ERROR");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a classified remote failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// No response was received (connection refused, DNS failure, reset).
    NetworkError,
    /// The transport deadline elapsed before a response arrived.
    TimeoutError,
    /// The remote answered with a 5xx-equivalent status.
    ServerError,
    /// The remote answered with a 4xx-equivalent status.
    ClientError,
    /// Synthetic: the circuit breaker refused to attempt the call.
    CircuitBreakerOpen,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 5] = [
        Self::NetworkError,
        Self::TimeoutError,
        Self::ServerError,
        Self::ClientError,
        Self::CircuitBreakerOpen,
    ];

    /// Returns the short code string (e.g., `"E2001"`).
    #[inline]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NetworkError => "E1001",
            Self::TimeoutError => "E1002",
            Self::ServerError => "E2001",
            Self::ClientError => "E3001",
            Self::CircuitBreakerOpen => "E4001",
        }
    }

    /// Returns the wire name (e.g., `"SERVER_ERROR"`).
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::NetworkError => "NETWORK_ERROR",
            Self::TimeoutError => "TIMEOUT_ERROR",
            Self::ServerError => "SERVER_ERROR",
            Self::ClientError => "CLIENT_ERROR",
            Self::CircuitBreakerOpen => "CIRCUIT_BREAKER_OPEN",
        }
    }

    /// Whether the default retry condition retries this kind.
    ///
    /// Only "no response" (network, timeout) and server-side failures are
    /// transient. Client errors are request defects and the breaker refusal is
    /// a deliberate fast failure.
    #[inline]
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError | Self::TimeoutError | Self::ServerError
        )
    }

    /// Parses a wire name, accepting the lowercase spelling as well.
    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.trim().to_ascii_uppercase();
        Self::ALL.into_iter().find(|k| k.name() == upper)
    }

    /// Maps an HTTP status to a kind.
    ///
    /// `408 Request Timeout` is treated as a timeout even though it is a 4xx.
    /// Anything that is neither 4xx nor 5xx is reported as a server error: a
    /// successful transport call with an unexpected status is still a backend
    /// defect from the caller's point of view.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            408 => Self::TimeoutError,
            400..=499 => Self::ClientError,
            _ => Self::ServerError,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(ErrorKind::from_http_status(400), ErrorKind::ClientError);
        assert_eq!(ErrorKind::from_http_status(404), ErrorKind::ClientError);
        assert_eq!(ErrorKind::from_http_status(408), ErrorKind::TimeoutError);
        assert_eq!(ErrorKind::from_http_status(429), ErrorKind::ClientError);
        assert_eq!(ErrorKind::from_http_status(500), ErrorKind::ServerError);
        assert_eq!(ErrorKind::from_http_status(503), ErrorKind::ServerError);
        assert_eq!(ErrorKind::from_http_status(302), ErrorKind::ServerError);
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(ErrorKind::NetworkError.retryable());
        assert!(ErrorKind::TimeoutError.retryable());
        assert!(ErrorKind::ServerError.retryable());
        assert!(!ErrorKind::ClientError.retryable());
        assert!(!ErrorKind::CircuitBreakerOpen.retryable());
    }

    #[test]
    fn test_names_round_trip_through_serde() {
        for kind in ErrorKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.name()));
            assert_eq!(ErrorKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(
            ErrorKind::from_name("client_error"),
            Some(ErrorKind::ClientError)
        );
        assert_eq!(ErrorKind::from_name("bogus"), None);
    }

    #[test]
    fn test_codes_are_unique() {
        let mut codes: Vec<_> = ErrorKind::ALL.iter().map(|k| k.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), ErrorKind::ALL.len());
    }
}
