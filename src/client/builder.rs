use crate::client::core::ResilientClient;
use crate::config::DataLayerConfig;
use crate::resilience::{CircuitBreaker, CircuitBreakerConfig, RetryConfig, RetryExecutor};
use crate::transport::{HttpTransport, Transport, DEFAULT_TIMEOUT};
use crate::{Error, ErrorContext, Result};
use std::sync::Arc;
use std::time::Duration;

/// Builder for creating clients with custom configuration.
///
/// A client needs either a base URL (for the built-in HTTP transport) or an
/// explicit [`Transport`].
pub struct ResilientClientBuilder {
    base_url: Option<String>,
    timeout: Duration,
    transport: Option<Arc<dyn Transport>>,
    retry: RetryConfig,
    breaker_config: CircuitBreakerConfig,
    breaker: Option<Arc<CircuitBreaker>>,
}

impl ResilientClientBuilder {
    pub fn new() -> Self {
        Self {
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            transport: None,
            retry: RetryConfig::default(),
            breaker_config: CircuitBreakerConfig::default(),
            breaker: None,
        }
    }

    /// Seed every setting from a loaded configuration.
    pub fn from_config(config: &DataLayerConfig) -> Self {
        Self::new()
            .base_url(config.transport.base_url.clone())
            .timeout(config.transport.timeout())
            .retry(config.retry.to_retry_config())
            .circuit_breaker(config.circuit_breaker.to_breaker_config())
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Per-request deadline of the HTTP transport.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use a custom transport instead of HTTP. Takes precedence over `base_url`.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = config;
        self
    }

    pub fn circuit_breaker(mut self, config: CircuitBreakerConfig) -> Self {
        self.breaker_config = config;
        self
    }

    /// Share an existing breaker, e.g. between clients of the same backend.
    pub fn shared_breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.breaker = Some(breaker);
        self
    }

    pub fn build(self) -> Result<ResilientClient> {
        let transport: Arc<dyn Transport> = match (self.transport, self.base_url) {
            (Some(t), _) => t,
            (None, Some(url)) => Arc::new(HttpTransport::new(&url, self.timeout)?),
            (None, None) => {
                return Err(Error::configuration_with_context(
                    "a base URL or a transport is required",
                    ErrorContext::new()
                        .with_field_path("transport.base_url")
                        .with_source("client_builder"),
                ))
            }
        };

        let breaker = self
            .breaker
            .unwrap_or_else(|| Arc::new(CircuitBreaker::new(self.breaker_config)));

        Ok(ResilientClient {
            transport,
            retry: RetryExecutor::new(self.retry),
            breaker,
        })
    }
}

impl Default for ResilientClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
