//! 弹性模式模块：提供熔断器和指数退避重试等可靠性保障机制。
//!
//! # Resilience Primitives Module
//!
//! Per-endpoint protection for outbound data fetches.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`circuit_breaker`] | Three-state breaker that fails fast while a dependency is unhealthy |
//! | [`retry`] | Bounded retry with exponential backoff for transient failures |
//!
//! The two compose inside [`ResilientClient`](crate::client::ResilientClient):
//! the breaker wraps the whole retry loop, so one logical call counts as at
//! most one failure toward the breaker threshold however many attempts it took.
//!
//! ## Circuit Breaker
//!
//! - **Closed**: Normal operation, requests pass through
//! - **Open**: Failures reached the threshold, requests fail fast
//! - **Half-Open**: Recovery timeout elapsed, requests run as probes
//!
//! ```rust
//! use annals_data::resilience::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
//! use std::time::Duration;
//!
//! let config = CircuitBreakerConfig::new()
//!     .with_failure_threshold(5)
//!     .with_recovery_timeout(Duration::from_secs(30));
//! let breaker = CircuitBreaker::new(config);
//! assert_eq!(breaker.state(), CircuitState::Closed);
//! ```
//!
//! ## Retry
//!
//! ```rust
//! use annals_data::resilience::retry::{RetryConfig, RetryExecutor};
//! use std::time::Duration;
//!
//! let retry = RetryExecutor::new(
//!     RetryConfig::new()
//!         .with_max_retries(3)
//!         .with_retry_delay(Duration::from_millis(1000)),
//! );
//! assert_eq!(retry.backoff(3), Duration::from_millis(4000));
//! ```

pub mod circuit_breaker;
pub mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerSnapshot, CircuitState};
pub use retry::{RequestOptions, RetryConfig, RetryExecutor};
