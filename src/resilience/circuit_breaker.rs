use crate::{ApiError, Error, Result};
use serde::Serialize;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Serialize)]
pub struct CircuitBreakerSnapshot {
    pub state: CircuitState,
    pub failure_threshold: u32,
    pub recovery_timeout_ms: u64,
    pub failure_count: u32,
    pub half_open_success_count: u32,
    /// Remaining time before the next probe is allowed, if currently open.
    pub open_remaining_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub recovery_timeout: Duration,
    /// Consecutive half-open successes needed to close again.
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
            success_threshold: 3,
        }
    }
}

impl CircuitBreakerConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the failure threshold
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    /// Set how long the breaker stays open before probing
    pub fn with_recovery_timeout(mut self, timeout: Duration) -> Self {
        self.recovery_timeout = timeout;
        self
    }

    pub fn with_success_threshold(mut self, threshold: u32) -> Self {
        self.success_threshold = threshold.max(1);
        self
    }
}

#[derive(Debug)]
struct State {
    state: CircuitState,
    failure_count: u32,
    last_failure: Option<Instant>,
    half_open_successes: u32,
}

impl State {
    fn closed() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            last_failure: None,
            half_open_successes: 0,
        }
    }
}

/// Three-state circuit breaker.
///
/// - Closed: calls pass, consecutive failures are counted
/// - Open: calls fail fast with `CIRCUIT_BREAKER_OPEN` without being attempted
/// - Half-open: calls pass as probes; enough successes close, any failure re-opens
///
/// The lock is never held across an `.await`.
pub struct CircuitBreaker {
    cfg: CircuitBreakerConfig,
    state: Mutex<State>,
}

impl CircuitBreaker {
    pub fn new(cfg: CircuitBreakerConfig) -> Self {
        Self {
            cfg,
            state: Mutex::new(State::closed()),
        }
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.cfg
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // Every transition rewrites State whole; a poisoned guard is still usable.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run `op` through the breaker.
    pub async fn execute<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.allow()?;
        let outcome = op().await;
        match &outcome {
            Ok(_) => self.on_success(),
            Err(err) if err.is_cancelled() => {}
            Err(_) => self.on_failure(),
        }
        outcome
    }

    /// Admission check. Moves OPEN to HALF_OPEN once the recovery timeout has
    /// elapsed; otherwise refuses.
    pub fn allow(&self) -> Result<()> {
        let mut st = self.lock();
        if st.state != CircuitState::Open {
            return Ok(());
        }

        let now = Instant::now();
        let elapsed = st
            .last_failure
            .map(|at| now.saturating_duration_since(at))
            .unwrap_or(Duration::MAX);
        if elapsed > self.cfg.recovery_timeout {
            st.state = CircuitState::HalfOpen;
            st.half_open_successes = 0;
            info!(
                recovery_timeout_ms = self.cfg.recovery_timeout.as_millis() as u64,
                "circuit breaker half-open, probing"
            );
            return Ok(());
        }

        let remaining = self.cfg.recovery_timeout.saturating_sub(elapsed);
        Err(Error::Api(ApiError::circuit_open(remaining.as_millis() as u64)))
    }

    pub fn on_success(&self) {
        let mut st = self.lock();
        match st.state {
            CircuitState::Closed => st.failure_count = 0,
            CircuitState::HalfOpen => {
                st.half_open_successes = st.half_open_successes.saturating_add(1);
                if st.half_open_successes >= self.cfg.success_threshold {
                    *st = State::closed();
                    info!("circuit breaker closed");
                }
            }
            // A call admitted before another one re-opened the breaker.
            CircuitState::Open => {}
        }
    }

    pub fn on_failure(&self) {
        let mut st = self.lock();
        let now = Instant::now();
        match st.state {
            CircuitState::Closed => {
                st.failure_count = st.failure_count.saturating_add(1);
                st.last_failure = Some(now);
                if st.failure_count >= self.cfg.failure_threshold {
                    st.state = CircuitState::Open;
                    warn!(
                        failure_count = st.failure_count,
                        failure_threshold = self.cfg.failure_threshold,
                        "circuit breaker opened"
                    );
                }
            }
            CircuitState::HalfOpen => {
                st.state = CircuitState::Open;
                st.half_open_successes = 0;
                st.last_failure = Some(now);
                warn!("circuit breaker probe failed, re-opened");
            }
            CircuitState::Open => st.last_failure = Some(now),
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Force the breaker back to CLOSED.
    pub fn reset(&self) {
        *self.lock() = State::closed();
        info!("circuit breaker reset");
    }

    pub fn snapshot(&self) -> CircuitBreakerSnapshot {
        let st = self.lock();
        let open_remaining_ms = match (st.state, st.last_failure) {
            (CircuitState::Open, Some(at)) => {
                let elapsed = Instant::now().saturating_duration_since(at);
                Some(self.cfg.recovery_timeout.saturating_sub(elapsed).as_millis() as u64)
            }
            _ => None,
        };
        CircuitBreakerSnapshot {
            state: st.state,
            failure_threshold: self.cfg.failure_threshold,
            recovery_timeout_ms: self.cfg.recovery_timeout.as_millis() as u64,
            failure_count: st.failure_count,
            half_open_success_count: st.half_open_successes,
            open_remaining_ms,
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}
