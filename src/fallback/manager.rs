use super::config::{FallbackConfig, FallbackConfigUpdate, FallbackConfigView};
use crate::error_code::ErrorKind;
use crate::{ApiError, Error, Result};
use arc_swap::ArcSwap;
use serde::Serialize;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct FallbackState {
    is_active: bool,
    activated_at: Option<Instant>,
    failure_count: u32,
    last_error: Option<ApiError>,
}

/// Serializable view of the last classified remote failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LastErrorView {
    pub kind: ErrorKind,
    pub message: String,
    pub status: Option<u16>,
}

impl From<&ApiError> for LastErrorView {
    fn from(e: &ApiError) -> Self {
        Self {
            kind: e.kind,
            message: e.message.clone(),
            status: e.status,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FallbackSnapshot {
    pub is_active: bool,
    pub failure_count: u32,
    pub last_error: Option<LastErrorView>,
    /// Time since degraded mode was entered, if active.
    pub activated_ms_ago: Option<u64>,
    /// Time left in the degraded window, if active.
    pub remaining_ms: Option<u64>,
    pub config: FallbackConfigView,
}

/// Session-level degradation policy for a whole data-access subsystem.
///
/// After `fallback_threshold` consecutive counted remote failures the manager
/// enters degraded mode and serves the fallback path directly for
/// `fallback_duration`. Expiry is lazy: the first call after the window
/// deactivates degraded mode and zeroes the failure count before routing.
///
/// Construct one per subsystem and share it behind an `Arc`.
pub struct FallbackManager {
    config: ArcSwap<FallbackConfig>,
    state: Mutex<FallbackState>,
}

impl FallbackManager {
    pub fn new(config: FallbackConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: ArcSwap::from_pointee(config),
            state: Mutex::new(FallbackState::default()),
        })
    }

    fn lock(&self) -> MutexGuard<'_, FallbackState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn config(&self) -> Arc<FallbackConfig> {
        self.config.load_full()
    }

    /// Apply a partial configuration update. Invalid updates are rejected and
    /// leave the current configuration in place.
    pub fn update_config(&self, update: FallbackConfigUpdate) -> Result<()> {
        let next = self.config.load().merged(&update);
        next.validate()?;
        info!(
            enable_auto_fallback = next.enable_auto_fallback,
            fallback_threshold = next.fallback_threshold,
            fallback_duration_ms = next.fallback_duration.as_millis() as u64,
            "fallback configuration updated"
        );
        self.config.store(Arc::new(next));
        Ok(())
    }

    /// Run `remote`, or `fallback` instead of / after it, per the current policy.
    pub async fn execute_with_fallback<T, R, RF, F, FF>(
        &self,
        remote: R,
        fallback: F,
        operation: &str,
    ) -> Result<T>
    where
        R: FnOnce() -> RF,
        RF: Future<Output = Result<T>>,
        F: FnOnce() -> FF,
        FF: Future<Output = Result<T>>,
    {
        let config = self.config.load_full();

        if self.refresh(&config) {
            debug!(operation, "degraded mode, serving fallback");
            let last = self.lock().last_error.clone();
            return fallback()
                .await
                .map_err(|e| both_failed(operation, e, last));
        }

        let err = match remote().await {
            Ok(value) => {
                self.record_success();
                return Ok(value);
            }
            Err(err) => err,
        };

        let classified = match err.classify() {
            Some(c) if !config.is_excluded(c.kind) => c,
            _ => {
                debug!(operation, error = %err, "remote failure not counted");
                return Err(err);
            }
        };
        self.record_failure(&config, &classified, operation);

        if !config.enable_auto_fallback {
            return Err(Error::Api(classified));
        }
        debug!(operation, error_kind = %classified.kind, "remote failed, serving fallback");
        fallback()
            .await
            .map_err(|e| both_failed(operation, e, Some(classified)))
    }

    /// Expire the degraded window if due. Returns whether degraded mode is on.
    fn refresh(&self, config: &FallbackConfig) -> bool {
        let mut st = self.lock();
        if !st.is_active {
            return false;
        }
        let expired = st
            .activated_at
            .map(|at| Instant::now().saturating_duration_since(at) > config.fallback_duration)
            .unwrap_or(true);
        if expired {
            st.is_active = false;
            st.activated_at = None;
            st.failure_count = 0;
            info!("degraded window elapsed, returning to remote");
        }
        st.is_active
    }

    fn record_success(&self) {
        let mut st = self.lock();
        st.failure_count = 0;
        st.last_error = None;
    }

    fn record_failure(&self, config: &FallbackConfig, err: &ApiError, operation: &str) {
        let mut st = self.lock();
        st.failure_count = st.failure_count.saturating_add(1);
        st.last_error = Some(err.clone());
        if !st.is_active && st.failure_count >= config.fallback_threshold {
            st.is_active = true;
            st.activated_at = Some(Instant::now());
            warn!(
                operation,
                failure_count = st.failure_count,
                fallback_duration_ms = config.fallback_duration.as_millis() as u64,
                error_kind = %err.kind,
                "degraded mode activated"
            );
        }
    }

    /// Force degraded mode on, starting a fresh window.
    pub fn manual_activate(&self) {
        let mut st = self.lock();
        st.is_active = true;
        st.activated_at = Some(Instant::now());
        info!("degraded mode activated manually");
    }

    /// Force degraded mode off and clear the failure count.
    pub fn manual_deactivate(&self) {
        let mut st = self.lock();
        st.is_active = false;
        st.activated_at = None;
        st.failure_count = 0;
        info!("degraded mode deactivated manually");
    }

    /// Back to the initial state, including the last error.
    pub fn reset(&self) {
        *self.lock() = FallbackState::default();
        info!("fallback state reset");
    }

    pub fn is_active(&self) -> bool {
        self.refresh(&self.config.load())
    }

    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }

    pub fn last_error(&self) -> Option<ApiError> {
        self.lock().last_error.clone()
    }

    pub fn snapshot(&self) -> FallbackSnapshot {
        let config = self.config.load_full();
        self.refresh(&config);
        let st = self.lock();
        let elapsed = st
            .activated_at
            .filter(|_| st.is_active)
            .map(|at| Instant::now().saturating_duration_since(at));
        FallbackSnapshot {
            is_active: st.is_active,
            failure_count: st.failure_count,
            last_error: st.last_error.as_ref().map(LastErrorView::from),
            activated_ms_ago: elapsed.map(|d| d.as_millis() as u64),
            remaining_ms: elapsed
                .map(|d| config.fallback_duration.saturating_sub(d).as_millis() as u64),
            config: config.view(),
        }
    }
}

fn both_failed(operation: &str, fallback: Error, remote: Option<ApiError>) -> Error {
    warn!(operation, error = %fallback, "fallback failed");
    Error::FallbackFailed {
        operation: operation.to_string(),
        fallback: Box::new(fallback),
        remote,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn api(kind: ErrorKind) -> Error {
        Error::Api(ApiError::new(kind, format!("{} from test", kind)))
    }

    fn manager(threshold: u32) -> FallbackManager {
        FallbackManager::new(
            FallbackConfig::new()
                .with_threshold(threshold)
                .with_duration(Duration::from_secs(60)),
        )
        .unwrap()
    }

    async fn call(
        m: &FallbackManager,
        remote: std::result::Result<&'static str, ErrorKind>,
        remote_calls: &AtomicU32,
    ) -> Result<&'static str> {
        m.execute_with_fallback(
            || async move {
                remote_calls.fetch_add(1, Ordering::SeqCst);
                remote.map_err(api)
            },
            || async { Ok("local") },
            "events.list",
        )
        .await
    }

    #[test]
    fn test_rejects_invalid_config() {
        assert!(FallbackManager::new(FallbackConfig::new().with_threshold(0)).is_err());
    }

    #[tokio::test]
    async fn test_success_returns_remote_and_resets() {
        let m = manager(3);
        let calls = AtomicU32::new(0);
        call(&m, Err(ErrorKind::ServerError), &calls).await.unwrap();
        call(&m, Err(ErrorKind::ServerError), &calls).await.unwrap();
        assert_eq!(m.failure_count(), 2);

        assert_eq!(call(&m, Ok("remote"), &calls).await.unwrap(), "remote");
        assert_eq!(m.failure_count(), 0);
        assert!(m.last_error().is_none());
        assert!(!m.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_threshold_activates_degraded_mode() {
        let m = manager(3);
        let calls = AtomicU32::new(0);

        for _ in 0..3 {
            let v = call(&m, Err(ErrorKind::ServerError), &calls).await.unwrap();
            assert_eq!(v, "local");
        }
        assert!(m.is_active());
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        // Remote is healthy now but is not attempted during the window.
        for _ in 0..5 {
            assert_eq!(call(&m, Ok("remote"), &calls).await.unwrap(), "local");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        tokio::time::advance(Duration::from_secs(60) + Duration::from_millis(1)).await;
        assert_eq!(call(&m, Ok("remote"), &calls).await.unwrap(), "remote");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert!(!m.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_zeroes_failure_count() {
        let m = manager(2);
        let calls = AtomicU32::new(0);
        call(&m, Err(ErrorKind::TimeoutError), &calls).await.unwrap();
        call(&m, Err(ErrorKind::TimeoutError), &calls).await.unwrap();
        assert!(m.is_active());

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(!m.is_active());
        assert_eq!(m.failure_count(), 0);

        // One failure after recovery is not enough to re-enter degraded mode.
        call(&m, Err(ErrorKind::TimeoutError), &calls).await.unwrap();
        assert!(!m.is_active());
        assert_eq!(m.failure_count(), 1);
    }

    #[tokio::test]
    async fn test_client_errors_are_excluded() {
        for threshold in [1, 2, 5] {
            let m = manager(threshold);
            let calls = AtomicU32::new(0);
            for _ in 0..10 {
                let err = call(&m, Err(ErrorKind::ClientError), &calls)
                    .await
                    .unwrap_err();
                assert_eq!(err.kind(), Some(ErrorKind::ClientError));
            }
            assert_eq!(m.failure_count(), 0);
            assert!(!m.is_active());
        }
    }

    #[tokio::test]
    async fn test_unclassified_errors_propagate_uncounted() {
        let m = manager(1);
        let err = m
            .execute_with_fallback(
                || async { Err::<(), _>(Error::cancelled("events.list")) },
                || async { Ok(()) },
                "events.list",
            )
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(m.failure_count(), 0);
    }

    #[tokio::test]
    async fn test_auto_fallback_disabled_reraises() {
        let m = FallbackManager::new(FallbackConfig::new().with_auto_fallback(false).with_threshold(2))
            .unwrap();
        let fallback_calls = AtomicU32::new(0);
        for _ in 0..2 {
            let err = m
                .execute_with_fallback(
                    || async { Err::<(), _>(api(ErrorKind::NetworkError)) },
                    || async {
                        fallback_calls.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    },
                    "places.list",
                )
                .await
                .unwrap_err();
            assert_eq!(err.kind(), Some(ErrorKind::NetworkError));
        }
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 0);
        // Degradation still engages; callers in degraded mode get the fallback.
        assert!(m.is_active());
    }

    #[tokio::test]
    async fn test_both_fail_reports_both() {
        let m = manager(5);
        let err = m
            .execute_with_fallback(
                || async { Err::<(), _>(api(ErrorKind::ServerError)) },
                || async { Err(api(ErrorKind::NetworkError)) },
                "persons.get",
            )
            .await
            .unwrap_err();
        match &err {
            Error::FallbackFailed {
                operation,
                fallback,
                remote,
            } => {
                assert_eq!(operation, "persons.get");
                assert_eq!(fallback.kind(), Some(ErrorKind::NetworkError));
                assert_eq!(remote.as_ref().unwrap().kind, ErrorKind::ServerError);
            }
            other => panic!("unexpected error {:?}", other),
        }
        let msg = err.to_string();
        assert!(msg.contains("SERVER_ERROR"));
        assert!(msg.contains("NETWORK_ERROR"));
    }

    #[tokio::test]
    async fn test_degraded_fallback_failure_references_last_remote() {
        let m = manager(1);
        let calls = AtomicU32::new(0);
        call(&m, Err(ErrorKind::ServerError), &calls).await.unwrap();
        assert!(m.is_active());

        let err = m
            .execute_with_fallback(
                || async { Ok::<_, Error>(()) },
                || async { Err(api(ErrorKind::NetworkError)) },
                "dynasties.list",
            )
            .await
            .unwrap_err();
        match err {
            Error::FallbackFailed { remote, .. } => {
                assert_eq!(remote.unwrap().kind, ErrorKind::ServerError)
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_overrides() {
        let m = manager(3);
        let calls = AtomicU32::new(0);

        m.manual_activate();
        assert_eq!(call(&m, Ok("remote"), &calls).await.unwrap(), "local");
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        m.manual_deactivate();
        assert_eq!(call(&m, Ok("remote"), &calls).await.unwrap(), "remote");

        call(&m, Err(ErrorKind::ServerError), &calls).await.unwrap();
        m.reset();
        let snap = m.snapshot();
        assert!(!snap.is_active);
        assert_eq!(snap.failure_count, 0);
        assert!(snap.last_error.is_none());

        // Manual activation also expires with the window.
        m.manual_activate();
        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(!m.is_active());
    }

    #[tokio::test]
    async fn test_update_config() {
        let m = manager(3);
        m.update_config(FallbackConfigUpdate {
            fallback_threshold: Some(1),
            exclude_error_types: Some(HashSet::new()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(m.config().fallback_threshold, 1);

        // Client errors now count.
        let calls = AtomicU32::new(0);
        call(&m, Err(ErrorKind::ClientError), &calls).await.unwrap();
        assert!(m.is_active());

        let bad = m.update_config(FallbackConfigUpdate {
            fallback_threshold: Some(0),
            ..Default::default()
        });
        assert!(bad.is_err());
        assert_eq!(m.config().fallback_threshold, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_reports_window() {
        let m = manager(1);
        let calls = AtomicU32::new(0);
        call(&m, Err(ErrorKind::ServerError), &calls).await.unwrap();
        tokio::time::advance(Duration::from_secs(20)).await;

        let snap = m.snapshot();
        assert!(snap.is_active);
        assert_eq!(snap.failure_count, 1);
        assert_eq!(snap.activated_ms_ago, Some(20_000));
        assert_eq!(snap.remaining_ms, Some(40_000));
        assert_eq!(snap.last_error.unwrap().kind, ErrorKind::ServerError);

        let json = serde_json::to_value(m.snapshot()).unwrap();
        assert_eq!(json["config"]["fallback_threshold"], 1);
        assert_eq!(json["last_error"]["kind"], "SERVER_ERROR");
    }
}
