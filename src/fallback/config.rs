use crate::error_code::ErrorKind;
use crate::{Error, ErrorContext, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::time::Duration;

/// Degradation policy of a [`FallbackManager`](super::FallbackManager).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackConfig {
    /// Serve the fallback result when the remote fails. When false, remote
    /// errors are re-raised (degraded mode still engages).
    pub enable_auto_fallback: bool,
    /// Consecutive counted failures that activate degraded mode.
    pub fallback_threshold: u32,
    /// Length of the degraded window.
    pub fallback_duration: Duration,
    /// Kinds that never count toward activation and are propagated as-is.
    pub exclude_error_types: HashSet<ErrorKind>,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enable_auto_fallback: true,
            fallback_threshold: 3,
            fallback_duration: Duration::from_secs(60),
            exclude_error_types: HashSet::from([ErrorKind::ClientError]),
        }
    }
}

impl FallbackConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_auto_fallback(mut self, enable: bool) -> Self {
        self.enable_auto_fallback = enable;
        self
    }

    pub fn with_threshold(mut self, threshold: u32) -> Self {
        self.fallback_threshold = threshold;
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.fallback_duration = duration;
        self
    }

    pub fn with_excluded(mut self, kinds: impl IntoIterator<Item = ErrorKind>) -> Self {
        self.exclude_error_types = kinds.into_iter().collect();
        self
    }

    pub fn is_excluded(&self, kind: ErrorKind) -> bool {
        self.exclude_error_types.contains(&kind)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fallback_threshold == 0 {
            return Err(Error::configuration_with_context(
                "fallback threshold must be greater than zero",
                ErrorContext::new()
                    .with_field_path("fallback.fallback_threshold")
                    .with_source("fallback_manager"),
            ));
        }
        if self.fallback_duration.is_zero() {
            return Err(Error::configuration_with_context(
                "fallback duration must be greater than zero",
                ErrorContext::new()
                    .with_field_path("fallback.fallback_duration")
                    .with_source("fallback_manager"),
            ));
        }
        Ok(())
    }

    /// Apply a partial update, producing the new configuration.
    pub fn merged(&self, update: &FallbackConfigUpdate) -> Self {
        let mut next = self.clone();
        if let Some(v) = update.enable_auto_fallback {
            next.enable_auto_fallback = v;
        }
        if let Some(v) = update.fallback_threshold {
            next.fallback_threshold = v;
        }
        if let Some(v) = update.fallback_duration {
            next.fallback_duration = v;
        }
        if let Some(ref kinds) = update.exclude_error_types {
            next.exclude_error_types = kinds.clone();
        }
        next
    }

    pub fn view(&self) -> FallbackConfigView {
        let mut excluded: Vec<ErrorKind> = self.exclude_error_types.iter().copied().collect();
        excluded.sort_by_key(|k| k.code());
        FallbackConfigView {
            enable_auto_fallback: self.enable_auto_fallback,
            fallback_threshold: self.fallback_threshold,
            fallback_duration_ms: self.fallback_duration.as_millis() as u64,
            exclude_error_types: excluded,
        }
    }
}

/// Partial update for [`FallbackConfig`]; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FallbackConfigUpdate {
    pub enable_auto_fallback: Option<bool>,
    pub fallback_threshold: Option<u32>,
    pub fallback_duration: Option<Duration>,
    pub exclude_error_types: Option<HashSet<ErrorKind>>,
}

/// Serializable form of the configuration for status output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FallbackConfigView {
    pub enable_auto_fallback: bool,
    pub fallback_threshold: u32,
    pub fallback_duration_ms: u64,
    pub exclude_error_types: Vec<ErrorKind>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_exclude_client_errors() {
        let cfg = FallbackConfig::default();
        assert!(cfg.is_excluded(ErrorKind::ClientError));
        assert!(!cfg.is_excluded(ErrorKind::ServerError));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_merge_only_touches_set_fields() {
        let cfg = FallbackConfig::default();
        let next = cfg.merged(&FallbackConfigUpdate {
            fallback_threshold: Some(10),
            ..Default::default()
        });
        assert_eq!(next.fallback_threshold, 10);
        assert_eq!(next.fallback_duration, cfg.fallback_duration);
        assert_eq!(next.exclude_error_types, cfg.exclude_error_types);
    }

    #[test]
    fn test_validate_rejects_zeroes() {
        assert!(FallbackConfig::new().with_threshold(0).validate().is_err());
        assert!(FallbackConfig::new()
            .with_duration(Duration::ZERO)
            .validate()
            .is_err());
    }

    #[test]
    fn test_view_is_sorted() {
        let view = FallbackConfig::new()
            .with_excluded([ErrorKind::CircuitBreakerOpen, ErrorKind::ClientError])
            .view();
        assert_eq!(
            view.exclude_error_types,
            vec![ErrorKind::ClientError, ErrorKind::CircuitBreakerOpen]
        );
    }
}
