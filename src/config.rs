//! 配置加载：YAML 文件 + 环境变量覆盖。
//!
//! Configuration for the data-access layer.
//!
//! Loaded from YAML (every field optional, defaults below), then patched from
//! the environment, then validated.
//!
//! | Env var | Field |
//! |---------|-------|
//! | `ANNALS_BASE_URL` | `transport.base_url` |
//! | `ANNALS_HTTP_TIMEOUT_MS` | `transport.timeout_ms` |
//! | `ANNALS_MAX_RETRIES` | `retry.max_retries` |
//! | `ANNALS_RETRY_DELAY_MS` | `retry.retry_delay_ms` |
//! | `ANNALS_BREAKER_FAILURE_THRESHOLD` | `circuit_breaker.failure_threshold` |
//! | `ANNALS_BREAKER_RECOVERY_TIMEOUT_MS` | `circuit_breaker.recovery_timeout_ms` |
//! | `ANNALS_FALLBACK_THRESHOLD` | `fallback.fallback_threshold` |
//! | `ANNALS_FALLBACK_DURATION_MS` | `fallback.fallback_duration_ms` |
//! | `ANNALS_AUTO_FALLBACK` | `fallback.enable_auto_fallback` |
//! | `ANNALS_DATA_SOURCE` | `data_source` (`api` or `mock`) |

use crate::error_code::ErrorKind;
use crate::fallback::FallbackConfig;
use crate::resilience::{CircuitBreakerConfig, RetryConfig};
use crate::services::DataSource;
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSection {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl Default for TransportSection {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            timeout_ms: 10_000,
        }
    }
}

impl TransportSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub max_delay_ms: Option<u64>,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 1000,
            max_delay_ms: None,
        }
    }
}

impl RetrySection {
    pub fn to_retry_config(&self) -> RetryConfig {
        let cfg = RetryConfig::new()
            .with_max_retries(self.max_retries)
            .with_retry_delay(Duration::from_millis(self.retry_delay_ms));
        match self.max_delay_ms {
            Some(ms) => cfg.with_max_delay(Duration::from_millis(ms)),
            None => cfg,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSection {
    pub failure_threshold: u32,
    pub recovery_timeout_ms: u64,
    pub success_threshold: u32,
}

impl Default for CircuitBreakerSection {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout_ms: 30_000,
            success_threshold: 3,
        }
    }
}

impl CircuitBreakerSection {
    pub fn to_breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig::new()
            .with_failure_threshold(self.failure_threshold)
            .with_recovery_timeout(Duration::from_millis(self.recovery_timeout_ms))
            .with_success_threshold(self.success_threshold)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackSection {
    pub enable_auto_fallback: bool,
    pub fallback_threshold: u32,
    pub fallback_duration_ms: u64,
    pub exclude_error_types: Vec<ErrorKind>,
}

impl Default for FallbackSection {
    fn default() -> Self {
        Self {
            enable_auto_fallback: true,
            fallback_threshold: 3,
            fallback_duration_ms: 60_000,
            exclude_error_types: vec![ErrorKind::ClientError],
        }
    }
}

impl FallbackSection {
    pub fn to_fallback_config(&self) -> FallbackConfig {
        FallbackConfig {
            enable_auto_fallback: self.enable_auto_fallback,
            fallback_threshold: self.fallback_threshold,
            fallback_duration: Duration::from_millis(self.fallback_duration_ms),
            exclude_error_types: self.exclude_error_types.iter().copied().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataLayerConfig {
    pub transport: TransportSection,
    pub retry: RetrySection,
    pub circuit_breaker: CircuitBreakerSection,
    pub fallback: FallbackSection,
    pub data_source: DataSource,
}

impl DataLayerConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let cfg: Self = serde_yaml::from_str(yaml)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    /// Defaults, patched from the process environment, validated.
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();
        cfg.apply_env_overrides()?;
        Ok(cfg)
    }

    /// Patch fields from `ANNALS_*` environment variables and re-validate.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    pub(crate) fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("ANNALS_BASE_URL") {
            self.transport.base_url = url;
        }
        if let Some(v) = parse_var(&lookup, "ANNALS_HTTP_TIMEOUT_MS")? {
            self.transport.timeout_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "ANNALS_MAX_RETRIES")? {
            self.retry.max_retries = v;
        }
        if let Some(v) = parse_var(&lookup, "ANNALS_RETRY_DELAY_MS")? {
            self.retry.retry_delay_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "ANNALS_BREAKER_FAILURE_THRESHOLD")? {
            self.circuit_breaker.failure_threshold = v;
        }
        if let Some(v) = parse_var(&lookup, "ANNALS_BREAKER_RECOVERY_TIMEOUT_MS")? {
            self.circuit_breaker.recovery_timeout_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "ANNALS_FALLBACK_THRESHOLD")? {
            self.fallback.fallback_threshold = v;
        }
        if let Some(v) = parse_var(&lookup, "ANNALS_FALLBACK_DURATION_MS")? {
            self.fallback.fallback_duration_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "ANNALS_AUTO_FALLBACK")? {
            self.fallback.enable_auto_fallback = v;
        }
        if let Some(raw) = lookup("ANNALS_FALLBACK_EXCLUDE") {
            self.fallback.exclude_error_types = parse_kinds("ANNALS_FALLBACK_EXCLUDE", &raw)?;
        }
        if let Some(raw) = lookup("ANNALS_DATA_SOURCE") {
            self.data_source = raw.parse()?;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.transport.base_url).map_err(|e| {
            invalid("transport.base_url", format!("invalid URL: {}", e))
        })?;
        positive("transport.timeout_ms", self.transport.timeout_ms)?;
        positive(
            "circuit_breaker.failure_threshold",
            self.circuit_breaker.failure_threshold as u64,
        )?;
        positive(
            "circuit_breaker.recovery_timeout_ms",
            self.circuit_breaker.recovery_timeout_ms,
        )?;
        positive(
            "circuit_breaker.success_threshold",
            self.circuit_breaker.success_threshold as u64,
        )?;
        positive(
            "fallback.fallback_threshold",
            self.fallback.fallback_threshold as u64,
        )?;
        positive(
            "fallback.fallback_duration_ms",
            self.fallback.fallback_duration_ms,
        )?;
        Ok(())
    }
}

fn invalid(field: &str, details: impl Into<String>) -> Error {
    Error::configuration_with_context(
        "invalid configuration value",
        ErrorContext::new()
            .with_field_path(field)
            .with_details(details)
            .with_source("config_loader"),
    )
}

fn positive(field: &str, value: u64) -> Result<()> {
    if value == 0 {
        return Err(invalid(field, "must be greater than zero"));
    }
    Ok(())
}

/// Comma-separated kind names; an empty value clears the list.
fn parse_kinds(key: &str, raw: &str) -> Result<Vec<ErrorKind>> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| {
            ErrorKind::from_name(name)
                .ok_or_else(|| invalid(key, format!("unknown error kind '{}'", name)))
        })
        .collect()
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| invalid(key, format!("cannot parse '{}': {}", raw, e))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let cfg = DataLayerConfig::default();
        assert_eq!(cfg.transport.timeout_ms, 10_000);
        assert_eq!(cfg.retry.max_retries, 3);
        assert_eq!(cfg.circuit_breaker.failure_threshold, 5);
        assert_eq!(cfg.circuit_breaker.recovery_timeout_ms, 30_000);
        assert!(cfg.fallback.enable_auto_fallback);
        assert_eq!(cfg.fallback.exclude_error_types, vec![ErrorKind::ClientError]);
        assert_eq!(cfg.data_source, DataSource::Api);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = r#"
transport:
  base_url: "https://annals.example.org/api"
fallback:
  fallback_threshold: 2
  exclude_error_types: [CLIENT_ERROR, CIRCUIT_BREAKER_OPEN]
data_source: mock
"#;
        let cfg = DataLayerConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(cfg.transport.base_url, "https://annals.example.org/api");
        assert_eq!(cfg.transport.timeout_ms, 10_000);
        assert_eq!(cfg.fallback.fallback_threshold, 2);
        assert_eq!(cfg.fallback.fallback_duration_ms, 60_000);
        assert_eq!(cfg.data_source, DataSource::Mock);

        let fb = cfg.fallback.to_fallback_config();
        assert!(fb.exclude_error_types.contains(&ErrorKind::CircuitBreakerOpen));
        assert_eq!(fb.fallback_duration, Duration::from_secs(60));
    }

    #[test]
    fn test_rejects_zero_threshold() {
        let err = DataLayerConfig::from_yaml_str("fallback:\n  fallback_threshold: 0\n")
            .unwrap_err();
        let ctx = err.context().unwrap();
        assert_eq!(ctx.field_path.as_deref(), Some("fallback.fallback_threshold"));
    }

    #[test]
    fn test_rejects_unknown_error_kind() {
        let err = DataLayerConfig::from_yaml_str("fallback:\n  exclude_error_types: [TEAPOT]\n")
            .unwrap_err();
        assert!(matches!(err, Error::Yaml(_)));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("ANNALS_BASE_URL", "http://10.0.0.5:9000"),
            ("ANNALS_MAX_RETRIES", "0"),
            ("ANNALS_FALLBACK_DURATION_MS", "1500"),
            ("ANNALS_AUTO_FALLBACK", "false"),
            ("ANNALS_DATA_SOURCE", "MOCK"),
        ]
        .into_iter()
        .collect();
        let mut cfg = DataLayerConfig::default();
        cfg.apply_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(cfg.transport.base_url, "http://10.0.0.5:9000");
        assert_eq!(cfg.retry.max_retries, 0);
        assert_eq!(cfg.fallback.fallback_duration_ms, 1500);
        assert!(!cfg.fallback.enable_auto_fallback);
        assert_eq!(cfg.data_source, DataSource::Mock);
    }

    #[test]
    fn test_env_override_excluded_kinds() {
        let mut cfg = DataLayerConfig::default();
        cfg.apply_overrides(|k| {
            (k == "ANNALS_FALLBACK_EXCLUDE").then(|| "client_error, CIRCUIT_BREAKER_OPEN".to_string())
        })
        .unwrap();
        assert_eq!(
            cfg.fallback.exclude_error_types,
            vec![ErrorKind::ClientError, ErrorKind::CircuitBreakerOpen]
        );

        cfg.apply_overrides(|k| (k == "ANNALS_FALLBACK_EXCLUDE").then(String::new))
            .unwrap();
        assert!(cfg.fallback.exclude_error_types.is_empty());

        let err = cfg
            .apply_overrides(|k| (k == "ANNALS_FALLBACK_EXCLUDE").then(|| "TEAPOT".to_string()))
            .unwrap_err();
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("ANNALS_FALLBACK_EXCLUDE")
        );
    }

    #[test]
    fn test_env_override_parse_failure() {
        let mut cfg = DataLayerConfig::default();
        let err = cfg
            .apply_overrides(|k| (k == "ANNALS_MAX_RETRIES").then(|| "three".to_string()))
            .unwrap_err();
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("ANNALS_MAX_RETRIES")
        );
    }

    #[test]
    fn test_breaker_and_retry_conversion() {
        let cfg = DataLayerConfig::default();
        let breaker = cfg.circuit_breaker.to_breaker_config();
        assert_eq!(breaker.recovery_timeout, Duration::from_secs(30));
        let retry = cfg.retry.to_retry_config();
        assert_eq!(retry.retry_delay, Duration::from_millis(1000));
        assert!(retry.max_delay.is_none());
    }
}
