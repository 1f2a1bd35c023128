use crate::fallback::FallbackSnapshot;
use crate::resilience::CircuitBreakerSnapshot;
use crate::services::DataSource;
use serde::Serialize;

/// Facts about one remote client, for a status/debug surface.
#[derive(Debug, Clone, Serialize)]
pub struct ClientSignals {
    pub base_url: String,
    pub circuit_breaker: CircuitBreakerSnapshot,
}

/// Combined status of the whole data-access layer.
///
/// Facts only, no policy.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub data_source: DataSource,
    pub client: ClientSignals,
    pub fallback: FallbackSnapshot,
}
