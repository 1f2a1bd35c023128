//! End-to-end degradation: wired services over a flaky backend.

mod common;

use annals_data::fallback::{FallbackConfig, FallbackConfigUpdate, FallbackManager};
use annals_data::resilience::RetryConfig;
use annals_data::services::{
    DataServices, DataSource, DataSourceSwitch, EntityService, ListQuery, LocalData,
};
use annals_data::{Error, ErrorKind, ResilientClient};
use common::FlakyBackend;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const SEED: &str = r#"{
    "events": [
        {"id": "local-1", "title": "Battle of Feishui", "year": 383, "category": "battle"}
    ]
}"#;

fn services(backend: Arc<FlakyBackend>, config: FallbackConfig) -> DataServices {
    let client = ResilientClient::builder()
        .transport(backend)
        .retry(RetryConfig::disabled())
        .build()
        .unwrap();
    let manager = Arc::new(FallbackManager::new(config).unwrap());
    let source = Arc::new(DataSourceSwitch::new(DataSource::Api));
    DataServices::build(client, manager, source, LocalData::from_json_str(SEED).unwrap())
}

fn remote_events() -> serde_json::Value {
    json!([{"id": "remote-1", "title": "Battle of Gaixia", "year": -202}])
}

#[tokio::test(start_paused = true)]
async fn test_threshold_then_window_then_recovery() {
    let backend = FlakyBackend::new(remote_events());
    let svc = services(
        backend.clone(),
        FallbackConfig::new()
            .with_threshold(3)
            .with_duration(Duration::from_secs(60)),
    );

    // Calls 1-3: remote fails, fallback masks every failure.
    for n in 1..=3 {
        let page = svc.events.list(&ListQuery::new()).await.unwrap();
        assert_eq!(page.items[0].id, "local-1");
        assert_eq!(backend.calls(), n);
    }
    assert!(svc.manager().is_active());

    // Backend healthy again, but the window keeps it untouched.
    backend.set_healthy(true);
    let page = svc.events.list(&ListQuery::new()).await.unwrap();
    assert_eq!(page.items[0].id, "local-1");
    assert_eq!(backend.calls(), 3);

    tokio::time::advance(Duration::from_secs(61)).await;

    let page = svc.events.list(&ListQuery::new()).await.unwrap();
    assert_eq!(page.items[0].id, "remote-1");
    assert_eq!(backend.calls(), 4);
    assert!(!svc.manager().is_active());
    assert_eq!(svc.manager().failure_count(), 0);
}

#[tokio::test]
async fn test_both_paths_failing_reports_both() {
    let backend = FlakyBackend::new(remote_events());
    let svc = services(backend, FallbackConfig::default());

    let err = svc.events.get("nowhere").await.unwrap_err();
    match &err {
        Error::FallbackFailed {
            operation, remote, ..
        } => {
            assert_eq!(operation, "events.get");
            assert_eq!(remote.as_ref().map(|e| e.kind), Some(ErrorKind::ServerError));
        }
        other => panic!("expected FallbackFailed, got {other:?}"),
    }
    assert!(err.to_string().contains("events.get"));
}

#[tokio::test]
async fn test_auto_fallback_disabled_reraises() {
    let backend = FlakyBackend::new(remote_events());
    let svc = services(backend, FallbackConfig::default());
    svc.manager()
        .update_config(FallbackConfigUpdate {
            enable_auto_fallback: Some(false),
            ..Default::default()
        })
        .unwrap();

    let err = svc.events.list(&ListQuery::new()).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::ServerError));
    assert_eq!(svc.manager().failure_count(), 1);
}

#[tokio::test]
async fn test_rejected_input_does_not_degrade() {
    let backend = FlakyBackend::new(remote_events());
    backend.set_healthy(true);
    let svc = services(backend.clone(), FallbackConfig::default());

    for _ in 0..3 {
        let err = svc.events.get("").await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest { .. }));
        assert_eq!(err.kind(), None);
    }
    assert_eq!(backend.calls(), 0);
    assert_eq!(svc.manager().failure_count(), 0);
    assert!(!svc.manager().is_active());

    // The remote is still consulted afterwards.
    let page = svc.events.list(&ListQuery::new()).await.unwrap();
    assert_eq!(page.items[0].id, "remote-1");
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn test_mock_mode_never_touches_backend() {
    let backend = FlakyBackend::new(remote_events());
    backend.set_healthy(true);
    let svc = services(backend.clone(), FallbackConfig::default());
    svc.set_data_source(DataSource::Mock);

    let found = svc.events.search("feishui").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_categories_do_not_hit_network() {
    let backend = FlakyBackend::new(remote_events());
    let svc = services(backend.clone(), FallbackConfig::default());

    let cats = svc.events.categories().unwrap();
    assert!(cats.contains(&"battle".to_string()));
    // Dynasties have no static enumeration; the local catalog answers.
    assert!(svc.dynasties.categories().unwrap().is_empty());
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_status_snapshot_serializes() {
    let backend = FlakyBackend::new(remote_events());
    let svc = services(backend, FallbackConfig::new().with_threshold(1));
    let _ = svc.events.list(&ListQuery::new()).await.unwrap();

    let json = serde_json::to_value(svc.status()).unwrap();
    assert_eq!(json["data_source"], "api");
    assert_eq!(json["client"]["base_url"], "flaky://backend");
    assert_eq!(json["client"]["circuit_breaker"]["state"], "CLOSED");
    assert_eq!(json["fallback"]["is_active"], true);
    assert_eq!(json["fallback"]["last_error"]["kind"], "SERVER_ERROR");
}
