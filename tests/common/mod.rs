//! Shared fixtures for integration tests.

#![allow(dead_code)]

use annals_data::resilience::{CircuitBreakerConfig, RetryConfig};
use annals_data::transport::{Transport, TransportError, TransportRequest, TransportResponse};
use annals_data::ResilientClient;
use async_trait::async_trait;
use mockito::{Mock, Server, ServerGuard};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Mock HTTP backend plus a client pointed at it.
pub struct MockBackend {
    pub server: ServerGuard,
    pub base_url: String,
}

impl MockBackend {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let base_url = server.url();
        Self { server, base_url }
    }

    /// Client with fast retries so tests don't sleep for seconds.
    pub fn client(&self, max_retries: u32) -> ResilientClient {
        ResilientClient::builder()
            .base_url(&self.base_url)
            .timeout(Duration::from_secs(2))
            .retry(
                RetryConfig::new()
                    .with_max_retries(max_retries)
                    .with_retry_delay(Duration::from_millis(5)),
            )
            .circuit_breaker(CircuitBreakerConfig::new().with_failure_threshold(5))
            .build()
            .expect("client")
    }

    pub async fn mock_json(&mut self, path: &str, status: usize, body: &str, hits: usize) -> Mock {
        self.server
            .mock("GET", path)
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .expect(hits)
            .create_async()
            .await
    }
}

/// In-process backend whose health can be flipped at runtime.
pub struct FlakyBackend {
    pub healthy: AtomicBool,
    pub calls: AtomicU32,
    pub reply: Value,
}

impl FlakyBackend {
    pub fn new(reply: Value) -> Arc<Self> {
        Arc::new(Self {
            healthy: AtomicBool::new(false),
            calls: AtomicU32::new(0),
            reply,
        })
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FlakyBackend {
    async fn send(
        &self,
        _request: &TransportRequest,
    ) -> Result<TransportResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.healthy.load(Ordering::SeqCst) {
            Ok(TransportResponse {
                status: 200,
                body: self.reply.clone(),
            })
        } else {
            Err(TransportError::Status {
                status: 500,
                body: "backend unavailable".into(),
            })
        }
    }

    fn base_url(&self) -> &str {
        "flaky://backend"
    }
}
