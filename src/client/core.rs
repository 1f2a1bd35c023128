//! 弹性客户端：熔断器包裹重试循环，再包裹一次传输调用。
//!
//! Resilient client (breaker around retry around transport).

use crate::resilience::{CircuitBreaker, RequestOptions, RetryExecutor};
use crate::transport::{classify, Method, Transport, TransportRequest};
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::signals::ClientSignals;

/// The "remote operation" as higher layers see it.
///
/// Every verb runs `breaker.execute(|| retry.execute(|| transport.send(..)))`,
/// so the breaker counts logical calls rather than raw attempts.
#[derive(Clone)]
pub struct ResilientClient {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) retry: RetryExecutor,
    pub(crate) breaker: Arc<CircuitBreaker>,
}

impl ResilientClient {
    pub fn builder() -> super::ResilientClientBuilder {
        super::ResilientClientBuilder::new()
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn base_url(&self) -> &str {
        self.transport.base_url()
    }

    pub fn signals(&self) -> ClientSignals {
        ClientSignals {
            base_url: self.transport.base_url().to_string(),
            circuit_breaker: self.breaker.snapshot(),
        }
    }

    /// Run one request through breaker and retry.
    pub async fn request(&self, request: TransportRequest, options: RequestOptions) -> Result<Value> {
        self.run(request, options, None).await
    }

    /// Like [`request`](Self::request), but abortable through `token`.
    pub async fn request_cancellable(
        &self,
        request: TransportRequest,
        options: RequestOptions,
        token: &CancellationToken,
    ) -> Result<Value> {
        self.run(request, options, Some(token)).await
    }

    async fn run(
        &self,
        request: TransportRequest,
        options: RequestOptions,
        token: Option<&CancellationToken>,
    ) -> Result<Value> {
        debug!(
            method = request.method.as_str(),
            path = request.path.as_str(),
            idempotent = options.idempotent,
            "remote request"
        );
        let request = &request;
        let attempt = || async move {
            self.transport
                .send(request)
                .await
                .map(|resp| resp.body)
                .map_err(|e| Error::Api(classify(e)))
        };

        self.breaker
            .execute(|| async {
                match token {
                    Some(token) => {
                        self.retry
                            .execute_cancellable(attempt, &options, token)
                            .await
                    }
                    None => self.retry.execute_with(attempt, &options).await,
                }
            })
            .await
            .map_err(|e| match e {
                Error::Cancelled { .. } => Error::cancelled(format!(
                    "{} {}",
                    request.method, request.path
                )),
                other => other,
            })
    }

    pub async fn get(&self, path: &str) -> Result<Value> {
        self.request(TransportRequest::get(path), RequestOptions::default())
            .await
    }

    pub async fn get_with_query(&self, path: &str, query: &[(&str, &str)]) -> Result<Value> {
        let mut req = TransportRequest::get(path);
        for (k, v) in query {
            req = req.with_query(*k, *v);
        }
        self.request(req, RequestOptions::default()).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let value = self.get(path).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<Value> {
        self.post_with(path, body, RequestOptions::default()).await
    }

    pub async fn post_with(&self, path: &str, body: Value, options: RequestOptions) -> Result<Value> {
        self.request(TransportRequest::new(Method::Post, path).with_body(body), options)
            .await
    }

    pub async fn put(&self, path: &str, body: Value) -> Result<Value> {
        self.put_with(path, body, RequestOptions::default()).await
    }

    pub async fn put_with(&self, path: &str, body: Value, options: RequestOptions) -> Result<Value> {
        self.request(TransportRequest::new(Method::Put, path).with_body(body), options)
            .await
    }

    pub async fn delete(&self, path: &str) -> Result<Value> {
        self.delete_with(path, RequestOptions::default()).await
    }

    pub async fn delete_with(&self, path: &str, options: RequestOptions) -> Result<Value> {
        self.request(TransportRequest::new(Method::Delete, path), options)
            .await
    }
}
