use super::{Method, Transport, TransportError, TransportRequest, TransportResponse};
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

/// reqwest-backed JSON transport rooted at a base URL.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let parsed = url::Url::parse(base_url).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid base URL '{}'", base_url),
                ErrorContext::new()
                    .with_field_path("transport.base_url")
                    .with_details(e.to_string())
                    .with_source("http_transport"),
            )
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::configuration_with_context(
                format!("unsupported scheme '{}'", parsed.scheme()),
                ErrorContext::new()
                    .with_field_path("transport.base_url")
                    .with_source("http_transport"),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .build()
            .map_err(|e| {
                Error::configuration_with_context(
                    "failed to build HTTP client",
                    ErrorContext::new()
                        .with_details(e.to_string())
                        .with_source("http_transport"),
                )
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        request: &TransportRequest,
    ) -> std::result::Result<TransportResponse, TransportError> {
        let url = self.url_for(&request.path);
        let mut req = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Put => self.client.put(&url),
            Method::Delete => self.client.delete(&url),
        };
        if !request.query.is_empty() {
            req = req.query(&request.query);
        }
        if let Some(body) = &request.body {
            req = req.json(body);
        }
        // Correlation id; the backend may ignore it.
        req = req
            .header("accept", "application/json")
            .header("x-request-id", Uuid::new_v4().to_string());

        let resp = req.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(self.timeout)
            } else {
                TransportError::Http(e)
            }
        })?;

        let status = resp.status().as_u16();
        let text = resp.text().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(self.timeout)
            } else {
                TransportError::Http(e)
            }
        })?;

        if !(200..300).contains(&status) {
            return Err(TransportError::Status { status, body: text });
        }

        let body = if text.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&text).map_err(|e| TransportError::Decode(e.to_string()))?
        };
        Ok(TransportResponse { status, body })
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}
