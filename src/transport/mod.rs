//! 传输层：远程调用的抽象接口与统一错误分类。
//!
//! Transport abstraction and the single classification function.
//!
//! Policy code never sees a [`TransportError`]; everything goes through
//! [`classify`] first and comes out as an [`ApiError`].

mod http;

pub use http::HttpTransport;

use crate::error_code::ErrorKind;
use crate::ApiError;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// Longest error-body prefix kept in an [`ApiError`] message.
pub const MAX_ERROR_BODY: usize = 512;

/// Default per-request deadline enforced by the transport.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl TransportRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    /// Decoded JSON body; `Null` for empty bodies.
    pub body: serde_json::Value,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("undecodable response body: {0}")]
    Decode(String),

    #[error("Transport error: {0}")]
    Other(String),
}

/// Performs one remote call. Implementations must enforce their own deadline.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        request: &TransportRequest,
    ) -> std::result::Result<TransportResponse, TransportError>;

    /// Identifies the remote for logs and status output.
    fn base_url(&self) -> &str;
}

/// Normalize a raw transport failure into the layer's error taxonomy.
pub fn classify(err: TransportError) -> ApiError {
    match err {
        TransportError::Timeout(_) => ApiError::new(ErrorKind::TimeoutError, err.to_string()),
        TransportError::Status { status, ref body } => {
            let message = if body.is_empty() {
                format!("remote responded with HTTP {}", status)
            } else {
                truncate_body(body)
            };
            ApiError::new(ErrorKind::from_http_status(status), message).with_status(status)
        }
        TransportError::Decode(_) => ApiError::new(ErrorKind::ServerError, err.to_string()),
        TransportError::Http(e) => classify_reqwest(e),
        TransportError::Other(msg) => ApiError::new(ErrorKind::NetworkError, msg),
    }
}

/// Keep at most [`MAX_ERROR_BODY`] bytes of `body`, cut on a char boundary.
pub(crate) fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... ({} bytes truncated)", &body[..end], body.len() - end)
}

fn classify_reqwest(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        return ApiError::new(ErrorKind::TimeoutError, e.to_string()).with_source(e);
    }
    if let Some(status) = e.status() {
        let kind = ErrorKind::from_http_status(status.as_u16());
        return ApiError::new(kind, e.to_string())
            .with_status(status.as_u16())
            .with_source(e);
    }
    if e.is_decode() || e.is_body() {
        return ApiError::new(ErrorKind::ServerError, e.to_string()).with_source(e);
    }
    // Connect, request and redirect failures: no usable response arrived.
    ApiError::new(ErrorKind::NetworkError, e.to_string()).with_source(e)
}
