use crate::error_code::ErrorKind;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Structured error context for configuration and validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path or configuration key that caused the error (e.g., "fallback.fallback_threshold")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected range, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "config_loader", "schema_validator")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// A transport failure normalized into one [`ErrorKind`].
///
/// This is the only error shape retry, breaker and fallback policy reason
/// about. It is `Clone` so the fallback manager can keep the last one around.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
    /// HTTP status, when the remote answered at all.
    pub status: Option<u16>,
    /// Opaque wrapped cause.
    pub source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            source: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    pub fn circuit_open(retry_in_ms: u64) -> Self {
        Self::new(
            ErrorKind::CircuitBreakerOpen,
            format!("circuit breaker open, next probe in {}ms", retry_in_ms),
        )
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (HTTP {}): {}", self.kind, status, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Unified error type for the data-access layer
#[derive(Debug, Error)]
pub enum Error {
    #[error("Remote error: {0}")]
    Api(#[from] ApiError),

    #[error(
        "Operation '{operation}' failed on both paths: fallback: {fallback}; remote: {}",
        format_remote(.remote)
    )]
    FallbackFailed {
        operation: String,
        fallback: Box<Error>,
        remote: Option<ApiError>,
    },

    #[error("Operation '{operation}' was cancelled by the caller")]
    Cancelled { operation: String },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    /// The caller's request was rejected before any remote call was made.
    #[error("Invalid request: {message}{}", format_context(.context))]
    InvalidRequest {
        message: String,
        context: ErrorContext,
    },

    #[error("Validation error: {message}{}", format_context(.context))]
    Validation {
        message: String,
        context: ErrorContext,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

fn format_remote(remote: &Option<ApiError>) -> String {
    match remote {
        Some(err) => err.to_string(),
        None => "no remote failure recorded".to_string(),
    }
}

impl Error {
    /// Create a new validation error with structured context
    pub fn validation_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Validation {
            message: msg.into(),
            context,
        }
    }

    /// Create a new invalid-request error with structured context
    pub fn invalid_request_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::InvalidRequest {
            message: msg.into(),
            context,
        }
    }

    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    pub fn cancelled(operation: impl Into<String>) -> Self {
        Error::Cancelled {
            operation: operation.into(),
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. }
            | Error::InvalidRequest { context, .. }
            | Error::Validation { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Classified view of this error, if it is a backend-health signal.
    ///
    /// A payload that fails to decode or validate came back from the remote,
    /// so it is reported as a server error. Cancellation, rejected caller
    /// input, local configuration and I/O problems return `None`: they say
    /// nothing about the remote.
    pub fn classify(&self) -> Option<ApiError> {
        match self {
            Error::Api(e) => Some(e.clone()),
            Error::Serialization(e) => Some(ApiError::new(
                ErrorKind::ServerError,
                format!("undecodable payload: {}", e),
            )),
            Error::Validation { message, .. } => Some(ApiError::new(
                ErrorKind::ServerError,
                format!("invalid payload: {}", message),
            )),
            _ => None,
        }
    }

    /// Kind of the classified view, if any.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Api(e) => Some(e.kind),
            Error::Serialization(_) | Error::Validation { .. } => Some(ErrorKind::ServerError),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled { .. })
    }
}
