//! Error types shared by the client, the handlers and the binary.

use thiserror::Error;

/// Boxed error used as the diagnostic cause of an [`UpstreamError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias for gateway operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Final failure of an upstream call, raised once retries are exhausted or a non-retryable
/// response arrives.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct UpstreamError {
    message: String,
    status_code: Option<u16>,
    #[source]
    source: Option<BoxError>,
}

impl UpstreamError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), status_code: None, source: None }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    /// Build the error for a final failure, choosing the message from the status table.
    pub fn classify(status_code: Option<u16>, cause: BoxError) -> Self {
        let message = match status_code.and_then(status_message) {
            Some(message) => message.to_string(),
            None => format!("Upstream request failed: {cause}"),
        };
        Self { message, status_code, source: Some(cause) }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    /// Whether the status (if any) is one the client retries on.
    pub fn is_retryable_status(&self) -> bool {
        self.status_code.is_some_and(is_retryable_status)
    }
}

/// Message for statuses with a dedicated meaning; `None` falls back to the generic text.
pub fn status_message(status: u16) -> Option<&'static str> {
    match status {
        400 => Some("Invalid request parameters"),
        401 => Some("Invalid API key or unauthorized access"),
        403 => Some("Access forbidden: insufficient permissions"),
        404 => Some("Resource not found"),
        429 => Some("Rate limit exceeded on upstream API"),
        500 => Some("Upstream API internal server error"),
        _ => None,
    }
}

/// 5xx and 429 are transient; every other status is final.
pub fn is_retryable_status(status: u16) -> bool {
    status >= 500 || status == 429
}

/// Rejected caller input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
    field: Option<String>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), field: None }
    }

    pub fn for_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { message: message.into(), field: Some(field.into()) }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }
}

/// Top-level error for gateway operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The caller cancelled the call; no further attempts were made.
    #[error("request cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: usize },

    /// Local admission control refused the request.
    #[error("rate limit exceeded for `{key}` (resets at {reset_at_ms})")]
    RateLimited { key: String, reset_at_ms: u64 },

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    pub fn as_upstream(&self) -> Option<&UpstreamError> {
        match self {
            Self::Upstream(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(e) => Some(e),
            _ => None,
        }
    }
}
