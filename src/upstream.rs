//! Resilient client for the upstream charity registry API.
//!
//! Every operation follows the same path: build an [`UpstreamRequest`], run it through the
//! [`RetryPolicy`], then either parse the JSON body or raise a single [`UpstreamError`].
//!
//! Classification of one failed attempt:
//! - no response (connection failure, timeout): always retryable;
//! - a response with status `>= 500` or `429`: retryable;
//! - any other non-2xx status, or a 2xx body that is not JSON: final.
//!
//! Retries wait `retry_base_delay * 2^attempt`. Nothing is shared between calls, so one client
//! can serve any number of concurrent callers.

use crate::config::UpstreamConfig;
use crate::error::{is_retryable_status, BoxError, Error, Result, UpstreamError};
use crate::retry::{RetryError, RetryPolicy};
use crate::{Backoff, CancelToken, Sleeper, TokioSleeper};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error as ThisError;

pub mod request;
pub mod transport;

pub use request::{SearchQuery, UpstreamRequest};
pub use transport::{ReqwestTransport, Transport, TransportError, UpstreamResponse, USER_AGENT_VALUE};

/// Bodies of failed responses are cut to this many characters in diagnostics.
const MAX_BODY_SNIPPET: usize = 200;

/// Why a single attempt failed.
#[derive(Debug, ThisError)]
pub enum AttemptFailure {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response body: {0}")]
    Decode(#[source] serde_json::Error),
}

impl AttemptFailure {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => is_retryable_status(*status),
            Self::Decode(_) => false,
        }
    }

    fn from_response(response: UpstreamResponse) -> std::result::Result<Value, Self> {
        if !response.is_success() {
            let body: String = response.body.chars().take(MAX_BODY_SNIPPET).collect();
            return Err(Self::Status { status: response.status, body });
        }
        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&response.body).map_err(Self::Decode)
    }
}

impl From<AttemptFailure> for UpstreamError {
    fn from(failure: AttemptFailure) -> Self {
        let status = failure.status_code();
        let cause: BoxError = Box::new(failure);
        UpstreamError::classify(status, cause)
    }
}

/// Client for the upstream REST API.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    transport: Arc<dyn Transport>,
    retry: RetryPolicy<AttemptFailure>,
}

impl UpstreamClient {
    /// Production client: `reqwest` transport and tokio timer.
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        Self::builder(config.clone()).build()
    }

    pub fn builder(config: UpstreamConfig) -> UpstreamClientBuilder {
        UpstreamClientBuilder { config, transport: None, sleeper: Arc::new(TokioSleeper) }
    }

    pub fn max_retries(&self) -> usize {
        self.retry.max_retries()
    }

    /// Fetch one organization record.
    pub async fn lookup(&self, id: &str) -> Result<Value> {
        self.execute(UpstreamRequest::lookup(id), &CancelToken::new()).await
    }

    /// Fetch the public-charity status of an organization.
    pub async fn public_charity_check(&self, id: &str) -> Result<Value> {
        self.execute(UpstreamRequest::public_charity_check(id), &CancelToken::new()).await
    }

    pub async fn search(&self, query: &SearchQuery) -> Result<Value> {
        self.execute(UpstreamRequest::search(query), &CancelToken::new()).await
    }

    /// Organizations added or changed since `since`.
    pub async fn list_since(&self, since: DateTime<Utc>) -> Result<Value> {
        self.execute(UpstreamRequest::list_since(since), &CancelToken::new()).await
    }

    /// Send `request` with retries until it succeeds, fails for good, or `cancel` fires.
    pub async fn execute(&self, request: UpstreamRequest, cancel: &CancelToken) -> Result<Value> {
        let transport = &self.transport;
        let request = &request;
        let outcome = self
            .retry
            .execute_with_cancel(cancel, || async move {
                tracing::debug!(path = %request.path(), "upstream request");
                match transport.send(request).await {
                    Ok(response) => AttemptFailure::from_response(response),
                    Err(e) => Err(AttemptFailure::Transport(e)),
                }
            })
            .await;

        match outcome {
            Ok(value) => Ok(value),
            Err(RetryError::Cancelled { attempts }) => Err(Error::Cancelled { attempts }),
            Err(RetryError::Failed { attempts, error }) => {
                tracing::debug!(path = %request.path(), attempts, error = %error, "upstream request failed");
                Err(Error::Upstream(error.into()))
            }
        }
    }
}

/// Builder for [`UpstreamClient`].
pub struct UpstreamClientBuilder {
    config: UpstreamConfig,
    transport: Option<Arc<dyn Transport>>,
    sleeper: Arc<dyn Sleeper>,
}

impl UpstreamClientBuilder {
    /// Use `transport` instead of building a [`ReqwestTransport`] from the config.
    pub fn transport<T: Transport + 'static>(mut self, transport: T) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn sleeper<S: Sleeper + 'static>(mut self, sleeper: S) -> Self {
        self.sleeper = Arc::new(sleeper);
        self
    }

    pub fn build(self) -> Result<UpstreamClient> {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(&self.config)?),
        };
        let retry = RetryPolicy::builder()
            .max_retries(self.config.max_retries as usize)
            .backoff(Backoff::exponential(self.config.retry_base_delay()))
            .should_retry(AttemptFailure::is_retryable)
            .with_shared_sleeper(self.sleeper)
            .build();
        Ok(UpstreamClient { transport, retry })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempt_classification() {
        let timeout = AttemptFailure::Transport(TransportError::Timeout(Default::default()));
        assert!(timeout.is_retryable());
        assert_eq!(timeout.status_code(), None);

        for status in [429, 500, 502, 503] {
            assert!(AttemptFailure::Status { status, body: String::new() }.is_retryable());
        }
        for status in [400, 401, 403, 404, 422] {
            assert!(!AttemptFailure::Status { status, body: String::new() }.is_retryable());
        }
    }

    #[test]
    fn response_parsing() {
        let ok = AttemptFailure::from_response(UpstreamResponse::new(200, r#"{"data":{"ein":"1"}}"#));
        assert_eq!(ok.unwrap()["data"]["ein"], "1");

        let empty = AttemptFailure::from_response(UpstreamResponse::new(204, ""));
        assert_eq!(empty.unwrap(), Value::Null);

        let garbage = AttemptFailure::from_response(UpstreamResponse::new(200, "<html>"));
        let failure = garbage.unwrap_err();
        assert!(matches!(failure, AttemptFailure::Decode(_)));
        assert!(!failure.is_retryable());
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        let body = "x".repeat(1_000);
        let failure = AttemptFailure::from_response(UpstreamResponse::new(502, body)).unwrap_err();
        match failure {
            AttemptFailure::Status { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body.len(), MAX_BODY_SNIPPET);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn final_failure_maps_to_upstream_error() {
        let err: UpstreamError = AttemptFailure::Status { status: 404, body: "{}".into() }.into();
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(err.message(), "Resource not found");

        let err: UpstreamError = AttemptFailure::Status { status: 503, body: "busy".into() }.into();
        assert_eq!(err.message(), "Upstream request failed: HTTP 503: busy");

        let err: UpstreamError =
            AttemptFailure::Transport(TransportError::network("connection reset")).into();
        assert_eq!(err.status_code(), None);
        assert_eq!(err.message(), "Upstream request failed: network error: connection reset");
    }
}
