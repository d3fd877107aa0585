//! The network seam under [`UpstreamClient`](super::UpstreamClient).
//!
//! A [`Transport`] performs exactly one HTTP exchange and reports what happened; retry and
//! classification live above it. [`ReqwestTransport`] is the production implementation. Tests
//! substitute scripted transports to simulate network failures deterministically.

use super::UpstreamRequest;
use crate::config::UpstreamConfig;
use crate::error::Result;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, ClientBuilder, Url};
use std::time::Duration;
use thiserror::Error;

/// User agent sent with every request.
pub const USER_AGENT_VALUE: &str = concat!("charitygate/", env!("CARGO_PKG_VERSION"));

/// A response as received, before any status handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: String,
}

impl UpstreamResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, body: body.into() }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// No response was received.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("network error: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl TransportError {
    pub fn network(error: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>) -> Self {
        Self::Network(error.into())
    }
}

/// Executes one upstream request.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    async fn send(&self, request: &UpstreamRequest)
        -> std::result::Result<UpstreamResponse, TransportError>;
}

/// `reqwest`-backed transport with the gateway's default headers and timeout.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: Client,
    base_url: Url,
    timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            crate::Error::InvalidConfig(format!("upstream base URL `{}`: {e}", config.base_url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(crate::Error::InvalidConfig(format!(
                "upstream base URL `{}` cannot take a path",
                config.base_url
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        if let Some(api_key) = &config.api_key {
            let mut value = HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|e| crate::Error::InvalidConfig(format!("API key is not a valid header: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = ClientBuilder::new()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()
            .map_err(|e| crate::Error::InvalidConfig(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url,
            timeout: config.timeout(),
        })
    }

    /// Base URL plus the request's segments, each percent-encoded.
    fn url_for(&self, request: &UpstreamRequest) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(&request.segments);
        }
        url
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(
        &self,
        request: &UpstreamRequest,
    ) -> std::result::Result<UpstreamResponse, TransportError> {
        let url = self.url_for(request);
        let response =
            self.http.get(url).query(&request.query).send().await.map_err(|e| self.map_err(e))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| self.map_err(e))?;
        Ok(UpstreamResponse { status, body })
    }
}

impl ReqwestTransport {
    fn map_err(&self, error: reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else {
            TransportError::Network(Box::new(error))
        }
    }
}
