//! Configuration for the gateway.
//!
//! Values are layered: built-in defaults, then an optional file (any format the `config` crate
//! understands), then environment variables prefixed with `CHARITYGATE_` where `__` separates
//! nested keys, e.g. `CHARITYGATE_UPSTREAM__API_KEY` or `CHARITYGATE_RATE_LIMIT__WINDOW_MS`.

use crate::error::{Error, Result};
use crate::rate_limit::sweeper::DEFAULT_SWEEP_INTERVAL;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

const ENV_PREFIX: &str = "CHARITYGATE";

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub upstream: UpstreamConfig,
    pub rate_limit: RateLimitConfig,
}

/// Upstream REST API settings.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.charityapi.org/api".to_string(),
            api_key: None,
            timeout_ms: 30_000,
            max_retries: 3,
            retry_base_delay_ms: 1_000,
        }
    }
}

// Hand-written so the API key never reaches logs.
impl std::fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_ms", &self.timeout_ms)
            .field("max_retries", &self.max_retries)
            .field("retry_base_delay_ms", &self.retry_base_delay_ms)
            .finish()
    }
}

impl UpstreamConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), ..Self::default() }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

/// Local admission control settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub window_ms: u64,
    pub max_requests: u32,
    pub sweep_interval_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_ms: 60_000,
            max_requests: 100,
            sweep_interval_ms: DEFAULT_SWEEP_INTERVAL.as_millis() as u64,
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

impl GatewayConfig {
    /// Load defaults, the optional file at `path`, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::build(path, None)
    }

    /// Like [`load`](Self::load) but reads variables from `vars` instead of the process
    /// environment.
    pub fn from_vars(path: Option<&Path>, vars: HashMap<String, String>) -> Result<Self> {
        Self::build(path, Some(vars))
    }

    fn build(path: Option<&Path>, vars: Option<HashMap<String, String>>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        let env = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .source(vars);
        let config: GatewayConfig = builder.add_source(env).build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the client cannot run with.
    pub fn validate(&self) -> Result<()> {
        reqwest::Url::parse(&self.upstream.base_url).map_err(|e| {
            Error::InvalidConfig(format!("upstream.base_url `{}`: {e}", self.upstream.base_url))
        })?;
        if self.upstream.timeout_ms == 0 {
            return Err(Error::InvalidConfig("upstream.timeout_ms must be > 0".into()));
        }
        Ok(())
    }
}
