//! Request handlers: validate, admit, call upstream, render.
//!
//! Each handler owns one rate-limit key, so a burst of searches cannot starve lookups.

use crate::error::{Error, Result};
use crate::format;
use crate::rate_limit::{Decision, SlidingWindowLimiter};
use crate::upstream::UpstreamClient;
use crate::validation::{self, SearchArgs};
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub const LOOKUP_KEY: &str = "lookup";
pub const PUBLIC_CHARITY_KEY: &str = "public_charity_check";
pub const SEARCH_KEY: &str = "search";
pub const LIST_KEY: &str = "list";

/// Handlers over a shared client and limiter.
#[derive(Debug, Clone)]
pub struct CharityGateway {
    client: Arc<UpstreamClient>,
    limiter: Arc<SlidingWindowLimiter>,
}

impl CharityGateway {
    pub fn new(client: Arc<UpstreamClient>, limiter: Arc<SlidingWindowLimiter>) -> Self {
        Self { client, limiter }
    }

    pub fn limiter(&self) -> &Arc<SlidingWindowLimiter> {
        &self.limiter
    }

    fn admit(&self, key: &str) -> Result<()> {
        match self.limiter.check(key) {
            Decision::Allowed { remaining } => {
                tracing::debug!(key, remaining, "admitted");
                Ok(())
            }
            Decision::Denied { reset_at, .. } => {
                tracing::info!(key, reset_at, "rate limited");
                Err(Error::RateLimited { key: key.to_string(), reset_at_ms: reset_at })
            }
        }
    }

    fn now(&self) -> DateTime<Utc> {
        let millis = i64::try_from(self.limiter.now_millis()).unwrap_or(i64::MAX);
        DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
    }

    /// Full record for an EIN.
    pub async fn lookup_charity(&self, ein: &str) -> Result<String> {
        let ein = validation::normalize_ein(ein)?;
        self.admit(LOOKUP_KEY)?;
        let payload = self.client.lookup(&ein).await?;
        Ok(format::organization(&payload))
    }

    /// Whether an EIN belongs to a registered public charity.
    pub async fn check_public_charity(&self, ein: &str) -> Result<String> {
        let ein = validation::normalize_ein(ein)?;
        self.admit(PUBLIC_CHARITY_KEY)?;
        let payload = self.client.public_charity_check(&ein).await?;
        Ok(format::public_charity(&ein, &payload))
    }

    pub async fn search_charities(&self, args: &SearchArgs) -> Result<String> {
        let query = validation::validate_search(args)?;
        self.admit(SEARCH_KEY)?;
        let payload = self.client.search(&query).await?;
        Ok(format::search_results(&payload))
    }

    /// Organizations changed since a timestamp or date.
    pub async fn list_organizations(&self, since: &str) -> Result<String> {
        let since = validation::parse_since(since, self.now())?;
        self.admit(LIST_KEY)?;
        let payload = self.client.list_since(since).await?;
        Ok(format::listing(&payload))
    }

    /// Render any handler error for the caller.
    pub fn describe_error(&self, error: &Error) -> String {
        format::render_error(error, self.limiter.now_millis())
    }
}
