#![forbid(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # charitygate
//!
//! A small gateway in front of a charity registry REST API: callers ask for an organization by
//! EIN, search by name or place, check public-charity status, or list recent changes, and get
//! readable text back.
//!
//! The interesting parts are the two resilience primitives underneath:
//!
//! - [`SlidingWindowLimiter`]: per-key sliding-window admission control with an injectable
//!   [`Clock`] and explicit [`sweep`](SlidingWindowLimiter::sweep)ing of idle keys.
//! - [`UpstreamClient`]: one base URL, default headers, a bounded [`RetryPolicy`] with
//!   exponential [`Backoff`], and a single [`UpstreamError`] per failed call. Waits go through a
//!   [`Sleeper`] and calls can be abandoned with a [`CancelToken`].
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use charitygate::{CharityGateway, GatewayConfig, SlidingWindowLimiter, UpstreamClient};
//!
//! # async fn run() -> charitygate::Result<()> {
//! let config = GatewayConfig::load(None)?;
//! let client = Arc::new(UpstreamClient::new(&config.upstream)?);
//! let limiter = Arc::new(SlidingWindowLimiter::from_config(&config.rate_limit));
//! let gateway = CharityGateway::new(client, limiter);
//!
//! println!("{}", gateway.lookup_charity("53-0196605").await?);
//! # Ok(())
//! # }
//! ```

pub mod backoff;
pub mod cancel;
pub mod clock;
pub mod config;
pub mod error;
pub mod format;
pub mod gateway;
pub mod prelude;
pub mod protocol;
pub mod rate_limit;
pub mod retry;
pub mod sleeper;
pub mod telemetry;
pub mod upstream;
pub mod validation;

// Re-exports
pub use backoff::Backoff;
pub use cancel::CancelToken;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{GatewayConfig, RateLimitConfig, UpstreamConfig};
pub use error::{Error, Result, UpstreamError, ValidationError};
pub use gateway::CharityGateway;
pub use rate_limit::{spawn_sweeper, Decision, SlidingWindowLimiter, GLOBAL_KEY};
pub use retry::{RetryError, RetryPolicy, RetryPolicyBuilder};
pub use sleeper::{InstantSleeper, Sleeper, TokioSleeper, TrackingSleeper};
pub use upstream::{SearchQuery, Transport, UpstreamClient, UpstreamRequest};
