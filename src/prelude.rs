//! Convenient re-exports for embedding the gateway.
pub use crate::{
    backoff::{Backoff, BackoffError, MAX_BACKOFF},
    cancel::CancelToken,
    clock::{Clock, ManualClock, SystemClock},
    config::{GatewayConfig, RateLimitConfig, UpstreamConfig},
    error::{Error, Result, UpstreamError, ValidationError},
    gateway::CharityGateway,
    rate_limit::{spawn_sweeper, Decision, SlidingWindowLimiter, GLOBAL_KEY},
    retry::{RetryError, RetryPolicy},
    sleeper::{Sleeper, TokioSleeper},
    upstream::{
        AttemptFailure, ReqwestTransport, SearchQuery, Transport, TransportError, UpstreamClient,
        UpstreamRequest, UpstreamResponse,
    },
    validation::SearchArgs,
};
