//! In-memory, per-key sliding-window rate limiting.
//!
//! Each key owns a bucket of admission timestamps (epoch milliseconds, oldest first). A request
//! is admitted when fewer than `max_requests` timestamps in its bucket are younger than the
//! window; admission appends the current time. This is window counting, not a token bucket: a
//! burst that fills the window blocks the key until its *oldest* entries age out.
//!
//! Stale entries are pruned lazily on admission and eagerly by [`SlidingWindowLimiter::sweep`],
//! which also drops empty keys. The limiter never schedules itself; see [`spawn_sweeper`].
//!
//! ```rust
//! use std::time::Duration;
//! use charitygate::{ManualClock, SlidingWindowLimiter};
//!
//! let clock = ManualClock::new(0);
//! let limiter = SlidingWindowLimiter::new(Duration::from_secs(1), 2).with_clock(clock.clone());
//! assert!(limiter.admit("search"));
//! assert!(limiter.admit("search"));
//! assert!(!limiter.admit("search"));
//! assert!(limiter.admit("lookup"));
//!
//! clock.advance(Duration::from_secs(1));
//! assert!(limiter.admit("search"));
//! ```

use crate::clock::{Clock, SystemClock};
use crate::config::RateLimitConfig;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

pub mod sweeper;
pub use sweeper::spawn_sweeper;

/// Conventional key for callers that do not partition their traffic.
pub const GLOBAL_KEY: &str = "global";

/// Outcome of [`SlidingWindowLimiter::check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Admitted; `remaining` admissions are left in the current window.
    Allowed { remaining: u32 },
    /// Refused until `reset_at` (epoch ms); `wait` is the distance from now.
    Denied { reset_at: u64, wait: Duration },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed { .. })
    }
}

/// Per-key sliding-window admission counter.
///
/// All bucket access goes through one mutex, so the count-then-append in
/// [`admit`](Self::admit) is atomic with respect to concurrent callers and to
/// [`sweep`](Self::sweep).
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    window_ms: u64,
    max_requests: u32,
    buckets: Mutex<HashMap<String, VecDeque<u64>>>,
    clock: Arc<dyn Clock>,
}

impl SlidingWindowLimiter {
    /// A zero `window` is treated as 1 ms.
    pub fn new(window: Duration, max_requests: u32) -> Self {
        let window_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX).max(1);
        Self {
            window_ms,
            max_requests,
            buckets: Mutex::new(HashMap::new()),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.window(), config.max_requests)
    }

    /// Replace the time source (tests inject [`ManualClock`](crate::ManualClock)).
    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn now_millis(&self) -> u64 {
        self.clock.now_millis()
    }

    /// Admit a request under `key` if the window has room, consuming one slot.
    ///
    /// A refused request leaves the bucket untouched.
    pub fn admit(&self, key: &str) -> bool {
        self.check(key).is_allowed()
    }

    /// [`admit`](Self::admit) that also reports remaining quota or when to come back.
    pub fn check(&self, key: &str) -> Decision {
        let now = self.clock.now_millis();
        let mut buckets = self.buckets.lock();

        let live = buckets.get(key).map_or(0, |bucket| self.live_count(bucket, now));
        if live >= self.max_requests as usize {
            let reset_at = buckets
                .get(key)
                .and_then(|bucket| bucket.iter().find(|&&t| self.is_live(t, now)))
                .map_or(now, |&oldest| oldest.saturating_add(self.window_ms));
            tracing::debug!(key, live, max = self.max_requests, "admission denied");
            return Decision::Denied {
                reset_at,
                wait: Duration::from_millis(reset_at.saturating_sub(now)),
            };
        }

        let bucket = buckets.entry(key.to_owned()).or_default();
        bucket.retain(|&t| self.is_live(t, now));
        bucket.push_back(now);
        let remaining = self.max_requests.saturating_sub(bucket.len() as u32);
        Decision::Allowed { remaining }
    }

    /// Admissions left for `key` in the current window. Never mutates.
    pub fn remaining(&self, key: &str) -> u32 {
        let now = self.clock.now_millis();
        let buckets = self.buckets.lock();
        let live = buckets.get(key).map_or(0, |bucket| self.live_count(bucket, now));
        self.max_requests.saturating_sub(u32::try_from(live).unwrap_or(u32::MAX))
    }

    /// Epoch ms at which the oldest *stored* entry for `key` expires, or `0` for an unknown key.
    ///
    /// Reads the bucket without pruning, so the result can lie in the past when the oldest entry
    /// is already stale; treat a past value as "available now".
    pub fn reset_at(&self, key: &str) -> u64 {
        self.buckets
            .lock()
            .get(key)
            .and_then(|bucket| bucket.front())
            .map_or(0, |&oldest| oldest.saturating_add(self.window_ms))
    }

    /// Prune stale entries from every bucket and drop keys left empty.
    pub fn sweep(&self) {
        let now = self.clock.now_millis();
        let mut buckets = self.buckets.lock();
        let before = buckets.len();
        buckets.retain(|_, bucket| {
            bucket.retain(|&t| self.is_live(t, now));
            !bucket.is_empty()
        });
        let removed = before - buckets.len();
        if removed > 0 {
            tracing::debug!(removed, remaining = buckets.len(), "swept rate limit buckets");
        }
    }

    /// Number of keys currently holding a bucket.
    pub fn tracked_keys(&self) -> usize {
        self.buckets.lock().len()
    }

    fn is_live(&self, timestamp: u64, now: u64) -> bool {
        now.saturating_sub(timestamp) < self.window_ms
    }

    fn live_count(&self, bucket: &VecDeque<u64>, now: u64) -> usize {
        bucket.iter().filter(|&&t| self.is_live(t, now)).count()
    }
}
