//! Exponential backoff between retry attempts.
//!
//! Attempt indices are zero-based and count *failed* attempts: after the first failure
//! (`attempt = 0`) the wait is `base`, after the second `base * 2`, then `base * 4`, and so on.
//!
//! ```rust
//! use std::time::Duration;
//! use charitygate::Backoff;
//!
//! let backoff = Backoff::exponential(Duration::from_millis(100));
//! assert_eq!(backoff.delay(0), Duration::from_millis(100));
//! assert_eq!(backoff.delay(1), Duration::from_millis(200));
//! assert_eq!(backoff.delay(3), Duration::from_millis(800));
//! ```
//!
//! Computations that would overflow saturate to [`MAX_BACKOFF`] (1 day).

use std::fmt;
use std::time::Duration;

/// Upper bound applied to every computed delay.
pub const MAX_BACKOFF: Duration = Duration::from_secs(24 * 60 * 60);

/// Errors returned by backoff configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackoffError {
    MaxMustBePositive,
    MaxLessThanBase { base: Duration, max: Duration },
}

impl fmt::Display for BackoffError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackoffError::MaxMustBePositive => write!(f, "max must be greater than zero"),
            BackoffError::MaxLessThanBase { base, max } => {
                write!(f, "max ({:?}) must be >= base ({:?})", max, base)
            }
        }
    }
}

impl std::error::Error for BackoffError {}

/// Doubling backoff with an optional cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    max: Option<Duration>,
}

impl Backoff {
    pub fn exponential(base: Duration) -> Self {
        Self { base, max: None }
    }

    /// Cap every delay at `max`. Rejects a zero cap or one below `base`.
    pub fn with_max(mut self, max: Duration) -> Result<Self, BackoffError> {
        if max.is_zero() {
            return Err(BackoffError::MaxMustBePositive);
        }
        if max < self.base {
            return Err(BackoffError::MaxLessThanBase { base: self.base, max });
        }
        self.max = Some(max);
        Ok(self)
    }

    pub fn base(&self) -> Duration {
        self.base
    }

    /// Wait to apply after failed attempt `attempt` (zero-based): `base * 2^attempt`.
    pub fn delay(&self, attempt: usize) -> Duration {
        let exponent = attempt.min(u32::MAX as usize) as u32;
        let multiplier = 2u128.saturating_pow(exponent);
        let nanos = self.base.as_nanos().saturating_mul(multiplier).min(MAX_BACKOFF.as_nanos());
        let delay = Duration::from_nanos(nanos as u64);
        self.max.map_or(delay, |max| delay.min(max))
    }
}
