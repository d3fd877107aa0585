//! Periodic background sweep of a shared limiter.

use super::SlidingWindowLimiter;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Default interval between sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Run [`SlidingWindowLimiter::sweep`] every `interval` until the handle is aborted.
///
/// The first sweep happens one full interval after spawning. Must be called from within a tokio
/// runtime.
pub fn spawn_sweeper(limiter: Arc<SlidingWindowLimiter>, interval: Duration) -> JoinHandle<()> {
    let period = interval.max(Duration::from_millis(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            limiter.sweep();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ManualClock;

    #[tokio::test(start_paused = true)]
    async fn sweeper_drops_expired_keys() {
        let clock = ManualClock::new(0);
        let limiter = Arc::new(
            SlidingWindowLimiter::new(Duration::from_secs(1), 5).with_clock(clock.clone()),
        );
        assert!(limiter.admit("a"));
        assert!(limiter.admit("b"));

        let handle = spawn_sweeper(limiter.clone(), Duration::from_secs(60));

        clock.advance(Duration::from_secs(2));
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(limiter.tracked_keys(), 0);

        handle.abort();
    }
}
