use criterion::{black_box, criterion_group, criterion_main, Criterion};
use charitygate::{Backoff, InstantSleeper, ManualClock, RetryPolicy, SlidingWindowLimiter};

use std::time::Duration;

// Capacity is never reached, so every call takes the allow path.
fn admit_single_key(c: &mut Criterion) {
    let limiter = SlidingWindowLimiter::new(Duration::from_secs(60), u32::MAX);
    c.bench_function("limiter_admit_single_key", |b| {
        b.iter(|| black_box(limiter.admit(black_box("lookup"))));
    });
}

fn admit_saturated(c: &mut Criterion) {
    let limiter = SlidingWindowLimiter::new(Duration::from_secs(3600), 1_000);
    for _ in 0..1_000 {
        limiter.admit("search");
    }
    c.bench_function("limiter_denied_full_window", |b| {
        b.iter(|| black_box(limiter.admit(black_box("search"))));
    });
}

fn sweep_many_keys(c: &mut Criterion) {
    let clock = ManualClock::new(0);
    let limiter = SlidingWindowLimiter::new(Duration::from_millis(10), 10).with_clock(clock.clone());
    let keys: Vec<String> = (0..10_000).map(|i| format!("key-{i}")).collect();

    c.bench_function("limiter_sweep_10k_idle_keys", |b| {
        b.iter(|| {
            for key in &keys {
                limiter.admit(key);
            }
            clock.advance_millis(20);
            limiter.sweep();
        });
    });
}

fn retry_always_failing(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let policy = RetryPolicy::<std::io::Error>::builder()
        .max_retries(3)
        .backoff(Backoff::exponential(Duration::from_millis(100)))
        .with_sleeper(InstantSleeper)
        .build();

    c.bench_function("retry_exhausts_three_retries", |b| {
        b.to_async(&rt).iter(|| async {
            let result: Result<(), _> =
                policy.execute(|| async { Err(std::io::Error::other("boom")) }).await;
            black_box(result.is_err())
        });
    });
}

criterion_group!(benches, admit_single_key, admit_saturated, sweep_many_keys, retry_always_failing);
criterion_main!(benches);
