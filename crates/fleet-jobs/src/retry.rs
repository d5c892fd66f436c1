//! Retry schedules and backoff jitter.

use std::time::{Duration, SystemTime};

/// Builders for retry schedules.
///
/// A schedule is the ordered list of delays waited before each retry; its
/// length is the maximum number of retries after the first attempt.
pub struct RetrySchedule;

impl RetrySchedule {
    /// No retries.
    pub fn none() -> Vec<Duration> {
        Vec::new()
    }

    /// Schedule from millisecond delays.
    pub fn from_millis(delays: &[u64]) -> Vec<Duration> {
        delays.iter().copied().map(Duration::from_millis).collect()
    }

    /// `count` retries, each after the same `delay`.
    pub fn fixed(delay: Duration, count: usize) -> Vec<Duration> {
        vec![delay; count]
    }

    /// `count` retries with delays `initial`, `initial * multiplier`, ...
    /// capped at `max_delay`.
    pub fn exponential(
        initial: Duration,
        multiplier: f64,
        max_delay: Duration,
        count: usize,
    ) -> Vec<Duration> {
        let mut delays = Vec::with_capacity(count);
        let mut current = initial;
        for _ in 0..count {
            delays.push(current.min(max_delay));
            current = scale(current, multiplier.max(1.0)).min(max_delay);
        }
        delays
    }

    /// `count` retries with delays `step`, `2 * step`, `3 * step`, ...
    pub fn linear(step: Duration, count: usize) -> Vec<Duration> {
        (1..=count)
            .map(|n| step.saturating_mul(u32::try_from(n).unwrap_or(u32::MAX)))
            .collect()
    }
}

/// Applies approximate jitter of `±pct/2` to `delay`.
///
/// The sign comes from the parity of the current clock nanoseconds. This is a
/// cheap way to spread out synchronized retries and is neither uniform nor
/// suitable as a randomness source. `pct` is clamped into `[0, 1]`; values
/// `<= 0` return `delay` unchanged.
pub fn apply_jitter(delay: Duration, pct: f64) -> Duration {
    if pct.is_nan() || pct <= 0.0 {
        return delay;
    }
    let spread = scale(delay, pct.min(1.0)) / 2;

    if clock_parity_is_odd() {
        delay.saturating_sub(spread)
    } else {
        delay.saturating_add(spread)
    }
}

fn scale(delay: Duration, factor: f64) -> Duration {
    Duration::from_nanos((delay.as_nanos() as f64 * factor) as u64)
}

fn clock_parity_is_odd() -> bool {
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    nanos & 1 == 1
}
