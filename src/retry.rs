use std::thread;
use std::time::{Duration, Instant};

/// Floor for the pause between attempts, so a zero interval cannot spin.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Bounded polling: keep trying until `max_wait` has elapsed, sleeping `interval` between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_wait: Duration,
    pub interval: Duration,
}

impl RetryPolicy {
    pub const fn new(max_wait: Duration, interval: Duration) -> Self {
        Self { max_wait, interval }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(12), Duration::from_millis(300))
    }
}

/// Calls `attempt` until it yields `Some` or the policy's deadline passes.
///
/// `attempt` receives the try number and the time left before the deadline, and should not
/// block for longer than that. It always runs at least once, and never starts after the
/// deadline.
pub fn poll_until<T>(
    policy: &RetryPolicy,
    mut attempt: impl FnMut(u32, Duration) -> Option<T>,
) -> Option<T> {
    let started = Instant::now();
    let interval = policy.interval.max(MIN_POLL_INTERVAL);
    let mut tries = 0u32;
    loop {
        tries = tries.saturating_add(1);
        let budget = policy.max_wait.saturating_sub(started.elapsed());
        if let Some(value) = attempt(tries, budget) {
            return Some(value);
        }
        let elapsed = started.elapsed();
        if elapsed >= policy.max_wait {
            return None;
        }
        let remaining = policy.max_wait - elapsed;
        thread::sleep(interval.min(remaining));
        if started.elapsed() >= policy.max_wait {
            return None;
        }
    }
}
