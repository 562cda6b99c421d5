//! Bounded, linearly backed-off retries.

use std::time::Duration;

/// How persistently the fetcher retries a failed page request.
///
/// A request is attempted once, then retried up to `max_retries` times.
/// Before retry `n` (1-based) the fetcher waits `n × base_delay`, so the
/// default schedule is 1s, 2s, 3s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Total number of requests a single fetch may issue.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_before(&self, retry: u32) -> Duration {
        self.base_delay * retry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule_is_one_two_three_seconds() {
        let policy = RetryPolicy::default();
        let delays: Vec<_> = (1..=policy.max_retries).map(|r| policy.delay_before(r)).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(3)
            ]
        );
        assert_eq!(policy.max_attempts(), 4);
    }

    #[test]
    fn zero_retries_means_single_attempt() {
        let policy = RetryPolicy::new(0, Duration::from_millis(250));
        assert_eq!(policy.max_attempts(), 1);
    }

    #[test]
    fn huge_retry_count_does_not_overflow() {
        let policy = RetryPolicy::new(u32::MAX, Duration::from_millis(1));
        assert_eq!(policy.max_attempts(), u32::MAX);
    }

    #[test]
    fn delay_scales_with_base() {
        let policy = RetryPolicy::new(5, Duration::from_millis(200));
        assert_eq!(policy.delay_before(4), Duration::from_millis(800));
    }
}
