//! Retry controller: decides whether a failed attempt is retried.

use std::time::Duration;

/// What happens to a task after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Requeue; the task becomes eligible again after `delay`.
    Retry { delay: Duration },
    /// No retries left; the task fails permanently.
    GiveUp,
}

/// Scheduler-wide retry policy.
///
/// The per-task `retry_delay` is the base delay. With the default multiplier
/// of 1.0 every retry waits exactly that long; a larger multiplier gives
/// exponential backoff: `retry_delay * multiplier^(attempts_used - 1)`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { multiplier: 1.0 }
    }
}

impl RetryPolicy {
    pub fn with_multiplier(multiplier: f64) -> Self {
        Self { multiplier }
    }

    /// Decide the fate of a task whose attempt number `attempts_used`
    /// (1-indexed, counted at dispatch) just failed.
    ///
    /// Retries remain while `attempts_used <= max_retries`, so a task is
    /// attempted at most `max_retries + 1` times.
    pub fn decide(&self, attempts_used: u32, max_retries: u32, retry_delay: Duration) -> RetryDecision {
        if attempts_used <= max_retries {
            RetryDecision::Retry {
                delay: self.next_delay(retry_delay, attempts_used),
            }
        } else {
            RetryDecision::GiveUp
        }
    }

    /// Delay before the retry that follows failed attempt `attempts_used`.
    pub fn next_delay(&self, base: Duration, attempts_used: u32) -> Duration {
        if base.is_zero() {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(attempts_used.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = base.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 1, RetryDecision::GiveUp)]
    #[case(1, 1, RetryDecision::Retry { delay: Duration::from_millis(100) })]
    #[case(1, 2, RetryDecision::GiveUp)]
    #[case(3, 3, RetryDecision::Retry { delay: Duration::from_millis(100) })]
    #[case(3, 4, RetryDecision::GiveUp)]
    fn retries_until_max_plus_one_attempts(
        #[case] max_retries: u32,
        #[case] attempts_used: u32,
        #[case] expected: RetryDecision,
    ) {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.decide(attempts_used, max_retries, Duration::from_millis(100)),
            expected
        );
    }

    #[test]
    fn always_failing_task_gets_k_plus_one_attempts() {
        let policy = RetryPolicy::default();
        for k in 0..5u32 {
            let mut attempts = 0;
            loop {
                attempts += 1;
                if policy.decide(attempts, k, Duration::ZERO) == RetryDecision::GiveUp {
                    break;
                }
            }
            assert_eq!(attempts, k + 1);
        }
    }

    #[test]
    fn exponential_backoff_increases() {
        let policy = RetryPolicy::with_multiplier(2.0);
        let base = Duration::from_secs(2);

        assert_eq!(policy.next_delay(base, 1), Duration::from_secs(2));
        assert_eq!(policy.next_delay(base, 2), Duration::from_secs(4));
        assert_eq!(policy.next_delay(base, 3), Duration::from_secs(8));
    }

    #[test]
    fn zero_delay_stays_zero() {
        let policy = RetryPolicy::with_multiplier(3.0);
        assert_eq!(policy.next_delay(Duration::ZERO, 4), Duration::ZERO);
    }

    #[test]
    fn huge_backoff_saturates() {
        let policy = RetryPolicy::with_multiplier(10.0);
        assert_eq!(
            policy.next_delay(Duration::from_secs(1), 10_000),
            Duration::MAX
        );
    }
}
