//! Retry backoff schedule: exponential with jitter, capped.
//!
//! Delay for zero-indexed attempt `k` is `initial_delay * 2^k`, capped at
//! 30s, then scaled by jitter drawn from `[0.75, 1.25]`.

use rand::Rng;
use std::time::Duration;

pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Whether an error kind should be retried at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    Permanent,
}

pub fn backoff_delay(initial_delay: Duration, attempt: u32, rng: &mut impl Rng) -> Duration {
    let exp = initial_delay.as_secs_f64() * 2f64.powi(attempt as i32);
    let capped = exp.min(MAX_BACKOFF.as_secs_f64());
    let jitter = rng.gen_range(0.75..=1.25);
    Duration::from_secs_f64(capped * jitter)
}

/// Overall deadline for a single harness call across all retries: the sum
/// of every possible backoff sleep (bounded by the jitter ceiling) plus one
/// per-attempt timeout budget.
pub fn overall_deadline(
    initial_delay: Duration,
    max_retries: u32,
    per_attempt_timeout: Duration,
) -> Duration {
    let backoff_sum = initial_delay.as_secs_f64() * (2f64.powi(max_retries as i32) - 1.0) * 1.25;
    Duration::from_secs_f64(backoff_sum) + per_attempt_timeout
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    #[test]
    fn backoff_grows_exponentially_before_cap() {
        let mut rng = StepRng::new(u64::MAX / 2, 0); // fixed jitter midpoint ~1.0
        let d0 = backoff_delay(Duration::from_millis(100), 0, &mut rng);
        let d1 = backoff_delay(Duration::from_millis(100), 1, &mut rng);
        assert!(d1 > d0);
    }

    #[test]
    fn backoff_is_capped_at_30s() {
        let mut rng = StepRng::new(u64::MAX / 2, 0);
        let d = backoff_delay(Duration::from_secs(10), 10, &mut rng);
        assert!(d <= Duration::from_secs_f64(30.0 * 1.25));
    }

    #[test]
    fn overall_deadline_increases_with_more_retries() {
        let short = overall_deadline(Duration::from_millis(100), 2, Duration::from_secs(1));
        let long = overall_deadline(Duration::from_millis(100), 5, Duration::from_secs(1));
        assert!(long > short);
    }
}
