//! Token-bucket rate limiter for outbound LLM calls.

use parking_lot::Mutex;
use std::time::{Duration, Instant};

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

pub struct RateLimiter {
    rate_per_sec: f64,
    burst_capacity: f64,
    state: Mutex<BucketState>,
}

impl RateLimiter {
    /// `max_calls_per_minute` sets the sustained rate; `burst_capacity`
    /// defaults to twice the sustained per-second rate when `None`.
    pub fn new(max_calls_per_minute: f64, burst_capacity: Option<f64>) -> Self {
        let rate_per_sec = max_calls_per_minute / 60.0;
        let burst_capacity = burst_capacity.unwrap_or(rate_per_sec * 2.0);
        Self {
            rate_per_sec,
            burst_capacity,
            state: Mutex::new(BucketState {
                tokens: burst_capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.rate_per_sec).min(self.burst_capacity);
        state.last_refill = now;
    }

    /// Try to take one token without blocking.
    pub fn try_acquire(&self) -> bool {
        let mut state = self.state.lock();
        self.refill(&mut state);
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Block the calling thread until a token is available or `deadline`
    /// elapses. Returns whether a token was acquired.
    pub fn acquire_blocking(&self, deadline: Duration) -> bool {
        let start = Instant::now();
        loop {
            if self.try_acquire() {
                return true;
            }
            if start.elapsed() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_capacity_allows_initial_burst() {
        let limiter = RateLimiter::new(60.0, Some(3.0));
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[test]
    fn default_burst_is_double_sustained_rate() {
        let limiter = RateLimiter::new(120.0, None);
        assert_eq!(limiter.burst_capacity, 4.0);
    }

    #[test]
    fn acquire_blocking_times_out_when_exhausted() {
        let limiter = RateLimiter::new(1.0, Some(1.0));
        assert!(limiter.try_acquire());
        let acquired = limiter.acquire_blocking(Duration::from_millis(20));
        assert!(!acquired);
    }
}
