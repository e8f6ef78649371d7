//! Three-state circuit breaker guarding the LLM backend: Closed → Open
//! (on sustained failure) → Half-Open (after a cooldown, a single probe
//! call) → Closed or back to Open, depending on the probe's outcome.
//!
//! Extends the two-state Closed/Open pattern used elsewhere in this crate
//! for provider-facing circuit breaking with the Half-Open probe state.

use parking_lot::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

struct Inner {
    state: BreakerState,
    tripped_at: Option<Instant>,
    consecutive_failures: u32,
}

pub struct CircuitBreaker {
    failure_threshold: u32,
    timeout: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, timeout: Duration) -> Self {
        Self {
            failure_threshold,
            timeout,
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                tripped_at: None,
                consecutive_failures: 0,
            }),
        }
    }

    /// Current state, applying the Open→Half-Open timeout transition if due.
    pub fn state(&self) -> BreakerState {
        let mut inner = self.inner.lock();
        self.maybe_transition_to_half_open(&mut inner);
        inner.state
    }

    fn maybe_transition_to_half_open(&self, inner: &mut Inner) {
        if inner.state == BreakerState::Open {
            if let Some(tripped_at) = inner.tripped_at {
                if tripped_at.elapsed() >= self.timeout {
                    inner.state = BreakerState::HalfOpen;
                }
            }
        }
    }

    /// Whether a call is currently permitted. Closed and Half-Open both
    /// permit calls (Half-Open permits exactly the probe); Open does not.
    pub fn is_allowed(&self) -> bool {
        let mut inner = self.inner.lock();
        self.maybe_transition_to_half_open(&mut inner);
        inner.state != BreakerState::Open
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        inner.consecutive_failures = 0;
        inner.state = BreakerState::Closed;
        inner.tripped_at = None;
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        match inner.state {
            BreakerState::HalfOpen => {
                inner.state = BreakerState::Open;
                inner.tripped_at = Some(Instant::now());
            }
            BreakerState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.failure_threshold {
                    inner.state = BreakerState::Open;
                    inner.tripped_at = Some(Instant::now());
                }
            }
            BreakerState::Open => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_closed() {
        let cb = CircuitBreaker::new(3, Duration::from_secs(60));
        assert_eq!(cb.state(), BreakerState::Closed);
        assert!(cb.is_allowed());
    }

    #[test]
    fn trips_after_threshold_consecutive_failures() {
        let cb = CircuitBreaker::new(3, Duration::from_secs(60));
        cb.record_failure();
        cb.record_failure();
        assert!(cb.is_allowed());
        cb.record_failure();
        assert_eq!(cb.state(), BreakerState::Open);
        assert!(!cb.is_allowed());
    }

    #[test]
    fn transitions_to_half_open_after_timeout() {
        let cb = CircuitBreaker::new(1, Duration::from_millis(10));
        cb.record_failure();
        assert_eq!(cb.state(), BreakerState::Open);
        std::thread::sleep(Duration::from_millis(15));
        assert_eq!(cb.state(), BreakerState::HalfOpen);
        assert!(cb.is_allowed());
    }

    #[test]
    fn half_open_success_closes_and_resets_counter() {
        let cb = CircuitBreaker::new(1, Duration::from_millis(10));
        cb.record_failure();
        std::thread::sleep(Duration::from_millis(15));
        assert_eq!(cb.state(), BreakerState::HalfOpen);
        cb.record_success();
        assert_eq!(cb.state(), BreakerState::Closed);
    }

    #[test]
    fn half_open_failure_reopens() {
        let cb = CircuitBreaker::new(1, Duration::from_millis(10));
        cb.record_failure();
        std::thread::sleep(Duration::from_millis(15));
        assert_eq!(cb.state(), BreakerState::HalfOpen);
        cb.record_failure();
        assert_eq!(cb.state(), BreakerState::Open);
    }
}
