//! LLMHarness — rate-limited, retried, circuit-broken access to an
//! `LLMBackend`, synchronous from the caller's perspective.

use super::backend::{BackendError, LLMBackend};
use super::circuit_breaker::{BreakerState, CircuitBreaker};
use super::parser::{parse_decision, Decision, ParsedDecision};
use super::rate_limiter::RateLimiter;
use super::retry::{backoff_delay, overall_deadline};
use rand::thread_rng;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMHarnessConfig {
    pub model_id: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub max_calls_per_minute: f64,
    pub burst_capacity: Option<f64>,
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub per_attempt_timeout_ms: u64,
    pub failure_threshold: u32,
    pub circuit_timeout_secs: u64,
    pub fallback_decision: Decision,
}

impl Default for LLMHarnessConfig {
    fn default() -> Self {
        Self {
            model_id: "mock-model".to_string(),
            temperature: 0.2,
            max_tokens: 512,
            max_calls_per_minute: 60.0,
            burst_capacity: None,
            max_retries: 3,
            initial_delay_ms: 500,
            per_attempt_timeout_ms: 5_000,
            failure_threshold: 5,
            circuit_timeout_secs: 300,
            fallback_decision: Decision::Skip,
        }
    }
}

pub struct LLMResult {
    pub success: bool,
    pub raw_response: Option<String>,
    pub parsed_decision: ParsedDecision,
    pub latency_ms: u64,
    pub retries: u32,
    pub fallback_used: bool,
    pub circuit_state: BreakerState,
}

pub struct LLMHarness {
    config: LLMHarnessConfig,
    backend: Box<dyn LLMBackend>,
    rate_limiter: RateLimiter,
    circuit_breaker: CircuitBreaker,
}

impl LLMHarness {
    pub fn new(config: LLMHarnessConfig, backend: Box<dyn LLMBackend>) -> Self {
        let rate_limiter = RateLimiter::new(config.max_calls_per_minute, config.burst_capacity);
        let circuit_breaker = CircuitBreaker::new(
            config.failure_threshold,
            Duration::from_secs(config.circuit_timeout_secs),
        );
        Self {
            config,
            backend,
            rate_limiter,
            circuit_breaker,
        }
    }

    fn fallback_result(&self, latency_ms: u64, circuit_state: BreakerState) -> LLMResult {
        LLMResult {
            success: false,
            raw_response: None,
            parsed_decision: ParsedDecision {
                decision: self.config.fallback_decision,
                setup_quality: super::parser::SetupQuality::CMinus,
                confidence: 0.0,
                risk_flags: vec!["fallback".to_string()],
                notes: "fallback decision: circuit open or retries exhausted".to_string(),
            },
            latency_ms,
            retries: 0,
            fallback_used: true,
            circuit_state,
        }
    }

    pub fn query(&self, system_prompt: &str, user_prompt: &str) -> LLMResult {
        let started = Instant::now();

        if !self.circuit_breaker.is_allowed() {
            return self.fallback_result(0, self.circuit_breaker.state());
        }

        let per_attempt_timeout = Duration::from_millis(self.config.per_attempt_timeout_ms);
        let initial_delay = Duration::from_millis(self.config.initial_delay_ms);
        let overall = overall_deadline(initial_delay, self.config.max_retries, per_attempt_timeout);
        let mut rng = thread_rng();
        let mut last_raw: Option<String> = None;
        let mut last_latency_ms: u64 = 0;

        for attempt in 0..=self.config.max_retries {
            if started.elapsed() >= overall {
                break;
            }
            if !self.rate_limiter.acquire_blocking(per_attempt_timeout) {
                continue;
            }
            match self.backend.call(
                system_prompt,
                user_prompt,
                &self.config.model_id,
                self.config.temperature,
                self.config.max_tokens,
                per_attempt_timeout,
            ) {
                Ok(response) => {
                    last_raw = Some(response.text.clone());
                    last_latency_ms = response.latency_ms;
                    match parse_decision(&response.text) {
                        Ok(parsed) => {
                            self.circuit_breaker.record_success();
                            return LLMResult {
                                success: true,
                                raw_response: last_raw,
                                parsed_decision: parsed,
                                latency_ms: last_latency_ms,
                                retries: attempt,
                                fallback_used: false,
                                circuit_state: self.circuit_breaker.state(),
                            };
                        }
                        Err(_) => {
                            // Malformed response is a transient condition: retry.
                            if attempt < self.config.max_retries {
                                std::thread::sleep(backoff_delay(initial_delay, attempt, &mut rng));
                            }
                        }
                    }
                }
                Err(BackendError::Permanent(_)) => {
                    self.circuit_breaker.record_failure();
                    break;
                }
                Err(BackendError::Transient(_)) => {
                    if attempt < self.config.max_retries {
                        std::thread::sleep(backoff_delay(initial_delay, attempt, &mut rng));
                    }
                }
            }
        }

        self.circuit_breaker.record_failure();
        let mut result = self.fallback_result(last_latency_ms, self.circuit_breaker.state());
        result.raw_response = last_raw;
        result.retries = self.config.max_retries;
        result
    }
}
