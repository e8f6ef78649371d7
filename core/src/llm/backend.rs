//! LLMBackend — the trait boundary to an LLM provider, plus an in-memory
//! mock implementation for deterministic tests.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("transport error: {0}")]
    Transient(String),
    #[error("permanent error (auth/quota): {0}")]
    Permanent(String),
}

pub struct BackendResponse {
    pub text: String,
    pub latency_ms: u64,
}

pub trait LLMBackend: Send + Sync {
    #[allow(clippy::too_many_arguments)]
    fn call(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        model_id: &str,
        temperature: f64,
        max_tokens: u32,
        deadline: Duration,
    ) -> Result<BackendResponse, BackendError>;
}

/// Deterministic mock backend driven by a scripted sequence of responses,
/// for harness and runner tests.
pub struct MockBackend {
    responses: parking_lot::Mutex<std::collections::VecDeque<Result<String, BackendError>>>,
}

impl MockBackend {
    pub fn new(responses: Vec<Result<String, BackendError>>) -> Self {
        Self {
            responses: parking_lot::Mutex::new(responses.into()),
        }
    }

}

impl LLMBackend for MockBackend {
    fn call(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
        _model_id: &str,
        _temperature: f64,
        _max_tokens: u32,
        _deadline: Duration,
    ) -> Result<BackendResponse, BackendError> {
        let mut queue = self.responses.lock();
        match queue.pop_front() {
            Some(Ok(text)) => Ok(BackendResponse {
                text,
                latency_ms: 1,
            }),
            Some(Err(e)) => Err(e),
            None => Err(BackendError::Transient("mock backend exhausted".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_backend_returns_scripted_responses_in_order() {
        let backend = MockBackend::new(vec![
            Ok("{\"decision\":\"take\"}".to_string()),
            Err(BackendError::Transient("timeout".to_string())),
        ]);
        let first = backend
            .call("sys", "user", "model", 0.0, 100, Duration::from_secs(1))
            .unwrap();
        assert!(first.text.contains("take"));
        let second = backend.call("sys", "user", "model", 0.0, 100, Duration::from_secs(1));
        assert!(second.is_err());
    }
}
