//! Language-model collaborator contract.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by an inference backend.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("inference request failed: {0}")]
    Request(String),

    #[error("inference response invalid: {0}")]
    Response(String),
}

impl LlmError {
    pub fn request(message: impl Into<String>) -> Self {
        Self::Request(message.into())
    }

    pub fn response(message: impl Into<String>) -> Self {
        Self::Response(message.into())
    }
}

/// Abstraction over inference backends so multiple vendors can plug into
/// the control loop. Prompt in, raw text out; the caller tolerates both
/// failures and non-JSON text.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn infer(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Deterministic provider used for tests and offline development.
///
/// Replays a queue of canned responses; once the queue is empty every call
/// fails, which exercises the callers' fallback paths.
#[derive(Debug, Default)]
pub struct MockLlmProvider {
    responses: Mutex<VecDeque<String>>,
}

impl MockLlmProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
        }
    }

    /// Provider whose every call fails.
    pub fn failing() -> Self {
        Self::default()
    }

    pub fn push_response(&self, response: impl Into<String>) {
        self.responses
            .lock()
            .expect("mock llm queue poisoned")
            .push_back(response.into());
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    async fn infer(&self, _prompt: &str) -> Result<String, LlmError> {
        self.responses
            .lock()
            .expect("mock llm queue poisoned")
            .pop_front()
            .ok_or_else(|| LlmError::request("mock llm has no queued response"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_replays_in_order() {
        let llm = MockLlmProvider::with_responses(["first", "second"]);
        assert_eq!(llm.infer("a").await.unwrap(), "first");
        assert_eq!(llm.infer("b").await.unwrap(), "second");
        assert!(llm.infer("c").await.is_err());
    }

    #[tokio::test]
    async fn failing_mock_always_errors() {
        let llm = MockLlmProvider::failing();
        assert!(llm.infer("anything").await.is_err());
    }
}
