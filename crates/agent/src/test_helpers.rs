//! Shared test helpers for orchestrator tests.

use aymara_core::error::ProviderError;
use aymara_core::message::Message;
use aymara_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use std::sync::Mutex;

/// A mock provider that answers every call with the same text and records
/// each request it receives.
pub struct ScriptedProvider {
    text: String,
    total_tokens: Option<u32>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(text: &str, total_tokens: Option<u32>) -> Self {
        Self {
            text: text.to_string(),
            total_tokens,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> ProviderRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("provider was never called")
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        Ok(make_text_response(&self.text, self.total_tokens))
    }
}

/// A mock provider that always fails with the given error.
pub struct FailingProvider {
    error: ProviderError,
    calls: Mutex<usize>,
}

impl FailingProvider {
    pub fn new(error: ProviderError) -> Self {
        Self {
            error,
            calls: Mutex::new(0),
        }
    }

    pub fn rate_limited() -> Self {
        Self::new(ProviderError::RateLimited {
            retry_after_secs: 5,
        })
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl Provider for FailingProvider {
    fn name(&self) -> &str {
        "failing_mock"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        *self.calls.lock().unwrap() += 1;
        Err(self.error.clone())
    }
}

/// Create a text response with optional total token usage.
pub fn make_text_response(text: &str, total_tokens: Option<u32>) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: total_tokens.map(|total| Usage {
            prompt_tokens: total / 2,
            completion_tokens: total - total / 2,
            total_tokens: total,
        }),
        model: "mock-model".into(),
    }
}
