//! Shared test helpers for capability tests.

use dealwatch_core::error::ProviderError;
use dealwatch_core::message::Message;
use dealwatch_core::provider::{Provider, ProviderRequest, ProviderResponse};
use std::sync::Mutex;

/// A provider that replays scripted replies and records every request.
pub struct ScriptedProvider {
    replies: Mutex<Vec<Result<String, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            replies: Mutex::new(replies),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn text(reply: &str) -> Self {
        Self::new(vec![Ok(reply.to_string())])
    }

    pub fn failing(error: ProviderError) -> Self {
        Self::new(vec![Err(error)])
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let mut replies = self.replies.lock().unwrap();
        assert!(!replies.is_empty(), "ScriptedProvider: no more replies");
        let text = replies.remove(0)?;
        Ok(ProviderResponse {
            message: Message::assistant(text),
            usage: None,
            model: "scripted".into(),
        })
    }
}
