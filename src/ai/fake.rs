//! A scripted completion backend for tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::ai::{AiError, CompletionBackend, CompletionRequest};

/// Replies to every request with the same text, or fails every request.
#[derive(Debug, Clone)]
pub(crate) struct FakeBackend {
    reply: Option<String>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl FakeBackend {
    pub(crate) fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_owned()),
            requests: Arc::default(),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            reply: None,
            requests: Arc::default(),
        }
    }

    /// The requests received so far.
    pub(crate) fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionBackend for FakeBackend {
    async fn complete(&self, request: CompletionRequest) -> Result<String, AiError> {
        self.requests.lock().unwrap().push(request);

        self.reply.clone().ok_or(AiError::EmptyResponse)
    }
}
