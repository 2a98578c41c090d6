use super::{ChatClient, ChatResult, ClientFactory, ProviderKind, ProviderRequest};
use crate::error::{BuildError, InvokeError};
use std::sync::Mutex;

/// Canned reply for a stub client.
#[derive(Debug, Clone)]
pub enum StubReply {
    Content(String),
    ApiError(String),
}

#[derive(Debug, Clone)]
pub struct StubClient {
    provider: ProviderKind,
    model: String,
    reply: StubReply,
}

#[async_trait::async_trait]
impl ChatClient for StubClient {
    fn provider(&self) -> ProviderKind {
        self.provider
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn invoke(&self, _prompt: &str) -> Result<ChatResult, InvokeError> {
        match &self.reply {
            StubReply::Content(text) => Ok(ChatResult::text(text.clone())),
            StubReply::ApiError(message) => Err(InvokeError::Api {
                status: 500,
                message: message.clone(),
            }),
        }
    }
}

/// Factory handing out stub clients; records every request it sees.
#[derive(Debug)]
pub struct StubFactory {
    reply: StubReply,
    pub requests: Mutex<Vec<ProviderRequest>>,
}

impl StubFactory {
    pub fn replying(text: &str) -> Self {
        Self::new(StubReply::Content(text.to_string()))
    }

    pub fn failing(message: &str) -> Self {
        Self::new(StubReply::ApiError(message.to_string()))
    }

    fn new(reply: StubReply) -> Self {
        Self {
            reply,
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl ClientFactory for StubFactory {
    fn build(&self, req: &ProviderRequest) -> Result<Box<dyn ChatClient>, BuildError> {
        self.requests.lock().unwrap().push(req.clone());
        Ok(Box::new(StubClient {
            provider: req.provider,
            model: req.model.clone(),
            reply: self.reply.clone(),
        }))
    }
}

/// Factory whose construction always fails with a missing credential.
#[derive(Debug, Default)]
pub struct NoCredentialFactory;

impl ClientFactory for NoCredentialFactory {
    fn build(&self, req: &ProviderRequest) -> Result<Box<dyn ChatClient>, BuildError> {
        Err(BuildError::MissingCredential {
            provider: req.provider.as_str(),
            var: req.provider.credential_var().unwrap_or("UNSET"),
        })
    }
}
