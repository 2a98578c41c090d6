use super::{ChatClient, ChatResult, ProviderKind, ProviderRequest, ResponseMetadata, Usage};
use crate::error::{BuildError, InvokeError};
use serde::{Deserialize, Serialize};

/// Default address of a local Ollama server.
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";

#[derive(Debug, Clone)]
pub struct OllamaSettings {
    pub base_url: String,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            base_url: OLLAMA_BASE_URL.to_string(),
        }
    }
}

/// Client for a self-hosted Ollama runtime. No credential.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OllamaClient {
    pub fn new(req: &ProviderRequest, settings: &OllamaSettings) -> Result<Self, BuildError> {
        Ok(Self {
            http: super::http_client(req.timeout)?,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: req.model.clone(),
            temperature: req.temperature,
        })
    }

    fn request_body(&self, prompt: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            stream: false,
            options: Options {
                temperature: self.temperature,
            },
        }
    }
}

#[async_trait::async_trait]
impl ChatClient for OllamaClient {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Ollama
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn invoke(&self, prompt: &str) -> Result<ChatResult, InvokeError> {
        tracing::debug!(provider = "Ollama", model = %self.model, base_url = %self.base_url, "sending chat request");

        let resp = self
            .http
            .post(format!("{}/api/chat", self.base_url))
            .json(&self.request_body(prompt))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(InvokeError::from_response(resp).await);
        }

        let body = resp.bytes().await?;
        let parsed: ChatResponse = serde_json::from_slice(&body)?;
        let result = parsed.into_result()?;

        tracing::info!(provider = "Ollama", model = %self.model, "received chat response");
        Ok(result)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    stream: bool,
    options: Options,
}

#[derive(Debug, Serialize)]
struct Options {
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    message: Option<Message>,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

impl ChatResponse {
    fn into_result(self) -> Result<ChatResult, InvokeError> {
        let message = self.message.ok_or(InvokeError::EmptyResponse)?;
        let usage = match (self.prompt_eval_count, self.eval_count) {
            (None, None) => None,
            (i, o) => Some(Usage {
                input_tokens: i.unwrap_or(0),
                output_tokens: o.unwrap_or(0),
            }),
        };
        Ok(ChatResult {
            content: message.content,
            metadata: Some(ResponseMetadata {
                model: self.model,
                finish_reason: self.done_reason,
                usage,
            }),
        })
    }
}
