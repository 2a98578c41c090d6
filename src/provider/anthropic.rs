use super::{ChatClient, ChatResult, ProviderKind, ProviderRequest, ResponseMetadata, Usage};
use crate::error::{BuildError, InvokeError};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";

/// Fixed defaults for the Messages API. `max_tokens` is mandatory there.
#[derive(Debug, Clone)]
pub struct AnthropicSettings {
    pub base_url: String,
    pub api_version: String,
    pub max_tokens: u32,
}

impl Default for AnthropicSettings {
    fn default() -> Self {
        Self {
            base_url: ANTHROPIC_BASE_URL.to_string(),
            api_version: "2023-06-01".to_string(),
            max_tokens: 1024,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    api_version: String,
    max_tokens: u32,
    model: String,
    temperature: f32,
}

impl AnthropicClient {
    pub fn new(req: &ProviderRequest, api_key: String, settings: &AnthropicSettings) -> Result<Self, BuildError> {
        Ok(Self {
            http: super::http_client(req.timeout)?,
            api_key,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_version: settings.api_version.clone(),
            max_tokens: settings.max_tokens,
            model: req.model.clone(),
            temperature: req.temperature,
        })
    }

    fn headers(&self) -> Result<HeaderMap, InvokeError> {
        let invalid = |what: &str| InvokeError::Api {
            status: 0,
            message: format!("{what} contains characters not allowed in a header"),
        };
        let mut h = HeaderMap::new();
        h.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        h.insert(
            "x-api-key",
            HeaderValue::from_str(&self.api_key).map_err(|_| invalid("ANTHROPIC_API_KEY"))?,
        );
        h.insert(
            "anthropic-version",
            HeaderValue::from_str(&self.api_version).map_err(|_| invalid("anthropic api version"))?,
        );
        Ok(h)
    }

    fn request_body(&self, prompt: &str) -> MessagesRequest {
        MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        }
    }
}

#[async_trait::async_trait]
impl ChatClient for AnthropicClient {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn invoke(&self, prompt: &str) -> Result<ChatResult, InvokeError> {
        tracing::debug!(provider = "Anthropic", model = %self.model, "sending messages request");

        let resp = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .headers(self.headers()?)
            .json(&self.request_body(prompt))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(InvokeError::from_response(resp).await);
        }

        let body = resp.bytes().await?;
        let parsed: MessagesResponse = serde_json::from_slice(&body)?;
        let result = parsed.into_result()?;

        tracing::info!(provider = "Anthropic", model = %self.model, "received message");
        Ok(result)
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<MessagesUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct MessagesUsage {
    input_tokens: u32,
    output_tokens: u32,
}

impl MessagesResponse {
    fn into_result(self) -> Result<ChatResult, InvokeError> {
        // Concatenate text blocks; thinking and tool blocks are not shown.
        let mut content = String::new();
        for block in self.content {
            if let ContentBlock::Text { text } = block {
                content.push_str(&text);
            }
        }
        if content.is_empty() {
            return Err(InvokeError::EmptyResponse);
        }
        Ok(ChatResult {
            content,
            metadata: Some(ResponseMetadata {
                model: self.model,
                finish_reason: self.stop_reason,
                usage: self.usage.map(|u| Usage {
                    input_tokens: u.input_tokens,
                    output_tokens: u.output_tokens,
                }),
            }),
        })
    }
}
