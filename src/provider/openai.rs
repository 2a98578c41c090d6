use super::{ChatClient, ChatResult, ProviderKind, ProviderRequest, ResponseMetadata, Usage};
use crate::error::{BuildError, InvokeError};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub base_url: String,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            base_url: OPENAI_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OpenAiClient {
    pub fn new(req: &ProviderRequest, api_key: String, settings: &OpenAiSettings) -> Result<Self, BuildError> {
        Ok(Self {
            http: super::http_client(req.timeout)?,
            api_key,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: req.model.clone(),
            temperature: req.temperature,
        })
    }

    fn headers(&self) -> Result<HeaderMap, InvokeError> {
        let mut h = HeaderMap::new();
        h.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let v = HeaderValue::from_str(&format!("Bearer {}", self.api_key)).map_err(|_| InvokeError::Api {
            status: 0,
            message: "OPENAI_API_KEY contains characters not allowed in a header".to_string(),
        })?;
        h.insert(AUTHORIZATION, v);
        Ok(h)
    }

    fn request_body(&self, prompt: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: self.temperature,
        }
    }
}

#[async_trait::async_trait]
impl ChatClient for OpenAiClient {
    fn provider(&self) -> ProviderKind {
        ProviderKind::OpenAI
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn invoke(&self, prompt: &str) -> Result<ChatResult, InvokeError> {
        tracing::debug!(provider = "OpenAI", model = %self.model, "sending chat completion request");

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .headers(self.headers()?)
            .json(&self.request_body(prompt))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(InvokeError::from_response(resp).await);
        }

        let body = resp.bytes().await?;
        let parsed: ChatCompletionResponse = serde_json::from_slice(&body)?;
        let result = parsed.into_result()?;

        tracing::info!(provider = "OpenAI", model = %self.model, "received chat completion");
        Ok(result)
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<CompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

impl ChatCompletionResponse {
    fn into_result(self) -> Result<ChatResult, InvokeError> {
        let choice = self.choices.into_iter().next().ok_or(InvokeError::EmptyResponse)?;
        let content = choice.message.content.ok_or(InvokeError::EmptyResponse)?;
        Ok(ChatResult {
            content,
            metadata: Some(ResponseMetadata {
                model: self.model,
                finish_reason: choice.finish_reason,
                usage: self.usage.map(|u| Usage {
                    input_tokens: u.prompt_tokens,
                    output_tokens: u.completion_tokens,
                }),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OpenAiClient {
        let req = ProviderRequest::new(ProviderKind::OpenAI, "gpt-4", 0.0, 60);
        OpenAiClient::new(&req, "sk-test".to_string(), &OpenAiSettings::default()).unwrap()
    }

    #[test]
    fn request_carries_model_temperature_and_prompt() {
        let json = serde_json::to_value(client().request_body("Hello")).unwrap();
        assert_eq!(json["model"], "gpt-4");
        assert_eq!(json["temperature"], 0.0);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "Hello");
    }

    #[test]
    fn bearer_header_uses_api_key() {
        let h = client().headers().unwrap();
        assert_eq!(h[AUTHORIZATION], "Bearer sk-test");
    }

    #[test]
    fn parses_first_choice() {
        let json = r#"{
            "id": "chatcmpl-1",
            "model": "gpt-4-0613",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "Hello"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 9, "completion_tokens": 1, "total_tokens": 10}
        }"#;
        let resp: ChatCompletionResponse = serde_json::from_str(json).unwrap();
        let result = resp.into_result().unwrap();
        assert_eq!(result.content, "Hello");
        let meta = result.metadata.unwrap();
        assert_eq!(meta.model.as_deref(), Some("gpt-4-0613"));
        assert_eq!(meta.finish_reason.as_deref(), Some("stop"));
        assert_eq!(meta.usage, Some(Usage { input_tokens: 9, output_tokens: 1 }));
    }

    #[tokio::test]
    async fn rejected_key_surfaces_provider_message_and_status() {
        let base_url = crate::provider::test_server::respond_once(
            "401 Unauthorized",
            r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}"#,
        )
        .await;
        let req = ProviderRequest::new(ProviderKind::OpenAI, "gpt-4", 0.0, 60);
        let client = OpenAiClient::new(&req, "sk-bad".to_string(), &OpenAiSettings { base_url }).unwrap();

        match client.invoke("Hello").await {
            Err(InvokeError::Api { status, message }) => {
                assert_eq!(status, 401);
                assert_eq!(message, "Incorrect API key provided");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn no_choices_is_empty_response() {
        let resp: ChatCompletionResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(resp.into_result(), Err(InvokeError::EmptyResponse)));
    }
}
