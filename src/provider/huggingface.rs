#![cfg(feature = "huggingface")]

use super::{ChatClient, ChatResult, ProviderKind, ProviderRequest, ResponseMetadata, Usage};
use crate::error::{BuildError, InvokeError};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

/// Inference Providers router; it picks a serving provider for the model.
pub const HUGGINGFACE_BASE_URL: &str = "https://router.huggingface.co";

/// Fixed generation defaults for HuggingFace inference.
#[derive(Debug, Clone)]
pub struct HuggingFaceSettings {
    pub base_url: String,
    /// Pipeline task the model is asked for; reported in request logs.
    pub task: String,
    pub max_new_tokens: u32,
    pub do_sample: bool,
    pub repetition_penalty: f32,
}

impl Default for HuggingFaceSettings {
    fn default() -> Self {
        Self {
            base_url: HUGGINGFACE_BASE_URL.to_string(),
            task: "text-generation".to_string(),
            max_new_tokens: 512,
            do_sample: false,
            repetition_penalty: 1.03,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HuggingFaceClient {
    http: reqwest::Client,
    token: String,
    settings: HuggingFaceSettings,
    model: String,
    temperature: f32,
}

impl HuggingFaceClient {
    pub fn new(req: &ProviderRequest, token: String, settings: &HuggingFaceSettings) -> Result<Self, BuildError> {
        let mut settings = settings.clone();
        settings.base_url = settings.base_url.trim_end_matches('/').to_string();
        Ok(Self {
            http: super::http_client(req.timeout)?,
            token,
            settings,
            model: req.model.clone(),
            temperature: req.temperature,
        })
    }

    fn url(&self) -> String {
        format!("{}/v1/chat/completions", self.settings.base_url)
    }

    fn headers(&self) -> Result<HeaderMap, InvokeError> {
        let mut h = HeaderMap::new();
        h.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let v = HeaderValue::from_str(&format!("Bearer {}", self.token)).map_err(|_| InvokeError::Api {
            status: 0,
            message: "HUGGINGFACEHUB_API_TOKEN contains characters not allowed in a header".to_string(),
        })?;
        h.insert(AUTHORIZATION, v);
        Ok(h)
    }

    fn request_body(&self, prompt: &str) -> GenerationRequest {
        // Greedy decoding unless sampling is on or a temperature was asked for.
        let sampling = self.settings.do_sample || self.temperature > 0.0;
        GenerationRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: self.settings.max_new_tokens,
            repetition_penalty: self.settings.repetition_penalty,
            temperature: sampling.then_some(self.temperature),
        }
    }
}

#[async_trait::async_trait]
impl ChatClient for HuggingFaceClient {
    fn provider(&self) -> ProviderKind {
        ProviderKind::HuggingFace
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn invoke(&self, prompt: &str) -> Result<ChatResult, InvokeError> {
        tracing::debug!(provider = "HuggingFace", model = %self.model, task = %self.settings.task, "sending generation request");

        let resp = self
            .http
            .post(self.url())
            .headers(self.headers()?)
            .json(&self.request_body(prompt))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(InvokeError::from_response(resp).await);
        }

        let body = resp.bytes().await?;
        let parsed: GenerationResponse = serde_json::from_slice(&body)?;
        let result = parsed.into_result(&self.model)?;

        tracing::info!(provider = "HuggingFace", model = %self.model, "received generation");
        Ok(result)
    }
}

#[derive(Debug, Serialize)]
struct GenerationRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    repetition_penalty: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<GenerationUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerationUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

impl GenerationResponse {
    fn into_result(self, requested_model: &str) -> Result<ChatResult, InvokeError> {
        let choice = self.choices.into_iter().next().ok_or(InvokeError::EmptyResponse)?;
        let content = choice.message.content.ok_or(InvokeError::EmptyResponse)?;
        Ok(ChatResult {
            content,
            metadata: Some(ResponseMetadata {
                model: self.model.or_else(|| Some(requested_model.to_string())),
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

    fn client(temperature: f32) -> HuggingFaceClient {
        let req = ProviderRequest::new(ProviderKind::HuggingFace, "deepseek-ai/DeepSeek-R1-0528", temperature, 60);
        HuggingFaceClient::new(&req, "hf_test".to_string(), &HuggingFaceSettings::default()).unwrap()
    }

    #[test]
    fn defaults_to_the_inference_router() {
        assert_eq!(client(0.0).url(), "https://router.huggingface.co/v1/chat/completions");
    }

    #[test]
    fn base_url_override_drops_trailing_slash() {
        let req = ProviderRequest::new(ProviderKind::HuggingFace, "deepseek-ai/DeepSeek-R1-0528", 0.0, 60);
        let settings = HuggingFaceSettings {
            base_url: "http://localhost:8080/".to_string(),
            ..HuggingFaceSettings::default()
        };
        let client = HuggingFaceClient::new(&req, "hf_test".to_string(), &settings).unwrap();
        assert_eq!(client.url(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn request_carries_repo_and_fixed_generation_defaults() {
        let json = serde_json::to_value(client(0.0).request_body("Hi")).unwrap();
        assert_eq!(json["model"], "deepseek-ai/DeepSeek-R1-0528");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "Hi");
        assert_eq!(json["max_tokens"], 512);
        assert!((json["repetition_penalty"].as_f64().unwrap() - 1.03).abs() < 1e-6);
        assert!(json.get("temperature").is_none());
    }

    #[test]
    fn positive_temperature_is_sent() {
        let json = serde_json::to_value(client(0.5).request_body("Hi")).unwrap();
        assert!((json["temperature"].as_f64().unwrap() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn parses_first_choice() {
        let json = r#"{
            "model": "deepseek-ai/DeepSeek-R1-0528",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "Hello"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 4, "completion_tokens": 2, "total_tokens": 6}
        }"#;
        let parsed: GenerationResponse = serde_json::from_str(json).unwrap();
        let result = parsed.into_result("deepseek-ai/DeepSeek-R1-0528").unwrap();
        assert_eq!(result.content, "Hello");
        let meta = result.metadata.unwrap();
        assert_eq!(meta.finish_reason.as_deref(), Some("stop"));
        assert_eq!(meta.usage, Some(Usage { input_tokens: 4, output_tokens: 2 }));
    }
}
