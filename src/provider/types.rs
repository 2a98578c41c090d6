use crate::error::{BuildError, InvokeError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_TEMPERATURE: f32 = 0.0;
pub const MIN_TEMPERATURE: f32 = 0.0;
pub const MAX_TEMPERATURE: f32 = 2.0;

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const MIN_TIMEOUT_SECS: u64 = 10;
pub const MAX_TIMEOUT_SECS: u64 = 300;

/// The providers this build can construct clients for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    OpenAI,
    Anthropic,
    Ollama,
    #[cfg(feature = "huggingface")]
    HuggingFace,
}

impl ProviderKind {
    /// Enabled providers, in selector order.
    pub const ALL: &'static [ProviderKind] = &[
        ProviderKind::OpenAI,
        ProviderKind::Anthropic,
        ProviderKind::Ollama,
        #[cfg(feature = "huggingface")]
        ProviderKind::HuggingFace,
    ];

    /// Canonical identifier. Parsing accepts exactly these strings.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "OpenAI",
            ProviderKind::Anthropic => "Anthropic",
            ProviderKind::Ollama => "Ollama",
            #[cfg(feature = "huggingface")]
            ProviderKind::HuggingFace => "HuggingFace",
        }
    }

    /// Environment variable holding the provider's credential, if it needs one.
    pub fn credential_var(&self) -> Option<&'static str> {
        match self {
            ProviderKind::OpenAI => Some("OPENAI_API_KEY"),
            ProviderKind::Anthropic => Some("ANTHROPIC_API_KEY"),
            ProviderKind::Ollama => None,
            #[cfg(feature = "huggingface")]
            ProviderKind::HuggingFace => Some("HUGGINGFACEHUB_API_TOKEN"),
        }
    }

    /// Models offered by the UI model selector; the first is the default.
    pub fn models(&self) -> &'static [&'static str] {
        match self {
            ProviderKind::OpenAI => &["gpt-4o-mini", "gpt-4o", "gpt-4", "gpt-3.5-turbo"],
            ProviderKind::Anthropic => &[
                "claude-3-5-sonnet-latest",
                "claude-3-5-haiku-latest",
                "claude-3-opus-latest",
            ],
            ProviderKind::Ollama => &["llama3.2", "llama3.1", "mistral", "qwen2.5"],
            #[cfg(feature = "huggingface")]
            ProviderKind::HuggingFace => &["deepseek-ai/DeepSeek-R1-0528"],
        }
    }

    pub fn default_model(&self) -> &'static str {
        self.models()[0]
    }

    /// Identifiers joined with `/`, for prompts and error hints.
    pub fn choices() -> String {
        Self::ALL
            .iter()
            .map(ProviderKind::as_str)
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = BuildError;

    /// Exact, case-sensitive match. No aliases and no fallback.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| BuildError::UnsupportedProvider(s.to_string()))
    }
}

/// Everything needed to construct one client.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRequest {
    pub provider: ProviderKind,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl ProviderRequest {
    pub fn new(provider: ProviderKind, model: impl Into<String>, temperature: f32, timeout_secs: u64) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Human-readable `"<provider> - <model>"` label.
    #[cfg(any(feature = "tui", test))]
    pub fn label(&self) -> String {
        format!("{} - {}", self.provider, self.model)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Provider-reported details that accompany a reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub model: Option<String>,
    pub finish_reason: Option<String>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatResult {
    pub content: String,
    pub metadata: Option<ResponseMetadata>,
}

#[cfg(test)]
impl ChatResult {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: None,
        }
    }
}

/// A constructed, ready-to-use client for one provider.
///
/// Construction never touches the network; the first request happens on
/// `invoke`.
#[async_trait::async_trait]
pub trait ChatClient: Send + Sync {
    fn provider(&self) -> ProviderKind;

    fn model(&self) -> &str;

    /// Send a single user prompt and wait for the full reply.
    async fn invoke(&self, prompt: &str) -> Result<ChatResult, InvokeError>;
}
