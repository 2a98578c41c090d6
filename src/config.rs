use crate::provider::ProviderSettings;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Default provider identifier (e.g., "Ollama").
    pub provider: Option<String>,

    /// Default model (optional)
    pub model: Option<String>,

    pub temperature: Option<f32>,

    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,

    /// Pre-filled chat UI username.
    #[cfg_attr(not(feature = "tui"), allow(dead_code))]
    pub username: Option<String>,

    #[serde(default)]
    pub openai: EndpointConfig,

    #[serde(default)]
    pub anthropic: EndpointConfig,

    #[serde(default)]
    pub ollama: EndpointConfig,

    #[serde(default)]
    pub huggingface: EndpointConfig,
}

/// Per-provider endpoint override.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EndpointConfig {
    pub base_url: Option<String>,
}

impl Config {
    /// Load config if the file exists, otherwise return Ok(None).
    pub fn load_optional(path: impl AsRef<Path>) -> anyhow::Result<Option<Self>> {
        let path = path.as_ref();
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(anyhow::Error::new(e))
                    .with_context(|| format!("failed to read config: {}", path.display()))
            }
        };

        let s = String::from_utf8(bytes).context("config is not valid UTF-8")?;
        let cfg: Config = toml::from_str(&s)
            .with_context(|| format!("failed to parse TOML: {}", path.display()))?;
        Ok(Some(cfg))
    }

    /// Provider defaults with any configured endpoint overrides applied.
    pub fn provider_settings(cfg: Option<&Config>) -> ProviderSettings {
        let mut settings = ProviderSettings::default();
        let Some(cfg) = cfg else {
            return settings;
        };
        if let Some(url) = &cfg.openai.base_url {
            settings.openai.base_url = url.clone();
        }
        if let Some(url) = &cfg.anthropic.base_url {
            settings.anthropic.base_url = url.clone();
        }
        if let Some(url) = &cfg.ollama.base_url {
            settings.ollama.base_url = url.clone();
        }
        #[cfg(feature = "huggingface")]
        if let Some(url) = &cfg.huggingface.base_url {
            settings.huggingface.base_url = url.clone();
        }
        settings
    }
}
