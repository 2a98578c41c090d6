use super::{
    AnthropicClient, AnthropicSettings, ChatClient, OllamaClient, OllamaSettings, OpenAiClient, OpenAiSettings,
    ProviderKind, ProviderRequest,
};
#[cfg(feature = "huggingface")]
use super::{HuggingFaceClient, HuggingFaceSettings};
use crate::credentials::CredentialSource;
use crate::error::BuildError;

/// Something that turns a `ProviderRequest` into a client.
///
/// Front ends take `&dyn ClientFactory` so they can be driven with a stub.
pub trait ClientFactory: Send + Sync {
    fn build(&self, req: &ProviderRequest) -> Result<Box<dyn ChatClient>, BuildError>;

    /// Build from a raw provider identifier. Unknown identifiers are an error,
    /// never a fallback.
    fn build_from_id(
        &self,
        provider_id: &str,
        model: &str,
        temperature: f32,
        timeout_secs: u64,
    ) -> Result<Box<dyn ChatClient>, BuildError> {
        let provider: ProviderKind = provider_id.parse()?;
        self.build(&ProviderRequest::new(provider, model, temperature, timeout_secs))
    }
}

/// Per-provider fixed defaults, one struct per variant.
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    pub openai: OpenAiSettings,
    pub anthropic: AnthropicSettings,
    pub ollama: OllamaSettings,
    #[cfg(feature = "huggingface")]
    pub huggingface: HuggingFaceSettings,
}

/// The real factory: credentials from `C`, defaults from `ProviderSettings`.
#[derive(Debug, Clone)]
pub struct ProviderFactory<C> {
    credentials: C,
    settings: ProviderSettings,
}

impl<C: CredentialSource> ProviderFactory<C> {
    pub fn new(credentials: C, settings: ProviderSettings) -> Self {
        Self { credentials, settings }
    }

    pub fn build_request(&self, req: &ProviderRequest) -> Result<Box<dyn ChatClient>, BuildError> {
        tracing::debug!(provider = %req.provider, model = %req.model, timeout = ?req.timeout, "building client");

        let client: Box<dyn ChatClient> = match req.provider {
            ProviderKind::OpenAI => {
                let key = self.credential(req.provider)?;
                Box::new(OpenAiClient::new(req, key, &self.settings.openai)?)
            }
            ProviderKind::Anthropic => {
                let key = self.credential(req.provider)?;
                Box::new(AnthropicClient::new(req, key, &self.settings.anthropic)?)
            }
            ProviderKind::Ollama => Box::new(OllamaClient::new(req, &self.settings.ollama)?),
            #[cfg(feature = "huggingface")]
            ProviderKind::HuggingFace => {
                let token = self.credential(req.provider)?;
                Box::new(HuggingFaceClient::new(req, token, &self.settings.huggingface)?)
            }
        };
        Ok(client)
    }

    fn credential(&self, provider: ProviderKind) -> Result<String, BuildError> {
        let Some(var) = provider.credential_var() else {
            return Ok(String::new());
        };
        self.credentials.get(var).ok_or(BuildError::MissingCredential {
            provider: provider.as_str(),
            var,
        })
    }
}

impl<C: CredentialSource + Send + Sync> ClientFactory for ProviderFactory<C> {
    fn build(&self, req: &ProviderRequest) -> Result<Box<dyn ChatClient>, BuildError> {
        self.build_request(req)
    }
}
