mod anthropic;
mod factory;
#[cfg(feature = "huggingface")]
mod huggingface;
mod ollama;
mod openai;
mod types;

#[cfg(test)]
pub mod stub;
#[cfg(test)]
mod test_server;

pub use anthropic::{AnthropicClient, AnthropicSettings};
pub use factory::{ClientFactory, ProviderFactory, ProviderSettings};
#[cfg(feature = "huggingface")]
pub use huggingface::{HuggingFaceClient, HuggingFaceSettings};
pub use ollama::{OllamaClient, OllamaSettings};
pub use openai::{OpenAiClient, OpenAiSettings};
pub use types::*;

use crate::error::BuildError;
use std::time::Duration;

/// Build the per-client HTTP transport. Purely local; no connection is made.
fn http_client(timeout: Duration) -> Result<reqwest::Client, BuildError> {
    let http = reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()?;
    Ok(http)
}
