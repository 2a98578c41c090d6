use thiserror::Error;

/// Failure to construct a provider client. Raised before any network I/O.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("unsupported model provider: {0}")]
    UnsupportedProvider(String),

    #[error("{var} is not set in environment variables (required by {provider})")]
    MissingCredential {
        provider: &'static str,
        var: &'static str,
    },

    #[error("failed to build HTTP client: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Failure surfaced by a client's `invoke`. Front ends only display it.
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("api error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("provider returned no content")]
    EmptyResponse,
}

impl InvokeError {
    /// Build an `Api` error from a non-success response, preferring the
    /// provider's own error message when the body carries one.
    pub async fn from_response(resp: reqwest::Response) -> Self {
        let status = resp.status().as_u16();
        let text = resp.text().await.unwrap_or_default();
        InvokeError::Api {
            status,
            message: extract_error_message(&text),
        }
    }
}

/// Pull a human-readable message out of a JSON error body.
///
/// OpenAI and Anthropic use `{"error": {"message": ..}}`, Ollama and
/// HuggingFace use `{"error": ".."}`. Anything else is returned verbatim.
fn extract_error_message(body: &str) -> String {
    let Ok(v) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };
    match v.get("error") {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(obj) => obj
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| obj.to_string()),
        None => body.trim().to_string(),
    }
}

/// Failure of one chat turn, either at construction or at invocation.
#[cfg(feature = "tui")]
#[derive(Debug, Error)]
pub enum TurnError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Invoke(#[from] InvokeError),
}

/// Reasons the chat session refuses a submitted message.
#[cfg(feature = "tui")]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("log in before sending messages")]
    NotLoggedIn,

    #[error("message is empty")]
    Empty,

    #[error("a response is still pending; wait for it to complete")]
    Pending,
}
