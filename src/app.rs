use crate::config::Config;
use crate::credentials::CredentialSource;
use crate::error::BuildError;
use crate::provider::{ClientFactory, ProviderKind, DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT_SECS};
use anyhow::Context;
use std::io::{BufRead, Write};

/// Command-line values for the terminal prompt. `provider` and `message`
/// are asked for on stdin when absent.
#[derive(Debug, Clone, Default)]
pub struct PromptArgs {
    pub provider: Option<String>,
    pub message: Option<String>,
    /// `--model`, applies to whichever provider is chosen.
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub timeout_secs: Option<u64>,
}

impl PromptArgs {
    fn temperature(&self, cfg: Option<&Config>) -> f32 {
        self.temperature
            .or_else(|| cfg.and_then(|c| c.temperature))
            .unwrap_or(DEFAULT_TEMPERATURE)
    }

    fn timeout_secs(&self, cfg: Option<&Config>) -> u64 {
        self.timeout_secs
            .or_else(|| cfg.and_then(|c| c.timeout_secs))
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
    }
}

/// Model for `provider`: explicit flag, then the configured model (only when
/// the config does not pin it to a different provider), then the provider's
/// default.
pub fn resolve_model(provider: ProviderKind, flag: Option<&str>, cfg: Option<&Config>) -> String {
    if let Some(m) = flag {
        return m.to_string();
    }
    if let Some(c) = cfg {
        let same_provider = c.provider.as_deref().map_or(true, |p| p == provider.as_str());
        if let (true, Some(m)) = (same_provider, c.model.as_deref()) {
            return m.to_string();
        }
    }
    provider.default_model().to_string()
}

fn read_line(input: &mut dyn BufRead, prompts: &mut dyn Write, prompt: &str) -> anyhow::Result<String> {
    write!(prompts, "{prompt}")?;
    prompts.flush().ok();
    let mut line = String::new();
    let n = input.read_line(&mut line).context("failed to read from stdin")?;
    if n == 0 {
        anyhow::bail!("no input (stdin closed)");
    }
    Ok(line.trim().to_string())
}

/// Terminal front end: provider, then message, then print the reply.
///
/// The client is built before the message is requested, so a bad provider
/// or missing credential fails before anything else is asked or printed.
pub async fn run_prompt(
    input: &mut dyn BufRead,
    prompts: &mut dyn Write,
    out: &mut dyn Write,
    factory: &dyn ClientFactory,
    cfg: Option<&Config>,
    args: &PromptArgs,
) -> anyhow::Result<()> {
    let provider_id = match &args.provider {
        Some(p) => p.clone(),
        None => read_line(
            input,
            prompts,
            &format!("Choose model provider ({}): ", ProviderKind::choices()),
        )?,
    };

    // An unknown id has no model of its own; build_from_id rejects it below.
    let model = provider_id
        .parse::<ProviderKind>()
        .map(|p| resolve_model(p, args.model.as_deref(), cfg))
        .unwrap_or_default();
    tracing::debug!(provider = %provider_id, %model, "building client for prompt");
    let client = match factory.build_from_id(&provider_id, &model, args.temperature(cfg), args.timeout_secs(cfg)) {
        Ok(client) => client,
        Err(err @ BuildError::UnsupportedProvider(_)) => {
            let hint = format!("failed to build LLM instance (choose one of {})", ProviderKind::choices());
            return Err(anyhow::Error::new(err).context(hint));
        }
        Err(err) => return Err(anyhow::Error::new(err).context("failed to build LLM instance")),
    };

    let message = match &args.message {
        Some(m) => m.clone(),
        None => read_line(input, prompts, "Enter your message: ")?,
    };

    let result = client
        .invoke(&message)
        .await
        .with_context(|| format!("{} - {} request failed", client.provider(), client.model()))?;
    if let Some(meta) = &result.metadata {
        tracing::debug!(?meta, "response metadata");
    }

    writeln!(out, "{}", result.content)?;
    out.flush().ok();
    Ok(())
}

/// `providers` subcommand.
pub fn cmd_providers(out: &mut dyn Write, creds: &dyn CredentialSource) -> anyhow::Result<()> {
    for p in ProviderKind::ALL {
        let credential = match p.credential_var() {
            Some(var) if creds.get(var).is_some() => format!("{var} (set)"),
            Some(var) => format!("{var} (missing)"),
            None => "no credential".to_string(),
        };
        writeln!(out, "{}\t{}\t{}", p, credential, p.models().join(", "))?;
    }
    Ok(())
}
