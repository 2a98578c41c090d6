use crate::provider::{MAX_TEMPERATURE, MAX_TIMEOUT_SECS, MIN_TEMPERATURE, MIN_TIMEOUT_SECS};
use clap::{Parser, Subcommand};

/// Chat with OpenAI, Anthropic or a local Ollama model from the terminal.
#[derive(Debug, Parser)]
#[command(name = "llm-switch")]
#[command(version)]
#[command(about = "Pick an LLM provider and chat with it", long_about = None)]
pub struct Args {
    /// Provider identifier, matched exactly (e.g. OpenAI, Anthropic, Ollama).
    /// Prompted for when omitted.
    #[arg(long = "provider", global = true)]
    pub provider: Option<String>,

    /// Model name (default: config/model or the provider's first model)
    #[arg(short = 'm', long = "model", global = true)]
    pub model: Option<String>,

    /// Sampling temperature
    #[arg(long = "temperature", global = true, value_parser = parse_temperature)]
    pub temperature: Option<f32>,

    /// Request timeout in seconds
    #[arg(long = "timeout", global = true, value_parser = clap::value_parser!(u64).range(MIN_TIMEOUT_SECS..=MAX_TIMEOUT_SECS))]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub cmd: Option<Command>,

    /// Message text (positional). Prompted for when omitted. A message that
    /// starts with a subcommand name needs `prompt` or `--` in front of it.
    #[arg(value_name = "MESSAGE")]
    pub message: Vec<String>,
}

impl Args {
    /// Positional message words, from the `prompt` subcommand or the bare
    /// one-shot form.
    pub fn message_words(&self) -> &[String] {
        match &self.cmd {
            Some(Command::Prompt { message }) => message,
            _ => &self.message,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ask for a provider and a message on stdin, print the reply (default)
    Prompt {
        /// Message text. Prompted for when omitted.
        #[arg(value_name = "MESSAGE")]
        message: Vec<String>,
    },

    /// Run an interactive terminal chat UI
    #[cfg(feature = "tui")]
    Tui {
        /// Log in immediately with this display name
        #[arg(short = 'u', long = "user")]
        user: Option<String>,
    },

    /// List enabled providers, their credential variable and models
    Providers,
}

fn parse_temperature(s: &str) -> Result<f32, String> {
    let t: f32 = s.parse().map_err(|e| format!("{e}"))?;
    if (MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&t) {
        Ok(t)
    } else {
        Err(format!("{t} is not in {MIN_TEMPERATURE:.1}..={MAX_TEMPERATURE:.1}"))
    }
}
