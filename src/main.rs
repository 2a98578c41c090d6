mod app;
mod cli;
mod config;
mod credentials;
mod error;
mod paths;
mod provider;

#[cfg(feature = "tui")]
mod session;
#[cfg(feature = "tui")]
mod tui;

use clap::Parser;
use credentials::EnvCredentials;
use provider::ProviderFactory;

fn init_logging(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Credentials may live in a local .env file.
    let _ = dotenvy::dotenv();

    let args = cli::Args::parse();

    // The TUI owns the terminal; keep log lines off it unless asked for.
    #[cfg(feature = "tui")]
    let default_filter = if matches!(args.cmd, Some(cli::Command::Tui { .. })) {
        "off"
    } else {
        "warn"
    };
    #[cfg(not(feature = "tui"))]
    let default_filter = "warn";
    init_logging(default_filter);

    // anyhow's report goes to stderr as `Error: ...`; the log keeps a copy.
    run(args).await.inspect_err(log_fatal)
}

fn log_fatal(err: &anyhow::Error) {
    tracing::error!(error = %format!("{err:#}"), "fatal");
}

async fn run(args: cli::Args) -> anyhow::Result<()> {
    let config_path = paths::config_path()?;
    let cfg = config::Config::load_optional(&config_path)?;
    tracing::debug!(?config_path, ?cfg, "resolved config");

    let factory = ProviderFactory::new(EnvCredentials, config::Config::provider_settings(cfg.as_ref()));

    match &args.cmd {
        Some(cli::Command::Providers) => {
            return app::cmd_providers(&mut std::io::stdout(), &EnvCredentials);
        }
        #[cfg(feature = "tui")]
        Some(cli::Command::Tui { user }) => {
            let session = initial_session(&args, cfg.as_ref(), user.clone())?;
            return tui::run_tui(session, std::sync::Arc::new(factory)).await;
        }
        Some(cli::Command::Prompt { .. }) | None => {}
    }

    let message = args.message_words().join(" ");
    let prompt_args = app::PromptArgs {
        provider: args.provider.clone(),
        message: (!message.trim().is_empty()).then_some(message),
        model: args.model.clone(),
        temperature: args.temperature,
        timeout_secs: args.timeout,
    };

    let stdin = std::io::stdin();
    app::run_prompt(
        &mut stdin.lock(),
        &mut std::io::stderr(),
        &mut std::io::stdout(),
        &factory,
        cfg.as_ref(),
        &prompt_args,
    )
    .await
}

/// Chat session seeded from flags, then config, then built-in defaults.
#[cfg(feature = "tui")]
fn initial_session(
    args: &cli::Args,
    cfg: Option<&config::Config>,
    user: Option<String>,
) -> anyhow::Result<session::ChatSession> {
    use provider::{ProviderKind, DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT_SECS};

    let provider = match args.provider.as_deref().or_else(|| cfg.and_then(|c| c.provider.as_deref())) {
        Some(id) => id.parse::<ProviderKind>()?,
        None => ProviderKind::ALL[0],
    };
    let controls = session::Controls::new(
        provider,
        Some(app::resolve_model(provider, args.model.as_deref(), cfg)),
        args.temperature
            .or_else(|| cfg.and_then(|c| c.temperature))
            .unwrap_or(DEFAULT_TEMPERATURE),
        args.timeout
            .or_else(|| cfg.and_then(|c| c.timeout_secs))
            .unwrap_or(DEFAULT_TIMEOUT_SECS),
    );

    let mut session = session::ChatSession::new(controls);
    if let Some(name) = user.or_else(|| cfg.and_then(|c| c.username.clone())) {
        session.login(&name)?;
    }
    Ok(session)
}
