use anyhow::Context;
use std::env;
use std::path::PathBuf;

fn home_dir() -> anyhow::Result<PathBuf> {
    let home = env::var_os("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home))
}

/// Directory holding `config.toml`. Not created; a missing config is fine.
pub fn config_dir() -> anyhow::Result<PathBuf> {
    if let Some(base) = env::var_os("LLM_SWITCH_HOME").map(PathBuf::from) {
        return Ok(base);
    }

    if let Some(xdg) = env::var_os("XDG_CONFIG_HOME").map(PathBuf::from) {
        return Ok(xdg.join("llm-switch"));
    }

    Ok(home_dir()?.join(".config").join("llm-switch"))
}

pub fn config_path() -> anyhow::Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}
