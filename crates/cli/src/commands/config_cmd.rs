//! `jarvis config` — Show the effective configuration.

use jarvis_config::AppConfig;
use super::{CliResult, load_config};

pub fn show() -> CliResult {
    let config = load_config()?;

    println!("# {}", AppConfig::config_dir().join("config.toml").display());
    println!("{}", config.redacted_toml());

    if !config.has_api_key() {
        println!("# ⚠️  No API key set (OPENAI_API_KEY or JARVIS_API_KEY)");
    }
    if config.tools.tavily_api_key.is_none() {
        println!("# ⚠️  Web search disabled (TAVILY_API_KEY not set)");
    }
    Ok(())
}
