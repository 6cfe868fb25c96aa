pub mod chat;
pub mod config_cmd;
pub mod memory;
pub mod progress;
pub mod run;

use std::sync::Arc;
use jarvis_agent::Orchestrator;
use jarvis_config::AppConfig;
use jarvis_core::event::EventBus;
use jarvis_core::memory::MemoryBackend;

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

pub fn load_config() -> CliResult<AppConfig> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

/// Build the memory backend; a provider is attached when one can be built.
pub fn build_memory(config: &AppConfig) -> CliResult<Arc<dyn MemoryBackend>> {
    let provider = jarvis_providers::build_from_config(config).ok();
    Ok(jarvis_memory::build_from_config(&config.memory, provider)
        .map_err(|e| format!("Failed to set up memory: {e}"))?)
}

/// Everything needed to run requests.
pub fn build_orchestrator(config: &AppConfig) -> CliResult<Orchestrator> {
    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    OPENAI_API_KEY=sk-...");
        eprintln!("    JARVIS_API_KEY=sk-...");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let provider = jarvis_providers::build_from_config(config)?;
    let memory = jarvis_memory::build_from_config(&config.memory, Some(provider.clone()))?;
    let event_bus = Arc::new(EventBus::default());
    tracing::debug!(model = %config.model, memory = memory.name(), "Orchestrator ready");
    Ok(Orchestrator::from_config(config, provider, memory, event_bus))
}
