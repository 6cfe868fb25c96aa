//! LLM Provider implementations for JARVIS.
//!
//! All providers implement the `jarvis_core::Provider` trait.
//! [`build_from_config`] assembles the provider stack the agents use.

pub mod openai_compat;
pub mod retry;

pub use openai_compat::OpenAiCompatProvider;
pub use retry::RetryProvider;

use jarvis_core::error::ProviderError;
use std::sync::Arc;
use std::time::Duration;

/// Build the configured provider: an OpenAI-compatible client wrapped in
/// transient-failure retries.
pub fn build_from_config(
    config: &jarvis_config::AppConfig,
) -> Result<Arc<dyn jarvis_core::Provider>, ProviderError> {
    let api_key = config.api_key.clone().ok_or_else(|| {
        ProviderError::NotConfigured(
            "No API key found. Set OPENAI_API_KEY or api_key in ~/.jarvis/config.toml".into(),
        )
    })?;

    let timeout = Duration::from_secs(config.request_timeout_secs);
    let inner = OpenAiCompatProvider::new("openai", &config.base_url, api_key, timeout)?;

    tracing::debug!(
        base_url = %config.base_url,
        model = %config.model,
        max_retries = config.max_retries,
        "Provider configured"
    );

    Ok(Arc::new(
        RetryProvider::new(Arc::new(inner), config.max_retries).with_timeout(timeout),
    ))
}
