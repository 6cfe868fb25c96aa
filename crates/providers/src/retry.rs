//! Provider retry: re-sends a failed request to the same provider.
//!
//! Only transient failures (rate limits, timeouts, network errors, 5xx) are
//! retried. Each attempt runs under its own timeout. Once the retries are
//! spent the last error is returned to the caller unchanged.

use async_trait::async_trait;
use jarvis_core::error::ProviderError;
use jarvis_core::provider::*;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Longest wait honoured from a provider's `retry-after` hint.
const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(30);

/// A provider that retries transient failures of an inner provider.
pub struct RetryProvider {
    inner: Arc<dyn jarvis_core::Provider>,
    max_retries: u32,
    timeout: Duration,
    backoff: Duration,
}

impl RetryProvider {
    /// Wrap `inner`, allowing `max_retries` extra attempts per request.
    pub fn new(inner: Arc<dyn jarvis_core::Provider>, max_retries: u32) -> Self {
        Self {
            inner,
            max_retries,
            timeout: Duration::from_secs(120),
            backoff: Duration::from_millis(500),
        }
    }

    /// Per-attempt timeout (default 120s).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Base delay between attempts, doubled after each failure (default 500ms).
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    fn delay_for(&self, attempt: u32, error: &ProviderError) -> Duration {
        let exponential = self.backoff.saturating_mul(2u32.saturating_pow(attempt));
        match error {
            ProviderError::RateLimited { retry_after_secs } => {
                Duration::from_secs(*retry_after_secs).min(MAX_RATE_LIMIT_WAIT).max(exponential)
            }
            _ => exponential,
        }
    }

    async fn with_retries<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let provider_name = self.inner.name().to_string();
        let mut attempt = 0u32;

        loop {
            let error = match tokio::time::timeout(self.timeout, call()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => e,
                Err(_) => ProviderError::Timeout(format!(
                    "Provider '{}' timed out after {}s",
                    provider_name,
                    self.timeout.as_secs()
                )),
            };

            if !error.is_transient() || attempt >= self.max_retries {
                if attempt > 0 {
                    warn!(
                        provider = %provider_name,
                        operation,
                        attempts = attempt + 1,
                        error = %error,
                        "Retry: giving up"
                    );
                }
                return Err(error);
            }

            let delay = self.delay_for(attempt, &error);
            attempt += 1;
            info!(
                provider = %provider_name,
                operation,
                attempt,
                max_retries = self.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Retry: transient failure, trying again"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl jarvis_core::Provider for RetryProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        self.with_retries("complete", || self.inner.complete(request.clone()))
            .await
    }

    async fn embed(
        &self,
        request: EmbeddingRequest,
    ) -> std::result::Result<EmbeddingResponse, ProviderError> {
        self.with_retries("embed", || self.inner.embed(request.clone()))
            .await
    }
}
