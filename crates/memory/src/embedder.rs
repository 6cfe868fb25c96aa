//! Embedders for the memory index.
//!
//! - [`ProviderEmbedder`] calls the provider's `/embeddings` endpoint.
//! - [`HashEmbedder`] works offline: it hashes word tokens into a fixed
//!   number of buckets, so texts sharing words land close together.

use async_trait::async_trait;
use jarvis_core::error::MemoryError;
use jarvis_core::memory::Embedder;
use jarvis_core::provider::{EmbeddingRequest, Provider};
use std::sync::Arc;
use tracing::debug;
use crate::vector::normalize;

/// Embeds through an LLM provider's embedding API.
pub struct ProviderEmbedder {
    provider: Arc<dyn Provider>,
    model: String,
    dimension: usize,
}

impl ProviderEmbedder {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, dimension: usize) -> Self {
        Self {
            provider,
            model: model.into(),
            dimension,
        }
    }
}

#[async_trait]
impl Embedder for ProviderEmbedder {
    fn name(&self) -> &str {
        "api"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, MemoryError> {
        debug!(model = %self.model, count = texts.len(), "Embedding texts");

        let response = self
            .provider
            .embed(EmbeddingRequest {
                model: self.model.clone(),
                inputs: texts.to_vec(),
            })
            .await
            .map_err(|e| MemoryError::EmbeddingFailed(e.to_string()))?;

        if response.embeddings.len() != texts.len() {
            return Err(MemoryError::EmbeddingFailed(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                response.embeddings.len()
            )));
        }

        if let Some(bad) = response.embeddings.iter().find(|v| v.len() != self.dimension) {
            return Err(MemoryError::DimensionMismatch {
                expected: self.dimension,
                actual: bad.len(),
            });
        }

        Ok(response.embeddings)
    }
}

/// Deterministic feature-hashing embedder.
///
/// Each lowercase alphanumeric token adds ±1 to one bucket chosen by its
/// FNV-1a hash; the result is normalized to unit length.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    /// Embed one text synchronously.
    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dimension];
        for token in tokens(text) {
            let h = fnv1a(token.as_bytes());
            let bucket = (h % self.dimension as u64) as usize;
            let sign = if (h >> 63) & 1 == 0 { 1.0 } else { -1.0 };
            v[bucket] += sign;
        }
        normalize(&mut v);
        v
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn name(&self) -> &str {
        "hash"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, MemoryError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes.iter().fold(OFFSET, |hash, b| (hash ^ *b as u64).wrapping_mul(PRIME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::cosine_similarity;
    use jarvis_core::error::ProviderError;
    use jarvis_core::provider::{EmbeddingResponse, ProviderRequest, ProviderResponse};

    #[test]
    fn hash_embedding_is_deterministic_and_unit_length() {
        let embedder = HashEmbedder::new(64);
        let a = embedder.embed_one("compute the factorial of 10");
        let b = embedder.embed_one("compute the factorial of 10");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn shared_words_are_closer() {
        let embedder = HashEmbedder::new(256);
        let query = embedder.embed_one("factorial of ten");
        let near = embedder.embed_one("Task: factorial of 10");
        let far = embedder.embed_one("list files in the home directory");
        assert!(cosine_similarity(&query, &near) > cosine_similarity(&query, &far));
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let v = HashEmbedder::new(8).embed_one("  ...  ");
        assert!(v.iter().all(|x| *x == 0.0));
    }

    struct FixedEmbeddings(Vec<Vec<f32>>);

    #[async_trait]
    impl Provider for FixedEmbeddings {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn complete(&self, _r: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            Err(ProviderError::NotConfigured("fixed".into()))
        }

        async fn embed(&self, r: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
            Ok(EmbeddingResponse {
                embeddings: self.0.clone(),
                model: r.model,
            })
        }
    }

    #[tokio::test]
    async fn provider_embedder_checks_dimension() {
        let embedder = ProviderEmbedder::new(Arc::new(FixedEmbeddings(vec![vec![0.1, 0.2]])), "m", 3);
        let err = embedder.embed(&["x".to_string()]).await.unwrap_err();
        assert!(matches!(err, MemoryError::DimensionMismatch { expected: 3, actual: 2 }));
    }

    #[tokio::test]
    async fn provider_embedder_passes_vectors_through() {
        let embedder = ProviderEmbedder::new(Arc::new(FixedEmbeddings(vec![vec![0.1, 0.2]])), "m", 2);
        let out = embedder.embed(&["x".to_string()]).await.unwrap();
        assert_eq!(out, vec![vec![0.1, 0.2]]);
    }

    #[tokio::test]
    async fn provider_failure_is_embedding_failed() {
        struct NoEmbed;

        #[async_trait]
        impl Provider for NoEmbed {
            fn name(&self) -> &str {
                "none"
            }
            async fn complete(&self, _r: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
                Err(ProviderError::NotConfigured("none".into()))
            }
        }

        let embedder = ProviderEmbedder::new(Arc::new(NoEmbed), "m", 2);
        let err = embedder.embed(&["x".to_string()]).await.unwrap_err();
        assert!(matches!(err, MemoryError::EmbeddingFailed(_)));
    }
}
