//! Memory system implementations for JARVIS.
//!
//! One backend, [`VectorMemory`], with two storage modes (process-local or
//! JSONL file) and two embedders (provider API or offline feature hashing).

pub mod embedder;
pub mod vector;
pub mod vector_memory;

pub use embedder::{HashEmbedder, ProviderEmbedder};
pub use vector::{cosine_similarity, FlatIndex};
pub use vector_memory::VectorMemory;

use jarvis_core::error::MemoryError;
use jarvis_core::memory::{Embedder, MemoryBackend};
use jarvis_core::provider::Provider;
use std::sync::Arc;

/// Build the configured memory backend.
///
/// The `api` embedding needs a provider; `hash` works without one.
pub fn build_from_config(
    config: &jarvis_config::MemoryConfig,
    provider: Option<Arc<dyn Provider>>,
) -> Result<Arc<dyn MemoryBackend>, MemoryError> {
    let embedder: Arc<dyn Embedder> = match config.embedding.as_str() {
        "hash" => Arc::new(HashEmbedder::new(config.embedding_dim)),
        _ => {
            let provider = provider.ok_or_else(|| {
                MemoryError::EmbeddingFailed(
                    "API embeddings need a configured provider (or set memory.embedding = \"hash\")".into(),
                )
            })?;
            Arc::new(ProviderEmbedder::new(provider, &config.embedding_model, config.embedding_dim))
        }
    };

    let memory = match config.backend.as_str() {
        "file" => VectorMemory::open(embedder, config.resolved_path()),
        _ => VectorMemory::new(embedder),
    };

    tracing::debug!(backend = memory.name(), embedding = %config.embedding, "Memory configured");
    Ok(Arc::new(memory))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_embedding_needs_no_provider() {
        let config = jarvis_config::MemoryConfig {
            embedding: "hash".into(),
            embedding_dim: 32,
            ..Default::default()
        };
        let memory = build_from_config(&config, None).unwrap();
        assert_eq!(memory.name(), "in_memory");
    }

    #[test]
    fn api_embedding_without_provider_fails() {
        let config = jarvis_config::MemoryConfig::default();
        assert!(matches!(
            build_from_config(&config, None),
            Err(MemoryError::EmbeddingFailed(_))
        ));
    }

    #[test]
    fn file_backend_selected() {
        let dir = tempfile::tempdir().unwrap();
        let config = jarvis_config::MemoryConfig {
            backend: "file".into(),
            path: Some(dir.path().join("memory.jsonl")),
            embedding: "hash".into(),
            embedding_dim: 16,
            ..Default::default()
        };
        let memory = build_from_config(&config, None).unwrap();
        assert_eq!(memory.name(), "file");
    }
}
