//! Memory trait: an append-only log of past task outcomes, indexed by
//! embedding similarity.
//!
//! Records are immutable once written and are never deleted. Ids are
//! allocated by the backend, starting at 0 and increasing by one per add.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::error::MemoryError;

/// Free-form metadata attached to a record (conventionally `agent` and `action`).
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A single memory record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Position in the log
    pub id: u64,

    /// The stored text
    pub text: String,

    /// When this record was written
    pub timestamp: DateTime<Utc>,

    /// Caller-supplied metadata
    #[serde(default)]
    pub metadata: Metadata,

    /// Similarity to the query (set by search operations only)
    #[serde(skip)]
    pub score: f32,
}

impl MemoryRecord {
    /// Metadata string value by key.
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }

    /// The agent that produced this record, or `"unknown"`.
    pub fn agent(&self) -> &str {
        self.meta_str("agent").unwrap_or("unknown")
    }

    /// The action this record describes, or `"unknown"`.
    pub fn action(&self) -> &str {
        self.meta_str("action").unwrap_or("unknown")
    }
}

/// Build metadata from `agent`/`action` labels.
pub fn agent_metadata(agent: &str, action: &str) -> Metadata {
    let mut meta = Metadata::new();
    meta.insert("agent".into(), serde_json::Value::String(agent.to_string()));
    meta.insert("action".into(), serde_json::Value::String(action.to_string()));
    meta
}

/// The core MemoryBackend trait.
///
/// Shared as `Arc<dyn MemoryBackend>` between tools and the orchestrator.
#[async_trait]
pub trait MemoryBackend: Send + Sync {
    /// The backend name (e.g., "in_memory", "file").
    fn name(&self) -> &str;

    /// Append a record and return its id.
    async fn add(&self, text: &str, metadata: Metadata) -> std::result::Result<u64, MemoryError>;

    /// The `k` most similar records, most similar first.
    ///
    /// Returns at most `min(k, count)` records; an empty store yields an empty list.
    async fn search(&self, query: &str, k: usize) -> std::result::Result<Vec<MemoryRecord>, MemoryError>;

    /// The `n` newest records, newest first.
    async fn get_recent(&self, n: usize) -> std::result::Result<Vec<MemoryRecord>, MemoryError>;

    /// Total record count.
    async fn count(&self) -> std::result::Result<usize, MemoryError>;
}

/// Turns text into fixed-dimension vectors for the memory index.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn name(&self) -> &str;

    /// Dimension of every vector this embedder returns.
    fn dimension(&self) -> usize;

    /// Embed a batch of texts, one vector per input, in order.
    async fn embed(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, MemoryError>;
}
