//! Vector memory: an append-only record log with an embedded similarity index.
//!
//! Records can optionally be persisted to a JSON-lines file (one record plus
//! its embedding per line). The file is appended to on every add, so history
//! survives across runs and is human-inspectable.

use async_trait::async_trait;
use chrono::Utc;
use jarvis_core::error::MemoryError;
use jarvis_core::memory::{Embedder, MemoryBackend, MemoryRecord, Metadata};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use crate::vector::FlatIndex;

/// One persisted line.
#[derive(Serialize, Deserialize)]
struct StoredRecord {
    #[serde(flatten)]
    record: MemoryRecord,
    embedding: Vec<f32>,
}

/// Records and index positions stay aligned: `records[i]` owns vector `i`.
struct Store {
    records: Vec<MemoryRecord>,
    index: FlatIndex,
    next_id: u64,
}

/// The memory component shared by tools and the orchestrator.
pub struct VectorMemory {
    embedder: Arc<dyn Embedder>,
    store: RwLock<Store>,
    path: Option<PathBuf>,
}

impl VectorMemory {
    /// A memory that lives only as long as the process.
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        let dimension = embedder.dimension();
        Self {
            embedder,
            store: RwLock::new(Store {
                records: Vec::new(),
                index: FlatIndex::new(dimension),
                next_id: 0,
            }),
            path: None,
        }
    }

    /// A memory persisted to a JSONL file at `path`.
    ///
    /// Existing lines are loaded; corrupted lines and lines embedded with a
    /// different dimension are skipped with a warning. The file is created on
    /// first write.
    pub fn open(embedder: Arc<dyn Embedder>, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut memory = Self::new(embedder);
        let store = memory.store.get_mut();

        for stored in load_from_disk(&path) {
            let id = stored.record.id;
            match store.index.add(stored.embedding) {
                Ok(_) => {
                    store.records.push(stored.record);
                    store.next_id = store.next_id.max(id + 1);
                }
                Err(e) => warn!(id, error = %e, "Skipping memory record with incompatible embedding"),
            }
        }

        debug!(path = %path.display(), count = store.records.len(), "File memory loaded");
        memory.path = Some(path);
        memory
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        let mut vectors = self.embedder.embed(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| MemoryError::EmbeddingFailed("embedder returned no vectors".into()))
    }
}

#[async_trait]
impl MemoryBackend for VectorMemory {
    fn name(&self) -> &str {
        if self.path.is_some() { "file" } else { "in_memory" }
    }

    async fn add(&self, text: &str, metadata: Metadata) -> Result<u64, MemoryError> {
        // Embedding happens before the lock so slow API calls never block readers
        let embedding = self.embed_one(text).await?;

        let mut store = self.store.write().await;
        let record = MemoryRecord {
            id: store.next_id,
            text: text.to_string(),
            timestamp: Utc::now(),
            metadata,
            score: 0.0,
        };

        if let Some(path) = &self.path {
            append_to_disk(path, &record, &embedding)?;
        }

        store.index.add(embedding)?;
        let id = record.id;
        store.records.push(record);
        store.next_id += 1;

        debug!(id, backend = self.name(), "Memory record added");
        Ok(id)
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<MemoryRecord>, MemoryError> {
        if k == 0 || self.store.read().await.records.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self.embed_one(query).await?;
        let store = self.store.read().await;
        let hits = store.index.search(&query_embedding, k)?;

        Ok(hits
            .into_iter()
            .filter_map(|(pos, distance)| {
                let mut record = store.records.get(pos)?.clone();
                record.score = 1.0 / (1.0 + distance);
                Some(record)
            })
            .collect())
    }

    async fn get_recent(&self, n: usize) -> Result<Vec<MemoryRecord>, MemoryError> {
        let store = self.store.read().await;
        let mut records = store.records.clone();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        records.truncate(n);
        Ok(records)
    }

    async fn count(&self) -> Result<usize, MemoryError> {
        Ok(self.store.read().await.records.len())
    }
}

/// Load records from a JSONL file.
fn load_from_disk(path: &Path) -> Vec<StoredRecord> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return Vec::new(), // File doesn't exist yet
    };

    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str::<StoredRecord>(line) {
            Ok(stored) => Some(stored),
            Err(e) => {
                warn!(error = %e, "Skipping corrupted memory record");
                None
            }
        })
        .collect()
}

/// Append one record to the JSONL file.
fn append_to_disk(path: &Path, record: &MemoryRecord, embedding: &[f32]) -> Result<(), MemoryError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            MemoryError::Storage(format!("Failed to create memory directory: {e}"))
        })?;
    }

    let line = serde_json::to_string(&StoredRecord {
        record: record.clone(),
        embedding: embedding.to_vec(),
    })
    .map_err(|e| MemoryError::Storage(format!("Failed to serialize memory record: {e}")))?;

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| MemoryError::Storage(format!("Failed to open memory file: {e}")))?;

    writeln!(file, "{line}")
        .map_err(|e| MemoryError::Storage(format!("Failed to write memory file: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::HashEmbedder;
    use jarvis_core::memory::agent_metadata;

    fn memory() -> VectorMemory {
        VectorMemory::new(Arc::new(HashEmbedder::new(128)))
    }

    #[tokio::test]
    async fn ids_start_at_zero_and_increase() {
        let mem = memory();
        assert_eq!(mem.add("first", Metadata::new()).await.unwrap(), 0);
        assert_eq!(mem.add("second", Metadata::new()).await.unwrap(), 1);
        assert_eq!(mem.add("third", Metadata::new()).await.unwrap(), 2);
        assert_eq!(mem.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn added_text_is_found_first() {
        let mem = memory();
        mem.add("Task: list files\nCommands: ls", agent_metadata("cli_agent", "cli_execution"))
            .await
            .unwrap();
        let id = mem
            .add("Task: factorial of 10\nResult: 3628800", agent_metadata("command_agent", "code_execution"))
            .await
            .unwrap();
        mem.add("Task: git status", agent_metadata("cli_agent", "cli_execution"))
            .await
            .unwrap();

        let hits = mem.search("Task: factorial of 10\nResult: 3628800", 3).await.unwrap();
        assert_eq!(hits[0].id, id);
        assert_eq!(hits[0].agent(), "command_agent");
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn search_empty_store_returns_nothing() {
        let mem = memory();
        assert!(mem.search("anything", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_returns_at_most_count() {
        let mem = memory();
        mem.add("only one", Metadata::new()).await.unwrap();
        assert_eq!(mem.search("one", 3).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn recent_is_newest_first() {
        let mem = memory();
        for text in ["a", "b", "c"] {
            mem.add(text, Metadata::new()).await.unwrap();
        }
        let recent = mem.get_recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].text, "c");
        assert_eq!(recent[1].text, "b");
    }

    #[tokio::test]
    async fn concurrent_adds_get_unique_ids() {
        let mem = Arc::new(memory());
        let mut handles = Vec::new();
        for i in 0..16 {
            let mem = mem.clone();
            handles.push(tokio::spawn(async move {
                mem.add(&format!("record {i}"), Metadata::new()).await.unwrap()
            }));
        }
        let mut ids = Vec::new();
        for h in handles {
            ids.push(h.await.unwrap());
        }
        ids.sort();
        assert_eq!(ids, (0..16).collect::<Vec<u64>>());
    }

    #[tokio::test]
    async fn file_backend_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("memory.jsonl");
        let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(64));

        let mem = VectorMemory::open(embedder.clone(), &path);
        assert_eq!(mem.name(), "file");
        mem.add("Task: factorial", agent_metadata("command_agent", "code_execution"))
            .await
            .unwrap();
        mem.add("Task: ls", agent_metadata("cli_agent", "cli_execution"))
            .await
            .unwrap();

        let reloaded = VectorMemory::open(embedder, &path);
        assert_eq!(reloaded.count().await.unwrap(), 2);
        // Ids continue after the persisted ones
        assert_eq!(reloaded.add("Task: pwd", Metadata::new()).await.unwrap(), 2);
        let hits = reloaded.search("Task: factorial", 1).await.unwrap();
        assert_eq!(hits[0].action(), "code_execution");
    }

    #[tokio::test]
    async fn corrupted_and_mismatched_lines_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.jsonl");
        std::fs::write(
            &path,
            concat!(
                r#"{"id":0,"text":"valid","timestamp":"2026-01-01T00:00:00Z","metadata":{},"embedding":[1.0,0.0]}"#,
                "\n",
                "this is not json\n",
                r#"{"id":1,"text":"wrong dim","timestamp":"2026-01-01T00:00:00Z","metadata":{},"embedding":[1.0]}"#,
                "\n",
            ),
        )
        .unwrap();

        let mem = VectorMemory::open(Arc::new(HashEmbedder::new(2)), &path);
        assert_eq!(mem.count().await.unwrap(), 1);
        assert_eq!(mem.add("next", Metadata::new()).await.unwrap(), 1);
    }
}
