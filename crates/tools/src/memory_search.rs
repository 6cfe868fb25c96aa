//! Memory search tool: lets every agent look up similar past tasks.

use async_trait::async_trait;
use jarvis_core::error::ToolError;
use jarvis_core::execution::ERROR_MARKER;
use jarvis_core::memory::{MemoryBackend, MemoryRecord};
use jarvis_core::tool::{Tool, ToolResult};
use std::sync::Arc;
use tracing::{debug, warn};
use crate::names::SEARCH_MEMORY;

/// Records returned per search.
pub const SEARCH_K: usize = 3;

const PREVIEW_CHARS: usize = 200;

pub struct MemorySearchTool {
    backend: Arc<dyn MemoryBackend>,
}

impl MemorySearchTool {
    pub fn new(backend: Arc<dyn MemoryBackend>) -> Self {
        Self { backend }
    }
}

/// Render hits with agent, action, time and a text preview.
pub fn format_records(records: &[MemoryRecord]) -> String {
    if records.is_empty() {
        return "🔍 Nothing found in memory. This is the first task of its kind.".to_string();
    }

    let mut lines = vec!["🧠 Found in memory history:\n".to_string()];
    for (idx, record) in records.iter().enumerate() {
        let preview: String = record.text.chars().take(PREVIEW_CHARS).collect();
        lines.push(format!("{}. [{}] {}", idx + 1, record.agent(), record.action()));
        lines.push(format!("   Time: {}", record.timestamp.to_rfc3339()));
        lines.push(format!("   {preview}..."));
        lines.push(String::new());
    }
    lines.join("\n")
}

#[async_trait]
impl Tool for MemorySearchTool {
    fn name(&self) -> &str {
        SEARCH_MEMORY
    }

    fn description(&self) -> &str {
        "Search the history of completed tasks and agent actions. Use it to find similar \
         solutions, code and commands from past tasks."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What to look for in the memory history"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let query = arguments["query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;

        match self.backend.search(query, SEARCH_K).await {
            Ok(records) => {
                debug!(query = %query, hits = records.len(), "Memory searched");
                let ids: Vec<u64> = records.iter().map(|r| r.id).collect();
                Ok(ToolResult::ok(format_records(&records)).with_data(serde_json::json!({ "ids": ids })))
            }
            Err(e) => {
                warn!(error = %e, "Memory search failed");
                Ok(ToolResult::failed(format!("{ERROR_MARKER} Error: Memory search failed: {e}")))
            }
        }
    }
}
