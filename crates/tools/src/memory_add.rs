//! Memory add tool: writes an agent action into the shared memory log.
//!
//! Not part of any specialist toolset; the orchestrator writes its own
//! records. Exposed for front-ends that let a user record notes.

use async_trait::async_trait;
use jarvis_core::error::ToolError;
use jarvis_core::execution::ERROR_MARKER;
use jarvis_core::memory::{MemoryBackend, agent_metadata};
use jarvis_core::tool::{Tool, ToolResult};
use std::sync::Arc;
use tracing::{info, warn};
use crate::names::ADD_TO_MEMORY;

pub struct MemoryAddTool {
    backend: Arc<dyn MemoryBackend>,
}

impl MemoryAddTool {
    pub fn new(backend: Arc<dyn MemoryBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for MemoryAddTool {
    fn name(&self) -> &str {
        ADD_TO_MEMORY
    }

    fn description(&self) -> &str {
        "Save an agent's actions and results to vector memory."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "text": {
                    "type": "string",
                    "description": "Text to store (agent actions, results)"
                },
                "agent": {
                    "type": "string",
                    "description": "Name of the agent that performed the action"
                },
                "action": {
                    "type": "string",
                    "description": "Kind of action (code_execution, cli_execution, search, ...)"
                }
            },
            "required": ["text", "agent", "action"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let arg = |key: &str| {
            arguments[key]
                .as_str()
                .ok_or_else(|| ToolError::InvalidArguments(format!("Missing '{key}' argument")))
        };
        let text = arg("text")?;
        let agent = arg("agent")?;
        let action = arg("action")?;

        match self.backend.add(text, agent_metadata(agent, action)).await {
            Ok(id) => {
                info!(id, agent = %agent, action = %action, "Saved to memory");
                Ok(ToolResult::ok(format!("💾 Saved to memory with ID: {id}"))
                    .with_data(serde_json::json!({ "id": id })))
            }
            Err(e) => {
                warn!(error = %e, "Memory write failed");
                Ok(ToolResult::failed(format!("{ERROR_MARKER} Error: Memory write failed: {e}")))
            }
        }
    }
}
