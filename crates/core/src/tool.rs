//! Tool trait and the dispatcher that routes model tool calls to capabilities.
//!
//! Capabilities report their own failures as status text (see
//! [`crate::execution`]), so the dispatcher never returns an error to the
//! loop: residual `ToolError`s are folded into the same wire format and
//! unknown names are reported as [`Dispatched::Unknown`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};
use crate::error::ToolError;
use crate::execution::ERROR_MARKER;
use crate::message::MessageToolCall;
use crate::provider::ToolDefinition;

/// A request to execute a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the LLM's tool_call.id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value
    pub arguments: serde_json::Value,
}

impl ToolCall {
    /// Decode the provider's string-encoded arguments.
    ///
    /// Unparseable argument text becomes an empty object; the tool then
    /// reports the missing argument in its own status text.
    pub fn from_message_call(tc: &MessageToolCall) -> Self {
        let arguments = serde_json::from_str(&tc.arguments)
            .unwrap_or_else(|_| serde_json::Value::Object(serde_json::Map::new()));
        Self {
            id: tc.id.clone(),
            name: tc.name.clone(),
            arguments,
        }
    }

    pub fn to_message_call(&self) -> MessageToolCall {
        MessageToolCall {
            id: self.id.clone(),
            name: self.name.clone(),
            arguments: self.arguments.to_string(),
        }
    }

    /// String argument by key, if present.
    pub fn str_arg(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(|v| v.as_str())
    }
}

/// The result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the tool executed successfully
    pub success: bool,

    /// The wire-format output, starting with a status glyph
    pub output: String,

    /// Optional structured data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ToolResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self { success: true, output: output.into(), data: None }
    }

    pub fn failed(output: impl Into<String>) -> Self {
        Self { success: false, output: output.into(), data: None }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// The core Tool trait.
///
/// Each capability (code execution, shell, web search, memory search/add)
/// implements this trait and is registered in a [`ToolRegistry`].
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "execute_shell_command").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments.
    async fn execute(&self, arguments: serde_json::Value) -> std::result::Result<ToolResult, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Outcome of routing one tool call through the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    /// The tool ran; `output` is its wire text.
    Completed { output: String, success: bool },
    /// No tool with the requested name is registered.
    Unknown,
}

impl Dispatched {
    /// The text appended to the conversation for this call.
    pub fn message_text(&self, tool_name: &str) -> String {
        match self {
            Dispatched::Completed { output, .. } => output.clone(),
            Dispatched::Unknown => unknown_tool_message(tool_name),
        }
    }
}

/// Tool-result text reported back to the model for an unregistered name.
pub fn unknown_tool_message(tool_name: &str) -> String {
    format!("{ERROR_MARKER} Unknown tool: {tool_name}")
}

/// A registry of available tools. Also the dispatcher.
///
/// Each specialist loop owns its own registry, which doubles as the toolset
/// bound to the model. Tools are shared behind `Arc` so one capability
/// instance can sit in several registries.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: BTreeMap::new() }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Builder-style registration.
    pub fn with(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Tool definitions for the LLM, ordered by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    /// Route a tool call without ever failing outward.
    pub async fn dispatch(&self, call: &ToolCall) -> Dispatched {
        let Some(tool) = self.tools.get(&call.name) else {
            warn!(tool = %call.name, call_id = %call.id, "Model requested an unknown tool");
            return Dispatched::Unknown;
        };

        debug!(tool = %call.name, call_id = %call.id, "Dispatching tool call");
        match tool.execute(call.arguments.clone()).await {
            Ok(result) => Dispatched::Completed {
                output: result.output,
                success: result.success,
            },
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool execution failed");
                Dispatched::Completed {
                    output: format!("{ERROR_MARKER} Error: {e}"),
                    success: false,
                }
            }
        }
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
