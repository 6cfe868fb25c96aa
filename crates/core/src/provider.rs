//! Provider trait: the abstraction over LLM backends.
//!
//! A Provider knows how to send a conversation to an LLM (with a bound
//! toolset) and get a complete response back, and how to embed text for the
//! memory index.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ProviderError;
use crate::message::{Message, MessageToolCall};
use crate::tool::ToolCall;

/// Configuration for a provider request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "gpt-4o")
    pub model: String,

    /// The conversation messages
    pub messages: Vec<Message>,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Tools the model may call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

pub fn default_temperature() -> f32 {
    0.7
}

/// A tool definition sent to the LLM so it knows what tools it can call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// A complete response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The generated message
    pub message: Message,

    /// Token usage statistics
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    pub model: String,
}

impl ProviderResponse {
    /// Classify the response as a final answer or a request for tool calls.
    pub fn turn(&self) -> Turn {
        Turn::from_message(&self.message)
    }
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// What the model decided to do on one turn.
///
/// An assistant message with no tool calls is the terminal `Answer`; any
/// non-empty list of calls is `ToolCalls`.
#[derive(Debug, Clone, PartialEq)]
pub enum Turn {
    Answer(String),
    ToolCalls {
        content: String,
        calls: Vec<ToolCall>,
    },
}

impl Turn {
    pub fn from_message(message: &Message) -> Self {
        if message.tool_calls.is_empty() {
            return Turn::Answer(message.content.clone());
        }
        Turn::ToolCalls {
            content: message.content.clone(),
            calls: message.tool_calls.iter().map(ToolCall::from_message_call).collect(),
        }
    }

    /// The text the model produced on this turn.
    pub fn content(&self) -> &str {
        match self {
            Turn::Answer(text) => text,
            Turn::ToolCalls { content, .. } => content,
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        matches!(self, Turn::ToolCalls { .. })
    }

    /// Rebuild the assistant message that echoes this turn's calls.
    pub fn to_message(&self) -> Message {
        match self {
            Turn::Answer(text) => Message::assistant(text.clone()),
            Turn::ToolCalls { content, calls } => Message::assistant_with_calls(
                content.clone(),
                calls.iter().map(ToolCall::to_message_call).collect::<Vec<MessageToolCall>>(),
            ),
        }
    }
}

/// An embedding request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// The model to use for embeddings (e.g., "text-embedding-3-small").
    pub model: String,

    /// The texts to embed.
    pub inputs: Vec<String>,
}

/// An embedding response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    /// The embedding vectors, one per input text.
    pub embeddings: Vec<Vec<f32>>,

    /// Which model was used.
    pub model: String,
}

/// The core Provider trait.
///
/// Every loop calls `complete()` without knowing which backend answers.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openai").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(&self, request: ProviderRequest) -> std::result::Result<ProviderResponse, ProviderError>;

    /// Generate embeddings for the given texts.
    ///
    /// Default implementation returns an error indicating embeddings aren't supported.
    async fn embed(
        &self,
        _request: EmbeddingRequest,
    ) -> std::result::Result<EmbeddingResponse, ProviderError> {
        Err(ProviderError::NotConfigured(
            format!("Provider '{}' does not support embeddings", self.name()),
        ))
    }
}
