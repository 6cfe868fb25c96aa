//! # JARVIS Core
//!
//! Domain types, traits, and error definitions for the JARVIS multi-agent
//! orchestrator. This crate has **no framework dependencies**: it defines
//! the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external capability is a trait here (`Provider`, `Tool`,
//! `MemoryBackend`, `Embedder`). Implementations live in their respective
//! crates, which lets tests drive the loops with scripted stand-ins.

pub mod error;
pub mod event;
pub mod execution;
pub mod memory;
pub mod message;
pub mod prompt;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use event::{DomainEvent, EventBus};
pub use execution::{ExecStatus, ExecutionResult};
pub use memory::{Embedder, MemoryBackend, MemoryRecord, Metadata};
pub use message::{Conversation, ConversationId, Message, Role};
pub use prompt::{PromptLoader, PromptTemplate};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Turn};
pub use tool::{Dispatched, Tool, ToolCall, ToolRegistry, ToolResult};
