//! Agent event stream: progress reporting decoupled from the loops.
//!
//! Loops publish what they are doing; front-ends subscribe and render it.
//! Nothing in the engine depends on anyone listening.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use crate::execution::ExecutionResult;

/// All agent events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A loop received its task
    AgentStarted {
        agent: String,
        task: String,
        timestamp: DateTime<Utc>,
    },

    /// Orchestrator progress note
    Progress { message: String },

    /// A tool call is about to be dispatched
    ToolStarted {
        agent: String,
        tool_name: String,
        arguments: serde_json::Value,
    },

    /// A tool call returned
    ToolFinished {
        agent: String,
        tool_name: String,
        success: bool,
        /// Result text for search tools, where the content itself is the news
        output: Option<String>,
        duration_ms: u64,
    },

    /// Code submitted for execution (by the model or the debugger)
    CodeGenerated { code: String },

    /// Code execution outcome
    CodeExecuted { result: ExecutionResult },

    /// A debug cycle attempt started
    DebugAttempt { attempt: u32, max_attempts: u32 },

    /// The reviewer's critique
    CodeReviewed { review: String },

    /// A shell command ran
    CommandExecuted {
        command: String,
        result: ExecutionResult,
    },

    /// The analyst routed the request
    DecisionMade {
        agent: String,
        reasoning: String,
        task: String,
    },

    /// A record was written to memory
    MemorySaved { id: u64, agent: String },

    /// Something failed but the run continues
    ErrorOccurred {
        context: String,
        error_message: String,
    },

    /// The formatted answer for the user
    FinalAnswer {
        answer: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
/// A lagging subscriber loses old events rather than slowing the loops.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn event_bus_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(DomainEvent::ToolFinished {
            agent: "cli_agent".into(),
            tool_name: "execute_shell_command".into(),
            success: true,
            output: None,
            duration_ms: 42,
        });

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            DomainEvent::ToolFinished { tool_name, success, .. } => {
                assert_eq!(tool_name, "execute_shell_command");
                assert!(success);
            }
            _ => panic!("Expected ToolFinished event"),
        }
    }

    #[test]
    fn event_bus_no_subscribers_doesnt_panic() {
        let bus = EventBus::new(16);
        assert_eq!(bus.subscriber_count(), 0);
        bus.publish(DomainEvent::Progress { message: "Routing to Analyst...".into() });
    }

    #[tokio::test]
    async fn events_arrive_in_publish_order() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(DomainEvent::DebugAttempt { attempt: 1, max_attempts: 3 });
        bus.publish(DomainEvent::CodeExecuted { result: ExecutionResult::success("42") });

        assert!(matches!(rx.recv().await.unwrap().as_ref(), DomainEvent::DebugAttempt { attempt: 1, .. }));
        assert!(matches!(rx.recv().await.unwrap().as_ref(), DomainEvent::CodeExecuted { .. }));
    }
}
