//! Console rendering of agent events.

use jarvis_core::event::{DomainEvent, EventBus};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

const PREVIEW_CHARS: usize = 300;

/// Print events to stderr until the bus closes.
pub fn spawn(bus: &EventBus) -> JoinHandle<()> {
    tokio::spawn(pump(bus.subscribe(), false))
}

/// Print events to stderr until the next final answer, which ends the task.
///
/// Subscribe before the request starts; awaiting the handle after the
/// request returns guarantees every progress line is out first.
pub fn spawn_until_answer(bus: &EventBus) -> JoinHandle<()> {
    tokio::spawn(pump(bus.subscribe(), true))
}

async fn pump(mut rx: broadcast::Receiver<Arc<DomainEvent>>, stop_at_answer: bool) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                if let Some(line) = describe(&event) {
                    eprintln!("{line}");
                }
                if stop_at_answer && matches!(event.as_ref(), DomainEvent::FinalAnswer { .. }) {
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => eprintln!("  ... {skipped} events skipped"),
            Err(RecvError::Closed) => break,
        }
    }
}

/// One console line per event; `None` for events shown elsewhere.
pub fn describe(event: &DomainEvent) -> Option<String> {
    let line = match event {
        DomainEvent::AgentStarted { agent, task, .. } => {
            format!("\n🤖 [{agent}] {}", preview(task))
        }
        DomainEvent::Progress { message } => format!("⏳ {message}"),
        DomainEvent::ToolStarted { tool_name, .. } => format!("  🔧 {tool_name}"),
        DomainEvent::ToolFinished {
            tool_name,
            output: Some(output),
            duration_ms,
            ..
        } => format!("  📎 {tool_name} ({duration_ms} ms)\n{}", indent(&preview(output))),
        DomainEvent::ToolFinished { .. } => return None,
        DomainEvent::CodeGenerated { code } => format!("  💻 Code:\n{}", indent(&preview(code))),
        DomainEvent::CodeExecuted { result } => {
            format!("  {} Result:\n{}", result.marker(), indent(&preview(&result.output)))
        }
        DomainEvent::DebugAttempt { attempt, max_attempts } => {
            format!("  🐛 Debug attempt {attempt}/{max_attempts}")
        }
        DomainEvent::CodeReviewed { review } => format!("  📋 Review:\n{}", indent(&preview(review))),
        DomainEvent::CommandExecuted { command, result } => {
            format!("  {} $ {command}", result.marker())
        }
        DomainEvent::DecisionMade { agent, reasoning, task } => {
            format!("  🧭 Route: {agent} ({reasoning})\n  Task: {}", preview(task))
        }
        DomainEvent::MemorySaved { id, agent } => format!("  💾 Saved to memory #{id} ({agent})"),
        DomainEvent::ErrorOccurred { context, error_message } => {
            format!("  ⚠️ {context}: {error_message}")
        }
        DomainEvent::FinalAnswer { .. } => return None,
    };
    Some(line)
}

fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let head: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

fn indent(text: &str) -> String {
    text.lines().map(|l| format!("     {l}")).collect::<Vec<_>>().join("\n")
}
