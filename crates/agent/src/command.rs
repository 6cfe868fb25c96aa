//! Command loop: writes and runs Python code, repairs failures, reviews.
//!
//! ```text
//! start ──▶ call_tools ⟲ ──▶ debug ⟲ ──▶ review
//!   └───────────────────────────────────▲
//! ```
//!
//! After every step the same transition rule picks the next phase (see
//! [`next_phase`]). The debug cycle runs at most [`MAX_DEBUG_RETRIES`] times.

use chrono::Utc;
use jarvis_core::event::DomainEvent;
use jarvis_core::execution::{ExecutionResult, parse_code_output};
use jarvis_core::prompt::PromptLoader;
use jarvis_core::tool::{Dispatched, ToolCall};
use jarvis_tools::names::EXECUTE_PYTHON_CODE;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use crate::tool_loop::{LoopState, ToolLoop, ToolOutcome};

/// Debug cycle attempts allowed per run.
pub const MAX_DEBUG_RETRIES: u32 = 3;

/// What the command loop knows about its task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandState {
    pub task: String,
    /// The most recently executed code
    pub code: Option<String>,
    /// Outcome of running `code`
    pub result: Option<ExecutionResult>,
    pub review: Option<String>,
    /// Debug cycle attempts so far
    pub retry_count: u32,
}

/// Changes produced by one step. `None` leaves a field as it was.
#[derive(Debug, Clone, Default)]
pub struct CommandDelta {
    pub code: Option<String>,
    pub result: Option<ExecutionResult>,
    pub review: Option<String>,
    pub retry_count: Option<u32>,
}

impl CommandState {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            ..Self::default()
        }
    }

    pub fn apply(self, delta: CommandDelta) -> Self {
        Self {
            task: self.task,
            code: delta.code.or(self.code),
            result: delta.result.or(self.result),
            review: delta.review.or(self.review),
            retry_count: delta.retry_count.unwrap_or(self.retry_count),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandPhase {
    CallTools,
    Debug,
    Review,
}

/// The transition rule applied after every step.
///
/// Pending tool calls are served first. A failing result is debugged while
/// attempts remain. Everything else goes to review.
pub fn next_phase(pending_tool_calls: bool, result: Option<&ExecutionResult>, retry_count: u32) -> CommandPhase {
    if pending_tool_calls {
        return CommandPhase::CallTools;
    }
    match result {
        Some(r) if r.is_error() && retry_count < MAX_DEBUG_RETRIES => CommandPhase::Debug,
        _ => CommandPhase::Review,
    }
}

/// Strip a surrounding ``` or ```python fence from model output.
pub fn clean_code_block(text: &str) -> String {
    let mut code = text.trim();
    if let Some(rest) = code.strip_prefix("```python") {
        code = rest.trim();
    } else if let Some(rest) = code.strip_prefix("```") {
        code = rest.trim();
    }
    if let Some(rest) = code.strip_suffix("```") {
        code = rest.trim();
    }
    code.to_string()
}

pub struct CommandLoop {
    tool_loop: ToolLoop,
    prompts: PromptLoader,
}

impl CommandLoop {
    pub fn new(tool_loop: ToolLoop, prompts: PromptLoader) -> Self {
        Self { tool_loop, prompts }
    }

    /// Run the task to review and return the final state.
    pub async fn run(&self, task: &str) -> jarvis_core::Result<CommandState> {
        self.publish(DomainEvent::AgentStarted {
            agent: self.tool_loop.agent().to_string(),
            task: task.to_string(),
            timestamp: Utc::now(),
        });

        let mut state = CommandState::new(task);
        let prompt = self.prompts.load("command_agent")?;
        let mut conversation = self.tool_loop.begin(&prompt.system, task).await?;

        let mut phase = if conversation.has_pending_calls() {
            CommandPhase::CallTools
        } else {
            CommandPhase::Review
        };

        loop {
            debug!(?phase, retry_count = state.retry_count, "Command loop step");
            match phase {
                CommandPhase::CallTools => {
                    let (next, delta) = self.call_tools(conversation).await?;
                    conversation = next;
                    state = state.apply(delta);
                }
                CommandPhase::Debug => {
                    let delta = self.debug(&state).await?;
                    state = state.apply(delta);
                }
                CommandPhase::Review => {
                    let delta = self.review(&state).await?;
                    state = state.apply(delta);
                    break;
                }
            }
            phase = next_phase(conversation.has_pending_calls(), state.result.as_ref(), state.retry_count);
        }

        info!(
            success = state.result.as_ref().is_some_and(|r| r.is_success()),
            retry_count = state.retry_count,
            "Command loop finished"
        );
        Ok(state)
    }

    /// Run the pending calls; the last code execution in the turn wins.
    async fn call_tools(&self, conversation: LoopState) -> jarvis_core::Result<(LoopState, CommandDelta)> {
        let (next, outcomes) = self.tool_loop.call_tools(conversation).await?;
        let mut delta = CommandDelta::default();

        for outcome in outcomes.iter().filter(|o| o.ran(EXECUTE_PYTHON_CODE)) {
            let (code, result) = self.code_outcome(outcome);
            delta.code = Some(code);
            delta.result = Some(result);
        }
        Ok((next, delta))
    }

    fn code_outcome(&self, outcome: &ToolOutcome) -> (String, ExecutionResult) {
        let code = outcome.call.str_arg("code").unwrap_or_default().to_string();
        let result = parse_code_output(outcome.output().unwrap_or_default());
        self.publish(DomainEvent::CodeGenerated { code: code.clone() });
        self.publish(DomainEvent::CodeExecuted { result: result.clone() });
        (code, result)
    }

    /// One debug cycle attempt: ask for a fix, run it directly.
    async fn debug(&self, state: &CommandState) -> jarvis_core::Result<CommandDelta> {
        let attempt = state.retry_count + 1;
        warn!(attempt, max = MAX_DEBUG_RETRIES, "Code failed, starting debug attempt");
        self.publish(DomainEvent::DebugAttempt {
            attempt,
            max_attempts: MAX_DEBUG_RETRIES,
        });

        let code = state.code.as_deref().unwrap_or_default();
        let error = state.result.as_ref().map(|r| r.output.as_str()).unwrap_or_default();
        let prompt = self
            .prompts
            .format("code_debugger", &[("code", code), ("error", error)])?;

        let fixed = clean_code_block(&self.tool_loop.ask(&prompt.system, &prompt.user).await?);
        self.publish(DomainEvent::CodeGenerated { code: fixed.clone() });

        let call = ToolCall {
            id: format!("debug_{}", uuid::Uuid::new_v4()),
            name: EXECUTE_PYTHON_CODE.to_string(),
            arguments: serde_json::json!({ "code": fixed }),
        };

        let mut delta = CommandDelta {
            retry_count: Some(attempt),
            ..CommandDelta::default()
        };

        match self.tool_loop.tools().dispatch(&call).await {
            Dispatched::Completed { output, .. } => {
                let result = parse_code_output(&output);
                self.publish(DomainEvent::CodeExecuted { result: result.clone() });
                delta.code = Some(fixed);
                delta.result = Some(result);
            }
            Dispatched::Unknown => {
                warn!(attempt, "Code execution tool is not registered, debug attempt wasted");
            }
        }
        Ok(delta)
    }

    async fn review(&self, state: &CommandState) -> jarvis_core::Result<CommandDelta> {
        let code = state.code.as_deref().unwrap_or_default();
        let result = state
            .result
            .as_ref()
            .map_or("(not executed)", |r| r.output.as_str());
        let prompt = self
            .prompts
            .format("code_reviewer", &[("code", code), ("result", result)])?;

        let review = self.tool_loop.ask(&prompt.system, &prompt.user).await?;
        self.publish(DomainEvent::CodeReviewed { review: review.clone() });

        Ok(CommandDelta {
            review: Some(review),
            ..CommandDelta::default()
        })
    }

    fn publish(&self, event: DomainEvent) {
        self.tool_loop.event_bus().publish(event);
    }
}
