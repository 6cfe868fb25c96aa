//! The agent loops of JARVIS.
//!
//! Every specialist is built on the same primitive, [`ToolLoop`]:
//!
//! 1. **Seed** a conversation with a system prompt and the task
//! 2. **Send to LLM** with the agent's toolset bound
//! 3. **If tool calls**: execute them in order, append results, go to 2
//! 4. **If text**: the loop is done
//!
//! The [`Orchestrator`] asks the [`AnalystLoop`] where a request should go,
//! hands it to the [`CommandLoop`] or the [`CliLoop`], records the outcome
//! in memory and formats the final answer.

pub mod analyst;
pub mod cli;
pub mod command;
pub mod orchestrator;
pub mod report;
pub mod tool_loop;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use analyst::{AgentKind, AnalystLoop, Decision, extract_decision};
pub use cli::{CliLoop, CliState, CommandRecord};
pub use command::{CommandLoop, CommandPhase, CommandState, MAX_DEBUG_RETRIES, next_phase};
pub use orchestrator::{MAX_ITERATIONS, Orchestrator, OrchestratorState, Route, should_continue};
pub use report::{AgentResult, format_final_answer};
pub use tool_loop::{LoopState, ToolLoop, ToolOutcome};
