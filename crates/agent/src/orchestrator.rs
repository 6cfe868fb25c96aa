//! Top-level routing of a user request.
//!
//! ```text
//! User request
//!       │
//!       ▼
//! ┌───────────┐
//! │  Analyst  │  ← searches, then decides
//! └──┬─────┬──┘
//!    │     │          FINISH ──────────────┐
//!    ▼     ▼                               │
//! ┌─────┐ ┌─────┐                          │
//! │ Cmd │ │ CLI │  ← result saved to memory│
//! └──┬──┘ └──┬──┘                          │
//!    └───┬───┘                             │
//!        ▼                                 │
//!   final answer  ◄────────────────────────┘
//! ```
//!
//! A single pass: the analyst runs once per request and the specialist's
//! outcome is formatted directly. The iteration cap still guards routing.

use std::sync::Arc;
use chrono::Utc;
use jarvis_config::AppConfig;
use jarvis_core::event::{DomainEvent, EventBus};
use jarvis_core::memory::{MemoryBackend, agent_metadata};
use jarvis_core::prompt::PromptLoader;
use jarvis_core::provider::Provider;
use jarvis_tools::Toolsets;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::analyst::{AgentKind, AnalystLoop, Decision};
use crate::cli::{CliLoop, CliState};
use crate::command::{CommandLoop, CommandState};
use crate::report::{AgentResult, format_final_answer};
use crate::tool_loop::ToolLoop;

/// Maximum analyst invocations per request.
pub const MAX_ITERATIONS: u32 = 5;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorState {
    pub user_input: String,
    pub decision: Option<Decision>,
    pub agent_result: Option<AgentResult>,
    pub final_answer: Option<String>,
    /// Analyst invocations so far
    pub iteration: u32,
}

/// Fields produced by one step. `None` leaves the state's value alone.
#[derive(Debug, Clone, Default)]
pub struct OrchestratorDelta {
    pub decision: Option<Decision>,
    pub agent_result: Option<AgentResult>,
    pub final_answer: Option<String>,
    pub iteration: Option<u32>,
}

impl OrchestratorState {
    pub fn new(user_input: impl Into<String>) -> Self {
        Self {
            user_input: user_input.into(),
            ..Self::default()
        }
    }

    pub fn apply(self, delta: OrchestratorDelta) -> Self {
        Self {
            user_input: self.user_input,
            decision: delta.decision.or(self.decision),
            agent_result: delta.agent_result.or(self.agent_result),
            final_answer: delta.final_answer.or(self.final_answer),
            iteration: delta.iteration.unwrap_or(self.iteration),
        }
    }
}

/// Where the orchestrator goes after the analyst.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Execute,
    Finalize,
}

pub fn should_continue(state: &OrchestratorState) -> Route {
    if state.iteration >= MAX_ITERATIONS {
        return Route::Finalize;
    }
    match &state.decision {
        Some(decision) if decision.agent != AgentKind::Finish => Route::Execute,
        _ => Route::Finalize,
    }
}

pub struct Orchestrator {
    analyst: AnalystLoop,
    command: CommandLoop,
    cli: CliLoop,
    memory: Arc<dyn MemoryBackend>,
    event_bus: Arc<EventBus>,
}

impl Orchestrator {
    pub fn new(
        analyst: AnalystLoop,
        command: CommandLoop,
        cli: CliLoop,
        memory: Arc<dyn MemoryBackend>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            analyst,
            command,
            cli,
            memory,
            event_bus,
        }
    }

    /// Wire the three loops with the configured tools.
    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        memory: Arc<dyn MemoryBackend>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let toolsets = Toolsets::from_config(&config.tools, memory.clone());
        Self::with_toolsets(config, provider, memory, toolsets, event_bus)
    }

    /// Wire the three loops with caller-supplied tools.
    pub fn with_toolsets(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        memory: Arc<dyn MemoryBackend>,
        toolsets: Toolsets,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let prompts = match &config.prompts_dir {
            Some(dir) => PromptLoader::with_dir(dir),
            None => PromptLoader::builtin(),
        };
        let tool_loop = |agent: &str, tools| {
            ToolLoop::new(
                agent,
                provider.clone(),
                &config.model,
                config.temperature,
                tools,
                event_bus.clone(),
            )
        };

        Self::new(
            AnalystLoop::new(tool_loop("analyst", toolsets.analyst), prompts.clone()),
            CommandLoop::new(tool_loop(AgentKind::CommandAgent.as_str(), toolsets.command), prompts.clone()),
            CliLoop::new(tool_loop(AgentKind::CliAgent.as_str(), toolsets.cli), prompts),
            memory,
            event_bus,
        )
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub fn memory(&self) -> &Arc<dyn MemoryBackend> {
        &self.memory
    }

    /// Handle one request and return the formatted answer.
    pub async fn run(&self, task: &str) -> jarvis_core::Result<String> {
        let state = self.run_state(task).await?;
        Ok(state.final_answer.unwrap_or_default())
    }

    /// Handle one request and return the whole final state.
    pub async fn run_state(&self, task: &str) -> jarvis_core::Result<OrchestratorState> {
        info!(task = %task, "Orchestrator started");
        let mut state = OrchestratorState::new(task);

        self.progress("Analyzing the request");
        let delta = self.analyze(&state).await?;
        state = state.apply(delta);

        if should_continue(&state) == Route::Execute {
            let delta = self.execute_agent(&state).await?;
            state = state.apply(delta);
        }

        let delta = self.finalize(&state);
        state = state.apply(delta);
        info!(iteration = state.iteration, "Orchestrator finished");
        Ok(state)
    }

    async fn analyze(&self, state: &OrchestratorState) -> jarvis_core::Result<OrchestratorDelta> {
        let decision = self.analyst.run(&state.user_input).await?;
        Ok(OrchestratorDelta {
            decision: Some(decision),
            iteration: Some(state.iteration + 1),
            ..OrchestratorDelta::default()
        })
    }

    async fn execute_agent(&self, state: &OrchestratorState) -> jarvis_core::Result<OrchestratorDelta> {
        let Some(decision) = &state.decision else {
            return Ok(OrchestratorDelta {
                agent_result: Some(AgentResult::None {
                    message: "No routing decision was made".into(),
                }),
                ..OrchestratorDelta::default()
            });
        };

        let result = match decision.agent {
            AgentKind::CommandAgent => {
                self.progress("Handing over to the command agent");
                let outcome = self.command.run(&decision.task).await?;
                self.remember(command_memory_text(&outcome)?, decision.agent, "code_execution")
                    .await;
                AgentResult::Command(outcome)
            }
            AgentKind::CliAgent => {
                self.progress("Handing over to the CLI agent");
                let outcome = self.cli.run(&decision.task).await?;
                self.remember(cli_memory_text(&outcome)?, decision.agent, "cli_execution")
                    .await;
                AgentResult::Cli(outcome)
            }
            AgentKind::Finish => AgentResult::None {
                message: decision.task.clone(),
            },
        };

        Ok(OrchestratorDelta {
            agent_result: Some(result),
            ..OrchestratorDelta::default()
        })
    }

    fn finalize(&self, state: &OrchestratorState) -> OrchestratorDelta {
        let answer = match &state.decision {
            Some(decision) => format_final_answer(decision, state.agent_result.as_ref()),
            None => "📝 No routing decision was made".to_string(),
        };
        self.event_bus.publish(DomainEvent::FinalAnswer {
            answer: answer.clone(),
            timestamp: Utc::now(),
        });
        OrchestratorDelta {
            final_answer: Some(answer),
            ..OrchestratorDelta::default()
        }
    }

    /// Save a specialist's outcome. Failures are reported, never fatal.
    async fn remember(&self, text: String, agent: AgentKind, action: &str) {
        match self.memory.add(&text, agent_metadata(agent.as_str(), action)).await {
            Ok(id) => {
                info!(id, agent = %agent, action, "Saved to memory");
                self.event_bus.publish(DomainEvent::MemorySaved {
                    id,
                    agent: agent.to_string(),
                });
            }
            Err(e) => {
                warn!(error = %e, agent = %agent, "Failed to save to memory");
                self.event_bus.publish(DomainEvent::ErrorOccurred {
                    context: "memory".into(),
                    error_message: e.to_string(),
                });
            }
        }
    }

    fn progress(&self, message: &str) {
        self.event_bus.publish(DomainEvent::Progress {
            message: message.to_string(),
        });
    }
}

fn command_memory_text(state: &CommandState) -> jarvis_core::Result<String> {
    Ok(format!(
        "Task: {}\nCode: {}\nResult: {}",
        state.task,
        state.code.as_deref().unwrap_or_default(),
        serde_json::to_string(&state.result)?
    ))
}

fn cli_memory_text(state: &CliState) -> jarvis_core::Result<String> {
    Ok(format!(
        "Task: {}\nCommands: {}\nResults: {}",
        state.task,
        serde_json::to_string(&state.commands)?,
        serde_json::to_string(&state.results)?
    ))
}
