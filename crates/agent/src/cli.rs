//! CLI loop: proposes and runs shell commands.
//!
//! No repair cycle here. Every executed command is recorded in order with
//! its parsed status, and the loop ends when the model stops calling tools.

use chrono::Utc;
use jarvis_core::event::DomainEvent;
use jarvis_core::execution::{ExecutionResult, parse_shell_output};
use jarvis_core::prompt::PromptLoader;
use jarvis_tools::names::EXECUTE_SHELL_COMMAND;
use serde::{Deserialize, Serialize};
use tracing::info;
use crate::tool_loop::{ToolLoop, ToolOutcome};

/// One executed command and its outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRecord {
    pub command: String,
    pub result: ExecutionResult,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CliState {
    pub task: String,
    /// Commands in execution order
    pub commands: Vec<String>,
    /// One record per entry of `commands`
    pub results: Vec<CommandRecord>,
}

/// Commands executed by one step, appended on apply.
#[derive(Debug, Clone, Default)]
pub struct CliDelta {
    pub records: Vec<CommandRecord>,
}

impl CliState {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            ..Self::default()
        }
    }

    pub fn apply(mut self, delta: CliDelta) -> Self {
        for record in delta.records {
            self.commands.push(record.command.clone());
            self.results.push(record);
        }
        self
    }
}

pub struct CliLoop {
    tool_loop: ToolLoop,
    prompts: PromptLoader,
}

impl CliLoop {
    pub fn new(tool_loop: ToolLoop, prompts: PromptLoader) -> Self {
        Self { tool_loop, prompts }
    }

    pub async fn run(&self, task: &str) -> jarvis_core::Result<CliState> {
        self.tool_loop.event_bus().publish(DomainEvent::AgentStarted {
            agent: self.tool_loop.agent().to_string(),
            task: task.to_string(),
            timestamp: Utc::now(),
        });

        let mut state = CliState::new(task);
        let prompt = self.prompts.load("cli_agent")?;
        let mut conversation = self.tool_loop.begin(&prompt.system, task).await?;

        while conversation.has_pending_calls() {
            let (next, outcomes) = self.tool_loop.call_tools(conversation).await?;
            conversation = next;
            state = state.apply(self.records(&outcomes));
        }

        info!(
            commands = state.commands.len(),
            failed = state.results.iter().filter(|r| r.result.is_error()).count(),
            "CLI loop finished"
        );
        Ok(state)
    }

    fn records(&self, outcomes: &[ToolOutcome]) -> CliDelta {
        let records = outcomes
            .iter()
            .filter(|o| o.ran(EXECUTE_SHELL_COMMAND))
            .map(|o| {
                let record = CommandRecord {
                    command: o.call.str_arg("command").unwrap_or_default().to_string(),
                    result: parse_shell_output(o.output().unwrap_or_default()),
                };
                self.tool_loop.event_bus().publish(DomainEvent::CommandExecuted {
                    command: record.command.clone(),
                    result: record.result.clone(),
                });
                record
            })
            .collect();
        CliDelta { records }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use jarvis_core::event::EventBus;
    use jarvis_core::tool::ToolRegistry;
    use std::sync::Arc;

    fn cli_loop(provider: Arc<SequentialMockProvider>, tools: ToolRegistry) -> CliLoop {
        CliLoop::new(
            ToolLoop::new("cli_agent", provider, "m", 0.7, tools, Arc::new(EventBus::default())),
            PromptLoader::builtin(),
        )
    }

    fn shell(id: &str, command: &str) -> jarvis_core::message::MessageToolCall {
        make_tool_call(id, "execute_shell_command", serde_json::json!({ "command": command }))
    }

    #[tokio::test]
    async fn records_each_command_in_order() {
        let tool = Arc::new(ScriptedTool::new(
            "execute_shell_command",
            &["✅ a.txt\nb.txt", "❌ Error: ls: cannot access 'nope'", "✅ Command completed (no output)"],
        ));
        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_tool_call_response(vec![shell("1", "ls"), shell("2", "ls nope")], ""),
            make_tool_call_response(vec![shell("3", "touch c.txt")], ""),
            make_text_response("Listed the files."),
        ]));
        let lp = cli_loop(provider, ToolRegistry::new().with(tool));

        let state = lp.run("list files").await.unwrap();
        assert_eq!(state.commands, vec!["ls", "ls nope", "touch c.txt"]);
        assert_eq!(state.results.len(), 3);
        assert_eq!(state.results[0].result, ExecutionResult::success("a.txt\nb.txt"));
        assert_eq!(state.results[1].result, ExecutionResult::error("ls: cannot access 'nope'"));
        assert!(state.results[2].result.is_success());
    }

    #[tokio::test]
    async fn timeout_is_an_error_record() {
        let tool = Arc::new(ScriptedTool::new("execute_shell_command", &["❌ Error: Command timeout (30s)"]));
        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_tool_call_response(vec![shell("1", "sleep 100")], ""),
            make_text_response("It timed out."),
        ]));
        let lp = cli_loop(provider, ToolRegistry::new().with(tool));

        let state = lp.run("wait").await.unwrap();
        assert_eq!(state.results[0].result, ExecutionResult::error("Command timeout (30s)"));
    }

    #[tokio::test]
    async fn no_tool_calls_means_no_records() {
        let provider = Arc::new(SequentialMockProvider::single_text("Nothing to run."));
        let lp = cli_loop(provider, ToolRegistry::new());
        let state = lp.run("noop").await.unwrap();
        assert!(state.commands.is_empty());
        assert!(state.results.is_empty());
    }

    #[tokio::test]
    async fn unknown_and_search_tools_are_not_recorded() {
        let search = Arc::new(ScriptedTool::new("search_web", &["🔍 Nothing found on the web."]));
        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_tool_call_response(
                vec![
                    make_tool_call("1", "search_web", serde_json::json!({"query": "git"})),
                    make_tool_call("2", "rm_rf", serde_json::json!({})),
                ],
                "",
            ),
            make_text_response("done"),
        ]));
        let lp = cli_loop(provider, ToolRegistry::new().with(search));
        let state = lp.run("t").await.unwrap();
        assert!(state.results.is_empty());
    }
}
