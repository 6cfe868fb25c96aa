//! The single-agent tool loop.
//!
//! 1. Seed a conversation with a system prompt and the user text
//! 2. Send it to the LLM with the loop's toolset bound
//! 3. If the model answers, stop
//! 4. Otherwise run every requested tool, append the results, go to 2
//!
//! There is no iteration cap here; the specialist loops that embed this
//! primitive bound it from outside.

use std::sync::Arc;
use std::time::Instant;
use jarvis_core::event::{DomainEvent, EventBus};
use jarvis_core::message::{Conversation, Message};
use jarvis_core::provider::{Provider, ProviderRequest, Turn};
use jarvis_core::tool::{Dispatched, ToolCall, ToolRegistry};
use jarvis_tools::names::{SEARCH_MEMORY, SEARCH_WEB};
use tracing::{debug, info, warn};

/// A conversation in flight plus the model's latest turn.
#[derive(Debug, Clone)]
pub struct LoopState {
    pub conversation: Conversation,
    pub turn: Turn,
}

impl LoopState {
    pub fn has_pending_calls(&self) -> bool {
        self.turn.has_tool_calls()
    }
}

/// One dispatched call and what came back.
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub call: ToolCall,
    pub dispatched: Dispatched,
}

impl ToolOutcome {
    /// The wire text if the tool ran, `None` for an unknown tool.
    pub fn output(&self) -> Option<&str> {
        match &self.dispatched {
            Dispatched::Completed { output, .. } => Some(output),
            Dispatched::Unknown => None,
        }
    }

    /// Whether this is a completed call to the named tool.
    pub fn ran(&self, tool_name: &str) -> bool {
        self.call.name == tool_name && self.output().is_some()
    }
}

/// The LLM-plus-tools loop shared by every specialist.
pub struct ToolLoop {
    /// Agent label used in events and logs
    agent: String,
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    tools: ToolRegistry,
    event_bus: Arc<EventBus>,
}

impl ToolLoop {
    pub fn new(
        agent: impl Into<String>,
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        temperature: f32,
        tools: ToolRegistry,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            agent: agent.into(),
            provider,
            model: model.into(),
            temperature,
            tools,
            event_bus,
        }
    }

    pub fn agent(&self) -> &str {
        &self.agent
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    /// Run to completion and return the model's final text.
    pub async fn run(&self, system: &str, user: &str) -> jarvis_core::Result<String> {
        let mut state = self.begin(system, user).await?;
        while state.has_pending_calls() {
            let (next, _) = self.call_tools(state).await?;
            state = next;
        }
        Ok(state.turn.content().to_string())
    }

    /// Seed the conversation and take the first turn.
    pub async fn begin(&self, system: &str, user: &str) -> jarvis_core::Result<LoopState> {
        info!(agent = %self.agent, tools = ?self.tools.names(), "Tool loop started");
        let conversation = Conversation::seeded(system, user);
        let turn = self.invoke(&conversation).await?;
        Ok(LoopState { conversation, turn })
    }

    /// Execute the pending calls of the latest turn, then re-invoke the model.
    ///
    /// Calls run sequentially in the order the model listed them. A state
    /// without pending calls is returned unchanged.
    pub async fn call_tools(&self, state: LoopState) -> jarvis_core::Result<(LoopState, Vec<ToolOutcome>)> {
        let LoopState { mut conversation, turn } = state;
        let calls = match &turn {
            Turn::ToolCalls { calls, .. } => calls.clone(),
            Turn::Answer(_) => Vec::new(),
        };
        if calls.is_empty() {
            return Ok((LoopState { conversation, turn }, Vec::new()));
        }

        debug!(agent = %self.agent, tool_count = calls.len(), "Executing tool calls");
        conversation.push(turn.to_message());

        let mut outcomes = Vec::with_capacity(calls.len());
        for call in &calls {
            let dispatched = self.dispatch(call).await;
            conversation.push(Message::tool_result(&call.id, dispatched.message_text(&call.name)));
            outcomes.push(ToolOutcome {
                call: call.clone(),
                dispatched,
            });
        }

        let turn = self.invoke(&conversation).await?;
        Ok((LoopState { conversation, turn }, outcomes))
    }

    /// A single completion with no tools bound.
    pub async fn ask(&self, system: &str, user: &str) -> jarvis_core::Result<String> {
        let conversation = Conversation::seeded(system, user);
        let response = self.provider.complete(self.request(&conversation, false)).await?;
        Ok(response.message.content)
    }

    async fn invoke(&self, conversation: &Conversation) -> jarvis_core::Result<Turn> {
        debug!(agent = %self.agent, messages = conversation.len(), "Calling model");
        let response = self.provider.complete(self.request(conversation, true)).await?;
        let turn = response.turn();
        if let Turn::ToolCalls { calls, .. } = &turn {
            debug!(
                agent = %self.agent,
                calls = ?calls.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
                "Model requested tools"
            );
        }
        Ok(turn)
    }

    async fn dispatch(&self, call: &ToolCall) -> Dispatched {
        self.event_bus.publish(DomainEvent::ToolStarted {
            agent: self.agent.clone(),
            tool_name: call.name.clone(),
            arguments: call.arguments.clone(),
        });

        let start = Instant::now();
        let dispatched = self.tools.dispatch(call).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match &dispatched {
            Dispatched::Completed { output, success } => {
                // Search results are the point of a search call, so they are shown
                let shown = [SEARCH_MEMORY, SEARCH_WEB].contains(&call.name.as_str());
                self.event_bus.publish(DomainEvent::ToolFinished {
                    agent: self.agent.clone(),
                    tool_name: call.name.clone(),
                    success: *success,
                    output: shown.then(|| output.clone()),
                    duration_ms,
                });
            }
            Dispatched::Unknown => {
                warn!(agent = %self.agent, tool = %call.name, "Skipping unknown tool");
                self.event_bus.publish(DomainEvent::ErrorOccurred {
                    context: self.agent.clone(),
                    error_message: format!("Unknown tool: {}", call.name),
                });
            }
        }
        dispatched
    }

    fn request(&self, conversation: &Conversation, with_tools: bool) -> ProviderRequest {
        ProviderRequest {
            model: self.model.clone(),
            messages: conversation.messages.clone(),
            temperature: self.temperature,
            max_tokens: None,
            tools: if with_tools { self.tools.definitions() } else { Vec::new() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use jarvis_core::message::Role;

    fn tool_loop(provider: Arc<SequentialMockProvider>, tools: ToolRegistry) -> ToolLoop {
        ToolLoop::new("tester", provider, "mock-model", 0.7, tools, Arc::new(EventBus::default()))
    }

    #[tokio::test]
    async fn answer_without_tools_ends_loop() {
        let provider = Arc::new(SequentialMockProvider::single_text("Hello!"));
        let lp = tool_loop(provider.clone(), ToolRegistry::new());

        let answer = lp.run("system", "hi").await.unwrap();
        assert_eq!(answer, "Hello!");
        assert_eq!(provider.call_count(), 1);

        let request = &provider.requests()[0];
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(request.messages[1].content, "hi");
        assert!((request.temperature - 0.7).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn tool_results_are_fed_back_by_call_id() {
        let tool = Arc::new(ScriptedTool::new("execute_shell_command", &["✅ file.txt"]));
        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_tool_call_response(
                vec![make_tool_call("call_7", "execute_shell_command", serde_json::json!({"command": "ls"}))],
                "Let me look",
            ),
            make_text_response("There is one file."),
        ]));
        let lp = tool_loop(provider.clone(), ToolRegistry::new().with(tool.clone()));

        let answer = lp.run("system", "list files").await.unwrap();
        assert_eq!(answer, "There is one file.");
        assert_eq!(tool.seen(), vec![serde_json::json!({"command": "ls"})]);

        // system, user, assistant(calls), tool
        let second = &provider.requests()[1];
        assert_eq!(second.messages.len(), 4);
        assert_eq!(second.messages[2].tool_calls[0].id, "call_7");
        assert_eq!(second.messages[3].role, Role::Tool);
        assert_eq!(second.messages[3].tool_call_id.as_deref(), Some("call_7"));
        assert_eq!(second.messages[3].content, "✅ file.txt");
        assert_eq!(second.tools.len(), 1);
    }

    #[tokio::test]
    async fn unknown_tool_gets_explicit_error_result() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_tool_call_response(
                vec![make_tool_call("call_1", "format_disk", serde_json::json!({}))],
                "",
            ),
            make_text_response("ok"),
        ]));
        let lp = tool_loop(provider.clone(), ToolRegistry::new());

        let state = lp.begin("system", "do it").await.unwrap();
        let (state, outcomes) = lp.call_tools(state).await.unwrap();

        assert!(!state.has_pending_calls());
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].dispatched, Dispatched::Unknown);
        assert!(!outcomes[0].ran("format_disk"));

        let tool_msg = &provider.requests()[1].messages[3];
        assert_eq!(tool_msg.content, "❌ Unknown tool: format_disk");
        assert_eq!(tool_msg.tool_call_id.as_deref(), Some("call_1"));
    }

    #[tokio::test]
    async fn call_tools_without_pending_calls_is_a_no_op() {
        let provider = Arc::new(SequentialMockProvider::single_text("done"));
        let lp = tool_loop(provider.clone(), ToolRegistry::new());

        let state = lp.begin("s", "u").await.unwrap();
        let (state, outcomes) = lp.call_tools(state).await.unwrap();
        assert!(outcomes.is_empty());
        assert_eq!(state.turn, Turn::Answer("done".into()));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn ask_binds_no_tools() {
        let tool = Arc::new(ScriptedTool::new("search_web", &[]));
        let provider = Arc::new(SequentialMockProvider::single_text("print(1)"));
        let lp = tool_loop(provider.clone(), ToolRegistry::new().with(tool));

        assert_eq!(lp.ask("fix it", "code").await.unwrap(), "print(1)");
        assert!(provider.requests()[0].tools.is_empty());
    }

    #[tokio::test]
    async fn events_report_search_output_only() {
        let search = Arc::new(ScriptedTool::new("search_memory", &["🧠 Found in memory history:\n"]));
        let shell = Arc::new(ScriptedTool::new("execute_shell_command", &["✅ secret"]));
        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_tool_call_response(
                vec![
                    make_tool_call("a", "search_memory", serde_json::json!({"query": "q"})),
                    make_tool_call("b", "execute_shell_command", serde_json::json!({"command": "x"})),
                ],
                "",
            ),
            make_text_response("done"),
        ]));
        let bus = Arc::new(EventBus::default());
        let mut rx = bus.subscribe();
        let lp = ToolLoop::new(
            "tester",
            provider,
            "mock-model",
            0.7,
            ToolRegistry::new().with(search).with(shell),
            bus,
        );
        lp.run("s", "u").await.unwrap();

        let mut finished = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let DomainEvent::ToolFinished { tool_name, output, .. } = event.as_ref() {
                finished.push((tool_name.clone(), output.clone()));
            }
        }
        assert_eq!(finished.len(), 2);
        assert!(finished[0].1.is_some());
        assert_eq!(finished[1], ("execute_shell_command".to_string(), None));
    }
}
