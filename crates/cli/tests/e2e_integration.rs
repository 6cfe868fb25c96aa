//! End-to-end tests for the JARVIS orchestration pipeline.
//!
//! These drive a full request from the analyst through a specialist to the
//! formatted answer, with a scripted model and scripted execution tools.

use std::sync::{Arc, Mutex};

use jarvis_agent::{AgentResult, Orchestrator};
use jarvis_config::AppConfig;
use jarvis_core::error::{ProviderError, ToolError};
use jarvis_core::event::{DomainEvent, EventBus};
use jarvis_core::execution::ExecutionResult;
use jarvis_core::memory::MemoryBackend;
use jarvis_core::message::{Message, MessageToolCall};
use jarvis_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use jarvis_core::tool::{Tool, ToolResult};
use jarvis_memory::{HashEmbedder, VectorMemory};
use jarvis_tools::Toolsets;

// ── Mock Provider ────────────────────────────────────────────────────────

/// A mock provider that returns scripted responses in sequence.
struct ScriptedProvider {
    responses: Mutex<Vec<ProviderResponse>>,
    call_count: Mutex<usize>,
}

impl ScriptedProvider {
    fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            call_count: Mutex::new(0),
        }
    }

    fn calls(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut count = self.call_count.lock().unwrap();
        let responses = self.responses.lock().unwrap();
        if *count >= responses.len() {
            panic!("ScriptedProvider exhausted: call #{}, have {}", *count, responses.len());
        }
        let resp = responses[*count].clone();
        *count += 1;
        Ok(resp)
    }
}

fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock".into(),
    }
}

fn tool_response(tool_calls: Vec<MessageToolCall>) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant_with_calls("", tool_calls),
        usage: None,
        model: "mock".into(),
    }
}

fn make_tool_call(name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: format!("call_{name}"),
        name: name.to_string(),
        arguments: serde_json::to_string(&args).unwrap(),
    }
}

fn decision(agent: &str, task: &str) -> ProviderResponse {
    text_response(&format!(
        "```json\n{{\"agent\": \"{agent}\", \"reasoning\": \"test\", \"task\": \"{task}\"}}\n```"
    ))
}

// ── Fake execution tools ─────────────────────────────────────────────────

/// Replays wire outputs in order, one per call.
struct FakeTool {
    name: &'static str,
    outputs: Mutex<Vec<String>>,
}

impl FakeTool {
    fn new(name: &'static str, outputs: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            name,
            outputs: Mutex::new(outputs.iter().rev().map(|s| s.to_string()).collect()),
        })
    }
}

#[async_trait::async_trait]
impl Tool for FakeTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "fake"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object" })
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let output = self.outputs.lock().unwrap().pop().expect("no more fake outputs");
        let success = output.starts_with('✅');
        Ok(ToolResult { success, output, data: None })
    }
}

struct Harness {
    orchestrator: Orchestrator,
    provider: Arc<ScriptedProvider>,
    memory: Arc<dyn MemoryBackend>,
}

fn harness(responses: Vec<ProviderResponse>, code: &[&str], shell: Arc<dyn Tool>) -> Harness {
    let provider = Arc::new(ScriptedProvider::new(responses));
    let memory: Arc<dyn MemoryBackend> = Arc::new(VectorMemory::new(Arc::new(HashEmbedder::new(128))));
    let toolsets = Toolsets::from_parts(
        FakeTool::new("execute_python_code", code),
        shell,
        FakeTool::new("search_web", &[]),
        FakeTool::new("search_memory", &[]),
    );
    let orchestrator = Orchestrator::with_toolsets(
        &AppConfig::default(),
        provider.clone(),
        memory.clone(),
        toolsets,
        Arc::new(EventBus::default()),
    );
    Harness {
        orchestrator,
        provider,
        memory,
    }
}

fn no_shell() -> Arc<dyn Tool> {
    FakeTool::new("execute_shell_command", &[])
}

// ── Scenario A: code on the first try ────────────────────────────────────

#[tokio::test]
async fn e2e_factorial_runs_code_and_remembers() {
    let h = harness(
        vec![
            decision("command_agent", "compute the factorial of 10 in Python"),
            tool_response(vec![make_tool_call(
                "execute_python_code",
                serde_json::json!({"code": "import math\nprint(math.factorial(10))"}),
            )]),
            text_response("The factorial of 10 is 3628800."),
            text_response("Correct; math.factorial is the idiomatic choice."),
        ],
        &["✅ Executed successfully:\n3628800"],
        no_shell(),
    );

    let answer = h.orchestrator.run("compute factorial of 10 in code").await.unwrap();

    assert!(answer.starts_with("📊 Python code execution result"));
    assert!(answer.contains("✅ Status: Success"));
    assert!(answer.contains("📤 Output:\n3628800\n"));
    assert!(answer.contains("📋 Review:\nCorrect; math.factorial is the idiomatic choice."));
    assert_eq!(h.provider.calls(), 4);

    // Exactly one record, and it is what a later search finds first
    assert_eq!(h.memory.count().await.unwrap(), 1);
    let hits = h.memory.search("compute the factorial of 10 in Python", 3).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].agent(), "command_agent");
    assert_eq!(hits[0].action(), "code_execution");
    assert!(hits[0].text.contains("math.factorial(10)"));
}

// ── Scenario B: two failures then a fix ──────────────────────────────────

#[tokio::test]
async fn e2e_debug_cycle_recovers_on_second_attempt() {
    let h = harness(
        vec![
            decision("command_agent", "print the sum of 1..10"),
            tool_response(vec![make_tool_call(
                "execute_python_code",
                serde_json::json!({"code": "print(sum(range(1, 11))"}),
            )]),
            text_response("That failed."),
            text_response("```python\nprint(sum(range(1, 11)\n```"),
            text_response("```python\nprint(sum(range(1, 11)))\n```"),
            text_response("Fixed the missing parenthesis."),
        ],
        &[
            "❌ Error:\nSyntaxError: '(' was never closed",
            "❌ Error:\nSyntaxError: '(' was never closed",
            "✅ Executed successfully:\n55",
        ],
        no_shell(),
    );
    let mut rx = h.orchestrator.event_bus().subscribe();

    let state = h.orchestrator.run_state("sum one to ten").await.unwrap();

    let Some(AgentResult::Command(command)) = &state.agent_result else {
        panic!("expected a command result, got {:?}", state.agent_result);
    };
    assert_eq!(command.retry_count, 2);
    assert_eq!(command.result, Some(ExecutionResult::success("55")));
    assert_eq!(command.code.as_deref(), Some("print(sum(range(1, 11)))"));
    assert_eq!(h.provider.calls(), 6);

    let mut attempts = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let DomainEvent::DebugAttempt { attempt, .. } = event.as_ref() {
            attempts.push(*attempt);
        }
    }
    assert_eq!(attempts, vec![1, 2]);

    let answer = state.final_answer.unwrap();
    assert!(answer.contains("✅ Status: Success"));
    assert!(answer.contains("55"));
}

#[tokio::test]
async fn e2e_debug_cycle_gives_up_after_three_attempts() {
    let fail = "❌ Error:\nZeroDivisionError: division by zero";
    let h = harness(
        vec![
            decision("command_agent", "divide by zero"),
            tool_response(vec![make_tool_call("execute_python_code", serde_json::json!({"code": "1/0"}))]),
            text_response("Error."),
            text_response("1/0"),
            text_response("1/0"),
            text_response("1/0"),
            text_response("This can never succeed."),
        ],
        &[fail, fail, fail, fail],
        no_shell(),
    );

    let state = h.orchestrator.run_state("divide by zero").await.unwrap();
    let Some(AgentResult::Command(command)) = &state.agent_result else {
        panic!("expected a command result");
    };
    assert_eq!(command.retry_count, 3);
    assert!(command.result.as_ref().unwrap().is_error());
    assert!(state.final_answer.unwrap().contains("❌ Status: Error"));
    assert_eq!(h.memory.count().await.unwrap(), 1);
}

// ── Scenario C: one shell command ────────────────────────────────────────

#[tokio::test]
async fn e2e_cli_lists_files() {
    let h = harness(
        vec![
            decision("cli_agent", "list the files in the current directory"),
            tool_response(vec![make_tool_call("execute_shell_command", serde_json::json!({"command": "ls"}))]),
            text_response("Here are the files."),
        ],
        &[],
        FakeTool::new("execute_shell_command", &["✅ Cargo.toml\nsrc"]),
    );

    let answer = h.orchestrator.run("show me the files here").await.unwrap();

    assert!(answer.starts_with("💻 CLI command results"));
    let status_lines: Vec<&str> = answer.lines().filter(|l| l.contains(" $ ")).collect();
    assert_eq!(status_lines, vec!["✅ $ ls"]);

    let recent = h.memory.get_recent(1).await.unwrap();
    assert_eq!(recent[0].agent(), "cli_agent");
    assert_eq!(recent[0].action(), "cli_execution");
}

#[cfg(unix)]
#[tokio::test]
async fn e2e_cli_with_real_shell() {
    let shell = Arc::new(jarvis_tools::ShellTool::new(vec![], std::time::Duration::from_secs(30)));
    let h = harness(
        vec![
            decision("cli_agent", "say hello"),
            tool_response(vec![make_tool_call(
                "execute_shell_command",
                serde_json::json!({"command": "echo hello"}),
            )]),
            text_response("Printed hello."),
        ],
        &[],
        shell,
    );

    let state = h.orchestrator.run_state("say hello").await.unwrap();
    let Some(AgentResult::Cli(cli)) = &state.agent_result else {
        panic!("expected a CLI result");
    };
    assert_eq!(cli.commands, vec!["echo hello"]);
    assert_eq!(cli.results[0].result, ExecutionResult::success("hello"));
    assert!(state.final_answer.unwrap().contains("✅ $ echo hello\n   hello\n"));
}

// ── Scenario D: direct answer ────────────────────────────────────────────

#[tokio::test]
async fn e2e_direct_answer_skips_specialists() {
    let h = harness(vec![decision("FINISH", "2+2=4")], &[], no_shell());

    let answer = h.orchestrator.run("what is 2+2").await.unwrap();

    assert_eq!(answer, "📝 Answer:\n2+2=4");
    assert_eq!(h.provider.calls(), 1);
    assert_eq!(h.memory.count().await.unwrap(), 0);
}

#[tokio::test]
async fn e2e_history_is_shared_across_requests() {
    let h = harness(
        vec![
            decision("cli_agent", "print the date"),
            tool_response(vec![make_tool_call("execute_shell_command", serde_json::json!({"command": "date"}))]),
            text_response("Done."),
            decision("FINISH", "You asked for the date."),
        ],
        &[],
        FakeTool::new("execute_shell_command", &["✅ Mon Oct 19 2026"]),
    );

    h.orchestrator.run("what's the date").await.unwrap();
    let answer = h.orchestrator.run("what did I ask before?").await.unwrap();

    assert_eq!(answer, "📝 Answer:\nYou asked for the date.");
    assert_eq!(h.memory.count().await.unwrap(), 1);
}
