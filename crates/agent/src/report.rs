//! Final answer rendering.
//!
//! Pure functions of the decision and the specialist result: no model
//! calls, no failure modes, same input gives the same bytes.

use std::fmt::Write;
use crate::analyst::{AgentKind, Decision};
use crate::cli::CliState;
use crate::command::CommandState;
use jarvis_core::execution::{ERROR_MARKER, SUCCESS_MARKER};
use serde::{Deserialize, Serialize};

const RULE_WIDTH: usize = 40;
const CODE_PREVIEW_CHARS: usize = 200;

/// What the routed specialist produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AgentResult {
    Command(CommandState),
    Cli(CliState),
    /// Nothing ran; carries the text to show
    None { message: String },
}

/// Render the answer shown to the user.
pub fn format_final_answer(decision: &Decision, agent_result: Option<&AgentResult>) -> String {
    if decision.agent == AgentKind::Finish {
        return format!("📝 Answer:\n{}", decision.task);
    }

    match agent_result {
        Some(AgentResult::Command(state)) => command_report(state),
        Some(AgentResult::Cli(state)) => cli_report(state),
        Some(AgentResult::None { message }) => format!("📝 {message}"),
        None => format!("📝 {}", decision.task),
    }
}

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

fn command_report(state: &CommandState) -> String {
    let review = state.review.as_deref().unwrap_or_default();

    let Some(result) = &state.result else {
        let mut out = format!("⚠️ Code was not executed\n{}\n\n", rule());
        out.push_str("The agent did not call execute_python_code.\n");
        if !review.is_empty() {
            let _ = write!(out, "\n📋 Review:\n{review}");
        }
        return out;
    };

    let mut out = format!("📊 Python code execution result\n{}\n\n", rule());
    if result.is_success() {
        let _ = write!(out, "{SUCCESS_MARKER} Status: Success\n\n");
    } else {
        let _ = write!(out, "{ERROR_MARKER} Status: Error\n\n");
    }

    let output = if result.output.is_empty() { "(no output)" } else { result.output.as_str() };
    let _ = writeln!(out, "📤 Output:\n{output}");

    let code = state.code.as_deref().unwrap_or_default();
    if !code.is_empty() {
        let _ = writeln!(out, "\n💻 Code (preview):\n{}", code_preview(code));
    }

    if !review.is_empty() {
        let _ = write!(out, "\n📋 Review:\n{review}");
    }
    out
}

fn code_preview(code: &str) -> String {
    if code.chars().count() > CODE_PREVIEW_CHARS {
        let head: String = code.chars().take(CODE_PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        code.to_string()
    }
}

fn cli_report(state: &CliState) -> String {
    let mut out = format!("💻 CLI command results\n{}\n\n", rule());
    for record in &state.results {
        let _ = writeln!(out, "{} $ {}", record.result.marker(), record.command);
        if !record.result.output.is_empty() {
            let _ = writeln!(out, "   {}", record.result.output);
        }
        out.push('\n');
    }
    out
}
