//! Analyst loop: decides which specialist should handle a request.
//!
//! The analyst may search memory and the web before answering. Its final
//! text is parsed into a [`Decision`]; unparseable output becomes a
//! `FINISH` decision carrying the raw text, so routing never fails.

use std::fmt;
use std::sync::LazyLock;
use chrono::Utc;
use jarvis_core::event::DomainEvent;
use jarvis_core::prompt::PromptLoader;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use crate::tool_loop::ToolLoop;

/// Reasoning attached to the fallback decision.
pub const PARSE_FAILURE: &str = "parse failure";

static FENCED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)\s*```").expect("valid regex"));

/// Where a request is routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentKind {
    #[serde(rename = "command_agent")]
    CommandAgent,
    #[serde(rename = "cli_agent")]
    CliAgent,
    #[serde(rename = "FINISH")]
    Finish,
}

impl AgentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::CommandAgent => "command_agent",
            AgentKind::CliAgent => "cli_agent",
            AgentKind::Finish => "FINISH",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The analyst's routing output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub agent: AgentKind,
    #[serde(default)]
    pub reasoning: String,
    /// Sub-task for a specialist, or the direct answer for `FINISH`
    #[serde(default)]
    pub task: String,
}

impl Decision {
    /// The decision used when the model output cannot be parsed.
    pub fn fallback(raw: &str) -> Self {
        Self {
            agent: AgentKind::Finish,
            reasoning: PARSE_FAILURE.to_string(),
            task: raw.to_string(),
        }
    }
}

/// Parse model output into a decision.
///
/// Looks inside the first fenced block if there is one, then takes the
/// outermost brace span. Never fails.
pub fn extract_decision(text: &str) -> Decision {
    let trimmed = text.trim();

    let mut candidate = FENCED_BLOCK
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map_or(trimmed, |m| m.as_str().trim());

    if let (Some(start), Some(end)) = (candidate.find('{'), candidate.rfind('}')) {
        if start < end {
            candidate = &candidate[start..=end];
        }
    }

    match serde_json::from_str::<Decision>(candidate) {
        Ok(decision) => decision,
        Err(e) => {
            warn!(error = %e, "Could not parse analyst decision, finishing with raw text");
            Decision::fallback(text)
        }
    }
}

pub struct AnalystLoop {
    tool_loop: ToolLoop,
    prompts: PromptLoader,
}

impl AnalystLoop {
    pub fn new(tool_loop: ToolLoop, prompts: PromptLoader) -> Self {
        Self { tool_loop, prompts }
    }

    /// Analyze the user request and route it.
    pub async fn run(&self, user_input: &str) -> jarvis_core::Result<Decision> {
        let bus = self.tool_loop.event_bus();
        bus.publish(DomainEvent::AgentStarted {
            agent: self.tool_loop.agent().to_string(),
            task: user_input.to_string(),
            timestamp: Utc::now(),
        });

        let prompt = self.prompts.load("analyst")?;
        let text = self.tool_loop.run(&prompt.system, user_input).await?;
        let decision = extract_decision(&text);

        info!(agent = %decision.agent, reasoning = %decision.reasoning, "Analyst decided");
        bus.publish(DomainEvent::DecisionMade {
            agent: decision.agent.to_string(),
            reasoning: decision.reasoning.clone(),
            task: decision.task.clone(),
        });
        Ok(decision)
    }
}
