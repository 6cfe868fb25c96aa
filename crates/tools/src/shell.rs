//! Shell tool: run a system command under a wall-clock limit.
//!
//! Supports command allowlisting and timeout. Every outcome, including
//! spawn failures and timeouts, is reported as glyph-prefixed status text.

use async_trait::async_trait;
use jarvis_core::error::ToolError;
use jarvis_core::execution::{render_shell_error, render_shell_success};
use jarvis_core::tool::{Tool, ToolResult};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};
use crate::names::EXECUTE_SHELL_COMMAND;

/// Execute shell commands with safety constraints.
pub struct ShellTool {
    /// If non-empty, only these commands are allowed.
    allowed_commands: Vec<String>,
    timeout: Duration,
}

impl ShellTool {
    pub fn new(allowed_commands: Vec<String>, timeout: Duration) -> Self {
        Self {
            allowed_commands,
            timeout,
        }
    }

    fn is_command_allowed(&self, command: &str) -> bool {
        if self.allowed_commands.is_empty() {
            return true; // No allowlist = all commands allowed
        }

        // Extract the base command (first word)
        let base_cmd = command.split_whitespace().next().unwrap_or("").trim();

        self.allowed_commands.iter().any(|a| a == base_cmd)
    }

    fn command(command: &str) -> Command {
        let mut cmd = if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", command]);
            c
        } else {
            let mut c = Command::new("sh");
            c.args(["-c", command]);
            c
        };
        cmd.kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Tool for ShellTool {
    fn name(&self) -> &str {
        EXECUTE_SHELL_COMMAND
    }

    fn description(&self) -> &str {
        "Run a command in the terminal. Use it for git, npm, file operations and other system commands."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let command = arguments["command"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'command' argument".into()))?;

        if !self.is_command_allowed(command) {
            let base = command.split_whitespace().next().unwrap_or("");
            warn!(command = %command, "Command rejected by allowlist");
            return Ok(ToolResult::failed(render_shell_error(&format!(
                "Command '{base}' not in allowlist"
            ))));
        }

        debug!(command = %command, timeout_secs = self.timeout.as_secs(), "Executing shell command");

        let output = match tokio::time::timeout(self.timeout, Self::command(command).output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!(command = %command, error = %e, "Failed to spawn command");
                return Ok(ToolResult::failed(render_shell_error(&e.to_string())));
            }
            Err(_) => {
                warn!(command = %command, "Command timed out");
                let stderr = format!("Command timeout ({}s)", self.timeout.as_secs());
                return Ok(ToolResult::failed(render_shell_error(&stderr)).with_data(serde_json::json!({
                    "stdout": "",
                    "stderr": stderr,
                    "returncode": -1,
                })));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let code = output.status.code().unwrap_or(-1);
        let data = serde_json::json!({
            "stdout": stdout,
            "stderr": stderr,
            "returncode": code,
        });

        if output.status.success() {
            Ok(ToolResult::ok(render_shell_success(&stdout)).with_data(data))
        } else {
            warn!(command = %command, exit_code = code, "Command failed");
            Ok(ToolResult::failed(render_shell_error(&stderr)).with_data(data))
        }
    }
}
