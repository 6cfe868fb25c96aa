//! Python code execution in a child interpreter.
//!
//! The code is piped to `<python> -` on stdin so no temporary file is
//! needed. This is process isolation only, not a sandbox.

use async_trait::async_trait;
use jarvis_core::error::ToolError;
use jarvis_core::execution::{render_code_error, render_code_success};
use jarvis_core::tool::{Tool, ToolResult};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};
use crate::names::EXECUTE_PYTHON_CODE;

pub struct CodeExecutorTool {
    python: String,
    timeout: Duration,
}

impl CodeExecutorTool {
    pub fn new(python: impl Into<String>, timeout: Duration) -> Self {
        Self {
            python: python.into(),
            timeout,
        }
    }

    async fn run(&self, code: &str) -> Result<std::process::Output, String> {
        let mut child = Command::new(&self.python)
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| format!("Failed to start {}: {e}", self.python))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(code.as_bytes())
                .await
                .map_err(|e| format!("Failed to send code to interpreter: {e}"))?;
            // Dropping stdin closes the pipe so the interpreter starts running
        }

        child
            .wait_with_output()
            .await
            .map_err(|e| format!("Failed to collect interpreter output: {e}"))
    }
}

#[async_trait]
impl Tool for CodeExecutorTool {
    fn name(&self) -> &str {
        EXECUTE_PYTHON_CODE
    }

    fn description(&self) -> &str {
        "Execute Python code and return what it prints. Use it for calculations, data processing and working with libraries."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "code": {
                    "type": "string",
                    "description": "Python code to execute"
                }
            },
            "required": ["code"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let code = arguments["code"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'code' argument".into()))?;

        debug!(python = %self.python, bytes = code.len(), "Executing Python code");

        let output = match tokio::time::timeout(self.timeout, self.run(code)).await {
            Ok(Ok(output)) => output,
            Ok(Err(reason)) => {
                warn!(error = %reason, "Code execution could not start");
                return Ok(ToolResult::failed(render_code_error(&reason)));
            }
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "Code execution timed out");
                return Ok(ToolResult::failed(render_code_error(&format!(
                    "Execution timeout ({}s)",
                    self.timeout.as_secs()
                ))));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if output.status.success() {
            let mut text = stdout.trim_end().to_string();
            if !stderr.trim().is_empty() {
                text.push_str(&format!("\n[stderr]: {}", stderr.trim()));
            }
            Ok(ToolResult::ok(render_code_success(&text)))
        } else {
            let traceback = if stderr.trim().is_empty() {
                format!("Process exited with code {}", output.status.code().unwrap_or(-1))
            } else {
                stderr.trim_end().to_string()
            };
            Ok(ToolResult::failed(render_code_error(&traceback)))
        }
    }
}
