//! Execution results and the glyph-prefixed wire format.
//!
//! Capabilities talk to the model in plain text that starts with a status
//! glyph. Loops never inspect that text ad hoc: they convert it into an
//! [`ExecutionResult`] with the `parse_*` functions here.

use serde::{Deserialize, Serialize};

/// Leading glyph of every successful capability result.
pub const SUCCESS_MARKER: &str = "✅";

/// Leading glyph of every failed capability result.
pub const ERROR_MARKER: &str = "❌";

const CODE_SUCCESS_PREFIX: &str = "✅ Executed successfully:\n";
const CODE_ERROR_PREFIX: &str = "❌ Error:\n";
const SHELL_ERROR_PREFIX: &str = "❌ Error: ";

/// Output reported for code that ran cleanly but printed nothing.
pub const CODE_NO_OUTPUT: &str = "Code executed successfully (no output)";
/// Shell success text when the command printed nothing.
pub const SHELL_NO_OUTPUT: &str = "✅ Command completed (no output)";
/// Shell failure text when the command wrote nothing to stderr.
pub const SHELL_FAILED: &str = "❌ Command failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecStatus {
    Success,
    Error,
}

/// Typed outcome of one code or shell execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub status: ExecStatus,
    /// Program output on success, traceback or stderr on failure.
    pub output: String,
}

impl ExecutionResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self { status: ExecStatus::Success, output: output.into() }
    }

    pub fn error(output: impl Into<String>) -> Self {
        Self { status: ExecStatus::Error, output: output.into() }
    }

    pub fn is_success(&self) -> bool {
        self.status == ExecStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == ExecStatus::Error
    }

    /// Status glyph for reports.
    pub fn marker(&self) -> &'static str {
        match self.status {
            ExecStatus::Success => SUCCESS_MARKER,
            ExecStatus::Error => ERROR_MARKER,
        }
    }
}

/// Whether capability text reports success.
pub fn is_success_text(text: &str) -> bool {
    text.starts_with(SUCCESS_MARKER)
}

// --- Code execution wire format ---

pub fn render_code_success(output: &str) -> String {
    let body = if output.trim().is_empty() { CODE_NO_OUTPUT } else { output };
    format!("{CODE_SUCCESS_PREFIX}{body}")
}

pub fn render_code_error(traceback: &str) -> String {
    format!("{CODE_ERROR_PREFIX}{traceback}")
}

/// Decode the text returned by the code capability.
pub fn parse_code_output(text: &str) -> ExecutionResult {
    if is_success_text(text) {
        let body = text.strip_prefix(CODE_SUCCESS_PREFIX).unwrap_or_else(|| strip_marker(text, SUCCESS_MARKER));
        ExecutionResult::success(body.trim())
    } else {
        let body = text.strip_prefix(CODE_ERROR_PREFIX).unwrap_or_else(|| strip_marker(text, ERROR_MARKER));
        ExecutionResult::error(body.trim())
    }
}

// --- Shell execution wire format ---

pub fn render_shell_success(stdout: &str) -> String {
    let stdout = stdout.trim();
    if stdout.is_empty() {
        SHELL_NO_OUTPUT.to_string()
    } else {
        format!("{SUCCESS_MARKER} {stdout}")
    }
}

pub fn render_shell_error(stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        SHELL_FAILED.to_string()
    } else {
        format!("{SHELL_ERROR_PREFIX}{stderr}")
    }
}

/// Decode the text returned by the shell capability.
pub fn parse_shell_output(text: &str) -> ExecutionResult {
    if is_success_text(text) {
        ExecutionResult::success(strip_marker(text, SUCCESS_MARKER).trim())
    } else {
        let body = text.strip_prefix(SHELL_ERROR_PREFIX).unwrap_or_else(|| strip_marker(text, ERROR_MARKER));
        ExecutionResult::error(body.trim())
    }
}

fn strip_marker<'a>(text: &'a str, marker: &str) -> &'a str {
    text.strip_prefix(marker).unwrap_or(text)
}
