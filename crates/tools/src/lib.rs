//! Built-in tool implementations for JARVIS.
//!
//! Tools give the agents the ability to interact with the world:
//! run Python code, run shell commands, search the web, and read or
//! write the shared memory log.
//!
//! Each specialist loop gets its own [`ToolRegistry`]; [`Toolsets`] builds
//! all three from one configuration so the capability instances are shared.

pub mod code_executor;
pub mod memory_add;
pub mod memory_search;
pub mod shell;
pub mod web_search;

use jarvis_config::ToolsConfig;
use jarvis_core::memory::MemoryBackend;
use jarvis_core::tool::{Tool, ToolRegistry};
use std::sync::Arc;
use std::time::Duration;

pub use code_executor::CodeExecutorTool;
pub use memory_add::MemoryAddTool;
pub use memory_search::MemorySearchTool;
pub use shell::ShellTool;
pub use web_search::WebSearchTool;

/// Tool names as the models see them.
pub mod names {
    pub const EXECUTE_PYTHON_CODE: &str = "execute_python_code";
    pub const EXECUTE_SHELL_COMMAND: &str = "execute_shell_command";
    pub const SEARCH_WEB: &str = "search_web";
    pub const SEARCH_MEMORY: &str = "search_memory";
    pub const ADD_TO_MEMORY: &str = "add_to_memory";
}

/// The registries bound to each specialist.
#[derive(Clone)]
pub struct Toolsets {
    /// `search_memory`, `search_web`
    pub analyst: ToolRegistry,
    /// `execute_python_code`, `search_memory`, `search_web`
    pub command: ToolRegistry,
    /// `execute_shell_command`, `search_memory`, `search_web`
    pub cli: ToolRegistry,
}

impl Toolsets {
    /// Assemble the three registries from individual capabilities.
    pub fn from_parts(
        code: Arc<dyn Tool>,
        shell: Arc<dyn Tool>,
        web: Arc<dyn Tool>,
        memory: Arc<dyn Tool>,
    ) -> Self {
        let search = ToolRegistry::new().with(memory).with(web);
        Self {
            analyst: search.clone(),
            command: search.clone().with(code),
            cli: search.with(shell),
        }
    }

    /// The production toolsets.
    pub fn from_config(config: &ToolsConfig, memory: Arc<dyn MemoryBackend>) -> Self {
        Self::from_parts(
            Arc::new(CodeExecutorTool::new(
                config.python.clone(),
                Duration::from_secs(config.code_timeout_secs),
            )),
            Arc::new(ShellTool::new(
                config.allowed_commands.clone(),
                Duration::from_secs(config.shell_timeout_secs),
            )),
            Arc::new(WebSearchTool::new(config.tavily_api_key.clone(), config.search_max_results)),
            Arc::new(MemorySearchTool::new(memory)),
        )
    }
}
