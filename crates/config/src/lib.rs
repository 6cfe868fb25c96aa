//! Configuration loading, validation, and management for JARVIS.
//!
//! Loads configuration from `~/.jarvis/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.jarvis/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the OpenAI-compatible endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Chat model used by every agent
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature for every agent
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Retries for transient provider failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Per-request timeout for the provider
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Directory of `<name>.toml` prompt overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompts_dir: Option<PathBuf>,

    /// Memory configuration
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Tool configuration
    #[serde(default)]
    pub tools: ToolsConfig,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4-turbo-preview".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_retries() -> u32 {
    2
}
fn default_request_timeout_secs() -> u64 {
    120
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_retries", &self.max_retries)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("prompts_dir", &self.prompts_dir)
            .field("memory", &self.memory)
            .field("tools", &self.tools)
            .finish()
    }
}

/// Where memory records live and how they are embedded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// `in_memory` (lost on exit) or `file` (JSONL at `path`)
    #[serde(default = "default_memory_backend")]
    pub backend: String,

    /// JSONL file for the `file` backend (defaults to `~/.jarvis/memory.jsonl`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// `api` (provider `/embeddings`) or `hash` (offline, deterministic)
    #[serde(default = "default_embedding")]
    pub embedding: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,
}

fn default_memory_backend() -> String {
    "in_memory".into()
}
fn default_embedding() -> String {
    "api".into()
}
fn default_embedding_model() -> String {
    "qwen/qwen3-embedding-8b".into()
}
fn default_embedding_dim() -> usize {
    4096
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: default_memory_backend(),
            path: None,
            embedding: default_embedding(),
            embedding_model: default_embedding_model(),
            embedding_dim: default_embedding_dim(),
        }
    }
}

impl MemoryConfig {
    /// The JSONL path for the `file` backend.
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| AppConfig::config_dir().join("memory.jsonl"))
    }
}

/// Settings for the tool capabilities.
#[derive(Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Tavily API key for `search_web`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tavily_api_key: Option<String>,

    /// Web search results per query
    #[serde(default = "default_search_max_results")]
    pub search_max_results: usize,

    /// Wall-clock limit for one shell command
    #[serde(default = "default_timeout_secs")]
    pub shell_timeout_secs: u64,

    /// Wall-clock limit for one code execution
    #[serde(default = "default_timeout_secs")]
    pub code_timeout_secs: u64,

    /// Interpreter used by `execute_python_code`
    #[serde(default = "default_python")]
    pub python: String,

    /// If non-empty, only these command names may be run by the shell tool
    #[serde(default)]
    pub allowed_commands: Vec<String>,
}

fn default_search_max_results() -> usize {
    3
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_python() -> String {
    "python3".into()
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            tavily_api_key: None,
            search_max_results: default_search_max_results(),
            shell_timeout_secs: default_timeout_secs(),
            code_timeout_secs: default_timeout_secs(),
            python: default_python(),
            allowed_commands: Vec::new(),
        }
    }
}

impl std::fmt::Debug for ToolsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolsConfig")
            .field("tavily_api_key", &redact(&self.tavily_api_key))
            .field("search_max_results", &self.search_max_results)
            .field("shell_timeout_secs", &self.shell_timeout_secs)
            .field("code_timeout_secs", &self.code_timeout_secs)
            .field("python", &self.python)
            .field("allowed_commands", &self.allowed_commands)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.jarvis/config.toml),
    /// then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_with_env(&config_path, |key| std::env::var(key).ok())
    }

    /// Load from `path` and apply overrides from `env`.
    pub fn load_with_env(
        path: &Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env(env)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Environment variable overrides (highest priority).
    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(key) = env("JARVIS_API_KEY").or_else(|| env("OPENAI_API_KEY")) {
            self.api_key = Some(key);
        }
        if let Some(url) = env("OPENAI_BASE_URL") {
            self.base_url = url;
        }
        if let Some(model) = env("OPENAI_MODEL") {
            self.model = model;
        }
        if let Some(key) = env("TAVILY_API_KEY") {
            self.tools.tavily_api_key = Some(key);
        }
        if let Some(model) = env("EMBEDDING_MODEL") {
            self.memory.embedding_model = model;
        }
        if let Some(dim) = env("EMBEDDING_DIM") {
            self.memory.embedding_dim = dim.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("EMBEDDING_DIM must be a positive integer, got '{dim}'"))
            })?;
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".jarvis")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if !matches!(self.memory.backend.as_str(), "in_memory" | "file") {
            return Err(ConfigError::ValidationError(format!(
                "unknown memory backend '{}' (expected 'in_memory' or 'file')",
                self.memory.backend
            )));
        }

        if !matches!(self.memory.embedding.as_str(), "api" | "hash") {
            return Err(ConfigError::ValidationError(format!(
                "unknown embedding '{}' (expected 'api' or 'hash')",
                self.memory.embedding
            )));
        }

        if self.memory.embedding_dim == 0 {
            return Err(ConfigError::ValidationError("embedding_dim must be > 0".into()));
        }

        if self.tools.shell_timeout_secs == 0 || self.tools.code_timeout_secs == 0 {
            return Err(ConfigError::ValidationError("tool timeouts must be > 0".into()));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError("request_timeout_secs must be > 0".into()));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// The effective configuration as TOML with secrets masked.
    pub fn redacted_toml(&self) -> String {
        let mut shown = self.clone();
        if shown.api_key.is_some() {
            shown.api_key = Some("[REDACTED]".into());
        }
        if shown.tools.tavily_api_key.is_some() {
            shown.tools.tavily_api_key = Some("[REDACTED]".into());
        }
        toml::to_string_pretty(&shown).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_retries: default_max_retries(),
            request_timeout_secs: default_request_timeout_secs(),
            prompts_dir: None,
            memory: MemoryConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for jarvis_core::Error {
    fn from(e: ConfigError) -> Self {
        jarvis_core::Error::Config { message: e.to_string() }
    }
}
