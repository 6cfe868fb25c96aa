//! Web search tool backed by the Tavily search API.
//!
//! Without an API key the tool stays registered but reports that it is not
//! configured, so the model can fall back to memory search.

use async_trait::async_trait;
use jarvis_core::error::ToolError;
use jarvis_core::execution::ERROR_MARKER;
use jarvis_core::tool::{Tool, ToolResult};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use crate::names::SEARCH_WEB;

const TAVILY_ENDPOINT: &str = "https://api.tavily.com/search";

/// One search hit as returned by Tavily.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

pub struct WebSearchTool {
    client: reqwest::Client,
    api_key: Option<String>,
    max_results: usize,
    endpoint: String,
}

impl WebSearchTool {
    pub fn new(api_key: Option<String>, max_results: usize) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_key: api_key.filter(|k| !k.is_empty()),
            max_results,
            endpoint: TAVILY_ENDPOINT.to_string(),
        }
    }

    /// Point the tool at a different search endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn search(&self, api_key: &str, query: &str) -> Result<Vec<SearchHit>, String> {
        let body = serde_json::json!({
            "api_key": api_key,
            "query": query,
            "max_results": self.max_results,
            "include_answer": false,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("Tavily request failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            let err_body = response.text().await.unwrap_or_default();
            return Err(format!("Tavily API error ({}): {}", status.as_u16(), err_body));
        }

        let data: TavilyResponse = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse Tavily response: {e}"))?;

        let mut hits = data.results;
        hits.truncate(self.max_results);
        Ok(hits)
    }
}

/// Render hits the way the agents read them.
pub fn format_results(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return "🔍 Nothing found on the web.".to_string();
    }

    let mut lines = vec!["🔍 Found on the web:\n".to_string()];
    for (idx, hit) in hits.iter().enumerate() {
        lines.push(format!("{}. {}", idx + 1, hit.content));
        lines.push(format!("   Source: {}\n", hit.url));
    }
    lines.join("\n")
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        SEARCH_WEB
    }

    fn description(&self) -> &str {
        "Search the internet for up-to-date information: documentation, code examples, \
         solutions to problems, current library versions and API references."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let query = arguments["query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;

        let Some(api_key) = &self.api_key else {
            return Ok(ToolResult::failed(format!(
                "{ERROR_MARKER} Web search is not configured: set TAVILY_API_KEY"
            )));
        };

        debug!(query = %query, max_results = self.max_results, "Searching the web");

        match self.search(api_key, query).await {
            Ok(hits) => Ok(ToolResult::ok(format_results(&hits))),
            Err(reason) => {
                warn!(error = %reason, "Web search failed");
                Ok(ToolResult::failed(format!("{ERROR_MARKER} Error: {reason}")))
            }
        }
    }
}
