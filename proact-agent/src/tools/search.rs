//! Internet search tool.
//!
//! Lets the model look up environmental problems near the user before it
//! writes missions. Backed by the Tavily search API.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::registry::{Tool, ToolError, ToolRegistry};
use crate::backend::traits::ToolDeclaration;
use crate::config::SearchConfig;

/// Name the search tool is registered and declared under.
pub const INTERNET_SEARCH_TOOL: &str = "internet_search_tool";

/// Default Tavily endpoint.
pub const DEFAULT_SEARCH_URL: &str = "https://api.tavily.com";

/// Errors from the search collaborator.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Credential refused
    #[error("Search unauthorized: {0}")]
    Unauthorized(String),

    /// Provider down or throttling
    #[error("Search provider unavailable: {0}")]
    Unavailable(String),

    /// Network error
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Response could not be decoded
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// How thorough a search should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchDepth {
    Basic,
    Advanced,
}

/// Search collaborator.
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Answer a query with text.
    async fn search(&self, query: &str, depth: SearchDepth) -> Result<String, SearchError>;
}

/// Tavily search client. Returns Tavily's generated answer for a query.
pub struct TavilyClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl TavilyClient {
    /// Create a new client.
    pub fn new(api_key: impl Into<String>) -> Result<Self, SearchError> {
        let client = Client::builder()
            .build()
            .map_err(|e| SearchError::Unavailable(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: DEFAULT_SEARCH_URL.to_string(),
            api_key: api_key.into(),
        })
    }

    /// Point the client at another endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: SearchDepth,
    include_answer: bool,
    max_results: u32,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    answer: Option<String>,
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
}

#[async_trait]
impl SearchClient for TavilyClient {
    async fn search(&self, query: &str, depth: SearchDepth) -> Result<String, SearchError> {
        let body = TavilyRequest {
            api_key: &self.api_key,
            query,
            search_depth: depth,
            include_answer: true,
            max_results: 5,
        };

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| SearchError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SearchError::Unauthorized(detail),
                _ => SearchError::Unavailable(format!("HTTP {status}: {detail}")),
            });
        }

        let parsed: TavilyResponse = response
            .json()
            .await
            .map_err(|e| SearchError::ParseError(e.to_string()))?;

        match parsed.answer {
            Some(answer) if !answer.trim().is_empty() => Ok(answer),
            _ if !parsed.results.is_empty() => Ok(parsed
                .results
                .iter()
                .map(|r| format!("{}: {}", r.title, r.content))
                .collect::<Vec<_>>()
                .join("\n")),
            _ => Err(SearchError::ParseError("Search returned no answer".to_string())),
        }
    }
}

/// Tool wrapper around a [`SearchClient`], always searching in advanced mode.
pub struct InternetSearchTool {
    client: Arc<dyn SearchClient>,
}

impl InternetSearchTool {
    pub fn new(client: Arc<dyn SearchClient>) -> Self {
        Self { client }
    }

    /// Build the tool from configuration.
    ///
    /// Fails with [`ToolError::SearchUnavailable`] when no credential is set.
    pub fn from_config(config: &SearchConfig) -> Result<Self, ToolError> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ToolError::SearchUnavailable("no search API key configured".to_string()))?;

        let client = TavilyClient::new(api_key)?.with_base_url(&config.base_url);
        Ok(Self::new(Arc::new(client)))
    }
}

#[async_trait]
impl Tool for InternetSearchTool {
    fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration {
            name: INTERNET_SEARCH_TOOL.to_string(),
            description: "Perform an internet search given a query.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "A clear and concise query"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn call(&self, args: Map<String, Value>) -> Result<Value, ToolError> {
        let query = args
            .get("query")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments {
                name: INTERNET_SEARCH_TOOL.to_string(),
                reason: "missing string argument `query`".to_string(),
            })?;

        let start = Instant::now();
        info!(%query, "Internet search requested");

        let result = self.client.search(query, SearchDepth::Advanced).await?;

        info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Search result obtained"
        );
        debug!(%result, "Search result");

        Ok(Value::String(result))
    }
}

/// Register the search tool if a credential is configured.
///
/// Without one the tool is left out entirely and `false` is returned.
pub fn register_search_tool(registry: &mut ToolRegistry, config: &SearchConfig) -> bool {
    match InternetSearchTool::from_config(config) {
        Ok(tool) => {
            registry.register(INTERNET_SEARCH_TOOL, Arc::new(tool));
            true
        }
        Err(e) => {
            warn!(error = %e, "Internet search tool will not be available");
            false
        }
    }
}
