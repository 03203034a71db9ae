//! Web search tool backed by a question-answering search provider.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{parse_args, CapabilityId, Tool};

/// A search backend that answers a query with a short synthesized answer.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn answer(&self, query: &str) -> anyhow::Result<String>;
}

/// Tavily search API client, used in question-answering mode.
pub struct TavilyClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl TavilyClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("engineer-chat/0.1")
            .timeout(timeout)
            .build()?;

        Ok(Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'a str,
    include_answer: bool,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    answer: Option<String>,
}

#[async_trait]
impl SearchProvider for TavilyClient {
    async fn answer(&self, query: &str) -> anyhow::Result<String> {
        let url = format!("{}/search", self.base_url);
        let request = SearchRequest {
            api_key: &self.api_key,
            query,
            search_depth: "advanced",
            include_answer: true,
        };

        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("HTTP error: {} {}", status, body.trim()));
        }

        let parsed: SearchResponse = response.json().await?;
        parsed
            .answer
            .filter(|a| !a.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("no answer returned for: {}", query))
    }
}

#[derive(Deserialize)]
struct SearchArgs {
    query: String,
}

/// Search the web for an up-to-date answer.
pub struct WebSearch {
    provider: Arc<dyn SearchProvider>,
}

impl WebSearch {
    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Tool for WebSearch {
    fn id(&self) -> CapabilityId {
        CapabilityId::WebSearch
    }

    fn description(&self) -> &str {
        "Perform a web search to get up-to-date information or additional context. Returns a concise answer. Use this when you need current information or feel a search could provide a better answer."
    }

    fn parameters_schema(&self) -> Value {
        json!({
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

    fn failure_verb(&self) -> &str {
        "performing search"
    }

    async fn execute(&self, args: Value, _workspace: &Path) -> anyhow::Result<String> {
        let args: SearchArgs = parse_args(self.id(), args)?;
        tracing::info!("Searching the web: {}", args.query);
        self.provider.answer(&args.query).await
    }
}
