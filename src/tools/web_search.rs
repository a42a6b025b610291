//! Web search tool
//!
//! Action `search` sends `query` to a JSON search API and returns the hits as
//! `{title, url, snippet}` records. The API key comes from the run's
//! `search_api_key` credential; `search_endpoint` overrides the endpoint.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::time::Duration;

use super::{str_param, Credentials, Tool, ToolAction, ToolExecutionContext, ToolKind, ToolResult};
use crate::workflow::LogLevel;

pub const API_KEY_CREDENTIAL: &str = "search_api_key";
pub const ENDPOINT_CREDENTIAL: &str = "search_endpoint";

const DEFAULT_ENDPOINT: &str = "https://api.tavily.com/search";
const DEFAULT_MAX_RESULTS: u64 = 5;

#[derive(Debug)]
pub struct WebSearchTool {
    api_key: String,
    endpoint: String,
    client: reqwest::Client,
}

impl WebSearchTool {
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            client,
        }
    }

    pub fn from_credentials(credentials: &Credentials) -> Self {
        Self::new(
            credentials.get(API_KEY_CREDENTIAL).cloned().unwrap_or_default(),
            credentials
                .get(ENDPOINT_CREDENTIAL)
                .cloned()
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
        )
    }

    async fn search(&self, query: &str, max_results: u64) -> Result<Value, String> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "api_key": self.api_key,
                "query": query,
                "max_results": max_results,
            }))
            .send()
            .await
            .map_err(|e| format!("Search request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("Search API returned HTTP {}", status.as_u16()));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| format!("Invalid search response: {}", e))
    }
}

/// Normalize a search API response into `{title, url, snippet}` records
pub fn parse_results(body: &Value, max_results: usize) -> Vec<Value> {
    let hits = body
        .get("results")
        .or_else(|| body.pointer("/web/results"))
        .and_then(|r| r.as_array())
        .cloned()
        .unwrap_or_default();

    hits.iter()
        .filter_map(|hit| {
            let url = hit.get("url").and_then(|u| u.as_str())?;
            let title = hit.get("title").and_then(|t| t.as_str()).unwrap_or(url);
            let snippet = hit
                .get("content")
                .or_else(|| hit.get("snippet"))
                .or_else(|| hit.get("description"))
                .and_then(|s| s.as_str())
                .unwrap_or_default();
            Some(json!({ "title": title, "url": url, "snippet": snippet }))
        })
        .take(max_results)
        .collect()
}

#[async_trait]
impl Tool for WebSearchTool {
    fn kind(&self) -> ToolKind {
        ToolKind::WebSearch
    }

    fn actions(&self) -> &'static [ToolAction] {
        &[ToolAction::Search]
    }

    async fn invoke(
        &self,
        action: ToolAction,
        params: &Map<String, Value>,
        ctx: &ToolExecutionContext<'_>,
    ) -> ToolResult {
        if action != ToolAction::Search {
            return ToolResult::error(format!("web_search does not support '{}'", action));
        }

        let Some(query) = str_param(params, "query") else {
            return ToolResult::error("web_search requires a 'query' parameter");
        };
        let max_results = params
            .get("maxResults")
            .and_then(|v| v.as_u64())
            .unwrap_or(DEFAULT_MAX_RESULTS);

        ctx.log(LogLevel::Info, format!("Searching for '{}'", query));

        match self.search(query, max_results).await {
            Ok(body) => {
                let results = parse_results(&body, max_results as usize);
                ToolResult::ok(json!({
                    "query": query,
                    "count": results.len(),
                    "results": results,
                }))
                .with_metadata(json!({ "endpoint": self.endpoint }))
            }
            Err(e) => ToolResult::error(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_results() {
        let body = json!({
            "results": [
                {"title": "Rust", "url": "https://rust-lang.org", "content": "A language"},
                {"url": "https://docs.rs", "snippet": "Docs"},
                {"title": "no url"}
            ]
        });
        let results = parse_results(&body, 10);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["snippet"], "A language");
        assert_eq!(results[1]["title"], "https://docs.rs");
    }

    #[test]
    fn test_parse_results_limit_and_nested() {
        let body = json!({
            "web": {"results": [
                {"url": "https://a.example", "description": "a"},
                {"url": "https://b.example", "description": "b"}
            ]}
        });
        assert_eq!(parse_results(&body, 1).len(), 1);
        assert!(parse_results(&json!({}), 5).is_empty());
    }

    #[tokio::test]
    async fn test_invoke_requires_query() {
        let mut creds = Credentials::new();
        creds.insert(API_KEY_CREDENTIAL.to_string(), "k".to_string());
        let tool = WebSearchTool::from_credentials(&creds);

        let vars = HashMap::new();
        let ctx = ToolExecutionContext::new("a", "e", "s", &vars, &creds);
        let result = tool.invoke(ToolAction::Search, &Map::new(), &ctx).await;
        assert!(!result.success);

        let result = tool.invoke(ToolAction::Scrape, &Map::new(), &ctx).await;
        assert!(result.error.unwrap().contains("does not support"));
    }
}
