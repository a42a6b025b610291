//! Web scraping tool
//!
//! Actions:
//! - `scrape` - fetch `url` and return its title and readable text
//! - `extract_links` - fetch `url` and return the absolute links it contains

use async_trait::async_trait;
use regex::Regex;
use reqwest::Url;
use serde_json::{json, Map, Value};
use std::sync::LazyLock;
use std::time::Duration;

use super::{str_param, Tool, ToolAction, ToolExecutionContext, ToolKind, ToolResult};
use crate::workflow::LogLevel;

const DEFAULT_MAX_LENGTH: usize = 10_000;

static TITLE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap());
static SCRIPT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<(script|style|noscript)[^>]*>.*?</(script|style|noscript)>").unwrap());
static TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]+>").unwrap());
static SPACE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static HREF_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<a\s[^>]*href\s*=\s*["']([^"'#]+)["']"#).unwrap());

#[derive(Debug)]
pub struct WebScraperTool {
    client: reqwest::Client,
}

impl WebScraperTool {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("gateway-agents/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self { client }
    }

    async fn fetch(&self, url: &str) -> Result<String, String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("Failed to fetch {}: {}", url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("Failed to fetch {}: HTTP {}", url, status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| format!("Failed to read {}: {}", url, e))
    }
}

impl Default for WebScraperTool {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Page title, if any
pub fn extract_title(html: &str) -> Option<String> {
    TITLE_REGEX
        .captures(html)
        .map(|c| decode_entities(c[1].trim()))
        .filter(|t| !t.is_empty())
}

/// Readable text of a page with scripts, styles and tags removed
pub fn html_to_text(html: &str) -> String {
    let without_scripts = SCRIPT_REGEX.replace_all(html, " ");
    let without_tags = TAG_REGEX.replace_all(&without_scripts, " ");
    let decoded = decode_entities(&without_tags);
    SPACE_REGEX.replace_all(&decoded, " ").trim().to_string()
}

/// Absolute, de-duplicated http(s) links found in `html`
pub fn extract_links(html: &str, base: &Url) -> Vec<String> {
    let mut links: Vec<String> = Vec::new();
    for cap in HREF_REGEX.captures_iter(html) {
        if let Ok(url) = base.join(cap[1].trim()) {
            if matches!(url.scheme(), "http" | "https") {
                let url = url.to_string();
                if !links.contains(&url) {
                    links.push(url);
                }
            }
        }
    }
    links
}

fn truncate(text: &str, max: usize) -> (String, bool) {
    match text.char_indices().nth(max) {
        Some((idx, _)) => (text[..idx].to_string(), true),
        None => (text.to_string(), false),
    }
}

#[async_trait]
impl Tool for WebScraperTool {
    fn kind(&self) -> ToolKind {
        ToolKind::WebScraper
    }

    fn actions(&self) -> &'static [ToolAction] {
        &[ToolAction::Scrape, ToolAction::ExtractLinks]
    }

    async fn invoke(
        &self,
        action: ToolAction,
        params: &Map<String, Value>,
        ctx: &ToolExecutionContext<'_>,
    ) -> ToolResult {
        let Some(raw_url) = str_param(params, "url") else {
            return ToolResult::error("web_scraper requires a 'url' parameter");
        };
        let url = match Url::parse(raw_url) {
            Ok(url) => url,
            Err(e) => return ToolResult::error(format!("Invalid url '{}': {}", raw_url, e)),
        };

        ctx.log(LogLevel::Info, format!("Fetching {}", url));
        let html = match self.fetch(url.as_str()).await {
            Ok(html) => html,
            Err(e) => return ToolResult::error(e),
        };

        match action {
            ToolAction::Scrape => {
                let max = params
                    .get("maxLength")
                    .and_then(|v| v.as_u64())
                    .map(|v| v as usize)
                    .unwrap_or(DEFAULT_MAX_LENGTH);
                let text = html_to_text(&html);
                let (content, truncated) = truncate(&text, max);
                ToolResult::ok(json!({
                    "url": url.as_str(),
                    "title": extract_title(&html),
                    "content": content,
                    "length": text.chars().count(),
                }))
                .with_metadata(json!({ "truncated": truncated }))
            }
            ToolAction::ExtractLinks => {
                let links = extract_links(&html, &url);
                ToolResult::ok(json!({
                    "url": url.as_str(),
                    "count": links.len(),
                    "links": links,
                }))
            }
            other => ToolResult::error(format!("web_scraper does not support '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r##"<html><head><title>Rust &amp; You</title>
<style>body { color: red; }</style></head>
<body><h1>Hello</h1><p>Ownership&nbsp;rules.</p>
<script>alert("x")</script>
<a href="/docs">Docs</a> <a href='https://example.org/a'>A</a>
<a href="/docs">Again</a> <a href="mailto:me@example.com">Mail</a> <a href="#top">Top</a>
</body></html>"##;

    #[test]
    fn test_extract_title() {
        assert_eq!(extract_title(PAGE).as_deref(), Some("Rust & You"));
        assert_eq!(extract_title("<p>none</p>"), None);
    }

    #[test]
    fn test_html_to_text() {
        let text = html_to_text(PAGE);
        assert!(text.contains("Hello Ownership rules."));
        assert!(!text.contains("alert"));
        assert!(!text.contains("color"));
    }

    #[test]
    fn test_extract_links() {
        let base = Url::parse("https://example.com/blog/post").unwrap();
        let links = extract_links(PAGE, &base);
        assert_eq!(
            links,
            vec!["https://example.com/docs", "https://example.org/a"]
        );
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abcdef", 3), ("abc".to_string(), true));
        assert_eq!(truncate("ab", 3), ("ab".to_string(), false));
    }
}
