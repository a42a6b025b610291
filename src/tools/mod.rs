//! Tool capabilities
//!
//! Every tool exposes a closed set of actions behind one uniform contract:
//! `invoke(action, params, ctx) -> ToolResult`. The executor builds a fresh
//! `ToolRegistry` for each run from that run's credentials, so concurrent runs
//! never share tool instances.
//!
//! Built-in tools:
//! - `web_search` - search the web (requires `search_api_key`)
//! - `web_scraper` - fetch a page as text, extract links
//! - `code_analyzer` - line counts, function counts, complexity

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;
use tracing::{debug, info};

use crate::workflow::LogLevel;

pub mod code_analyzer;
pub mod web_scraper;
pub mod web_search;

pub use code_analyzer::CodeAnalyzerTool;
pub use web_scraper::WebScraperTool;
pub use web_search::WebSearchTool;

/// Credential values keyed by name (e.g. `search_api_key`)
pub type Credentials = HashMap<String, String>;

/// The closed set of tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    WebSearch,
    WebScraper,
    CodeAnalyzer,
}

impl ToolKind {
    pub const ALL: [ToolKind; 3] = [
        ToolKind::WebSearch,
        ToolKind::WebScraper,
        ToolKind::CodeAnalyzer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::WebSearch => "web_search",
            ToolKind::WebScraper => "web_scraper",
            ToolKind::CodeAnalyzer => "code_analyzer",
        }
    }

    /// Credentials the tool cannot be built without
    pub fn required_credentials(&self) -> &'static [&'static str] {
        match self {
            ToolKind::WebSearch => &[web_search::API_KEY_CREDENTIAL],
            ToolKind::WebScraper | ToolKind::CodeAnalyzer => &[],
        }
    }

    /// Build the tool for one run
    fn build(&self, credentials: &Credentials) -> Box<dyn Tool> {
        match self {
            ToolKind::WebSearch => Box::new(WebSearchTool::from_credentials(credentials)),
            ToolKind::WebScraper => Box::new(WebScraperTool::new()),
            ToolKind::CodeAnalyzer => Box::new(CodeAnalyzerTool::new()),
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "web_search" | "websearch" => Ok(ToolKind::WebSearch),
            "web_scraper" | "webscraper" | "web_scrape" => Ok(ToolKind::WebScraper),
            "code_analyzer" | "codeanalyzer" | "code_analysis" => Ok(ToolKind::CodeAnalyzer),
            other => Err(format!("Unknown tool: {}", other)),
        }
    }
}

/// The closed set of tool actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolAction {
    Search,
    Scrape,
    ExtractLinks,
    Analyze,
    Complexity,
}

impl ToolAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolAction::Search => "search",
            ToolAction::Scrape => "scrape",
            ToolAction::ExtractLinks => "extract_links",
            ToolAction::Analyze => "analyze",
            ToolAction::Complexity => "complexity",
        }
    }
}

impl fmt::Display for ToolAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "search" => Ok(ToolAction::Search),
            "scrape" => Ok(ToolAction::Scrape),
            "extract_links" | "links" => Ok(ToolAction::ExtractLinks),
            "analyze" | "analyse" => Ok(ToolAction::Analyze),
            "complexity" => Ok(ToolAction::Complexity),
            other => Err(format!("Unknown action: {}", other)),
        }
    }
}

/// Uniform result of a tool invocation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl ToolResult {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            ..Default::default()
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            ..Default::default()
        }
    }
}

/// A log line a tool emitted during one invocation
#[derive(Debug, Clone)]
pub struct ToolLog {
    pub level: LogLevel,
    pub message: String,
}

/// What a tool sees of the run that invokes it
pub struct ToolExecutionContext<'a> {
    pub agent_id: &'a str,
    pub execution_id: &'a str,
    pub step_id: &'a str,
    pub variables: &'a HashMap<String, Value>,
    pub credentials: &'a Credentials,
    logs: Mutex<Vec<ToolLog>>,
}

impl<'a> ToolExecutionContext<'a> {
    pub fn new(
        agent_id: &'a str,
        execution_id: &'a str,
        step_id: &'a str,
        variables: &'a HashMap<String, Value>,
        credentials: &'a Credentials,
    ) -> Self {
        Self {
            agent_id,
            execution_id,
            step_id,
            variables,
            credentials,
            logs: Mutex::new(Vec::new()),
        }
    }

    /// Record a log line on the execution
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        debug!(step_id = %self.step_id, "tool: {}", message);
        if let Ok(mut logs) = self.logs.lock() {
            logs.push(ToolLog { level, message });
        }
    }

    /// Take the lines logged so far
    pub fn drain_logs(&self) -> Vec<ToolLog> {
        self.logs
            .lock()
            .map(|mut logs| std::mem::take(&mut *logs))
            .unwrap_or_default()
    }
}

/// A pluggable capability
#[async_trait]
pub trait Tool: Send + Sync {
    fn kind(&self) -> ToolKind;

    /// Actions this tool accepts
    fn actions(&self) -> &'static [ToolAction];

    fn supports(&self, action: ToolAction) -> bool {
        self.actions().contains(&action)
    }

    async fn invoke(
        &self,
        action: ToolAction,
        params: &Map<String, Value>,
        ctx: &ToolExecutionContext<'_>,
    ) -> ToolResult;
}

/// Tools available to one run
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<ToolKind, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every tool whose credentials are present.
    ///
    /// `extra_requirements` returns credential keys a binding adds for a tool.
    pub fn for_run<F>(credentials: &Credentials, extra_requirements: F) -> Self
    where
        F: Fn(ToolKind) -> Vec<String>,
    {
        let mut registry = Self::new();

        for kind in ToolKind::ALL {
            let mut required: Vec<String> = kind
                .required_credentials()
                .iter()
                .map(|c| c.to_string())
                .collect();
            required.extend(extra_requirements(kind));

            let missing: Vec<&String> = required
                .iter()
                .filter(|key| credentials.get(key.as_str()).map_or(true, |v| v.is_empty()))
                .collect();

            if missing.is_empty() {
                registry.register(kind.build(credentials));
            } else {
                info!("Tool {} unavailable, missing credentials: {:?}", kind, missing);
            }
        }

        registry
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.kind(), tool);
    }

    pub fn get(&self, kind: ToolKind) -> Option<&dyn Tool> {
        self.tools.get(&kind).map(|t| t.as_ref())
    }

    /// Names of the tools present, sorted
    pub fn names(&self) -> Vec<String> {
        let mut kinds: Vec<&ToolKind> = self.tools.keys().collect();
        kinds.sort();
        kinds.iter().map(|k| k.to_string()).collect()
    }
}

/// Read a string parameter
pub(crate) fn str_param<'p>(params: &'p Map<String, Value>, name: &str) -> Option<&'p str> {
    params.get(name).and_then(|v| v.as_str()).filter(|s| !s.is_empty())
}
