//! # Gateway Agents
//!
//! A declarative agent runner for chat-completion models reached through a
//! common OpenAI-compatible gateway API.
//!
//! ## Features
//!
//! - **Declarative agents** - Steps, variables and settings in YAML or JSON
//! - **Typed steps** - Model prompts, tool calls, conditions, transforms, output
//! - **Built-in tools** - Web search, web scraping, static code analysis
//! - **Execution records** - Per-step status, logs, token usage and metrics
//! - **Concurrent runs** - One executor serves many runs, each isolated
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use gateway_agents::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let agent: AgentDefinition = serde_yaml::from_str(r#"
//! id: summarizer
//! name: Summarizer
//! variables:
//!   - name: topic
//!     type: string
//!     required: true
//! steps:
//!   - id: summarize
//!     type: prompt
//!     order: 1
//!     config:
//!       prompt: "Summarize {topic} in three sentences"
//!       model: gpt-4o-mini
//! "#)?;
//!
//!     let backend = GatewayClient::from_config(&GatewayConfig::default(), None)?;
//!     let executor = Executor::new(
//!         Arc::new(MemoryStore::with_agents(vec![agent])),
//!         Arc::new(backend),
//!     );
//!
//!     let mut inputs = HashMap::new();
//!     inputs.insert("topic".to_string(), serde_json::json!("ownership in Rust"));
//!
//!     let record = executor
//!         .execute_agent("summarizer", inputs, Credentials::new())
//!         .await?;
//!     println!("Execution {} finished: {:?}", record.id, record.status);
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod gateway;
pub mod keys;
pub mod store;
pub mod tools;
pub mod workflow;

// Re-export main types
pub use engine::{
    ExecutionRecord, ExecutionStatus, ExecutionTable, Executor, ExecutorError, LogEntry, Metrics,
    StepError, StepExecution, StepStatus,
};
pub use gateway::{
    ChatBackend, Completion, CompletionRequest, GatewayClient, GatewayConfig, GatewayError,
    TokenUsage,
};
pub use keys::{KeyStore, KeyStoreError};
pub use store::{AgentStore, FileStore, MemoryStore, StoreError};
pub use tools::{
    Credentials, Tool, ToolAction, ToolExecutionContext, ToolKind, ToolRegistry, ToolResult,
};
pub use workflow::{
    AgentDefinition, AgentLoader, ErrorPolicy, ExecutionContext, LoadError, LogLevel,
    RunnerConfig, Settings, Step, StepKind, Variable,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::engine::{ExecutionRecord, ExecutionStatus, Executor, ExecutorError, StepStatus};
    pub use crate::gateway::{ChatBackend, GatewayClient, GatewayConfig, GatewayError};
    pub use crate::keys::KeyStore;
    pub use crate::store::{AgentStore, FileStore, MemoryStore};
    pub use crate::tools::{Credentials, ToolKind, ToolRegistry};
    pub use crate::workflow::{AgentDefinition, AgentLoader, RunnerConfig, Step, StepKind};
}
